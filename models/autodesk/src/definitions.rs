use log::warn;
use scenekit_core::{
	scene::FaceType,
	trim_null
};

use ultraviolet::vec::Vec3;

use crate::fbx_binary::{
	is_container,
	Property,
	PropertyData,
	RawNode
};

/// Index of an object definition within its [`Registry`](crate::registry::Registry)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// Hooks invoked while reading the body of an object record
pub trait Definition {
	/// Called for every structural record in the body, containers included
	fn nested_record(&mut self, _name: &str, _properties: &[Property]) {}
	/// Called for every `P`/`Property` record, usually found in `Properties60`/`Properties70`
	fn embedded_property(&mut self, _properties: &[Property]) {}
}

fn text(properties: &[Property], index: usize) -> Option<&str> {
	properties.get(index).and_then(|p| p.data.as_str())
}

/// The value of the last property, where typed values such as colours and vectors end
fn trailing_f32(properties: &[Property]) -> Option<f32> {
	properties.last().and_then(|p| p.data.as_f32())
}

fn trailing_vec3(properties: &[Property]) -> Option<Vec3> {
	let n = properties.len();
	if n < 3 {
		return None;
	}

	let x = properties[n - 3].data.as_f32()?;
	let y = properties[n - 2].data.as_f32()?;
	let z = properties[n - 1].data.as_f32()?;
	Some(Vec3::new(x, y, z))
}

/// Reads a float list stored either as one array property or as one scalar property per value
fn floats(name: &str, properties: &[Property]) -> Option<Vec<f32>> {
	match properties.first().map(|p| &p.data) {
		Some(PropertyData::Float64Array(v)) => Some(v.iter().map(|f| *f as f32).collect()),
		Some(PropertyData::Float32Array(v)) => Some(v.clone()),
		Some(d) if d.as_f64().is_some() => properties.iter().map(|p| p.data.as_f32()).collect(),
		Some(d) => {
			warn!("Invalid {} data: expected floats, found {:?}", name, d.type_code());
			None
		},
		None => None,
	}
}

/// Reads an integer list stored either as one array property or as one scalar property per value
fn ints(name: &str, properties: &[Property]) -> Option<Vec<i32>> {
	match properties.first().map(|p| &p.data) {
		Some(PropertyData::Int32Array(v)) => Some(v.clone()),
		Some(PropertyData::Int64Array(v)) => Some(v.iter().map(|i| *i as i32).collect()),
		Some(d) if d.as_i64().is_some() => properties.iter().map(|p| p.data.as_i32()).collect(),
		Some(d) => {
			warn!("Invalid {} data: expected integers, found {:?}", name, d.type_code());
			None
		},
		None => None,
	}
}

fn longs(properties: &[Property]) -> Option<Vec<i64>> {
	match properties.first().map(|p| &p.data) {
		Some(PropertyData::Int64Array(v)) => Some(v.clone()),
		Some(PropertyData::Int32Array(v)) => Some(v.iter().map(|i| *i as i64).collect()),
		Some(_) => properties.iter().map(|p| p.data.as_i64()).collect(),
		None => None,
	}
}

/// Polygon vertex indices mark the last corner of each polygon by storing it bitwise negated.
/// Returns the plain indices and the face type, fixed by the size of the first polygon.
pub fn decode_polygons(raw: &[i32]) -> (Vec<i32>, Option<FaceType>) {
	let size = raw.iter().position(|i| *i < 0).map(|p| p + 1);
	let indices = raw.iter().map(|&i| if i < 0 { !i } else { i }).collect();

	let face_type = match size {
		Some(size) => {
			let face_type = FaceType::from_size(size);
			if face_type.is_none() {
				warn!("Unsupported polygon size {}, only triangles and quads are imported", size);
			}
			face_type
		},
		None => None,
	};

	(indices, face_type)
}

/// A `Model` or `Geometry` of class `Mesh`. Geometry arrays stay empty on transform-only models.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
	pub vertices: Vec<f32>,
	pub normals: Vec<f32>,
	pub uvs: Vec<f32>,
	pub uv_indices: Vec<i32>,
	pub indices: Vec<i32>,
	pub face_type: Option<FaceType>,
	pub parent: Option<ObjectId>,
	pub children: Vec<ObjectId>,
	pub textures: Vec<ObjectId>,
	pub materials: Vec<ObjectId>,
	pub deformer: Option<ObjectId>,
	pub skeleton: Option<ObjectId>,
}

impl Model {
	pub fn has_geometry(&self) -> bool {
		!self.vertices.is_empty()
	}

	pub fn is_root(&self) -> bool {
		self.parent.is_none()
	}
}

impl Definition for Model {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		match name {
			"Vertices" => if let Some(v) = floats(name, properties) {
				self.vertices = v;
			},
			"Normals" => if let Some(v) = floats(name, properties) {
				self.normals = v;
			},
			"UV" => if let Some(v) = floats(name, properties) {
				self.uvs = v;
			},
			"UVIndex" => if let Some(v) = ints(name, properties) {
				self.uv_indices = v;
			},
			"PolygonVertexIndex" => if let Some(v) = ints(name, properties) {
				let (indices, face_type) = decode_polygons(&v);
				self.indices = indices;
				self.face_type = face_type;
			},
			_ => {},
		}
	}
}

/// Skeleton bone
#[derive(Clone, Debug, PartialEq)]
pub struct LimbNode {
	pub translation: Vec3,
	pub rotation: Vec3,
	pub scaling: Vec3,
	pub parent: Option<ObjectId>,
	pub children: Vec<ObjectId>,
	pub cluster: Option<ObjectId>,
}

impl Default for LimbNode {
	fn default() -> Self {
		LimbNode {
			translation: Vec3::zero(),
			rotation: Vec3::zero(),
			scaling: Vec3::one(),
			parent: None,
			children: vec![],
			cluster: None,
		}
	}
}

impl Definition for LimbNode {
	fn embedded_property(&mut self, properties: &[Property]) {
		let target = match text(properties, 0) {
			Some("Lcl Translation") => &mut self.translation,
			Some("Lcl Rotation") => &mut self.rotation,
			Some("Lcl Scaling") => &mut self.scaling,
			_ => return,
		};

		if let Some(v) = trailing_vec3(properties) {
			*target = v;
		}
	}
}

/// Blend shape geometry. Kept for completeness, shapes take part in no connection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
	pub indexes: Vec<i32>,
	pub vertices: Vec<f32>,
	pub normals: Vec<f32>,
}

impl Definition for Shape {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		match name {
			"Indexes" => if let Some(v) = ints(name, properties) {
				self.indexes = v;
			},
			"Vertices" => if let Some(v) = floats(name, properties) {
				self.vertices = v;
			},
			"Normals" => if let Some(v) = floats(name, properties) {
				self.normals = v;
			},
			_ => {},
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
	pub ambient: Vec3,
	pub diffuse: Vec3,
	pub specular: Vec3,
	pub emissive: Vec3,
	pub transparency_factor: f32,
	pub specular_factor: f32,
	pub reflection_factor: f32,
	pub shininess: f32,
	pub shininess_exponent: f32,
	pub emissive_factor: f32,
	pub opacity: f32,
	pub reflectivity: f32,
	pub textures: Vec<ObjectId>,
}

impl Default for Material {
	fn default() -> Self {
		Material {
			ambient: Vec3::one(),
			diffuse: Vec3::one(),
			specular: Vec3::one(),
			emissive: Vec3::one(),
			transparency_factor: 1.0,
			specular_factor: 1.0,
			reflection_factor: 1.0,
			shininess: 1.0,
			shininess_exponent: 1.0,
			emissive_factor: 1.0,
			opacity: 1.0,
			reflectivity: 1.0,
			textures: vec![],
		}
	}
}

impl Definition for Material {
	fn embedded_property(&mut self, properties: &[Property]) {
		let name = match text(properties, 0) {
			Some(name) => name,
			None => return,
		};

		let factor = match name {
			"TransparencyFactor" => Some(&mut self.transparency_factor),
			"SpecularFactor" => Some(&mut self.specular_factor),
			"ReflectionFactor" => Some(&mut self.reflection_factor),
			"Shininess" => Some(&mut self.shininess),
			"ShininessExponent" => Some(&mut self.shininess_exponent),
			"EmissiveFactor" => Some(&mut self.emissive_factor),
			"Opacity" => Some(&mut self.opacity),
			"Reflectivity" => Some(&mut self.reflectivity),
			_ => None,
		};

		if let Some(factor) = factor {
			if let Some(v) = trailing_f32(properties) {
				*factor = v;
			}
			return;
		}

		// Colours are typed Color in 7.x files and ColorRGB in 6.x files
		if !matches!(text(properties, 1), Some("Color") | Some("ColorRGB")) {
			return;
		}

		let color = match name {
			"Ambient" | "AmbientColor" => &mut self.ambient,
			"Diffuse" | "DiffuseColor" => &mut self.diffuse,
			"Specular" | "SpecularColor" => &mut self.specular,
			"Emissive" | "EmissiveColor" => &mut self.emissive,
			_ => return,
		};

		if let Some(v) = trailing_vec3(properties) {
			*color = v;
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
	pub texture_type: String,
	pub texture_name: String,
	pub file_name: String,
	pub relative_file_name: String,
	/// Embedded image, copied from a connected `Video`
	pub data: Vec<u8>,
	pub parent: Option<ObjectId>,
}

impl Definition for Texture {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		let value = match text(properties, 0) {
			Some(v) => v,
			None => return,
		};

		match name {
			"Type" => self.texture_type = value.to_string(),
			"TextureName" => self.texture_name = trim_null(value).to_string(),
			"FileName" => self.file_name = value.to_string(),
			"RelativeFilename" => self.relative_file_name = value.to_string(),
			_ => {},
		}
	}
}

/// A `Video` object, carrying the file contents of an embedded texture
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Media {
	pub content: Vec<u8>,
	pub file_name: String,
	pub relative_file_name: String,
}

impl Definition for Media {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		let first = match properties.first() {
			Some(p) => &p.data,
			None => return,
		};

		match (name, first) {
			("Content", PropertyData::Binary(b)) => self.content = b.clone(),
			("FileName", PropertyData::Text(s)) | ("Filename", PropertyData::Text(s)) => self.file_name = s.clone(),
			("RelativeFilename", PropertyData::Text(s)) => self.relative_file_name = s.clone(),
			_ => {},
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skin {
	pub link_deform_accuracy: f32,
	pub clusters: Vec<ObjectId>,
}

impl Definition for Skin {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		if name == "Link_DeformAcuracy" {
			if let Some(v) = properties.first().and_then(|p| p.data.as_f32()) {
				self.link_deform_accuracy = v;
			}
		}
	}
}

/// Binding of one bone to the vertices it influences
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cluster {
	pub indexes: Vec<i32>,
	pub weights: Vec<f32>,
	pub transform: Vec<f32>,
	pub transform_link: Vec<f32>,
	pub limb: Option<ObjectId>,
}

impl Definition for Cluster {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		match name {
			"Indexes" => if let Some(v) = ints(name, properties) {
				self.indexes = v;
			},
			"Weights" => if let Some(v) = floats(name, properties) {
				self.weights = v;
			},
			"Transform" => if let Some(v) = floats(name, properties) {
				self.transform = v;
			},
			"TransformLink" => if let Some(v) = floats(name, properties) {
				self.transform_link = v;
			},
			_ => {},
		}
	}
}

/// Times are in FBX ticks
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationStack {
	pub local_start: i64,
	pub local_stop: i64,
	pub reference_start: i64,
	pub reference_stop: i64,
	pub layers: Vec<ObjectId>,
}

impl Definition for AnimationStack {
	fn embedded_property(&mut self, properties: &[Property]) {
		let target = match text(properties, 0) {
			Some("LocalStart") => &mut self.local_start,
			Some("LocalStop") => &mut self.local_stop,
			Some("ReferenceStart") => &mut self.reference_start,
			Some("ReferenceStop") => &mut self.reference_stop,
			_ => return,
		};

		if let Some(v) = properties.last().and_then(|p| p.data.as_i64()) {
			*target = v;
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationLayer {
	pub curve_nodes: Vec<ObjectId>,
}

impl Definition for AnimationLayer {}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationCurveNode {
	pub delta: Vec3,
	pub curve: Option<ObjectId>,
}

impl Default for AnimationCurveNode {
	fn default() -> Self {
		AnimationCurveNode {
			delta: Vec3::zero(),
			curve: None,
		}
	}
}

impl Definition for AnimationCurveNode {
	fn embedded_property(&mut self, properties: &[Property]) {
		let target = match text(properties, 0) {
			Some("d|X") => &mut self.delta.x,
			Some("d|Y") => &mut self.delta.y,
			Some("d|Z") => &mut self.delta.z,
			_ => return,
		};

		if let Some(v) = trailing_f32(properties) {
			*target = v;
		}
	}
}

/// Keyframes of one animated channel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationCurve {
	pub default: f64,
	pub key_version: i32,
	pub key_time: Vec<i64>,
	pub key_value: Vec<f32>,
	pub key_attr_flags: Vec<i32>,
	pub key_attr_data: Vec<f32>,
	pub key_attr_ref_count: Vec<i32>,
}

impl Definition for AnimationCurve {
	fn nested_record(&mut self, name: &str, properties: &[Property]) {
		match name {
			"Default" => if let Some(v) = properties.first().and_then(|p| p.data.as_f64()) {
				self.default = v;
			},
			"KeyVer" => if let Some(v) = properties.first().and_then(|p| p.data.as_i32()) {
				self.key_version = v;
			},
			"KeyTime" => if let Some(v) = longs(properties) {
				self.key_time = v;
			},
			"KeyValueFloat" => if let Some(v) = floats(name, properties) {
				self.key_value = v;
			},
			"KeyAttrFlags" => if let Some(v) = ints(name, properties) {
				self.key_attr_flags = v;
			},
			"KeyAttrDataFloat" => if let Some(v) = floats(name, properties) {
				self.key_attr_data = v;
			},
			"KeyAttrRefCount" => if let Some(v) = ints(name, properties) {
				self.key_attr_ref_count = v;
			},
			_ => {},
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKind {
	Model(Model),
	LimbNode(LimbNode),
	Shape(Shape),
	Material(Material),
	Texture(Texture),
	Media(Media),
	Skin(Skin),
	Cluster(Cluster),
	AnimationStack(AnimationStack),
	AnimationLayer(AnimationLayer),
	AnimationCurveNode(AnimationCurveNode),
	AnimationCurve(AnimationCurve),
}

impl ObjectKind {
	/// Selects the kind of an `Objects` child from its record name and, for models, geometry and
	/// deformers, its subtype (the last string property). `None` for unsupported objects.
	pub fn from_record(name: &str, subtype: &str) -> Option<ObjectKind> {
		let kind = match (name, subtype) {
			("Model", "LimbNode") | ("Geometry", "LimbNode") => ObjectKind::LimbNode(LimbNode::default()),
			("Model", "Shape") | ("Geometry", "Shape") => ObjectKind::Shape(Shape::default()),
			("Model", "Mesh") | ("Geometry", "Mesh") => ObjectKind::Model(Model::default()),
			("Material", _) => ObjectKind::Material(Material::default()),
			("Texture", _) => ObjectKind::Texture(Texture::default()),
			("Video", _) => ObjectKind::Media(Media::default()),
			("Deformer", "Skin") => ObjectKind::Skin(Skin::default()),
			("Deformer", "Cluster") => ObjectKind::Cluster(Cluster::default()),
			("AnimationStack", _) => ObjectKind::AnimationStack(AnimationStack::default()),
			("AnimationLayer", _) => ObjectKind::AnimationLayer(AnimationLayer::default()),
			("AnimationCurveNode", _) => ObjectKind::AnimationCurveNode(AnimationCurveNode::default()),
			("AnimationCurve", _) => ObjectKind::AnimationCurve(AnimationCurve::default()),
			_ => return None,
		};

		Some(kind)
	}

	pub fn definition(&mut self) -> &mut dyn Definition {
		match self {
			ObjectKind::Model(d) => d,
			ObjectKind::LimbNode(d) => d,
			ObjectKind::Shape(d) => d,
			ObjectKind::Material(d) => d,
			ObjectKind::Texture(d) => d,
			ObjectKind::Media(d) => d,
			ObjectKind::Skin(d) => d,
			ObjectKind::Cluster(d) => d,
			ObjectKind::AnimationStack(d) => d,
			ObjectKind::AnimationLayer(d) => d,
			ObjectKind::AnimationCurveNode(d) => d,
			ObjectKind::AnimationCurve(d) => d,
		}
	}
}

/// An object from the `Objects` section: the shared envelope plus its kind-specific payload
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDefinition {
	pub uid: i64,
	pub name: String,
	/// Absolute offset just past the object's record
	pub end_offset: usize,
	pub kind: ObjectKind,
}

impl ObjectDefinition {
	/// Builds a definition from an `Objects` child and reads its body. `None` for unsupported
	/// objects such as cameras and lights.
	pub fn from_node(node: &RawNode) -> Option<ObjectDefinition> {
		let subtype = node.properties.last().and_then(|p| p.data.as_str()).unwrap_or("");
		let kind = ObjectKind::from_record(&node.name, subtype)?;

		let uid = node.properties.first().and_then(|p| p.data.as_i64()).unwrap_or(0);

		let n = node.properties.len();
		let name = match n {
			0 | 1 => "",
			_ => node.properties[n - 2].data.as_str().map(trim_null).unwrap_or(""),
		};

		let mut def = ObjectDefinition {
			uid: uid,
			name: if name.is_empty() { "NULL".to_string() } else { name.to_string() },
			end_offset: node.end,
			kind: kind,
		};
		read_body(def.kind.definition(), &node.children);

		Some(def)
	}

	/// Registry key: the UID when one is set, otherwise the name as used by legacy files
	pub fn key(&self) -> String {
		if self.uid > 0 {
			self.uid.to_string()
		} else {
			self.name.clone()
		}
	}
}

fn read_body(def: &mut dyn Definition, records: &[RawNode]) {
	for record in records.iter() {
		match record.name.as_str() {
			"P" | "Property" => def.embedded_property(&record.properties),
			name => def.nested_record(name, &record.properties),
		}

		if is_container(&record.name) {
			read_body(def, &record.children);
		}
	}
}
