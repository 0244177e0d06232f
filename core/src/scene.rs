use ultraviolet::vec::{
	Vec2,
	Vec3
};

use crate::texture::{
	Color,
	Texture
};

/// Polygon layout of a mesh's index list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceType {
	Triangles,
	Quads,
}

impl FaceType {
	/// Classifies a face by its corner count. Other polygon sizes are unsupported.
	pub fn from_size(size: usize) -> Option<FaceType> {
		match size {
			3 => Some(FaceType::Triangles),
			4 => Some(FaceType::Quads),
			_ => None,
		}
	}

	pub fn size(&self) -> usize {
		match self {
			FaceType::Triangles => 3,
			FaceType::Quads => 4,
		}
	}
}

/// Skeleton bone, owning its children
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
	pub name: String,
	pub translation: Vec3,
	/// Euler angles in degrees
	pub rotation: Vec3,
	pub scale: Vec3,
	/// Influenced vertex indices, parallel to [`Bone::weights`]
	pub indices: Vec<i32>,
	pub weights: Vec<f32>,
	/// Column-major 4x4 matrix of the mesh at bind time
	pub transform: Vec<f32>,
	/// Column-major 4x4 matrix of the bone at bind time
	pub transform_link: Vec<f32>,
	pub children: Vec<Bone>,
}

impl Bone {
	pub fn new(name: &str) -> Bone {
		Bone {
			name: name.to_string(),
			translation: Vec3::zero(),
			rotation: Vec3::zero(),
			scale: Vec3::one(),
			indices: vec![],
			weights: vec![],
			transform: vec![],
			transform_link: vec![],
			children: vec![],
		}
	}

	/// Searches this bone and its descendants for the given name
	pub fn find(&self, name: &str) -> Option<&Bone> {
		if self.name == name {
			return Some(self);
		}

		self.children.iter().find_map(|c| c.find(name))
	}

	/// All descendants in pre-order, excluding this bone
	pub fn descendants(&self) -> Vec<&Bone> {
		let mut out = vec![];
		for child in self.children.iter() {
			out.push(child);
			out.extend(child.descendants());
		}
		out
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
	pub name: String,
	pub ambient: Color,
	pub diffuse: Color,
	pub specular: Color,
	pub emissive: Color,
	pub specular_factor: f32,
	pub shininess_exponent: f32,
	pub transparency_factor: f32,
	pub emissive_factor: f32,
	pub reflection_factor: f32,
	pub shininess: f32,
	pub reflectivity: f32,
	pub opacity: f32,
	pub textures: Vec<Texture>,
}

impl Material {
	pub fn new(name: &str) -> Material {
		Material {
			name: name.to_string(),
			ambient: Color::white(),
			diffuse: Color::white(),
			specular: Color::white(),
			emissive: Color::white(),
			specular_factor: 1.0,
			shininess_exponent: 1.0,
			transparency_factor: 1.0,
			emissive_factor: 1.0,
			reflection_factor: 1.0,
			shininess: 1.0,
			reflectivity: 1.0,
			opacity: 1.0,
			textures: vec![],
		}
	}

	pub fn texture_by_name(&self, name: &str) -> Option<&Texture> {
		self.textures.iter().find(|t| t.name == name)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
	pub name: String,
	pub vertices: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	pub indices: Vec<u32>,
	/// `None` when the geometry had no polygons or used an unsupported polygon size
	pub face_type: Option<FaceType>,
	pub materials: Vec<Material>,
	/// Textures connected directly to the model hierarchy rather than through a material
	pub textures: Vec<Texture>,
	pub root_bone: Option<Bone>,
}

impl Mesh {
	pub fn new(name: &str) -> Mesh {
		Mesh {
			name: name.to_string(),
			vertices: vec![],
			normals: vec![],
			uvs: vec![],
			indices: vec![],
			face_type: None,
			materials: vec![],
			textures: vec![],
			root_bone: None,
		}
	}

	pub fn has_skeleton(&self) -> bool {
		self.root_bone.is_some()
	}

	pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
		self.root_bone.as_ref().and_then(|b| b.find(name))
	}

	/// Every bone of the skeleton, root first
	pub fn all_bones(&self) -> Vec<&Bone> {
		match &self.root_bone {
			Some(root) => {
				let mut bones = vec![root];
				bones.extend(root.descendants());
				bones
			},
			None => vec![],
		}
	}

	pub fn material_by_name(&self, name: &str) -> Option<&Material> {
		self.materials.iter().find(|m| m.name == name)
	}

	/// Returns the largest absolute coordinate of any vertex
	pub fn max_extent(&self) -> f32 {
		self.vertices.iter()
			.map(|v| v.x.abs().max(v.y.abs()).max(v.z.abs()))
			.fold(0.0, f32::max)
	}

	pub fn set_scale(&mut self, scale: f32) {
		for v in self.vertices.iter_mut() {
			*v *= scale;
		}
	}

	/// Scales the mesh so the furthest coordinate from the origin equals `extent`
	pub fn set_max_extent(&mut self, extent: f32) {
		let current = self.max_extent();
		if current > 0.0 {
			self.set_scale(extent / current);
		}
	}

	/// Splits every quad into two triangles. Triangle meshes are left untouched.
	pub fn triangulate(&mut self) {
		if self.face_type != Some(FaceType::Quads) {
			return;
		}

		let mut tris = Vec::with_capacity(self.indices.len() / 4 * 6);
		for q in self.indices.chunks_exact(4) {
			tris.extend_from_slice(&[q[0], q[1], q[2], q[2], q[3], q[0]]);
		}

		self.indices = tris;
		self.face_type = Some(FaceType::Triangles);
	}

	pub fn flip_uv_x(&mut self) {
		for uv in self.uvs.iter_mut() {
			uv.x = 1.0 - uv.x;
		}
	}

	pub fn flip_uv_y(&mut self) {
		for uv in self.uvs.iter_mut() {
			uv.y = 1.0 - uv.y;
		}
	}
}

/// Top level of an imported file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
	pub meshes: Vec<Mesh>,
	/// Textures not connected to any material or model
	pub textures: Vec<Texture>,
}

impl Scene {
	pub fn mesh_by_name(&self, name: &str) -> Option<&Mesh> {
		self.meshes.iter().find(|m| m.name == name)
	}

	pub fn is_empty(&self) -> bool {
		self.meshes.is_empty() && self.textures.is_empty()
	}
}
