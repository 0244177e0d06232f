use log::debug;

use scenekit_core::{
	scene::{
		Bone,
		Material,
		Mesh,
		Scene
	},
	texture::{
		Color,
		Texture
	}
};

use std::convert::TryFrom;

use ultraviolet::vec::{
	Vec2,
	Vec3
};

use crate::{
	definitions::{
		Cluster,
		LimbNode,
		Model,
		ObjectId,
		ObjectKind
	},
	registry::Registry
};

fn model(registry: &Registry, id: ObjectId) -> Option<&Model> {
	match registry.get(id).map(|o| &o.kind) {
		Some(ObjectKind::Model(m)) => Some(m),
		_ => None,
	}
}

fn limb(registry: &Registry, id: ObjectId) -> Option<&LimbNode> {
	match registry.get(id).map(|o| &o.kind) {
		Some(ObjectKind::LimbNode(l)) => Some(l),
		_ => None,
	}
}

fn cluster(registry: &Registry, id: ObjectId) -> Option<&Cluster> {
	match registry.get(id).map(|o| &o.kind) {
		Some(ObjectKind::Cluster(c)) => Some(c),
		_ => None,
	}
}

/// `root` and its model descendants in pre-order, children in connection order
fn subtree(registry: &Registry, root: ObjectId) -> Vec<ObjectId> {
	let mut seen = vec![false; registry.len()];
	let mut order = vec![];
	let mut stack = vec![root];

	while let Some(id) = stack.pop() {
		if seen[id.0] {
			continue;
		}
		seen[id.0] = true;

		if let Some(m) = model(registry, id) {
			order.push(id);
			stack.extend(m.children.iter().rev());
		}
	}

	order
}

fn vec3s(values: &[f32]) -> Vec<Vec3> {
	values.chunks_exact(3).map(|c| Vec3::new(c[0], c[1], c[2])).collect()
}

fn vec2s(values: &[f32]) -> Vec<Vec2> {
	values.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect()
}

/// UVs indexed by `UVIndex` are scattered into one slot per polygon corner: corner `i` writes
/// `UV[UVIndex[i]]` to slot `PolygonVertexIndex[i]`. Out-of-range entries are skipped.
fn expand_uvs(model: &Model) -> Vec<Vec2> {
	let uvs = vec2s(&model.uvs);
	if model.uv_indices.is_empty() {
		return uvs;
	}

	let mut out = vec![Vec2::zero(); model.uv_indices.len()];
	for (&vertex, &uv) in model.indices.iter().zip(model.uv_indices.iter()) {
		let slot = usize::try_from(vertex).ok().and_then(|v| out.get_mut(v));
		let value = usize::try_from(uv).ok().and_then(|u| uvs.get(u));

		if let (Some(slot), Some(value)) = (slot, value) {
			*slot = *value;
		}
	}

	out
}

fn color(v: Vec3) -> Color {
	Color::rgb(v.x, v.y, v.z)
}

fn texture(registry: &Registry, id: ObjectId) -> Option<Texture> {
	let def = registry.get(id)?;
	let t = match &def.kind {
		ObjectKind::Texture(t) => t,
		_ => return None,
	};

	let mut out = Texture::new(&def.name, &t.file_name);
	out.relative_path = t.relative_file_name.clone();
	out.data = t.data.clone();
	Some(out)
}

fn material(registry: &Registry, id: ObjectId) -> Option<Material> {
	let def = registry.get(id)?;
	let m = match &def.kind {
		ObjectKind::Material(m) => m,
		_ => return None,
	};

	let mut out = Material::new(&def.name);
	out.ambient = color(m.ambient);
	out.diffuse = color(m.diffuse);
	out.specular = color(m.specular);
	out.emissive = color(m.emissive);
	out.specular_factor = m.specular_factor;
	out.shininess_exponent = m.shininess_exponent;
	out.transparency_factor = m.transparency_factor;
	out.emissive_factor = m.emissive_factor;
	out.reflection_factor = m.reflection_factor;
	out.shininess = m.shininess;
	out.reflectivity = m.reflectivity;
	out.opacity = m.opacity;
	out.textures = m.textures.iter().filter_map(|&t| texture(registry, t)).collect();
	Some(out)
}

/// Follows parent links up to the top of the skeleton
fn skeleton_root(registry: &Registry, mut id: ObjectId) -> ObjectId {
	for _ in 0..registry.len() {
		match limb(registry, id).and_then(|l| l.parent) {
			Some(parent) => id = parent,
			None => break,
		}
	}
	id
}

/// The skeleton bound to a model subtree: the root's own limb link, otherwise the first skin
/// deformer with a cluster attached to a bone
fn find_skeleton(registry: &Registry, order: &[ObjectId]) -> Option<ObjectId> {
	let root = model(registry, *order.first()?)?;
	if let Some(limb) = root.skeleton {
		return Some(skeleton_root(registry, limb));
	}

	order.iter()
		.filter_map(|&id| model(registry, id).and_then(|m| m.deformer))
		.find_map(|skin| match registry.get(skin).map(|o| &o.kind) {
			Some(ObjectKind::Skin(s)) => s.clusters.iter().find_map(|&c| cluster(registry, c).and_then(|c| c.limb)),
			_ => None,
		})
		.map(|limb| skeleton_root(registry, limb))
}

fn bone(registry: &Registry, id: ObjectId, seen: &mut [bool]) -> Bone {
	seen[id.0] = true;
	let mut bone = Bone::new(&registry[id].name);

	let limb = match limb(registry, id) {
		Some(l) => l,
		None => return bone,
	};

	bone.translation = limb.translation;
	bone.rotation = limb.rotation;
	bone.scale = limb.scaling;

	if let Some(c) = limb.cluster.and_then(|c| cluster(registry, c)) {
		bone.indices = c.indexes.clone();
		bone.weights = c.weights.clone();
		bone.transform = c.transform.clone();
		bone.transform_link = c.transform_link.clone();
	}

	for &child in limb.children.iter() {
		if !seen[child.0] {
			bone.children.push(self::bone(registry, child, seen));
		}
	}

	bone
}

fn mesh(registry: &Registry, root: ObjectId) -> Option<Mesh> {
	let order = subtree(registry, root);
	let geometry = match order.iter().find_map(|&id| model(registry, id).filter(|m| m.has_geometry())) {
		Some(g) => g,
		None => {
			debug!("Model {} has no geometry, skipping", registry[root].name);
			return None;
		},
	};

	let mut mesh = Mesh::new(&registry[root].name);
	mesh.vertices = vec3s(&geometry.vertices);
	mesh.normals = vec3s(&geometry.normals);
	mesh.uvs = expand_uvs(geometry);
	mesh.indices = geometry.indices.iter().map(|&i| i as u32).collect();
	mesh.face_type = geometry.face_type;

	for m in order.iter().filter_map(|&id| model(registry, id)) {
		mesh.textures.extend(m.textures.iter().filter_map(|&t| texture(registry, t)));
		mesh.materials.extend(m.materials.iter().filter_map(|&t| material(registry, t)));
	}

	if let Some(limb) = find_skeleton(registry, &order) {
		let mut seen = vec![false; registry.len()];
		mesh.root_bone = Some(bone(registry, limb, &mut seen));
	}

	Some(mesh)
}

/// Builds the scene from a resolved object graph: one mesh per root model carrying geometry, plus
/// every texture not attached to anything.
pub fn assemble(registry: &Registry) -> Scene {
	let meshes: Vec<Mesh> = registry.iter()
		.filter(|(_, o)| matches!(&o.kind, ObjectKind::Model(m) if m.is_root()))
		.filter_map(|(id, _)| mesh(registry, id))
		.collect();

	let textures: Vec<Texture> = registry.iter()
		.filter(|(_, o)| matches!(&o.kind, ObjectKind::Texture(t) if t.parent.is_none()))
		.filter_map(|(id, _)| texture(registry, id))
		.collect();

	debug!("Assembled {} meshes and {} unattached textures", meshes.len(), textures.len());

	Scene {
		meshes: meshes,
		textures: textures,
	}
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use scenekit_core::scene::FaceType;

	use ultraviolet::vec::{
		Vec2,
		Vec3
	};

	use crate::{
		definitions::Model,
		fbx::Document,
		fbx_binary::{
			export::NodeRecord,
			PropertyData
		},
		test_util::*
	};

	use super::expand_uvs;

	fn triangle(uid: i64, name: &str) -> NodeRecord {
		geometry(uid, name, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, !2])
	}

	fn resolved(objects: Vec<NodeRecord>, links: Vec<NodeRecord>) -> Document {
		let buf = file(vec![
			objects.into_iter().fold(NodeRecord::new("Objects"), NodeRecord::child),
			links.into_iter().fold(NodeRecord::new("Connections"), NodeRecord::child),
		]);

		let mut doc = Document::parse(&buf).unwrap();
		doc.resolve();
		doc
	}

	#[test]
	fn test_textured_triangle() {
		let doc = resolved(vec![
			model(1, "Tri", "Mesh"),
			triangle(2, "TriGeometry"),
			object("Material", 3, "Paint", "", vec![]),
			texture(4, "Wood", "C:\\maps\\wood.png"),
		], vec![
			oo(1, 0),
			oo(2, 1),
			oo(3, 1),
			oo(4, 3),
		]);

		let scene = doc.scene();
		assert_eq!(1, scene.meshes.len());
		assert!(scene.textures.is_empty());

		let mesh = &scene.meshes[0];
		assert_eq!("Tri", mesh.name);
		assert_eq!(Some(FaceType::Triangles), mesh.face_type);
		assert_eq!(3, mesh.vertices.len());
		assert_eq!(Vec3::new(1.0, 0.0, 0.0), mesh.vertices[1]);
		assert_eq!(vec![0, 1, 2], mesh.indices);
		assert_eq!(1, mesh.materials.len());
		assert_eq!(1, mesh.materials[0].textures.len());
		assert_eq!("wood.png", mesh.materials[0].textures[0].file_name);
		assert!(mesh.root_bone.is_none());
	}

	#[test]
	fn test_skinned_mesh() {
		let doc = resolved(vec![
			model(1, "Body", "Mesh"),
			triangle(2, "BodyGeometry"),
			object("Deformer", 3, "Skin", "Skin", vec![]),
			object("Deformer", 4, "Cluster", "Cluster", vec![
				NodeRecord::new("Indexes").prop(PropertyData::Int32Array(vec![0, 2])),
				NodeRecord::new("Weights").prop(PropertyData::Float64Array(vec![1.0, 0.5])),
			]),
			object("Model", 5, "Hips", "LimbNode", vec![]),
			object("Model", 6, "Spine", "LimbNode", vec![
				NodeRecord::new("Properties70").child(p70("Lcl Translation", &[0.0, 10.0, 0.0])),
			]),
		], vec![
			oo(1, 0),
			oo(2, 1),
			oo(3, 2),
			oo(4, 3),
			oo(6, 4),
			oo(6, 5),
			oo(5, 1),
		]);

		let scene = doc.scene();
		// Limb nodes attached to the model are not meshes
		assert_eq!(1, scene.meshes.len());

		let root = scene.meshes[0].root_bone.as_ref().unwrap();
		assert_eq!("Hips", root.name);
		assert!(root.indices.is_empty());
		assert_eq!(1, root.children.len());

		let spine = &root.children[0];
		assert_eq!("Spine", spine.name);
		assert_eq!(vec![0, 2], spine.indices);
		assert_eq!(vec![1.0, 0.5], spine.weights);
		assert_eq!(Vec3::new(0.0, 10.0, 0.0), spine.translation);
		assert_eq!(Vec3::one(), spine.scale);
	}

	#[test]
	fn test_skin_without_limb_link() {
		let doc = resolved(vec![
			model(1, "Body", "Mesh"),
			triangle(2, "BodyGeometry"),
			object("Deformer", 3, "Skin", "Skin", vec![]),
			object("Deformer", 4, "Cluster", "Cluster", vec![]),
			object("Model", 5, "Hips", "LimbNode", vec![]),
			object("Model", 6, "Spine", "LimbNode", vec![]),
		], vec![
			oo(2, 1),
			oo(3, 2),
			oo(4, 3),
			oo(6, 4),
			oo(6, 5),
		]);

		let mesh = &doc.scene().meshes[0];
		assert_eq!(Some("Hips"), mesh.root_bone.as_ref().map(|b| b.name.as_str()));
		assert_eq!(2, mesh.all_bones().len());
	}

	#[test]
	fn test_unsupported_connection() {
		let doc = resolved(vec![
			model(1, "Cube", "Mesh"),
			triangle(2, "CubeGeometry"),
			object("NodeAttribute", 3, "Camera", "Camera", vec![]),
			model(4, "Empty", "Mesh"),
		], vec![
			oo(2, 1),
			oo(3, 1),
			oo(1, 3),
		]);

		let scene = doc.scene();
		assert_eq!(1, scene.meshes.len());
		assert_eq!("Cube", scene.meshes[0].name);
	}

	#[test]
	fn test_idempotent() {
		let doc = resolved(vec![
			model(1, "Tri", "Mesh"),
			triangle(2, "TriGeometry"),
			texture(3, "Loose", "loose.png"),
		], vec![oo(2, 1)]);

		let before = doc.objects.clone();
		let first = doc.scene();
		let second = doc.scene();

		assert_eq!(first, second);
		assert_eq!(before, doc.objects);
	}

	#[test]
	fn test_orphan_textures() {
		let doc = resolved(vec![
			texture(1, "Bound", "bound.png"),
			texture(2, "LooseA", "a.png"),
			model(3, "Tri", "Mesh"),
			triangle(4, "TriGeometry"),
			texture(5, "LooseB", "b.png"),
		], vec![
			oo(4, 3),
			oo(1, 3),
		]);

		let scene = doc.scene();
		let names: Vec<&str> = scene.textures.iter().map(|t| t.name.as_str()).collect();
		assert_eq!(vec!["LooseA", "LooseB"], names);
		assert_eq!(1, scene.meshes[0].textures.len());
	}

	#[test]
	fn test_legacy_names() {
		let doc = resolved(vec![
			legacy_model("Model::Tri", "Mesh", vec![
				NodeRecord::new("Vertices").prop(PropertyData::Float64Array(vec![0.0; 12])),
				NodeRecord::new("PolygonVertexIndex").prop(PropertyData::Int32Array(vec![0, 1, 2, !3])),
			]),
			legacy_model("Model::Bone", "LimbNode", vec![]),
		], vec![
			connect("Model::Tri", "Model::Scene"),
			connect("Model::Bone", "Model::Tri"),
		]);

		let scene = doc.scene();
		assert_eq!(1, scene.meshes.len());
		assert_eq!("Model::Tri", scene.meshes[0].name);
		assert_eq!(Some(FaceType::Quads), scene.meshes[0].face_type);
		assert_eq!("Model::Bone", scene.meshes[0].root_bone.as_ref().unwrap().name);
	}

	#[test]
	fn test_embedded_texture() {
		let doc = resolved(vec![
			texture(1, "Embedded", "C:\\maps\\skin.png"),
			object("Video", 2, "Clip", "Clip", vec![
				NodeRecord::new("Content").prop(PropertyData::Binary(vec![1, 2, 3, 4])),
			]),
		], vec![oo(2, 1)]);

		let scene = doc.scene();
		assert_eq!(1, scene.textures.len());
		assert!(scene.textures[0].has_data());
		assert_eq!("skin.png", scene.textures[0].file_name);
	}

	#[test]
	fn test_expand_uvs() {
		let mut model = Model::default();
		model.indices = vec![0, 1, 2, 2, 1, 3];
		model.uvs = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];
		model.uv_indices = vec![0, 1, 2, 2, 1, 3];

		let uvs = expand_uvs(&model);
		assert_eq!(6, uvs.len());
		assert_eq!(Vec2::new(1.0, 0.0), uvs[1]);
		assert_eq!(Vec2::new(1.0, 1.0), uvs[3]);
		assert_eq!(Vec2::zero(), uvs[5]);

		model.uv_indices = vec![0, 9, -1];
		let uvs = expand_uvs(&model);
		assert_eq!(3, uvs.len());
		assert_eq!(Vec2::zero(), uvs[1]);

		model.uv_indices.clear();
		assert_eq!(4, expand_uvs(&model).len());
	}

	#[test]
	fn test_geometry_in_grandchild() {
		let doc = resolved(vec![
			model(1, "Root", "Mesh"),
			model(2, "Pivot", "Mesh"),
			triangle(3, "Deep"),
			object("Material", 4, "Outer", "", vec![]),
			object("Material", 5, "Inner", "", vec![]),
		], vec![
			oo(2, 1),
			oo(3, 2),
			oo(4, 1),
			oo(5, 3),
		]);

		let scene = doc.scene();
		assert_eq!(1, scene.meshes.len());
		assert_eq!("Root", scene.meshes[0].name);
		let names: Vec<&str> = scene.meshes[0].materials.iter().map(|m| m.name.as_str()).collect();
		assert_eq!(vec!["Outer", "Inner"], names);
	}
}
