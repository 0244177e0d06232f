use log::debug;

use std::{
	collections::HashMap,
	ops::Index
};

use crate::{
	definitions::{
		ObjectDefinition,
		ObjectId,
		ObjectKind
	},
	fbx_binary::RawNode
};

/// Arena of object definitions. Objects are addressed by [`ObjectId`] once registered and by
/// their UID (or legacy name) when resolving connections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
	objects: Vec<ObjectDefinition>,
	keys: HashMap<String, ObjectId>,
}

/// Mutable access to two distinct elements
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
	if a < b {
		let (lo, hi) = items.split_at_mut(b);
		(&mut lo[a], &mut hi[0])
	} else {
		let (lo, hi) = items.split_at_mut(a);
		(&mut hi[0], &mut lo[b])
	}
}

impl Registry {
	pub fn new() -> Registry {
		Registry::default()
	}

	/// Registers every supported child of an `Objects` node
	pub fn from_node(objects: &RawNode) -> Registry {
		let mut registry = Registry::new();

		for node in objects.children.iter() {
			match ObjectDefinition::from_node(node) {
				Some(def) => {
					registry.insert(def);
				},
				None => debug!("Skipping unsupported object {} ending at {}", node.name, node.end),
			}
		}

		registry
	}

	/// Adds a definition. A definition with the key of an existing one replaces it, keeping its id.
	pub fn insert(&mut self, def: ObjectDefinition) -> ObjectId {
		let key = def.key();

		match self.keys.get(&key) {
			Some(&id) => {
				debug!("Object {} redefined", key);
				self.objects[id.0] = def;
				id
			},
			None => {
				let id = ObjectId(self.objects.len());
				self.objects.push(def);
				self.keys.insert(key, id);
				id
			},
		}
	}

	pub fn lookup(&self, key: &str) -> Option<ObjectId> {
		self.keys.get(key).copied()
	}

	pub fn get(&self, id: ObjectId) -> Option<&ObjectDefinition> {
		self.objects.get(id.0)
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}

	/// Definitions in registration order
	pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectDefinition)> {
		self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
	}

	/// Lets `left` absorb `right`. What happens depends on both kinds; unrelated pairs are left
	/// untouched.
	pub fn connect(&mut self, left: ObjectId, right: ObjectId) {
		if left == right {
			debug!("Ignoring connection of object {} to itself", self.objects[left.0].name);
			return;
		}

		let (l, r) = pair_mut(&mut self.objects, left.0, right.0);

		match (&mut l.kind, &mut r.kind) {
			(ObjectKind::Model(child), ObjectKind::Model(parent)) => {
				parent.children.push(left);
				child.parent = Some(right);
			},
			(ObjectKind::Model(model), ObjectKind::Texture(_)) => model.textures.push(right),
			(ObjectKind::Model(model), ObjectKind::Material(_)) => model.materials.push(right),
			(ObjectKind::Model(model), ObjectKind::LimbNode(_)) => model.skeleton = Some(right),
			(ObjectKind::Model(model), ObjectKind::Skin(_)) => model.deformer = Some(right),

			(ObjectKind::LimbNode(_), ObjectKind::Model(model)) => model.skeleton = Some(left),
			(ObjectKind::LimbNode(child), ObjectKind::LimbNode(parent)) => {
				parent.children.push(left);
				child.parent = Some(right);
			},
			(ObjectKind::LimbNode(limb), ObjectKind::Cluster(cluster)) => {
				cluster.limb = Some(left);
				limb.cluster = Some(right);
			},

			(ObjectKind::Cluster(cluster), ObjectKind::LimbNode(limb)) => {
				cluster.limb = Some(right);
				limb.cluster = Some(left);
			},
			(ObjectKind::Cluster(_), ObjectKind::Skin(skin)) => skin.clusters.push(left),

			(ObjectKind::Skin(_), ObjectKind::Model(model)) => model.deformer = Some(left),
			(ObjectKind::Skin(skin), ObjectKind::Cluster(_)) => skin.clusters.push(right),

			(ObjectKind::Material(_), ObjectKind::Model(model)) => model.materials.push(left),
			(ObjectKind::Material(material), ObjectKind::Texture(_)) => material.textures.push(right),

			(ObjectKind::Texture(texture), ObjectKind::Model(model)) => {
				model.textures.push(left);
				texture.parent = Some(right);
			},
			(ObjectKind::Texture(texture), ObjectKind::Texture(_)) |
			(ObjectKind::Texture(texture), ObjectKind::LimbNode(_)) => texture.parent = Some(right),
			(ObjectKind::Texture(texture), ObjectKind::Material(material)) => {
				material.textures.push(left);
				texture.parent = Some(right);
			},
			(ObjectKind::Texture(texture), ObjectKind::Media(media)) => {
				if !media.content.is_empty() {
					texture.data = media.content.clone();
				}
				texture.parent = Some(right);
			},

			(ObjectKind::Media(media), ObjectKind::Texture(texture)) => {
				if !media.content.is_empty() {
					texture.data = media.content.clone();
				}
			},

			(ObjectKind::AnimationCurve(_), ObjectKind::AnimationCurveNode(node)) => node.curve = Some(left),
			(ObjectKind::AnimationCurveNode(node), ObjectKind::AnimationCurve(_)) => node.curve = Some(right),
			(ObjectKind::AnimationCurveNode(_), ObjectKind::AnimationLayer(layer)) => layer.curve_nodes.push(left),

			(ObjectKind::AnimationLayer(layer), ObjectKind::AnimationCurveNode(_)) => layer.curve_nodes.push(right),
			(ObjectKind::AnimationLayer(_), ObjectKind::AnimationStack(stack)) => stack.layers.push(left),

			(ObjectKind::AnimationStack(stack), ObjectKind::AnimationLayer(_)) => stack.layers.push(right),

			_ => {},
		}
	}
}

impl Index<ObjectId> for Registry {
	type Output = ObjectDefinition;

	fn index(&self, id: ObjectId) -> &ObjectDefinition {
		&self.objects[id.0]
	}
}
