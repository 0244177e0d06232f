use log::{
	debug,
	trace
};

use scenekit_core::trim_null;

use std::fmt;

use crate::{
	fbx_binary::{
		PropertyData,
		RawNode
	},
	registry::Registry
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionKind {
	/// `OO`: object to object
	ObjectObject,
	/// `OP`: object to a property of another object
	ObjectProperty,
}

impl ConnectionKind {
	pub fn from_tag(tag: &str) -> Option<ConnectionKind> {
		match tag {
			"OO" => Some(ConnectionKind::ObjectObject),
			"OP" => Some(ConnectionKind::ObjectProperty),
			_ => None,
		}
	}
}

/// One side of a connection. Files before 7.0 refer to objects by name instead of UID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
	Uid(i64),
	Name(String),
}

impl Endpoint {
	/// Registry key of the endpoint. UIDs of zero and below refer to the scene root or nothing
	/// and never resolve.
	pub fn key(&self) -> Option<String> {
		match self {
			Endpoint::Uid(uid) if *uid > 0 => Some(uid.to_string()),
			Endpoint::Uid(_) => None,
			Endpoint::Name(name) => Some(name.clone()),
		}
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Endpoint::Uid(uid) => write!(f, "{}", uid),
			Endpoint::Name(name) => write!(f, "{:?}", name),
		}
	}
}

/// A directed link, the left object being attached to the right one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
	pub kind: ConnectionKind,
	pub left: Endpoint,
	pub right: Endpoint,
	/// Name of the target property of an `OP` connection
	pub property: Option<String>,
}

impl Connection {
	/// Reads a `C` (or legacy `Connect`) record. Other records and unknown kinds yield `None`.
	pub fn from_node(node: &RawNode) -> Option<Connection> {
		if node.name != "C" && node.name != "Connect" {
			return None;
		}

		let kind = ConnectionKind::from_tag(node.property(0)?.as_str()?)?;
		let left = node.property(1)?;
		let right = node.property(2)?;

		let (left, right) = match left {
			PropertyData::Int64(uid) => (Endpoint::Uid(*uid), Endpoint::Uid(right.as_i64().unwrap_or(0))),
			_ => (
				Endpoint::Name(trim_null(left.as_str().unwrap_or("")).to_string()),
				Endpoint::Name(trim_null(right.as_str().unwrap_or("")).to_string()),
			),
		};

		let property = node.property(3)
			.and_then(|p| p.as_str())
			.map(|s| trim_null(s).to_string());

		Some(Connection {
			kind: kind,
			left: left,
			right: right,
			property: property,
		})
	}
}

/// Reads the children of a `Connections` node in file order
pub fn parse(connections: &RawNode) -> Vec<Connection> {
	connections.children.iter().filter_map(Connection::from_node).collect()
}

/// Applies each connection whose endpoints are both registered, in order. Returns how many were
/// applied.
pub fn resolve(registry: &mut Registry, connections: &[Connection]) -> usize {
	let mut applied = 0;

	for c in connections.iter() {
		let left = c.left.key().and_then(|k| registry.lookup(&k));
		let right = c.right.key().and_then(|k| registry.lookup(&k));

		match (left, right) {
			(Some(left), Some(right)) => {
				registry.connect(left, right);
				applied += 1;
			},
			_ => trace!("Dropping connection {} -> {}", c.left, c.right),
		}
	}

	debug!("Applied {} of {} connections", applied, connections.len());
	applied
}

#[cfg(test)]
mod tests {
	use crate::{
		definitions::*,
		fbx_binary::Property
	};

	use super::*;

	fn record(name: &str, values: Vec<PropertyData>) -> RawNode {
		RawNode {
			name: name.to_string(),
			properties: values.into_iter().map(|d| Property {
				data: d,
				size: 0,
			}).collect(),
			start: 0,
			end: 0,
			children: vec![],
		}
	}

	fn text(s: &str) -> PropertyData {
		PropertyData::Text(s.to_string())
	}

	#[test]
	fn test_parse() {
		let section = RawNode {
			children: vec![
				record("C", vec![text("OO"), PropertyData::Int64(10), PropertyData::Int64(0)]),
				record("C", vec![text("OP"), PropertyData::Int64(11), PropertyData::Int64(12), text("DiffuseColor")]),
				record("C", vec![text("PP"), PropertyData::Int64(11), PropertyData::Int64(12)]),
				record("Connect", vec![text("OO"), text("Model::Cube\x00\x01Model"), text("Model::Scene")]),
				record("Comment", vec![text("OO"), PropertyData::Int64(1), PropertyData::Int64(2)]),
				record("C", vec![text("OO")]),
			],
			..record("Connections", vec![])
		};

		let connections = parse(&section);
		assert_eq!(3, connections.len());

		assert_eq!(ConnectionKind::ObjectObject, connections[0].kind);
		assert_eq!(Endpoint::Uid(10), connections[0].left);
		assert_eq!(None, connections[0].right.key());

		assert_eq!(ConnectionKind::ObjectProperty, connections[1].kind);
		assert_eq!(Some("DiffuseColor".to_string()), connections[1].property);

		assert_eq!(Endpoint::Name("Model::Cube".to_string()), connections[2].left);
		assert_eq!(Some("Model::Scene".to_string()), connections[2].right.key());
	}

	#[test]
	fn test_resolve() {
		let mut registry = Registry::new();
		let tex = registry.insert(ObjectDefinition {
			uid: 1,
			name: "Wood".to_string(),
			end_offset: 0,
			kind: ObjectKind::Texture(Texture::default()),
		});
		let mat = registry.insert(ObjectDefinition {
			uid: 0,
			name: "Material::Table".to_string(),
			end_offset: 0,
			kind: ObjectKind::Material(Material::default()),
		});

		let connections = vec![
			// Missing endpoints are dropped
			Connection {
				kind: ConnectionKind::ObjectObject,
				left: Endpoint::Uid(1),
				right: Endpoint::Uid(99),
				property: None,
			},
			Connection {
				kind: ConnectionKind::ObjectObject,
				left: Endpoint::Uid(1),
				right: Endpoint::Uid(0),
				property: None,
			},
			// OP links are applied like OO links
			Connection {
				kind: ConnectionKind::ObjectProperty,
				left: Endpoint::Uid(1),
				right: Endpoint::Name("Material::Table".to_string()),
				property: Some("DiffuseColor".to_string()),
			},
		];

		assert_eq!(1, resolve(&mut registry, &connections));

		match (&registry[tex].kind, &registry[mat].kind) {
			(ObjectKind::Texture(t), ObjectKind::Material(m)) => {
				assert_eq!(Some(mat), t.parent);
				assert_eq!(vec![tex], m.textures);
			},
			other => panic!("unexpected {:?}", other),
		}
	}
}
