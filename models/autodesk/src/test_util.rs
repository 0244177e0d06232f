use crate::fbx_binary::{
	export::{
		document,
		NodeRecord
	},
	Encoding,
	PropertyData,
	VERSION
};

/// A complete file with arrays zlib compressed, as exporters write them
pub fn file(nodes: Vec<NodeRecord>) -> Vec<u8> {
	document(VERSION, &nodes, Encoding::Deflate).unwrap()
}

pub fn text(s: &str) -> PropertyData {
	PropertyData::Text(s.to_string())
}

/// Object names are stored as `name\x00\x01class`
pub fn name_class(name: &str, class: &str) -> PropertyData {
	text(&format!("{}\x00\x01{}", name, class))
}

pub fn object(record: &str, uid: i64, name: &str, subtype: &str, children: Vec<NodeRecord>) -> NodeRecord {
	let node = NodeRecord::new(record)
		.prop(PropertyData::Int64(uid))
		.prop(name_class(name, record))
		.prop(text(subtype));

	children.into_iter().fold(node, NodeRecord::child)
}

pub fn model(uid: i64, name: &str, subtype: &str) -> NodeRecord {
	object("Model", uid, name, subtype, vec![])
}

pub fn geometry(uid: i64, name: &str, vertices: &[f64], indices: &[i32]) -> NodeRecord {
	object("Geometry", uid, name, "Mesh", vec![
		NodeRecord::new("Vertices").prop(PropertyData::Float64Array(vertices.to_vec())),
		NodeRecord::new("PolygonVertexIndex").prop(PropertyData::Int32Array(indices.to_vec())),
	])
}

pub fn texture(uid: i64, name: &str, path: &str) -> NodeRecord {
	object("Texture", uid, name, "", vec![
		NodeRecord::new("Type").prop(text("TextureVideoClip")),
		NodeRecord::new("FileName").prop(text(path)),
	])
}

/// Pre-7.0 objects have no UID, the name is the key
pub fn legacy_model(name: &str, subtype: &str, children: Vec<NodeRecord>) -> NodeRecord {
	let node = NodeRecord::new("Model")
		.prop(text(name))
		.prop(text(subtype));

	children.into_iter().fold(node, NodeRecord::child)
}

/// A `Properties70` entry whose type is its name
pub fn p70(name: &str, values: &[f64]) -> NodeRecord {
	let node = NodeRecord::new("P")
		.prop(text(name))
		.prop(text(name))
		.prop(text(""))
		.prop(text("A"));

	values.iter().fold(node, |n, v| n.prop(PropertyData::Float64(*v)))
}

pub fn oo(left: i64, right: i64) -> NodeRecord {
	NodeRecord::new("C")
		.prop(text("OO"))
		.prop(PropertyData::Int64(left))
		.prop(PropertyData::Int64(right))
}

pub fn connect(left: &str, right: &str) -> NodeRecord {
	NodeRecord::new("Connect")
		.prop(text("OO"))
		.prop(text(left))
		.prop(text(right))
}
