/// Offset of the first top-level node record
pub const HEADER_SIZE: usize = 27;

pub static MAGIC: &[u8] = b"Kaydara FBX Binary  \x00";

/// Two bytes of unknown meaning follow the [`MAGIC`], then the version as a 4-byte little endian
/// value.
pub static MAGIC_TAIL: [u8; 2] = [0x1a, 0x00];

/// Version written by the exporter
pub const VERSION: u32 = 7300;

/// Versions outside this range are imported, but with a warning.
pub const MIN_VERSION: u32 = 7100;
pub const MAX_VERSION: u32 = 7300;

/// Size of the all-zero record closing a nested record list
pub const NULL_RECORD_SIZE: usize = 13;

/// Records inside an object definition whose nested records are read as part of the object.
/// Every other nested record is opaque.
pub const CONTAINERS: [&str; 13] = [
	"Properties60",
	"Properties70",
	"Layer",
	"LayerElement",
	"LayerElementUV",
	"LayerElementMaterial",
	"LayerElementTexture",
	"LayerElementBinormal",
	"LayerElementNormal",
	"LayerElementTangent",
	"LayerElementSmoothing",
	"LayerElementColor",
	"LayerElementVisibility",
];

pub fn is_container(name: &str) -> bool {
	CONTAINERS.contains(&name)
}

/// Encoding for array property contents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Encoding {
	None = 0,
	/// Deflate/zlib encoding
	Deflate,
}

/// FBX file header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
	pub version: u32,
}

impl Header {
	/// Whether the version lies within the range the importer was written against
	pub fn is_supported(&self) -> bool {
		(MIN_VERSION..=MAX_VERSION).contains(&self.version)
	}
}

/// Fixed part of a node record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeHeader {
	/// Distance between start of the file to end of the node record
	/// This is useful for skipping over unknown or non-essential records.
	pub end_offset: i32,
	pub num_properties: u32,
	pub property_list_size: u32,
	/// This is usually blank for top-level nodes. It's parsed as a Pascal string.
	pub name: String,
}

impl NodeHeader {
	/// A record with an empty name closes a nested record list
	pub fn is_null(&self) -> bool {
		self.name.is_empty()
	}
}

/// Property payload
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyData {
	/// Stored with a 4-byte length prefix
	Binary(Vec<u8>),
	/// Stored as a single byte, non-zero being true
	Boolean(bool),
	Float32(f32),
	Float64(f64),
	Int16(i16),
	Int32(i32),
	Int64(i64),
	/// Stored with a 4-byte length prefix. This is not null terminated and may
	/// contain null bytes.
	Text(String),
	BooleanArray(Vec<bool>),
	Float32Array(Vec<f32>),
	Float64Array(Vec<f64>),
	Int32Array(Vec<i32>),
	Int64Array(Vec<i64>),
}

impl PropertyData {
	pub fn type_code(&self) -> TypeCode {
		match self {
			PropertyData::Binary(_) => TypeCode::Binary,
			PropertyData::Boolean(_) => TypeCode::Boolean,
			PropertyData::Float32(_) => TypeCode::Float32,
			PropertyData::Float64(_) => TypeCode::Float64,
			PropertyData::Int16(_) => TypeCode::Int16,
			PropertyData::Int32(_) => TypeCode::Int32,
			PropertyData::Int64(_) => TypeCode::Int64,
			PropertyData::Text(_) => TypeCode::Text,
			PropertyData::BooleanArray(_) => TypeCode::BooleanArray,
			PropertyData::Float32Array(_) => TypeCode::Float32Array,
			PropertyData::Float64Array(_) => TypeCode::Float64Array,
			PropertyData::Int32Array(_) => TypeCode::Int32Array,
			PropertyData::Int64Array(_) => TypeCode::Int64Array,
		}
	}

	/// Integer scalars, widened
	pub fn as_i64(&self) -> Option<i64> {
		match *self {
			PropertyData::Int16(v) => Some(v as i64),
			PropertyData::Int32(v) => Some(v as i64),
			PropertyData::Int64(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_i32(&self) -> Option<i32> {
		self.as_i64().map(|v| v as i32)
	}

	/// Any numeric scalar
	pub fn as_f64(&self) -> Option<f64> {
		match *self {
			PropertyData::Float32(v) => Some(v as f64),
			PropertyData::Float64(v) => Some(v),
			_ => self.as_i64().map(|v| v as f64),
		}
	}

	pub fn as_f32(&self) -> Option<f32> {
		self.as_f64().map(|v| v as f32)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropertyData::Text(s) => Some(s.as_str()),
			_ => None,
		}
	}
}

/// A decoded property along with the number of bytes its record occupied
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
	pub data: PropertyData,
	pub size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeCode {
	Boolean = b'C',
	Float64 = b'D',
	Float32 = b'F',
	Int32 = b'I',
	Int64 = b'L',
	Binary = b'R',
	Text = b'S',
	Int16 = b'Y',
	BooleanArray = b'b',
	Float64Array = b'd',
	Float32Array = b'f',
	Int32Array = b'i',
	Int64Array = b'l',
}

impl TypeCode {
	pub fn from_u8(code: u8) -> Option<TypeCode> {
		match code {
			b'C' => Some(TypeCode::Boolean),
			b'D' => Some(TypeCode::Float64),
			b'F' => Some(TypeCode::Float32),
			b'I' => Some(TypeCode::Int32),
			b'L' => Some(TypeCode::Int64),
			b'R' => Some(TypeCode::Binary),
			b'S' => Some(TypeCode::Text),
			b'Y' => Some(TypeCode::Int16),
			b'b' => Some(TypeCode::BooleanArray),
			b'd' => Some(TypeCode::Float64Array),
			b'f' => Some(TypeCode::Float32Array),
			b'i' => Some(TypeCode::Int32Array),
			b'l' => Some(TypeCode::Int64Array),
			_ => None,
		}
	}
}

/// A node record with its nested records
#[derive(Clone, Debug, PartialEq)]
pub struct RawNode {
	pub name: String,
	pub properties: Vec<Property>,
	/// Absolute offset of the record's first byte
	pub start: usize,
	/// Absolute offset just past the record, nested records included
	pub end: usize,
	pub children: Vec<RawNode>,
}

impl RawNode {
	pub fn child(&self, name: &str) -> Option<&RawNode> {
		self.children.iter().find(|c| c.name == name)
	}

	pub fn property(&self, index: usize) -> Option<&PropertyData> {
		self.properties.get(index).map(|p| &p.data)
	}

	/// Bytes taken by the property list
	pub fn properties_size(&self) -> usize {
		self.properties.iter().map(|p| p.size).sum()
	}
}

#[cfg(feature = "import")]
pub mod import {
	use std::{
		borrow::Cow,
		io::Read
	};

	use byteorder::{
		ByteOrder,
		LE
	};

	use flate2::read::ZlibDecoder;
	use log::warn;

	use nom::{
		bytes::complete::take,
		combinator::map,
		Err,
		IResult,
		number::complete::{
			le_f32,
			le_f64,
			le_i16,
			le_i32,
			le_i64,
			le_u32,
			u8
		}
	};

	use scenekit_core::nom_ext::{
		lbytes,
		lstr,
		pstr
	};

	use crate::fbx::import::FBXImportError;
	use super::*;

	pub type ParseResult<'a, T> = IResult<&'a [u8], T, FBXImportError>;

	/// Absolute offset of `input` within `doc`. `input` must be a suffix of `doc`.
	pub fn position(doc: &[u8], input: &[u8]) -> usize {
		doc.len() - input.len()
	}

	/// Moves the cursor to an absolute offset
	pub fn seek(doc: &[u8], offset: usize) -> Result<&[u8], FBXImportError> {
		doc.get(offset..).ok_or(FBXImportError::EndOffset {
			end_offset: offset as i64,
			len: doc.len(),
		})
	}

	pub fn header(input: &[u8]) -> ParseResult<'_, Header> {
		if input.len() < HEADER_SIZE {
			return Err(Err::Failure(FBXImportError::Truncated));
		}

		if !input.starts_with(MAGIC) {
			return Err(Err::Failure(FBXImportError::Magic));
		}

		let (input, _) = take(MAGIC.len() + MAGIC_TAIL.len())(input)?;
		let (input, version) = le_u32(input)?;

		Ok((input, Header {
			version: version,
		}))
	}

	/// Decodes one typed value. The returned [`Property`] records how many bytes were consumed.
	pub fn property(input: &[u8]) -> ParseResult<'_, Property> {
		let (rest, code) = u8(input)?;

		let (rest, data) = match TypeCode::from_u8(code) {
			Some(TypeCode::Boolean) => map(u8, |b| PropertyData::Boolean(b != 0))(rest)?,
			Some(TypeCode::Float64) => map(le_f64, PropertyData::Float64)(rest)?,
			Some(TypeCode::Float32) => map(le_f32, PropertyData::Float32)(rest)?,
			Some(TypeCode::Int32) => map(le_i32, PropertyData::Int32)(rest)?,
			Some(TypeCode::Int64) => map(le_i64, PropertyData::Int64)(rest)?,
			Some(TypeCode::Int16) => map(le_i16, PropertyData::Int16)(rest)?,
			Some(TypeCode::Binary) => map(lbytes, |b: &[u8]| PropertyData::Binary(b.to_vec()))(rest)?,
			Some(TypeCode::Text) => map(lstr, PropertyData::Text)(rest)?,
			Some(TypeCode::BooleanArray) => {
				let (rest, v) = array(rest, 1, |b| b[0] != 0)?;
				(rest, PropertyData::BooleanArray(v))
			},
			Some(TypeCode::Float64Array) => {
				let (rest, v) = array(rest, 8, LE::read_f64)?;
				(rest, PropertyData::Float64Array(v))
			},
			Some(TypeCode::Float32Array) => {
				let (rest, v) = array(rest, 4, LE::read_f32)?;
				(rest, PropertyData::Float32Array(v))
			},
			Some(TypeCode::Int32Array) => {
				let (rest, v) = array(rest, 4, LE::read_i32)?;
				(rest, PropertyData::Int32Array(v))
			},
			Some(TypeCode::Int64Array) => {
				let (rest, v) = array(rest, 8, LE::read_i64)?;
				(rest, PropertyData::Int64Array(v))
			},
			None => return Err(Err::Failure(FBXImportError::PropertyType {
				code: code,
				remaining: input.len(),
			})),
		};

		Ok((rest, Property {
			data: data,
			size: input.len() - rest.len(),
		}))
	}

	/// Array layout: element count, encoding, stored byte length, then the elements, possibly
	/// zlib compressed.
	fn array<T>(input: &[u8], width: usize, decode: fn(&[u8]) -> T) -> ParseResult<'_, Vec<T>> {
		let (input, count) = le_u32(input)?;
		let (input, encoding) = le_u32(input)?;
		let (input, stored_len) = le_u32(input)?;

		let raw_len = (count as usize).checked_mul(width)
			.ok_or(Err::Failure(FBXImportError::ArrayLength(count)))?;

		let (input, bytes) = if encoding == Encoding::Deflate as u32 {
			let (input, packed) = take(stored_len as usize)(input)?;
			(input, Cow::Owned(inflate(packed, raw_len)))
		} else {
			if encoding != Encoding::None as u32 {
				warn!("Unknown array encoding {}, reading contents as raw", encoding);
			}
			let (input, raw) = take(raw_len)(input)?;
			(input, Cow::Borrowed(raw))
		};

		Ok((input, bytes.chunks_exact(width).map(decode).collect()))
	}

	/// Inflates at most `expected` bytes. A corrupt stream keeps whatever was inflated before the
	/// failure.
	pub fn inflate(packed: &[u8], expected: usize) -> Vec<u8> {
		let mut out = vec![];

		if let Err(e) = ZlibDecoder::new(packed).take(expected as u64).read_to_end(&mut out) {
			warn!("Array inflate failed after {} of {} bytes: {}", out.len(), expected, e);
		}

		out
	}

	pub fn node_header(input: &[u8]) -> ParseResult<'_, NodeHeader> {
		let (input, end_offset) = le_i32(input)?;
		let (input, num_properties) = le_u32(input)?;
		let (input, property_list_size) = le_u32(input)?;
		let (input, name) = pstr(input)?;

		Ok((input, NodeHeader {
			end_offset: end_offset,
			num_properties: num_properties,
			property_list_size: property_list_size,
			name: name,
		}))
	}

	/// Reads one node record starting at `input`, a suffix of `doc`. Returns `None` for the null
	/// record closing a nested list.
	pub fn node<'a>(doc: &'a [u8], input: &'a [u8]) -> ParseResult<'a, Option<RawNode>> {
		let start = position(doc, input);
		let (input, header) = node_header(input)?;

		if header.is_null() {
			return Ok((input, None));
		}

		let (input, node) = node_body(doc, input, start, header)?;
		Ok((input, Some(node)))
	}

	/// Reads the properties and nested records of a node whose header has already been consumed
	pub fn node_body<'a>(doc: &'a [u8], input: &'a [u8], start: usize, header: NodeHeader)
		-> ParseResult<'a, RawNode>
	{
		let mut input = input;
		let mut properties = Vec::new();
		for _ in 0..header.num_properties {
			let (rest, prop) = property(input)?;
			properties.push(prop);
			input = rest;
		}

		let props_end = position(doc, input);
		let end = header.end_offset as i64;
		if end < props_end as i64 || end > doc.len() as i64 {
			return Err(Err::Failure(FBXImportError::EndOffset {
				end_offset: end,
				len: doc.len(),
			}));
		}
		let end = end as usize;

		let mut children = vec![];
		if end > props_end {
			let (rest, nodes) = nested(doc, input, end)?;
			input = rest;
			children = nodes;
		}

		Ok((input, RawNode {
			name: header.name,
			properties: properties,
			start: start,
			end: end,
			children: children,
		}))
	}

	/// Reads nested records up to the closing null record, leaving the cursor at `end`
	fn nested<'a>(doc: &'a [u8], input: &'a [u8], end: usize) -> ParseResult<'a, Vec<RawNode>> {
		let mut input = input;
		let mut nodes = vec![];

		while position(doc, input) < end {
			let (rest, node) = node(doc, input)?;
			input = rest;

			match node {
				Some(n) => nodes.push(n),
				None => break,
			}
		}

		let pos = position(doc, input);
		if pos != end {
			warn!("Nested records ended at offset {} instead of {}, skipping ahead", pos, end);
			input = seek(doc, end).map_err(Err::Failure)?;
		}

		Ok((input, nodes))
	}

}

#[cfg(feature = "export")]
pub mod export {
	use byteorder::{
		ByteOrder,
		LE,
		WriteBytesExt
	};

	use flate2::{
		Compression,
		write::ZlibEncoder
	};

	use std::io::{
		self,
		Write
	};

	use super::*;

	const SENTINEL: [u8; NULL_RECORD_SIZE] = [0; NULL_RECORD_SIZE];

	/// Node record to be written
	#[derive(Clone, Debug, Default, PartialEq)]
	pub struct NodeRecord {
		pub name: String,
		pub properties: Vec<PropertyData>,
		pub children: Vec<NodeRecord>,
	}

	impl NodeRecord {
		pub fn new(name: &str) -> NodeRecord {
			NodeRecord {
				name: name.to_string(),
				properties: vec![],
				children: vec![],
			}
		}

		pub fn prop(mut self, data: PropertyData) -> NodeRecord {
			self.properties.push(data);
			self
		}

		pub fn child(mut self, child: NodeRecord) -> NodeRecord {
			self.children.push(child);
			self
		}
	}

	fn write_array<T, F>(out: &mut Vec<u8>, items: &[T], width: usize, encoding: Encoding, put: F)
		-> io::Result<()>
	where
		F: Fn(&mut Vec<u8>, &T) -> io::Result<()>,
	{
		let mut raw = Vec::with_capacity(items.len() * width);
		for item in items.iter() {
			put(&mut raw, item)?;
		}

		out.write_u32::<LE>(items.len() as u32)?;
		out.write_u32::<LE>(encoding as u32)?;

		match encoding {
			Encoding::None => {
				out.write_u32::<LE>(raw.len() as u32)?;
				out.write_all(&raw)
			},
			Encoding::Deflate => {
				let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
				enc.write_all(&raw)?;
				let packed = enc.finish()?;

				out.write_u32::<LE>(packed.len() as u32)?;
				out.write_all(&packed)
			},
		}
	}

	/// Writes one property record. `encoding` only applies to array types.
	pub fn write_property(out: &mut Vec<u8>, data: &PropertyData, encoding: Encoding) -> io::Result<()> {
		out.write_u8(data.type_code() as u8)?;

		match data {
			PropertyData::Binary(b) => {
				out.write_u32::<LE>(b.len() as u32)?;
				out.write_all(b)
			},
			PropertyData::Boolean(b) => out.write_u8(*b as u8),
			PropertyData::Float32(v) => out.write_f32::<LE>(*v),
			PropertyData::Float64(v) => out.write_f64::<LE>(*v),
			PropertyData::Int16(v) => out.write_i16::<LE>(*v),
			PropertyData::Int32(v) => out.write_i32::<LE>(*v),
			PropertyData::Int64(v) => out.write_i64::<LE>(*v),
			PropertyData::Text(s) => {
				out.write_u32::<LE>(s.len() as u32)?;
				out.write_all(s.as_bytes())
			},
			PropertyData::BooleanArray(v) => write_array(out, v.as_slice(), 1, encoding, |o, b| o.write_u8(*b as u8)),
			PropertyData::Float32Array(v) => write_array(out, v.as_slice(), 4, encoding, |o, f| o.write_f32::<LE>(*f)),
			PropertyData::Float64Array(v) => write_array(out, v.as_slice(), 8, encoding, |o, f| o.write_f64::<LE>(*f)),
			PropertyData::Int32Array(v) => write_array(out, v.as_slice(), 4, encoding, |o, i| o.write_i32::<LE>(*i)),
			PropertyData::Int64Array(v) => write_array(out, v.as_slice(), 8, encoding, |o, i| o.write_i64::<LE>(*i)),
		}
	}

	/// Appends a node record. End offsets are relative to the start of `out`, so `out` should
	/// hold the whole document written so far.
	pub fn write_node(out: &mut Vec<u8>, node: &NodeRecord, encoding: Encoding) -> io::Result<()> {
		if node.name.len() > u8::MAX as usize {
			return Err(io::Error::new(io::ErrorKind::InvalidInput,
				format!("node name too long: {}", node.name)));
		}

		let start = out.len();
		// end offset and property list size are patched once known
		out.write_u32::<LE>(0)?;
		out.write_u32::<LE>(node.properties.len() as u32)?;
		out.write_u32::<LE>(0)?;
		out.write_u8(node.name.len() as u8)?;
		out.write_all(node.name.as_bytes())?;

		let props_start = out.len();
		for prop in node.properties.iter() {
			write_property(out, prop, encoding)?;
		}
		let props_size = out.len() - props_start;

		if !node.children.is_empty() {
			for child in node.children.iter() {
				write_node(out, child, encoding)?;
			}
			out.write_all(&SENTINEL)?;
		}

		let end = out.len();
		LE::write_u32(&mut out[start..start + 4], end as u32);
		LE::write_u32(&mut out[start + 8..start + 12], props_size as u32);

		Ok(())
	}

	/// Writes a complete file: header, top-level nodes and the closing null record
	pub fn document(version: u32, nodes: &[NodeRecord], encoding: Encoding) -> io::Result<Vec<u8>> {
		let mut out = Vec::with_capacity(HEADER_SIZE);
		out.write_all(MAGIC)?;
		out.write_all(&MAGIC_TAIL)?;
		out.write_u32::<LE>(version)?;

		for node in nodes.iter() {
			write_node(&mut out, node, encoding)?;
		}
		out.write_all(&SENTINEL)?;

		Ok(out)
	}

}
