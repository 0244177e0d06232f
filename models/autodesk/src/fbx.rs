use scenekit_core::scene::Scene;

use crate::{
	assembly,
	connections::{
		self,
		Connection
	},
	registry::Registry
};

/// The parts of an FBX file the importer keeps: object definitions and the links between them
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
	pub version: u32,
	pub objects: Registry,
	pub connections: Vec<Connection>,
}

impl Document {
	/// Applies every connection whose endpoints are both known. Returns how many were applied.
	pub fn resolve(&mut self) -> usize {
		connections::resolve(&mut self.objects, &self.connections)
	}

	/// Builds the output scene. This only reads the object graph, so it can be called repeatedly.
	pub fn scene(&self) -> Scene {
		assembly::assemble(&self.objects)
	}
}

#[cfg(feature = "import")]
pub mod import {
	use log::{
		debug,
		warn
	};

	use nom::error::{
		ErrorKind,
		ParseError
	};

	use std::io;
	use thiserror::Error;

	use crate::{
		connections,
		fbx_binary::{
			import::{
				header,
				node_body,
				node_header,
				position,
				seek
			},
			MAX_VERSION,
			MIN_VERSION
		},
		registry::Registry
	};

	use super::Document;

	#[derive(Error, Debug)]
	pub enum FBXImportError {
		#[error("I/O error")]
		IO {
			#[from]
			source: io::Error,
		},
		#[error("Not a binary FBX file")]
		Magic,
		#[error("Unexpected end of data")]
		Truncated,
		#[error("Unknown property type code {code:#04x} with {remaining} bytes remaining")]
		PropertyType {
			code: u8,
			remaining: usize,
		},
		#[error("Node end offset {end_offset} lies outside its record in a {len} byte file")]
		EndOffset {
			end_offset: i64,
			len: usize,
		},
		#[error("Array length {0} is too large")]
		ArrayLength(u32),
		#[error("Parser error with {remaining} bytes remaining")]
		Parse {
			remaining: usize,
			kind: ErrorKind,
		},
	}

	impl FBXImportError {
		/// Absolute file offset the error was raised at, if known. `len` is the file size.
		pub fn offset(&self, len: usize) -> Option<usize> {
			match self {
				FBXImportError::PropertyType { remaining, .. } |
				FBXImportError::Parse { remaining, .. } => len.checked_sub(*remaining),
				_ => None,
			}
		}
	}

	impl<'a> ParseError<&'a [u8]> for FBXImportError {
		fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
			match kind {
				ErrorKind::Eof => FBXImportError::Truncated,
				_ => FBXImportError::Parse {
					remaining: input.len(),
					kind: kind,
				},
			}
		}

		fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
			other
		}
	}

	impl From<nom::Err<FBXImportError>> for FBXImportError {
		fn from(e: nom::Err<FBXImportError>) -> Self {
			match e {
				nom::Err::Incomplete(_) => FBXImportError::Truncated,
				nom::Err::Error(e) | nom::Err::Failure(e) => e,
			}
		}
	}

	impl Document {
		/// Walks the top-level records, reading `Objects` and `Connections` and skipping the rest.
		/// Connections are not applied; see [`Document::resolve`].
		pub fn parse(buf: &[u8]) -> Result<Document, FBXImportError> {
			let (mut input, header) = header(buf)?;

			if !header.is_supported() {
				warn!("FBX version {} is outside the supported range {}-{}, import may be incomplete",
					header.version, MIN_VERSION, MAX_VERSION);
			}

			let mut doc = Document {
				version: header.version,
				..Default::default()
			};

			while !input.is_empty() {
				let start = position(buf, input);
				let (rest, node) = node_header(input)?;

				if node.end_offset <= 0 {
					break;
				}

				let end = node.end_offset as usize;
				if end <= start || end > buf.len() {
					return Err(FBXImportError::EndOffset {
						end_offset: node.end_offset as i64,
						len: buf.len(),
					});
				}

				let section = node.name.clone();
				match section.as_str() {
					// Animation takes of older files follow, the importer reads nothing past them
					"Takes" => break,
					"Objects" => {
						let (_, objects) = node_body(buf, rest, start, node)?;
						doc.objects = Registry::from_node(&objects);
						debug!("Read {} object definitions", doc.objects.len());
					},
					"Connections" => {
						let (_, links) = node_body(buf, rest, start, node)?;
						doc.connections = connections::parse(&links);
						debug!("Read {} connections", doc.connections.len());
					},
					_ => debug!("Skipping top-level node {}", section),
				}

				input = seek(buf, end)?;
			}

			Ok(doc)
		}
	}

	#[cfg(all(test, feature = "export"))]
	mod tests {
		use crate::{
			fbx_binary::{
				export::{
					document,
					NodeRecord
				},
				Encoding,
				PropertyData,
				VERSION
			},
			test_util::*
		};

		use super::*;

		#[test]
		fn test_sections() {
			let buf = file(vec![
				NodeRecord::new("FBXHeaderExtension")
					.child(NodeRecord::new("FBXVersion").prop(PropertyData::Int32(7300))),
				NodeRecord::new("Objects")
					.child(model(10, "Cube", "Mesh"))
					.child(NodeRecord::new("NodeAttribute")
						.prop(PropertyData::Int64(11))
						.prop(name_class("Cam", "NodeAttribute"))
						.prop(PropertyData::Text("Camera".to_string()))),
				NodeRecord::new("Connections")
					.child(oo(10, 0)),
			]);

			let doc = Document::parse(&buf).unwrap();
			assert_eq!(VERSION, doc.version);
			assert_eq!(1, doc.objects.len());
			assert_eq!(1, doc.connections.len());
		}

		#[test]
		fn test_missing_sections() {
			let buf = file(vec![NodeRecord::new("GlobalSettings").prop(PropertyData::Int32(1000))]);
			let doc = Document::parse(&buf).unwrap();
			assert!(doc.objects.is_empty());
			assert!(doc.connections.is_empty());
			assert!(doc.scene().is_empty());
		}

		#[test]
		fn test_takes_ends_import() {
			let buf = file(vec![
				NodeRecord::new("Takes").child(NodeRecord::new("Current").prop(PropertyData::Text(String::new()))),
				NodeRecord::new("Objects").child(model(10, "Cube", "Mesh")),
			]);

			let doc = Document::parse(&buf).unwrap();
			assert!(doc.objects.is_empty());
		}

		#[test]
		fn test_unsupported_version() {
			let objects = NodeRecord::new("Objects").child(model(10, "Cube", "Mesh"));
			let buf = document(7500, &[objects], Encoding::Deflate).unwrap();

			let doc = Document::parse(&buf).unwrap();
			assert_eq!(7500, doc.version);
			assert_eq!(1, doc.objects.len());
		}

		#[test]
		fn test_no_trailing_null_record() {
			let mut buf = file(vec![NodeRecord::new("Objects").child(model(10, "Cube", "Mesh"))]);
			buf.truncate(buf.len() - 13);

			let doc = Document::parse(&buf).unwrap();
			assert_eq!(1, doc.objects.len());
		}

		#[test]
		fn test_bad_header() {
			assert!(matches!(Document::parse(b"Kaydara FBX"), Err(FBXImportError::Truncated)));
			assert!(matches!(Document::parse(&[b'x'; 40]), Err(FBXImportError::Magic)));
		}

		#[test]
		fn test_bad_top_level_offset() {
			let mut buf = file(vec![NodeRecord::new("Objects").child(model(10, "Cube", "Mesh"))]);
			let len = buf.len() as u32;
			buf[27..31].copy_from_slice(&(len + 100).to_le_bytes());

			assert!(matches!(Document::parse(&buf), Err(FBXImportError::EndOffset { .. })));
		}

		#[test]
		fn test_error_offset() {
			let mut buf = file(vec![NodeRecord::new("Objects").child(model(10, "Cube", "Mesh"))]);
			// Type code of the model's first property
			let code = 27 + 13 + "Objects".len() + 13 + "Model".len();
			assert_eq!(b'L', buf[code]);
			buf[code] = b'?';

			match Document::parse(&buf) {
				Err(e @ FBXImportError::PropertyType { .. }) => assert_eq!(Some(code), e.offset(buf.len())),
				other => panic!("unexpected {:?}", other),
			}
		}
	}
}
