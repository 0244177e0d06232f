#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub red: f32,
	pub green: f32,
	pub blue: f32,
	pub alpha: f32,
}

impl Color {
	/// An opaque color
	pub const fn rgb(red: f32, green: f32, blue: f32) -> Color {
		Color {
			red: red,
			green: green,
			blue: blue,
			alpha: 1.0,
		}
	}

	pub const fn white() -> Color {
		Color::rgb(1.0, 1.0, 1.0)
	}
}

impl Default for Color {
	fn default() -> Self {
		Color::white()
	}
}

/// An image referenced by a scene, either by path or with its file contents embedded
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
	pub name: String,
	/// Path as written by the exporting tool, usually absolute
	pub file_path: String,
	/// File name component of [`Texture::file_path`]
	pub file_name: String,
	pub relative_path: String,
	/// Embedded file contents. Empty when the image lives outside the scene file.
	pub data: Vec<u8>,
}

impl Texture {
	pub fn new(name: &str, file_path: &str) -> Texture {
		Texture {
			name: name.to_string(),
			file_path: file_path.to_string(),
			file_name: file_name(file_path).to_string(),
			relative_path: String::new(),
			data: vec![],
		}
	}

	pub fn has_data(&self) -> bool {
		!self.data.is_empty()
	}
}

/// Returns the last component of a path written with either separator style
pub fn file_name(path: &str) -> &str {
	match path.rfind(|c: char| c == '\\' || c == '/') {
		Some(i) => &path[i + 1..],
		None => path,
	}
}
