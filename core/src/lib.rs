#[cfg(feature = "nom_ext")]
pub mod nom_ext;

pub mod scene;
pub mod texture;

/// Truncates a string at its first null byte.
///
/// Binary scene formats often pack a name and a class into one string, separated by a null,
/// e.g. `Cube\x00\x01Model`. Strings without a null byte are returned unchanged.
pub fn trim_null(s: &str) -> &str {
	match s.find('\0') {
		Some(i) => &s[..i],
		None => s,
	}
}
