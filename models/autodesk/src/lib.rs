pub mod assembly;
pub mod connections;
pub mod definitions;
pub mod fbx;
pub mod fbx_binary;
pub mod registry;

#[cfg(all(test, feature = "export"))]
mod test_util;

#[cfg(feature = "import")]
use std::fs;

#[cfg(feature = "import")]
use scenekit_core::scene::Scene;

#[cfg(feature = "import")]
use fbx::{
	Document,
	import::FBXImportError
};

/// Imports a binary FBX file held in memory
#[cfg(feature = "import")]
pub fn import(buf: &[u8]) -> Result<Scene, FBXImportError> {
	let mut doc = Document::parse(buf)?;
	doc.resolve();
	Ok(doc.scene())
}

#[cfg(feature = "import")]
pub fn read(filepath: &str) -> Result<Scene, FBXImportError> {
	let data = fs::read(filepath)?;
	import(&data)
}
