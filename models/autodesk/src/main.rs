use std::{
	env,
	process
};

use scenekit_models_autodesk::{
	fbx::import::FBXImportError,
	read
};

fn main() -> Result<(), FBXImportError> {
	env_logger::init();

	let path = match env::args().nth(1) {
		Some(path) => path,
		None => {
			eprintln!("Usage: fbx-info <file.fbx>");
			process::exit(2);
		},
	};

	let scene = read(&path)?;

	for mesh in scene.meshes.iter() {
		println!("mesh {}: {} vertices, {} indices ({:?}), {} materials, {} textures, {} bones",
			mesh.name, mesh.vertices.len(), mesh.indices.len(), mesh.face_type,
			mesh.materials.len(), mesh.textures.len(), mesh.all_bones().len());
	}

	for texture in scene.textures.iter() {
		println!("texture {}: {} ({} bytes embedded)", texture.name, texture.file_path, texture.data.len());
	}

	Ok(())
}
