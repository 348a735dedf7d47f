use std::{io, path::PathBuf};

use directories::ProjectDirs;

const DATABASE_FILE: &str = "campaign.sqlite";

/// Directory holding the local database and other on-disk state.
///
/// Debug builds keep everything under `dev_assets/` at the workspace root so a
/// development database never mixes with a real one.
pub fn asset_dir() -> io::Result<PathBuf> {
    let path = if cfg!(debug_assertions) {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../dev_assets")
    } else {
        ProjectDirs::from("dev", "campaign", "campaign")
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?
            .data_dir()
            .to_path_buf()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
    }

    Ok(path)
}

pub fn database_path() -> io::Result<PathBuf> {
    Ok(asset_dir()?.join(DATABASE_FILE))
}
