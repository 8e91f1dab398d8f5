use std::fs;
use std::path::{Path, PathBuf};

use crate::consts::IMAGE_NAME_MARKER;
use crate::error::Result;

/// Names of the regular files in `dir`, sorted so discovery order is stable.
pub fn list_directory(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub fn join_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// True when the name carries the FITS marker ("fit", any case).
pub fn is_image_file_name(name: &str) -> bool {
    name.to_ascii_lowercase().contains(IMAGE_NAME_MARKER)
}

/// Full paths of every image file in `dir`, in discovery order, without duplicates.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = list_directory(dir)?
        .iter()
        .filter(|name| is_image_file_name(name))
        .map(|name| join_path(dir, name))
        .collect();
    paths.dedup();
    Ok(paths)
}

/// Where the calibrated version of `science` goes: same base name, output directory.
pub fn output_path_for(science: &Path, output_dir: &Path) -> Option<PathBuf> {
    science.file_name().map(|name| output_dir.join(name))
}
