//! Discovery of series folders below an extracted upload.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::volume_loader::has_dcm_extension;

/// A directory holding the files of one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFolder {
    pub name: String,
    pub path: PathBuf,
}

impl SeriesFolder {
    pub fn new(path: PathBuf) -> Self {
        Self {
            name: series_name(&path),
            path,
        }
    }
}

/// Final path component, used as the series name.
pub fn series_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Number of `.dcm` files directly inside `dir`.
pub fn count_dcm_files(dir: &Path) -> std::io::Result<usize> {
    Ok(fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| has_dcm_extension(&entry.path()))
        .count())
}

/// Every sub-directory of `root` (at any depth, excluding `root`) with at
/// least `min_dcm_files` `.dcm` files, sorted by path.
pub fn find_series_folders(root: &Path, min_dcm_files: usize) -> std::io::Result<Vec<SeriesFolder>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let dcm_files = count_dcm_files(&path)?;
            log::debug!("{}: {dcm_files} .dcm file(s)", path.display());
            if dcm_files >= min_dcm_files {
                found.push(SeriesFolder::new(path.clone()));
            }
            pending.push(path);
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}
