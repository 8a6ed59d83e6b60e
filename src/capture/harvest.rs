use log::{debug, info, trace, warn};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name suffixes of the intermediates worth keeping: generated Go and
/// cgo sources, headers, and objects.
pub const HARVEST_SUFFIXES : &[&str] = &[".go", ".c", ".h", ".o"];

#[derive(thiserror::Error,Debug)]
pub enum HarvestError {
    #[error("workdir {0:?} walk: {1}")]
    Walk(PathBuf, walkdir::Error),
    #[error("no parent directory name for {0:?}")]
    NoParent(PathBuf),
    #[error("creating {0:?}: {1}")]
    CreateDir(PathBuf, io::Error),
    #[error("copying {0:?}: readfile {1}")]
    Read(PathBuf, io::Error),
    #[error("copying {0:?}: writefile {1:?}: {2}")]
    Write(PathBuf, PathBuf, io::Error)
}

pub fn is_harvestable(file_name : &str) -> bool {
    HARVEST_SUFFIXES.iter().any(|sfx| file_name.ends_with(sfx))
}

/// Walk `work_dir` and collect every regular file with a harvestable suffix.
///
/// Any walk error is returned, including a `work_dir` that does not exist.
pub fn collect_artifacts(work_dir : &Path) -> Result<BTreeSet<PathBuf>, HarvestError> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(work_dir) {
        let entry = entry.map_err(|e| HarvestError::Walk(work_dir.to_path_buf(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_harvestable(&entry.file_name().to_string_lossy()) {
            trace!("workdir path {}", entry.path().display());
            files.insert(entry.into_path());
        }
    }
    Ok(files)
}

/// Files are grouped in the artifact directory by the name of the directory
/// that held them in the work directory (`$WORK/b001/x.o` goes to
/// `<artdir>/b001/x.o`).
pub fn destination_for(artdir : &Path, src : &Path) -> Result<PathBuf, HarvestError> {
    let no_parent = || HarvestError::NoParent(src.to_path_buf());
    let file_name = src.file_name().ok_or_else(no_parent)?;
    let parent_name = src.parent()
        .and_then(|p| p.file_name())
        .ok_or_else(no_parent)?;
    Ok(artdir.join(parent_name).join(file_name))
}

/// Byte-for-byte copy of `from` to `to` (created with mode 0644)
pub fn copy_file(from : &Path, to : &Path) -> Result<(), HarvestError> {
    let input = fs::read(from).map_err(|e| HarvestError::Read(from.to_path_buf(), e))?;
    let write_err = |e| HarvestError::Write(from.to_path_buf(), to.to_path_buf(), e);
    let mut out = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(to)
        .map_err(write_err)?;
    out.write_all(&input).map_err(write_err)?;
    Ok(())
}

/// Copy the harvestable files of `work_dir` into `artdir`.
///
/// The whole tree is walked before anything is copied, and files are copied
/// in sorted path order.  Returns the destination paths.
pub fn harvest(work_dir : &Path, artdir : &Path) -> anyhow::Result<Vec<PathBuf>> {
    let files = collect_artifacts(work_dir)?;
    debug!("{} candidate files in {}", files.len(), work_dir.display());

    let mut copied = Vec::with_capacity(files.len());
    let mut seen = HashSet::new();
    for path in &files {
        let dest = destination_for(artdir, path)?;
        if let Some(destdir) = dest.parent() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o777)
                .create(destdir)
                .map_err(|e| HarvestError::CreateDir(destdir.to_path_buf(), e))?;
        }
        trace!("copying {} to {}", path.display(), dest.display());
        copy_file(path, &dest)?;
        if seen.insert(dest.clone()) {
            copied.push(dest);
        } else {
            warn!("{} overwrote an earlier file harvested to {}", path.display(), dest.display());
        }
    }
    info!("harvested {} files from {}", copied.len(), work_dir.display());
    Ok(copied)
}
