use anyhow::Context;
use log::info;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// `go build -work` announces its scratch directory with a line of this form
pub const WORK_MARKER : &str = "WORK=";

#[derive(thiserror::Error,Debug)]
pub enum WorkDirError {
    #[error("no WORK= line in build transcript {0:?}; did the go command run at all?")]
    MarkerMissing(PathBuf),
    #[error("empty WORK= line in build transcript {0:?}")]
    EmptyPath(PathBuf)
}

/// Pick the work directory out of a build transcript.
///
/// Plain prefix matching on each line; if the marker appears more than once
/// the last one wins.  The path bytes are taken as-is, they need not be UTF-8.
pub fn extract_work_dir(transcript : &[u8]) -> Option<PathBuf> {
    transcript.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter_map(|line| line.strip_prefix(WORK_MARKER.as_bytes()))
        .last()
        .map(|p| PathBuf::from(OsStr::from_bytes(p)))
}

/// Read the transcript at `path` and return the work directory it names
pub fn read_work_dir(path : &Path) -> anyhow::Result<PathBuf> {
    let bytes = fs::read(path)
        .with_context(|| format!("opening {}", path.display()))?;
    match extract_work_dir(&bytes) {
        None => Err(anyhow::Error::new(WorkDirError::MarkerMissing(path.to_path_buf()))),
        Some(wd) if wd.as_os_str().is_empty() =>
            Err(anyhow::Error::new(WorkDirError::EmptyPath(path.to_path_buf()))),
        Some(wd) => {
            info!("workdir is: {}", wd.display());
            Ok(wd)
        }
    }
}
