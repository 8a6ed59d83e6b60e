use log::info;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error,Debug)]
pub enum ArtifactDirError {
    #[error("can't remove {0:?}: {1}")]
    Remove(PathBuf, std::io::Error),
    #[error("can't create {0:?}: {1}")]
    Create(PathBuf, std::io::Error)
}

/// Remove any previous contents at `artdir` and create it again, empty.
///
/// A missing directory is not an error.  The new directory is created with
/// mode 0777 (subject to the umask).
pub fn recreate_artifact_dir(artdir : &Path) -> Result<(), ArtifactDirError> {
    info!("recreating artifact dir {}", artdir.display());
    match fs::remove_dir_all(artdir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => { return Err(ArtifactDirError::Remove(artdir.to_path_buf(), e)) }
    }
    fs::DirBuilder::new()
        .mode(0o777)
        .create(artdir)
        .map_err(|e| ArtifactDirError::Create(artdir.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recreate_clears_stale_files() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let artdir = root.path().join("xxx.t");

        // Absent is fine
        recreate_artifact_dir(&artdir)?;
        assert!(artdir.is_dir());

        fs::create_dir(artdir.join("b001"))?;
        fs::write(artdir.join("b001").join("stale.o"), b"old")?;
        fs::write(artdir.join("err.t.txt"), b"old transcript")?;

        recreate_artifact_dir(&artdir)?;
        assert!(artdir.is_dir());
        assert_eq!(fs::read_dir(&artdir)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_create_failure() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let artdir = root.path().join("missing-parent").join("xxx.t");
        match recreate_artifact_dir(&artdir) {
            Err(ArtifactDirError::Create(p, _)) => assert_eq!(p, artdir),
            other => panic!("expected a create failure, got {:?}", other),
        }
        Ok(())
    }
}
