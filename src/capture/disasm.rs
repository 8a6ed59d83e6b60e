use anyhow::Context;
use log::{debug, info};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::capture::config::CaptureConfig;
use crate::capture::toolchain::{display_cmd, CmdStatus, Toolchain};

/// Text found in the header of objects written by the Go compiler
pub const GO_OBJECT_MARKER : &[u8] = b"go object ";

/// How much of the start of an object file is searched for the marker
pub const MARKER_WINDOW : usize = 4096;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ObjectKind {
    /// Produced by the Go toolchain; needs `go tool objdump`
    GoObject,
    /// Produced by the host C toolchain (cgo, external linker temporaries)
    Host
}

#[derive(thiserror::Error,Debug)]
pub enum DisasmError {
    #[error("reading object file {0:?} failed: {1}")]
    Read(PathBuf, io::Error),
    #[error("artifact dir {0:?} is not valid UTF-8")]
    NonUtf8Path(PathBuf),
    #[error("error executing cmd {0}: {1:?}")]
    Failed(String, CmdStatus)
}

/// Decide how to disassemble an object from its leading bytes
pub fn classify_object(leading : &[u8]) -> ObjectKind {
    let window = &leading[..leading.len().min(MARKER_WINDOW)];
    if window.windows(GO_OBJECT_MARKER.len()).any(|w| w == GO_OBJECT_MARKER) {
        ObjectKind::GoObject
    } else {
        ObjectKind::Host
    }
}

fn read_leading_bytes(path : &Path) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(MARKER_WINDOW);
    File::open(path)?.take(MARKER_WINDOW as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// `dir/x.o` is dumped to `dir/x.od.txt`
pub fn dump_path(obj : &Path) -> PathBuf {
    obj.with_extension("od.txt")
}

pub fn dump_command(config : &CaptureConfig, kind : ObjectKind, obj : &Path) -> Vec<OsString> {
    match kind {
        ObjectKind::GoObject => vec![config.go_tool.clone().into(),
                                     "tool".into(),
                                     "objdump".into(),
                                     obj.into()],
        ObjectKind::Host => vec![config.objdump_tool.clone().into(),
                                 "-t".into(),
                                 obj.into()],
    }
}

/// All regular files ending in `.o` anywhere under `artdir`, sorted
pub fn find_objects(artdir : &Path) -> anyhow::Result<Vec<PathBuf>> {
    let dir = artdir.to_str().ok_or_else(|| DisasmError::NonUtf8Path(artdir.to_path_buf()))?;
    let pattern = format!("{}/**/*.o", glob::Pattern::escape(dir));
    let mut objects = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if path.is_file() {
            objects.push(path);
        }
    }
    objects.sort();
    Ok(objects)
}

/// Write a disassembly/symbol dump next to every object in `artdir`.
///
/// Returns the dump files written.  Any disassembler failure is an error.
pub fn annotate(config : &CaptureConfig,
                toolchain : &dyn Toolchain,
                artdir : &Path) -> anyhow::Result<Vec<PathBuf>> {
    let objects = find_objects(artdir)?;
    let mut dumps = Vec::with_capacity(objects.len());
    for obj in objects {
        let leading = read_leading_bytes(&obj).map_err(|e| DisasmError::Read(obj.clone(), e))?;
        let kind = classify_object(&leading);
        debug!("{} is {:?}", obj.display(), kind);

        let out = dump_path(&obj);
        let cmd = dump_command(config, kind, &obj);
        let status = toolchain.run_to_file(&cmd, &out)
            .with_context(|| format!("dumping {}", obj.display()))?;
        if !status.success() {
            return Err(anyhow::Error::new(DisasmError::Failed(display_cmd(&cmd), status)));
        }
        dumps.push(out);
    }
    info!("wrote {} object dumps under {}", dumps.len(), artdir.display());
    Ok(dumps)
}
