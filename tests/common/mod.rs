// Shared by several test crates, each of which uses only part of it
#![allow(dead_code)]

use fs_extra::dir::{copy, CopyOptions};
use std::cell::RefCell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use extlink::capture::config::CaptureConfig;
use extlink::capture::options::GoVerb;
use extlink::capture::toolchain::{CmdStatus, Toolchain};

/// A stand-in work directory, as left behind by `go build -work` for a small
/// cgo package.
pub fn fixture_work_tree() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("sources").join("work")
}

/// Configuration for a capture rooted in a temporary directory
pub fn test_config(root : &Path, tag : &str) -> CaptureConfig {
    let mut config = CaptureConfig::new(tag, GoVerb::Build);
    config.artifact_root = root.to_path_buf();
    config
}

pub fn strs(v : &[&str]) -> Vec<String> {
    v.iter().map(|s| String::from(*s)).collect()
}

/// Plays the part of the go command and the host objdump.
///
/// The rebuild populates `work_dir` from the fixture tree (if any) and writes
/// `transcript` to the transcript file; object dumps are a single line naming
/// the tool and the object.
pub struct FakeGo {
    pub work_dir : PathBuf,
    pub fixture : Option<PathBuf>,
    pub transcript : String,
    pub build_status : CmdStatus,
    /// Drop a host object into the -tmpdir directory, as the external linker does
    pub linker_temp : bool,
    pub fail_clean : bool,
    pub fail_objdump : bool,
    pub calls : RefCell<Vec<Vec<String>>>,
}

impl FakeGo {
    pub fn new(work_dir : &Path) -> FakeGo {
        FakeGo {
            work_dir : work_dir.to_path_buf(),
            fixture : Some(fixture_work_tree()),
            transcript : format!("WORK={}\nmkdir -p $WORK/b001/\n", work_dir.display()),
            build_status : CmdStatus::Success,
            linker_temp : false,
            fail_clean : false,
            fail_objdump : false,
            calls : RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    fn record(&self, cmd : &[OsString]) -> Vec<String> {
        let strs : Vec<String> = cmd.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        self.calls.borrow_mut().push(strs.clone());
        strs
    }

    fn rebuild(&self, cmd : &[String], out_file : &Path) -> anyhow::Result<CmdStatus> {
        if let Some(fixture) = &self.fixture {
            std::fs::create_dir_all(&self.work_dir)?;
            let mut options = CopyOptions::new();
            options.content_only = true;
            copy(fixture, &self.work_dir, &options)?;
        }
        if self.linker_temp {
            let tmpdir = cmd.iter()
                .find_map(|a| a.strip_prefix("-ldflags=-tmpdir="))
                .map(|v| v.split(' ').next().unwrap_or(v))
                .ok_or_else(|| anyhow::anyhow!("no -tmpdir in {:?}", cmd))?;
            std::fs::write(Path::new(tmpdir).join("go.o"), b"\x7fELF linker temporary")?;
        }
        std::fs::write(out_file, &self.transcript)?;
        Ok(self.build_status)
    }
}

impl Toolchain for FakeGo {
    fn run_captured(&self, cmd : &[OsString]) -> anyhow::Result<Vec<u8>> {
        let cmd = self.record(cmd);
        match cmd.get(1).map(|s| s.as_str()) {
            Some("clean") if self.fail_clean => Err(anyhow::anyhow!("go: cache is read-only")),
            Some("clean") => Ok(Vec::new()),
            _ => Err(anyhow::anyhow!("unexpected captured command {:?}", cmd)),
        }
    }

    fn run_to_file(&self, cmd : &[OsString], out_file : &Path) -> anyhow::Result<CmdStatus> {
        let cmd = self.record(cmd);
        match cmd.get(1).map(|s| s.as_str()) {
            Some("build") | Some("test") => self.rebuild(&cmd, out_file),
            Some("tool") | Some("-t") => {
                if self.fail_objdump {
                    std::fs::write(out_file, "objdump: not an object\n")?;
                    return Ok(CmdStatus::Failure(Some(1)));
                }
                let obj = cmd.last().cloned().unwrap_or_default();
                std::fs::write(out_file, format!("{} dump of {}\n", cmd[0], obj))?;
                Ok(CmdStatus::Success)
            }
            _ => Err(anyhow::anyhow!("unexpected command {:?}", cmd)),
        }
    }
}
