use log::LevelFilter;
use std::path::PathBuf;

use crate::capture::options::{GoVerb, Options};

/// Directory under which the per-tag artifact directories are created
pub const DEFAULT_ARTIFACT_ROOT : &str = "/tmp";

/// Everything a capture run needs to know, built once at startup and passed to
/// each step of the pipeline.
#[derive(Debug,Clone)]
pub struct CaptureConfig {
    /// Names the artifact directory, the transcript and the output binary
    pub tag : String,
    /// Which `go` subcommand is being re-run
    pub verb : GoVerb,
    /// Parent of the artifact directory
    pub artifact_root : PathBuf,
    /// The go command (also used for `clean -cache` and `tool objdump`)
    pub go_tool : PathBuf,
    /// Disassembler used for host (non-Go) objects
    pub objdump_tool : PathBuf,
}

impl CaptureConfig {
    pub fn new<T>(tag : T, verb : GoVerb) -> CaptureConfig
    where String: From<T>
    {
        CaptureConfig {
            tag : String::from(tag),
            verb,
            artifact_root : PathBuf::from(DEFAULT_ARTIFACT_ROOT),
            go_tool : PathBuf::from("go"),
            objdump_tool : PathBuf::from("objdump"),
        }
    }

    /// Options must already have passed [Options::validate], which produced
    /// `verb`.  The `-v` level is not kept here; it only sets up logging.
    pub fn from_options(opt : &Options, verb : GoVerb) -> CaptureConfig {
        CaptureConfig::new(opt.tag.as_str(), verb)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_root.join(format!("xxx.{}", self.tag))
    }

    /// The captured combined stdout/stderr of the rebuild
    pub fn transcript_path(&self) -> PathBuf {
        self.artifact_dir().join(format!("err.{}.txt", self.tag))
    }

    pub fn output_binary_path(&self) -> PathBuf {
        self.artifact_dir().join(format!("{}.exe", self.tag))
    }
}

/// Map the `-v` level onto a log filter; level 0 only reports problems.
pub fn log_level(verbosity : u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
