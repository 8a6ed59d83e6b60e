//! Every external program this tool runs (the go command, its cache and
//! objdump subcommands, and the host objdump) goes through the [Toolchain]
//! trait.  [HostToolchain] runs real subprocesses; tests substitute their own
//! implementation to stand in for a Go installation.
//!
//! Both operations block until the child exits.  There is no timeout: a hung
//! child hangs the capture.

use log::{debug, trace, warn};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Outcome of a command whose exit status the caller wants to judge itself
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum CmdStatus {
    Success,
    /// Non-zero exit; `None` if the child was terminated by a signal
    Failure(Option<i32>)
}

impl CmdStatus {
    pub fn success(&self) -> bool {
        matches!(self, CmdStatus::Success)
    }
}

impl From<std::process::ExitStatus> for CmdStatus {
    fn from(st : std::process::ExitStatus) -> Self {
        if st.success() {
            CmdStatus::Success
        } else {
            CmdStatus::Failure(st.code())
        }
    }
}

#[derive(thiserror::Error,Debug)]
pub enum ToolError {
    #[error("empty command")]
    EmptyCommand,

    #[error("command {0:?} not found: {1}")]
    NotFound(OsString, which::Error),

    #[error("error {2} setting up command {0:?} {1:?}")]
    Setup(PathBuf, Vec<OsString>, std::io::Error),

    /// The last field holds the command's combined output
    #[error("error executing cmd {0}: exit status {1:?}")]
    Failed(String, Option<i32>, String)
}

pub trait Toolchain {
    /// Runs `cmd` (program first) and returns its combined stdout/stderr.  A
    /// non-zero exit is an error.
    fn run_captured(&self, cmd : &[OsString]) -> anyhow::Result<Vec<u8>>;

    /// Runs `cmd` with both stdout and stderr written to `out_file` (created
    /// or truncated) and returns how it exited, without judging the status.
    fn run_to_file(&self, cmd : &[OsString], out_file : &Path) -> anyhow::Result<CmdStatus>;
}

/// Render a command vector for messages and logs
pub fn display_cmd(cmd : &[OsString]) -> String {
    cmd.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs commands as real subprocesses of this one
#[derive(Debug,Default)]
pub struct HostToolchain {}

impl HostToolchain {
    pub fn new() -> HostToolchain {
        HostToolchain {}
    }

    fn command_for(&self, cmd : &[OsString]) -> anyhow::Result<(Command, PathBuf)> {
        let (prog, args) = cmd.split_first().ok_or(ToolError::EmptyCommand)?;
        let prog_path = which::which(prog)
            .map_err(|e| ToolError::NotFound(prog.clone(), e))?;
        trace!("resolved {:?} to {}", prog, prog_path.display());
        let mut c = Command::new(&prog_path);
        c.args(args).stdin(Stdio::null());
        Ok((c, prog_path))
    }
}

impl Toolchain for HostToolchain {
    fn run_captured(&self, cmd : &[OsString]) -> anyhow::Result<Vec<u8>> {
        debug!("docmd: {}", display_cmd(cmd));
        let (mut c, prog_path) = self.command_for(cmd)?;
        let out = c.output()
            .map_err(|e| ToolError::Setup(prog_path, cmd[1..].to_vec(), e))?;
        let mut combined = out.stdout;
        combined.extend_from_slice(&out.stderr);
        if !out.status.success() {
            warn!("{}", String::from_utf8_lossy(&combined).trim_end());
            return Err(anyhow::Error::new(
                ToolError::Failed(display_cmd(cmd),
                                  out.status.code(),
                                  String::from_utf8_lossy(&combined).into_owned())));
        }
        Ok(combined)
    }

    fn run_to_file(&self, cmd : &[OsString], out_file : &Path) -> anyhow::Result<CmdStatus> {
        debug!("docmdout: {} > {}", display_cmd(cmd), out_file.display());
        let (mut c, prog_path) = self.command_for(cmd)?;
        let of = open_output(out_file)?;
        let ef = of.try_clone()?;
        let status = c.stdout(Stdio::from(of))
            .stderr(Stdio::from(ef))
            .status()
            .map_err(|e| ToolError::Setup(prog_path, cmd[1..].to_vec(), e))?;
        Ok(CmdStatus::from(status))
    }
}

fn open_output(out_file : &Path) -> anyhow::Result<File> {
    let f = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(out_file)
        .map_err(|e| anyhow::anyhow!("opening output file {}: {}", out_file.display(), e))?;
    Ok(f)
}
