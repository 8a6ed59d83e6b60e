// Overall Design
// ==============
//
// A capture is a strictly sequential pipeline:
//
// 1. The artifact directory (/tmp/xxx.<tag>) is removed and recreated.
//
// 2. The go build cache is cleaned; otherwise the rebuild may be satisfied
//    from the cache and never run the link step being investigated.
//
// 3. The original `go build`/`go test` command is re-run with -x -work -i,
//    an explicit output binary in the artifact directory, and -tmpdir passed
//    to the linker so that its temporaries (host objects handed to the
//    external linker) land in the artifact directory too.  The combined
//    output is the transcript.  A failed build does not stop the capture:
//    the intermediates of a broken link are usually what is wanted.
//
// 4. The transcript names the retained work directory on a WORK= line.
//
// 5. Sources, headers and objects are copied out of the work directory,
//    grouped by the directory (b001, b002, ...) that held them.
//
// 6. Every object now in the artifact directory gets a .od.txt dump, from
//    `go tool objdump` for Go objects or `objdump -t` for host objects.
//
// Every step except the rebuild itself is fatal on failure.

use anyhow::Context;
use log::{debug, info};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::capture::artifact_dir::recreate_artifact_dir;
use crate::capture::config::CaptureConfig;
use crate::capture::disasm::annotate;
use crate::capture::harvest::harvest;
use crate::capture::rebuild::{rebuild_command, run_rebuild};
use crate::capture::toolchain::{display_cmd, CmdStatus, Toolchain};
use crate::capture::workdir::read_work_dir;

/// What a capture run produced
#[derive(Debug)]
pub struct CaptureSummary {
    pub artifact_dir : PathBuf,
    pub transcript : PathBuf,
    pub work_dir : PathBuf,
    pub rebuild_status : CmdStatus,
    /// Files copied from the work directory, in copy order
    pub harvested : Vec<PathBuf>,
    /// Disassembly dumps written next to objects
    pub dumps : Vec<PathBuf>,
}

/// Clear the go build cache so the rebuild actually compiles and links
pub fn clean_cache(config : &CaptureConfig, toolchain : &dyn Toolchain) -> anyhow::Result<()> {
    let cmd : Vec<OsString> = vec![config.go_tool.clone().into(), "clean".into(), "-cache".into()];
    let out = toolchain.run_captured(&cmd)
        .with_context(|| format!("clearing build cache with {}", display_cmd(&cmd)))?;
    if !out.is_empty() {
        debug!("{}", String::from_utf8_lossy(&out).trim_end());
    }
    Ok(())
}

/// Run a full capture for `command` (the validated `go build`/`go test`
/// vector) using `toolchain` for every subprocess.
pub fn perform_capture(config : &CaptureConfig,
                       toolchain : &dyn Toolchain,
                       command : &[String]) -> anyhow::Result<CaptureSummary> {
    info!("build/test command is: {}", command.join(" "));
    let artdir = config.artifact_dir();
    recreate_artifact_dir(&artdir)?;

    clean_cache(config, toolchain)?;

    let rcmd = rebuild_command(config, command);
    let rebuild_status = run_rebuild(config, toolchain, &rcmd)?;

    let transcript = config.transcript_path();
    let work_dir = read_work_dir(&transcript)?;

    let harvested = harvest(&work_dir, &artdir)?;
    let dumps = annotate(config, toolchain, &artdir)?;

    let summary = CaptureSummary {
        artifact_dir : artdir,
        transcript,
        work_dir,
        rebuild_status,
        harvested,
        dumps,
    };
    print_summary(&summary);
    Ok(summary)
}

fn print_summary(summary : &CaptureSummary) {
    info!("Capture summary for {}:", summary.artifact_dir.display());
    info!("  rebuild: {}",
          match summary.rebuild_status {
              CmdStatus::Success => String::from("succeeded"),
              CmdStatus::Failure(Some(code)) => format!("failed with exit code {}", code),
              CmdStatus::Failure(None) => String::from("terminated by a signal"),
          });
    info!("  transcript: {}", summary.transcript.display());
    info!("  work dir: {}", summary.work_dir.display());
    info!("  {} files harvested, {} objects dumped", summary.harvested.len(), summary.dumps.len());
}
