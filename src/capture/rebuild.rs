use anyhow::Context;
use log::info;
use regex::Regex;
use std::ffi::OsString;
use std::path::Path;

use crate::capture::config::CaptureConfig;
use crate::capture::options::GoVerb;
use crate::capture::toolchain::{display_cmd, CmdStatus, Toolchain};

lazy_static::lazy_static! {
    static ref LDFLAGS_RE : Regex = Regex::new(r"(?s)^--?ldflags(=(?P<value>.*))?$").unwrap();
}

/// Where a linker-flags argument sits in the original `go` arguments
#[derive(Debug,PartialEq,Eq)]
pub enum LinkerFlags {
    /// `-ldflags=VALUE` (or `--ldflags=VALUE`) at `index`
    Joined { index : usize, value : String },
    /// `-ldflags VALUE`, with the value in its own argument at `value_index`
    Separate { value_index : usize }
}

/// Find the first linker-flags argument among the arguments following
/// `go build`/`go test`.
///
/// Scanning stops at `-args`, since everything after it belongs to the test
/// binary rather than the go command.
pub fn find_ldflags(args : &[String]) -> Option<LinkerFlags> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "-args" || arg == "--args" {
            return None;
        }
        if let Some(caps) = LDFLAGS_RE.captures(arg) {
            return match caps.name("value") {
                Some(v) => Some(LinkerFlags::Joined { index : i, value : v.as_str().to_owned() }),
                // A trailing -ldflags with no value is left for the go command
                // to complain about
                None if i + 1 < args.len() => Some(LinkerFlags::Separate { value_index : i + 1 }),
                None => None,
            };
        }
    }
    None
}

fn join_flags(first : &str, rest : &str) -> String {
    if rest.is_empty() {
        first.to_owned()
    } else {
        format!("{} {}", first, rest)
    }
}

/// Given the arguments that followed `go build`/`go test`, construct the
/// command that rebuilds with full tracing, keeps the work directory, writes
/// the binary to `exe_file` and has the linker put its temporaries in
/// `artdir`.
///
/// An existing linker-flags argument is extended in place; otherwise exactly
/// one is added after the output binary.  The original arguments keep their
/// relative order.
pub fn build_rebuild_command(go_tool : &Path,
                             verb : GoVerb,
                             args : &[String],
                             artdir : &Path,
                             exe_file : &Path) -> Vec<OsString> {
    let tmpdir_flag = format!("-tmpdir={}", artdir.display());
    let mut rcmd : Vec<OsString> = vec![
        go_tool.into(),
        verb.as_str().into(),
        "-x".into(),
        "-work".into(),
        "-i".into(),
        "-o".into(),
        exe_file.into(),
    ];

    let mut rest = args.to_vec();
    match find_ldflags(&rest) {
        Some(LinkerFlags::Joined { index, value }) => {
            rest[index] = format!("-ldflags={}", join_flags(&tmpdir_flag, &value));
        }
        Some(LinkerFlags::Separate { value_index }) => {
            rest[value_index] = join_flags(&tmpdir_flag, &rest[value_index]);
        }
        None => {
            rcmd.push(format!("-ldflags={}", tmpdir_flag).into());
        }
    }
    rcmd.extend(rest.into_iter().map(OsString::from));
    rcmd
}

/// The rebuild command for a validated `go build`/`go test` command vector
pub fn rebuild_command(config : &CaptureConfig, command : &[String]) -> Vec<OsString> {
    let args = command.get(2..).unwrap_or(&[]);
    build_rebuild_command(&config.go_tool,
                          config.verb,
                          args,
                          &config.artifact_dir(),
                          &config.output_binary_path())
}

/// Run the rebuild once, capturing its combined output in the transcript.
///
/// A failing build is not an error here: a broken link step still leaves
/// intermediates worth harvesting.
pub fn run_rebuild(config : &CaptureConfig,
                   toolchain : &dyn Toolchain,
                   rcmd : &[OsString]) -> anyhow::Result<CmdStatus> {
    let transcript = config.transcript_path();
    info!("cmd is: {}", display_cmd(rcmd));
    let status = toolchain.run_to_file(rcmd, &transcript)
        .with_context(|| format!("running build for {}", display_cmd(rcmd)))?;
    match status {
        CmdStatus::Success =>
            info!("build/test complete, output in {}", transcript.display()),
        CmdStatus::Failure(code) =>
            info!("build/test exited with status {:?}; continuing, output in {}",
                  code, transcript.display()),
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strs(v : &[&str]) -> Vec<String> {
        v.iter().map(|s| String::from(*s)).collect()
    }

    fn rebuild(args : &[&str]) -> Vec<String> {
        build_rebuild_command(Path::new("go"),
                              GoVerb::Build,
                              &strs(args),
                              Path::new("/tmp/xxx.t"),
                              Path::new("/tmp/xxx.t/t.exe"))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_appends_ldflags_when_absent() {
        let cmd = rebuild(&["-tags", "netgo", "./pkg"]);
        assert_eq!(cmd, strs(&["go", "build", "-x", "-work", "-i", "-o", "/tmp/xxx.t/t.exe",
                               "-ldflags=-tmpdir=/tmp/xxx.t",
                               "-tags", "netgo", "./pkg"]));
        assert_eq!(cmd.iter().filter(|a| a.starts_with("-ldflags")).count(), 1);
    }

    #[test]
    fn test_extends_joined_ldflags() {
        let cmd = rebuild(&["-v", "-ldflags=-linkmode=external -extldflags=-static", "./pkg"]);
        assert_eq!(cmd, strs(&["go", "build", "-x", "-work", "-i", "-o", "/tmp/xxx.t/t.exe",
                               "-v",
                               "-ldflags=-tmpdir=/tmp/xxx.t -linkmode=external -extldflags=-static",
                               "./pkg"]));
        assert_eq!(cmd.iter().filter(|a| a.starts_with("-ldflags")).count(), 1);

        let cmd = rebuild(&["--ldflags=-s", "."]);
        assert_eq!(&cmd[7..], &strs(&["-ldflags=-tmpdir=/tmp/xxx.t -s", "."])[..]);

        let cmd = rebuild(&["-ldflags=", "."]);
        assert_eq!(&cmd[7..], &strs(&["-ldflags=-tmpdir=/tmp/xxx.t", "."])[..]);
    }

    #[test]
    fn test_extends_separate_ldflags() {
        let cmd = rebuild(&["-ldflags", "-linkmode=external", "./cmd/x"]);
        assert_eq!(&cmd[7..], &strs(&["-ldflags", "-tmpdir=/tmp/xxx.t -linkmode=external", "./cmd/x"])[..]);
    }

    #[test]
    fn test_test_binary_args_are_not_linker_flags() {
        assert_eq!(find_ldflags(&strs(&["./pkg", "-args", "-ldflags=x"])), None);
        let cmd = build_rebuild_command(Path::new("go"), GoVerb::Test,
                                        &strs(&["./pkg", "-args", "-ldflags=x"]),
                                        Path::new("/a"), Path::new("/a/t.exe"));
        let cmd : Vec<String> = cmd.into_iter().map(|a| a.into_string().unwrap()).collect();
        assert_eq!(cmd, strs(&["go", "test", "-x", "-work", "-i", "-o", "/a/t.exe",
                               "-ldflags=-tmpdir=/a", "./pkg", "-args", "-ldflags=x"]));
    }

    #[test]
    fn test_find_ldflags() {
        assert_eq!(find_ldflags(&strs(&["-gcflags=-N", "-ldflags=-w"])),
                   Some(LinkerFlags::Joined { index : 1, value : String::from("-w") }));
        assert_eq!(find_ldflags(&strs(&["-ldflags", "-w"])),
                   Some(LinkerFlags::Separate { value_index : 1 }));
        assert_eq!(find_ldflags(&strs(&["-ldflags"])), None);
        assert_eq!(find_ldflags(&strs(&["-ldflagsx=1", "x-ldflags=2"])), None);
    }

    #[test]
    fn test_rebuild_command_from_config() {
        let mut config = CaptureConfig::new("demo1", GoVerb::Build);
        config.artifact_root = PathBuf::from("/scratch/art");
        let cmd = rebuild_command(&config, &strs(&["go", "build", "./pkg"]));
        let cmd : Vec<String> = cmd.into_iter().map(|a| a.into_string().unwrap()).collect();
        assert_eq!(cmd, strs(&["go", "build", "-x", "-work", "-i", "-o",
                               "/scratch/art/xxx.demo1/demo1.exe",
                               "-ldflags=-tmpdir=/scratch/art/xxx.demo1",
                               "./pkg"]));
    }
}
