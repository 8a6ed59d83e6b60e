use clap::Parser;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

#[derive(Debug,Parser)]
#[command(name = "capture-extlink", version, about)]
#[command(after_long_help="The go command must follow a `--` separator, as in\n\n    capture-extlink -tag demo -- go build ./pkg\n\nArtifacts are collected in /tmp/xxx.<tag>.\n\nGo-style flags (-tag NAME, -tag=NAME) are accepted as well as --tag.\n\nLogging is controlled with the -v level or via the RUST_LOG/RUST_LOG_STYLE\nas described in https://docs.rs/env_logger documentation.")]
pub struct Options {
    /// Tag to use for the artifact directory and the output binary
    #[arg(long, value_name = "NAME", default_value_t = String::new(), hide_default_value = true)]
    pub tag : String,
    /// Verbose trace output level
    #[arg(short = 'v', value_name = "LEVEL", default_value_t = 0)]
    pub verbose : u8,
    /// The `go build` or `go test` command to re-run
    #[arg(last = true)]
    pub command : Vec<String>
}

/// The two `go` subcommands we know how to re-run
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum GoVerb {
    Build,
    Test
}

impl GoVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoVerb::Build => "build",
            GoVerb::Test => "test",
        }
    }
}

impl fmt::Display for GoVerb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoVerb {
    type Err = UsageError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => { Ok(GoVerb::Build) }
            "test" => { Ok(GoVerb::Test) }
            _ => { Err(UsageError::NotGoCommand) }
        }
    }
}

#[derive(thiserror::Error,Debug,PartialEq,Eq)]
pub enum UsageError {
    #[error("please supply tag name with -tag option")]
    MissingTag,
    #[error("tag '{0}' must be a single path component")]
    InvalidTag(String),
    #[error("please supply 'go build' or 'go test' command")]
    NotGoCommand
}

impl Options {
    /// Check the tag and the wrapped command.  Flags of the wrapped command are
    /// not examined.
    pub fn validate(&self) -> Result<GoVerb, UsageError> {
        if self.tag.is_empty() {
            return Err(UsageError::MissingTag);
        }
        if self.tag == "." || self.tag == ".." || self.tag.contains('/') || self.tag.contains('\0') {
            return Err(UsageError::InvalidTag(self.tag.clone()));
        }
        match self.command.as_slice() {
            [go, verb, ..] if go == "go" => GoVerb::from_str(verb),
            _ => Err(UsageError::NotGoCommand)
        }
    }
}

/// Rewrite Go-style `-tag` flags into the `--tag` form understood by clap.
///
/// Only arguments ahead of the `--` separator are touched; the wrapped command
/// is passed through as-is.
pub fn go_style_args<I, T>(args : I) -> Vec<OsString>
where I: IntoIterator<Item = T>, T: Into<OsString>
{
    let mut seen_separator = false;
    args.into_iter()
        .map(Into::<OsString>::into)
        .map(|arg| {
            if seen_separator {
                return arg;
            }
            if arg == "--" {
                seen_separator = true;
                return arg;
            }
            match arg.to_str() {
                Some(s) if s == "-tag" || s.starts_with("-tag=") => format!("-{}", s).into(),
                _ => arg
            }
        })
        .collect()
}
