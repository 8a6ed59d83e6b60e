use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use extlink::capture::config::log_level;
use extlink::capture::options::{go_style_args, Options, UsageError};

fn main() {
    let opt = Options::parse_from(go_style_args(std::env::args_os()));

    env_logger::Builder::new()
        .filter_level(log_level(opt.verbose))
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .format_timestamp(None)
        .init();

    match extlink::run_capture(opt) {
        Ok(ec) => std::process::exit(ec),
        Err(e) => {
            if let Some(usage) = e.downcast_ref::<UsageError>() {
                // Exits with status 2 after printing the usage
                Options::command().error(ErrorKind::ValueValidation, usage).exit();
            }
            eprintln!("capture-extlink: {:#}", e);
            std::process::exit(1);
        }
    }
}
