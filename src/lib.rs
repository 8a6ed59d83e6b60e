pub mod capture;

use crate::capture::config::CaptureConfig;
use crate::capture::options::Options;
use crate::capture::pipeline::perform_capture;
use crate::capture::toolchain::HostToolchain;

/// Validate the options and run one capture with the host toolchain
pub fn run_capture(opt : Options) -> anyhow::Result<i32> {
    let verb = opt.validate()?;
    let config = CaptureConfig::from_options(&opt, verb);
    perform_capture(&config, &HostToolchain::new(), &opt.command)?;
    Ok(0)
}
