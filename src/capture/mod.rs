pub mod artifact_dir;
pub mod config;
pub mod disasm;
pub mod harvest;
pub mod options;
pub mod pipeline;
pub mod rebuild;
pub mod toolchain;
pub mod workdir;
