//! Shared pieces of the `nfsserver` and `nfsclient` binaries.
mod logger;
mod shell;

pub use logger::init_logger;
pub use shell::{Remote, Shell};
