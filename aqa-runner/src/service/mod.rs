//! Service layer
//!
//! One service per pipeline stage. Services run external commands and
//! downloads through the `CommandRunner` and `Downloader` seams and record
//! their results in the run's `Context`.

pub mod jdk;
mod executor;
mod provision;
mod source;

pub use executor::{PipelineExecutor, target_command};
pub use provision::{CYGWIN_PACKAGES, DependencyProvisioner};
pub use source::{SourceAcquisition, get_sh_command, record_systemtest_repo};
