//! Launches parameterized notebooks on accelerator instances.
//!
//! Every notebook execution ([`JobSpec`]) gets its own instance. A new instance is only requested
//! when the regional accelerator quota has free capacity, see [`SubmissionLoop`].

pub mod config;
pub mod instance;
pub mod jobspec;
pub mod process;
pub mod provider;
pub mod quota;
pub mod template;

pub use config::{RunnerConfig, SubmitOrder};
pub use jobspec::JobSpec;
pub use process::{SubmissionLoop, SubmissionStats};
