//! Analysis tasks
//!
//! - [`MyTask`]: template task filling kinematic histograms and flat trees
//!   from AOD events.
//! - [`McInfoTask`]: CEP selection on ESD events with MC-truth comparison.

pub mod mc_info;
pub mod my_task;

pub use mc_info::{central_system_momentum, McInfoSummary, McInfoTask};
pub use my_task::MyTask;
