//! Remove scale-in protection from Auto Scaling Group instances that run an outdated
//! launch template version, optionally pulling them out of their target groups first.

pub mod advisory;
pub mod aws;
pub mod classifier;
pub mod config;
pub mod deregister;
pub mod error;
pub mod executor;
pub mod logging;
pub mod model;
pub mod planner;
pub mod updater;

#[cfg(test)]
mod testing;

pub use error::{Result, UnprotectError};
pub use updater::{ClassifiedGroup, RunOptions, RunReport, Updater};
