//! Browser-agnostic automation pipeline: stage sequencing, deep-element
//! location over probe snapshots, overlay suppression, result extraction,
//! and failure diagnostics. Drivers plug in through the [`backend::Backend`]
//! trait.

pub mod actions;
pub mod backend;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod extract;
pub mod locator;
pub mod runner;
pub mod stages;
pub mod suppress;

pub use squall_common::{error, job, protocol};
