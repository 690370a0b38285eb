//! Assessment scoring and support-session dispatch for the MindHelp platform.
//!
//! The [`assessment`] module holds the engine: question bank, sequential presenter with a
//! countdown, scorers, threshold dispatcher and the per-user storage seam. The remaining modules
//! carry configuration, error and telemetry plumbing shared with the API service.

pub mod assessment;
pub mod config;
pub mod error;
pub mod telemetry;
