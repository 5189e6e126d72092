//! Task Master library: tasks bounded by a shared date cycle, daily
//! checklists with derived progress, sprint analytics and yearly resolutions.

pub mod commands;
pub mod config;
pub mod cycle;
pub mod error;
pub mod models;
pub mod progress;
pub mod resolution;
pub mod sprint;
pub mod storage;
pub mod tui;

pub use error::{Error, Result};
