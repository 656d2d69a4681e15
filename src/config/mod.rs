//! Configuration loading and management for the payroll engine.
//!
//! This module provides functionality to load payroll settings and dated tax
//! bracket schedules from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/ng-paye").unwrap();
//! println!("Loaded jurisdiction: {}", config.jurisdiction().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{BracketSchedule, JurisdictionMetadata, PayrollConfig, PayrollSettings, SettingsFile};
