//! Shared configuration, errors and calendar helpers for every threethings crate.

pub mod config;
pub mod error;
pub mod time;

pub use config::ThreeThingsConfig;
pub use error::{CoreError, Result};
pub use time::WeekWindow;
