//! Market Cache Library
//!
//! Seasonal key-value cache layer for the farmers market platform.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod state;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
