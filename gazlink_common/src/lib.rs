//! Gazlink Common Library
//!
//! This crate provides shared constants, identity types, command tokens and
//! configuration loading utilities for all gazlink workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide constants and default paths
//! - [`identity`] - Robot identity and fail-fast validation
//! - [`mode`] - Simulator operating-mode enumeration
//! - [`command`] - Command tokens and channel scopes
//! - [`params`] - `repr(C)` parameter records shared with the simulator
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! gaz = { package = "gazlink_common", path = "../gazlink_common" }
//! ```
//!
//! Then import:
//! ```rust,ignore
//! use gaz::consts::*;
//! use gaz::config::{BridgeConfig, ConfigLoader};
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod identity;
pub mod mode;
pub mod params;
pub mod prelude;
