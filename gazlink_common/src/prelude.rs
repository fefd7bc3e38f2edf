//! Common re-exports for convenience.
//!
//! ```rust
//! use gazlink_common::prelude::*;
//! ```

pub use crate::command::{ChannelScope, CommandToken};
pub use crate::config::{BridgeConfig, ConfigError, ConfigLoader, LogLevel};
pub use crate::identity::{IdentityError, RobotIdentity};
pub use crate::mode::OperatingMode;
pub use crate::params::{ModelParameters, WorldParameters};
