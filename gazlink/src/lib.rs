//! # Gazlink — robot interface to a physics simulator
//!
//! A process-boundary bridge between a controller process and a physics
//! simulator running on the same machine. High-frequency numeric state
//! (joint states, body pose, IMU, contacts) and command parameters travel
//! through shared memory segments; discrete one-shot commands (pause, step,
//! reset, parameter updates) travel as short ASCII tokens over two local
//! stream sockets, one world-scoped and one model-scoped.
//!
//! ## Control flow
//!
//! [`RobotInterface`] is constructed with a robot identity. It attaches the
//! fixed segment registry — creating and zero-initializing every segment if
//! this process is first — then connects both command sockets with bounded
//! retry, because the simulator may still be starting. After that, state
//! reads and command writes are pure shared-memory traffic; only the
//! infrequent configuration operations touch a socket, and each of those
//! finishes its shared-memory write before signaling, so the simulator
//! never sees a token before the data it acts on.
//!
//! ```rust,no_run
//! use gazlink::{OperatingMode, RobotInterface};
//!
//! # fn main() -> Result<(), gazlink::BridgeError> {
//! let mut robot = RobotInterface::connect("bear", 10)?;
//! robot.set_operating_mode(OperatingMode::Torque)?;
//!
//! loop {
//!     let position = robot.current_position()?;
//!     let torque: Vec<f64> = position.iter().map(|q| -10.0 * q).collect();
//!     robot.set_command_force(&torque)?;
//! }
//! # }
//! ```
//!
//! ## Guarantees and limits
//!
//! - Construction fully succeeds or fails with a fatal [`BridgeError`];
//!   there is no degraded mode and no reconnect after a socket drop.
//! - Commands within one channel are strictly one-in-flight; the two
//!   channels are independent.
//! - Command acknowledgments block without a timeout, and their contents
//!   are not inspected.
//! - The interface is not meant for concurrent callers; serialize access
//!   externally.

pub mod channel;
pub mod error;
pub mod handshake;
pub mod interface;
pub mod registry;

pub use channel::CommandChannel;
pub use error::{BridgeError, BridgeResult};
pub use handshake::{ConnectionState, RetryPolicy, Sleeper, ThreadSleeper};
pub use interface::{InterfaceBuilder, RobotInterface};
pub use registry::{SegmentCatalog, Segments};

// Re-export the shared vocabulary so most callers need only this crate.
pub use gaz::command::{ChannelScope, CommandToken};
pub use gaz::config::{BridgeConfig, ConfigError, ConfigLoader};
pub use gaz::identity::{IdentityError, RobotIdentity};
pub use gaz::mode::OperatingMode;
pub use gaz::params::{ModelParameters, WorldParameters};

/// Initialize tracing with env-filter controlled verbosity.
///
/// Convenience for binaries and examples; libraries embedding gazlink
/// should install their own subscriber instead.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
