//! Error type for the robot interface facade.

use gaz::command::ChannelScope;
use gaz::identity::IdentityError;
use gazlink_shm::ShmError;
use thiserror::Error;

/// Error type for bridge construction and operation.
///
/// Construction either fully succeeds (all segments attached, both command
/// sockets connected) or fails with one of these; there is no degraded
/// operating mode.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid identity or configuration parameters. Fatal at
    /// construction, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Shared memory failure. `NotFound` is consumed internally by the
    /// initializer flip; anything surfacing here is fatal.
    #[error("shared memory error: {source}")]
    Shm {
        /// Underlying segment error
        #[from]
        source: ShmError,
    },

    /// Socket connection retries exhausted during the handshake.
    #[error("simulator not reachable after {attempts} attempts - start the simulator first")]
    SimulatorNotReachable {
        /// Number of connection attempts made
        attempts: u32,
    },

    /// Command socket errored or closed mid-exchange. Fatal at the point
    /// of use; there is no reconnect.
    #[error("{scope:?} command channel closed: {source}")]
    ChannelClosed {
        /// Which channel failed
        scope: ChannelScope,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Caller-supplied data has the wrong dimensionality for a setter.
    /// Rejected before any shared memory is written.
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch {
        /// Expected element count
        expected: usize,
        /// Supplied element count
        actual: usize,
    },

    /// Joint index outside `0..num_joints`.
    #[error("joint index {index} out of range (robot has {num_joints} joints)")]
    InvalidJointIndex {
        /// Requested index
        index: usize,
        /// Configured joint count
        num_joints: usize,
    },
}

impl From<IdentityError> for BridgeError {
    fn from(err: IdentityError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
