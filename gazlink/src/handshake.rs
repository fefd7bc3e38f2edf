//! Connection handshake: bounded-retry socket connection state machine.
//!
//! The simulator may still be starting up when the control process starts,
//! so the two command sockets are connected with a fixed backoff and a
//! bounded attempt count. Exhausting the attempts is fatal — there is no
//! degraded mode and, once connected, no reconnect-after-drop.
//!
//! Sleeping goes through the [`Sleeper`] trait so the retry machine is
//! testable without real time.

use crate::error::{BridgeError, BridgeResult};
use gaz::consts::{DEFAULT_CONNECT_BACKOFF_SECS, DEFAULT_MAX_CONNECT_ATTEMPTS};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

/// Connection lifecycle of one bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registry creation not yet requested.
    Unattached,
    /// Attaching segments / connecting sockets.
    Attaching,
    /// All segments attached and both sockets connected. Terminal for the
    /// session.
    Connected,
    /// Handshake aborted; the interface was never handed to the caller.
    Failed,
}

/// Bounded retry policy for the socket handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum connection attempts before giving up.
    pub max_attempts: u32,
    /// Fixed backoff between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_CONNECT_BACKOFF_SECS),
        }
    }
}

/// Clock abstraction for the retry loop.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Connect the world and model command sockets with bounded retry.
///
/// Both sockets are connected within one attempt, world first; a failure
/// on either counts as a failed attempt and both are retried after the
/// backoff. Returns the connected `(world, model)` pair or
/// [`BridgeError::SimulatorNotReachable`] once `policy.max_attempts` is
/// exhausted.
pub fn connect_sockets(
    world_path: &Path,
    model_path: &Path,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> BridgeResult<(UnixStream, UnixStream)> {
    for attempt in 1..=policy.max_attempts {
        match try_connect_pair(world_path, model_path) {
            Ok(pair) => {
                tracing::info!(attempt, "command sockets connected");
                return Ok(pair);
            }
            Err(error) => {
                let remaining = policy.max_attempts - attempt;
                tracing::warn!(%error, remaining, "simulator not reachable");
                if remaining > 0 {
                    sleeper.sleep(policy.backoff);
                }
            }
        }
    }

    Err(BridgeError::SimulatorNotReachable {
        attempts: policy.max_attempts,
    })
}

fn try_connect_pair(
    world_path: &Path,
    model_path: &Path,
) -> std::io::Result<(UnixStream, UnixStream)> {
    let world = UnixStream::connect(world_path)?;
    let model = UnixStream::connect(model_path)?;
    Ok((world, model))
}
