//! Simulator operating-mode enumeration.
//!
//! Uses `#[repr(i32)]` because the mode travels as the raw integer field of
//! the model-parameters record.

use serde::{Deserialize, Serialize};

/// Joint control mode applied by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum OperatingMode {
    /// Raw joint torque commands.
    Torque = 0,
    /// Velocity tracking via the simulator's PID loop.
    VelocityPid = 1,
    /// Position tracking via the simulator's PID loop.
    PositionPid = 2,
    /// Forces applied directly to bodies, bypassing joint actuation.
    DirectForce = 3,
}

impl OperatingMode {
    /// Convert from raw `i32` value. Returns `None` for invalid values.
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Torque),
            1 => Some(Self::VelocityPid),
            2 => Some(Self::PositionPid),
            3 => Some(Self::DirectForce),
            _ => None,
        }
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::Torque
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_roundtrip() {
        for val in 0..=3i32 {
            let mode = OperatingMode::from_i32(val).unwrap();
            assert_eq!(mode as i32, val);
        }
        assert!(OperatingMode::from_i32(4).is_none());
        assert!(OperatingMode::from_i32(-1).is_none());
    }

    #[test]
    fn default_matches_zeroed_record() {
        assert_eq!(OperatingMode::default() as i32, 0);
    }
}
