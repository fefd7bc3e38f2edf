//! `repr(C)` parameter records shared with the simulator.
//!
//! These two structs are the only non-vector blocks in the segment catalog.
//! They mirror the simulator's C structures field for field, so layout is
//! fixed: `#[repr(C)]`, fixed-size numeric fields only, sizes asserted at
//! compile time.

use crate::mode::OperatingMode;
use static_assertions::const_assert_eq;

/// World-level simulation parameters (`world_params` segment, `data` block).
///
/// Size: 16 bytes (2×f64).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct WorldParameters {
    /// Physics step size in seconds.
    pub step_size: f64,
    /// Real-time update rate in Hz. `0.0` runs the simulation unthrottled.
    pub real_time_update_rate: f64,
}

/// Per-model simulation parameters (`model_params` segment, `data` block).
///
/// Size: 16 bytes (i32 + 4 pad + f64).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct ModelParameters {
    /// Joint control mode, raw discriminant of [`OperatingMode`].
    pub operating_mode: i32,
    // Implicit padding: 4 bytes → total 16 = 2×align(8)
    /// State publication rate in Hz.
    pub state_update_rate: f64,
}

impl ModelParameters {
    /// Decode the operating mode. Returns `None` if the simulator wrote an
    /// unknown discriminant.
    #[inline]
    pub const fn mode(&self) -> Option<OperatingMode> {
        OperatingMode::from_i32(self.operating_mode)
    }

    /// Set the operating mode field.
    #[inline]
    pub fn set_mode(&mut self, mode: OperatingMode) {
        self.operating_mode = mode as i32;
    }
}

const_assert_eq!(core::mem::size_of::<WorldParameters>(), 16);
const_assert_eq!(core::mem::size_of::<ModelParameters>(), 16);
const_assert_eq!(core::mem::align_of::<WorldParameters>(), 8);
const_assert_eq!(core::mem::align_of::<ModelParameters>(), 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes() {
        assert_eq!(core::mem::size_of::<WorldParameters>(), 16);
        assert_eq!(core::mem::size_of::<ModelParameters>(), 16);
    }

    #[test]
    fn default_is_zeroed() {
        let wp = WorldParameters::default();
        assert_eq!(wp.step_size, 0.0);
        assert_eq!(wp.real_time_update_rate, 0.0);

        let mp = ModelParameters::default();
        assert_eq!(mp.operating_mode, 0);
        assert_eq!(mp.mode(), Some(OperatingMode::Torque));
    }

    #[test]
    fn mode_accessors() {
        let mut mp = ModelParameters::default();
        mp.set_mode(OperatingMode::PositionPid);
        assert_eq!(mp.operating_mode, 2);
        assert_eq!(mp.mode(), Some(OperatingMode::PositionPid));

        mp.operating_mode = 99;
        assert_eq!(mp.mode(), None);
    }
}
