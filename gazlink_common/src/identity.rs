//! Robot identity: the parameters that determine segment naming and block
//! shapes for one robot/world pair.
//!
//! Identity is validated once, at construction. Every downstream shape
//! (joint vectors, interleaved gain triples, contact flags) is derived from
//! it and never recomputed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_CONTACT_SENSORS, DEFAULT_WORLD_NAME, MAX_CONTACT_SENSORS, MAX_JOINTS};

/// Error type for identity validation failures.
///
/// All variants are configuration errors: fatal at construction, never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Robot name is empty.
    #[error("robot name cannot be empty")]
    EmptyRobotName,

    /// World name is empty.
    #[error("world name cannot be empty")]
    EmptyWorldName,

    /// Joint count outside the accepted range.
    #[error("invalid joint count {0} (must be 1..={MAX_JOINTS})")]
    InvalidJointCount(usize),

    /// Contact sensor count above the accepted maximum.
    #[error("invalid contact sensor count {0} (must be <= {MAX_CONTACT_SENSORS})")]
    InvalidContactSensorCount(usize),
}

/// Identity of one robot/world pair.
///
/// Determines segment namespaces (segments are namespaced by either the
/// world name or the robot name) and all block shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotIdentity {
    /// Robot name as defined in the simulator world file.
    pub robot_name: String,
    /// World name as defined in the simulator world file.
    pub world_name: String,
    /// Total number of joints in the robot.
    pub num_joints: usize,
    /// Total number of contact sensors on the robot.
    pub num_contact_sensors: usize,
}

impl RobotIdentity {
    /// Create an identity with the default world name and contact sensor
    /// count.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] if the robot name is empty or the joint
    /// count is outside `1..=MAX_JOINTS`.
    pub fn new(robot_name: impl Into<String>, num_joints: usize) -> Result<Self, IdentityError> {
        Self::with_details(
            robot_name,
            DEFAULT_WORLD_NAME,
            num_joints,
            DEFAULT_CONTACT_SENSORS,
        )
    }

    /// Create a fully specified identity.
    pub fn with_details(
        robot_name: impl Into<String>,
        world_name: impl Into<String>,
        num_joints: usize,
        num_contact_sensors: usize,
    ) -> Result<Self, IdentityError> {
        let identity = Self {
            robot_name: robot_name.into(),
            world_name: world_name.into(),
            num_joints,
            num_contact_sensors,
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Validate identity parameters.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.robot_name.is_empty() {
            return Err(IdentityError::EmptyRobotName);
        }
        if self.world_name.is_empty() {
            return Err(IdentityError::EmptyWorldName);
        }
        if self.num_joints == 0 || self.num_joints > MAX_JOINTS {
            return Err(IdentityError::InvalidJointCount(self.num_joints));
        }
        if self.num_contact_sensors > MAX_CONTACT_SENSORS {
            return Err(IdentityError::InvalidContactSensorCount(
                self.num_contact_sensors,
            ));
        }
        Ok(())
    }
}
