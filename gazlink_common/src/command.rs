//! Command tokens and channel scopes.
//!
//! A command token is a short fixed ASCII string that tells the simulator to
//! act on previously written shared memory. Tokens carry no parameters and
//! no version; all payload travels via a prior shared-memory write.
//!
//! Every token belongs to exactly one of the two command channels: the
//! world-scope socket (simulation lifecycle, world parameters) or the
//! model-scope socket (per-robot configuration).

use serde::{Deserialize, Serialize};

/// Which of the two persistent command sockets a token travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelScope {
    /// World-level socket, addressed by the world name.
    World,
    /// Model-level socket, addressed by the robot name.
    Model,
}

/// One of the fixed simulator actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandToken {
    /// Freeze the physics loop.
    PausePhysics,
    /// Resume the physics loop.
    UnpausePhysics,
    /// Advance the simulation by one step.
    StepSimulation,
    /// Reset the world to the commanded joint positions.
    ResetSimulation,
    /// Re-read the world-parameters record.
    UpdateWorldParameters,
    /// Re-read the model-parameters record.
    UpdateModelParameters,
    /// Re-read the position PID gain block.
    SetPositionPidGains,
    /// Re-read the joint-limits block.
    SetJointLimits,
    /// Re-read the effort-limits block.
    SetEffortLimits,
    /// Apply the body-force block to the base link.
    SetBodyForce,
    /// Apply the body-torque block to the base link.
    SetBodyTorque,
}

impl CommandToken {
    /// Wire form of the token, exactly as the simulator expects it.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PausePhysics => "pause_physics",
            Self::UnpausePhysics => "unpause_physics",
            Self::StepSimulation => "step_simulation",
            Self::ResetSimulation => "reset_simulation",
            Self::UpdateWorldParameters => "update_world_parameters",
            Self::UpdateModelParameters => "update_model_parameters",
            Self::SetPositionPidGains => "set_position_pid_gains",
            Self::SetJointLimits => "set_joint_limits",
            Self::SetEffortLimits => "set_effort_limits",
            Self::SetBodyForce => "set_body_force",
            Self::SetBodyTorque => "set_body_torque",
        }
    }

    /// Wire bytes of the token.
    #[inline]
    pub const fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// Channel this token travels on.
    pub const fn scope(&self) -> ChannelScope {
        match self {
            Self::PausePhysics
            | Self::UnpausePhysics
            | Self::StepSimulation
            | Self::ResetSimulation
            | Self::UpdateWorldParameters => ChannelScope::World,
            Self::UpdateModelParameters
            | Self::SetPositionPidGains
            | Self::SetJointLimits
            | Self::SetEffortLimits
            | Self::SetBodyForce
            | Self::SetBodyTorque => ChannelScope::Model,
        }
    }
}
