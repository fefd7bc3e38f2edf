//! Typed robot interface over the segment registry and command channels.
//!
//! Operations come in two shapes:
//!
//! - **Pure shared-memory accessors** (state getters, command setters):
//!   no socket traffic, safe to call every simulation tick.
//! - **Write-then-signal operations** (mode, gains, limits, lifecycle):
//!   write the parameter block(s), then send exactly one command token and
//!   block for the acknowledgment. The shared-memory write always fully
//!   completes before the token is sent, so the simulator never observes a
//!   command before the data it acts on.
//!
//! The interface is not designed for concurrent use by multiple callers;
//! callers serialize their own access or accept interleaved block writes.

use crate::channel::CommandChannel;
use crate::error::{BridgeError, BridgeResult};
use crate::handshake::{ConnectionState, RetryPolicy, Sleeper, ThreadSleeper, connect_sockets};
use crate::registry::{
    BLK_ACCEL, BLK_ANG_RATE, BLK_DATA, BLK_EULER_ANGLES, BLK_FORCE, BLK_ON, BLK_POSITION,
    BLK_QUATERNION, BLK_TIME, BLK_TORQUE, BLK_VELOCITY, SegmentCatalog, Segments,
};
use gaz::command::{ChannelScope, CommandToken};
use gaz::config::BridgeConfig;
use gaz::consts::{
    DEFAULT_CONTACT_SENSORS, DEFAULT_SHM_DIR, DEFAULT_SOCKET_DIR, DEFAULT_WORLD_NAME,
};
use gaz::identity::RobotIdentity;
use gaz::mode::OperatingMode;
use gaz::params::{ModelParameters, WorldParameters};
use gazlink_shm::SegmentRole;
use std::path::PathBuf;
use std::time::Duration;

/// Real-time update rate applied by [`RobotInterface::turn_off_ludicrous_mode`].
const THROTTLED_UPDATE_RATE_HZ: f64 = 1000.0;

/// Builder for [`RobotInterface`] construction parameters.
#[derive(Debug, Clone)]
pub struct InterfaceBuilder {
    robot_name: String,
    num_joints: usize,
    world_name: String,
    num_contact_sensors: usize,
    shm_dir: PathBuf,
    socket_dir: PathBuf,
    retry: RetryPolicy,
}

impl InterfaceBuilder {
    fn new(robot_name: impl Into<String>, num_joints: usize) -> Self {
        Self {
            robot_name: robot_name.into(),
            num_joints,
            world_name: DEFAULT_WORLD_NAME.to_string(),
            num_contact_sensors: DEFAULT_CONTACT_SENSORS,
            shm_dir: PathBuf::from(DEFAULT_SHM_DIR),
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            retry: RetryPolicy::default(),
        }
    }

    /// World name as defined in the simulator world file.
    pub fn world_name(mut self, name: impl Into<String>) -> Self {
        self.world_name = name.into();
        self
    }

    /// Number of contact sensors on the robot.
    pub fn contact_sensors(mut self, count: usize) -> Self {
        self.num_contact_sensors = count;
        self
    }

    /// Directory holding the shared memory backing files.
    pub fn shm_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shm_dir = dir.into();
        self
    }

    /// Directory holding the simulator command sockets.
    pub fn socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    /// Maximum socket connection attempts before giving up.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    /// Backoff between socket connection attempts.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Perform the full handshake and return a connected interface.
    pub fn connect(self) -> BridgeResult<RobotInterface> {
        self.connect_with_sleeper(&ThreadSleeper)
    }

    /// Like [`connect`](Self::connect), with an injected retry clock.
    pub fn connect_with_sleeper(self, sleeper: &dyn Sleeper) -> BridgeResult<RobotInterface> {
        let identity = RobotIdentity::with_details(
            self.robot_name,
            self.world_name,
            self.num_joints,
            self.num_contact_sensors,
        )?;

        tracing::info!(
            robot = %identity.robot_name,
            world = %identity.world_name,
            joints = identity.num_joints,
            "connecting robot interface"
        );
        let mut state = ConnectionState::Attaching;
        tracing::debug!(state = ?state, "attaching segment registry");

        let catalog = SegmentCatalog::new(identity.clone());
        let (segments, role) = match catalog.open(&self.shm_dir) {
            Ok(opened) => opened,
            Err(e) => {
                state = ConnectionState::Failed;
                tracing::error!(error = %e, state = ?state, "segment handshake failed");
                return Err(e.into());
            }
        };

        let world_path = self.socket_dir.join(&identity.world_name);
        let model_path = self.socket_dir.join(&identity.robot_name);
        let (world_stream, model_stream) =
            match connect_sockets(&world_path, &model_path, &self.retry, sleeper) {
                Ok(pair) => pair,
                Err(e) => {
                    state = ConnectionState::Failed;
                    tracing::error!(error = %e, state = ?state, "socket handshake failed");
                    return Err(e);
                }
            };

        state = ConnectionState::Connected;
        tracing::info!(role = ?role, state = ?state, "robot interface connected");

        Ok(RobotInterface {
            identity,
            segments,
            world_channel: CommandChannel::new(ChannelScope::World, world_stream),
            model_channel: CommandChannel::new(ChannelScope::Model, model_stream),
            state,
            role,
        })
    }
}

/// Interface between a controller process and the simulator.
///
/// Owns its two command sockets and its view of every shared segment.
/// Construction either fully succeeds ([`ConnectionState::Connected`]) or
/// fails with a fatal [`BridgeError`].
pub struct RobotInterface {
    identity: RobotIdentity,
    segments: Segments,
    world_channel: CommandChannel,
    model_channel: CommandChannel,
    state: ConnectionState,
    role: SegmentRole,
}

impl RobotInterface {
    /// Start building an interface for `robot_name` with `num_joints`
    /// joints; everything else defaults.
    pub fn builder(robot_name: impl Into<String>, num_joints: usize) -> InterfaceBuilder {
        InterfaceBuilder::new(robot_name, num_joints)
    }

    /// Connect with defaults: world `"world"`, one contact sensor,
    /// `/dev/shm` segments, `/tmp` sockets, 10 attempts at 3 s backoff.
    pub fn connect(
        robot_name: impl Into<String>,
        num_joints: usize,
    ) -> BridgeResult<RobotInterface> {
        Self::builder(robot_name, num_joints).connect()
    }

    /// Connect from a loaded [`BridgeConfig`].
    pub fn from_config(config: &BridgeConfig) -> BridgeResult<RobotInterface> {
        config
            .validate()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        Self::builder(config.robot.name.clone(), config.robot.joints)
            .world_name(config.robot.world.clone())
            .contact_sensors(config.robot.contact_sensors)
            .shm_dir(config.connection.shm_dir.clone())
            .socket_dir(config.connection.socket_dir.clone())
            .max_attempts(config.connection.max_attempts)
            .backoff(Duration::from_secs(config.connection.backoff_secs))
            .connect()
    }

    // ─── Session info ───────────────────────────────────────────────

    /// Identity this interface was constructed with.
    pub fn identity(&self) -> &RobotIdentity {
        &self.identity
    }

    /// Number of joints.
    pub fn num_joints(&self) -> usize {
        self.identity.num_joints
    }

    /// Whether this process created the segments or attached to them.
    pub fn role(&self) -> SegmentRole {
        self.role
    }

    /// Connection state; `Connected` for the lifetime of the value.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Attached segments, for direct block access.
    pub fn segments(&self) -> &Segments {
        &self.segments
    }

    // ─── State getters (pure shared memory) ─────────────────────────

    /// Simulation time of the latest joint-state sample.
    pub fn current_time(&self) -> BridgeResult<f64> {
        Ok(self.segments.joint_states.read_vec(BLK_TIME)?[0])
    }

    /// Current joint positions.
    pub fn current_position(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.joint_states.read_vec(BLK_POSITION)?)
    }

    /// Current joint velocities.
    pub fn current_velocity(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.joint_states.read_vec(BLK_VELOCITY)?)
    }

    /// Current joint forces/torques.
    pub fn current_force(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.joint_states.read_vec(BLK_FORCE)?)
    }

    /// Base-link position (xyz).
    pub fn body_position(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.body_pose.read_vec(BLK_POSITION)?)
    }

    /// Base-link orientation quaternion (wxyz).
    pub fn body_quaternion(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.body_pose.read_vec(BLK_QUATERNION)?)
    }

    /// Base-link orientation as Euler angles.
    pub fn body_euler_angles(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.body_pose.read_vec(BLK_EULER_ANGLES)?)
    }

    /// Base-link linear velocity.
    pub fn body_velocity(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.body_pose.read_vec(BLK_VELOCITY)?)
    }

    /// IMU linear acceleration.
    pub fn imu_acceleration(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.imu_states.read_vec(BLK_ACCEL)?)
    }

    /// IMU angular rate.
    pub fn imu_angular_rate(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.imu_states.read_vec(BLK_ANG_RATE)?)
    }

    /// Contact-sensor flags, one per sensor.
    pub fn limb_contacts(&self) -> BridgeResult<Vec<f64>> {
        Ok(self.segments.limb_contacts.read_vec(BLK_ON)?)
    }

    /// Current world-parameters record.
    pub fn world_parameters(&self) -> BridgeResult<WorldParameters> {
        Ok(self.segments.world_params.read_record(BLK_DATA)?)
    }

    /// Current model-parameters record.
    pub fn model_parameters(&self) -> BridgeResult<ModelParameters> {
        Ok(self.segments.model_params.read_record(BLK_DATA)?)
    }

    // ─── Command setters (pure shared memory) ───────────────────────

    /// Write the joint force command block. Streaming path, no socket
    /// traffic.
    pub fn set_command_force(&mut self, force: &[f64]) -> BridgeResult<()> {
        self.check_joint_shape(force)?;
        self.segments.force_commands.write_vec(BLK_DATA, force)?;
        Ok(())
    }

    /// Write the joint position command block. Streaming path, no socket
    /// traffic.
    pub fn set_command_positions(&mut self, positions: &[f64]) -> BridgeResult<()> {
        self.check_joint_shape(positions)?;
        self.segments
            .position_commands
            .write_vec(BLK_DATA, positions)?;
        Ok(())
    }

    // ─── World-channel operations (write-then-signal) ───────────────

    /// Freeze the physics loop.
    pub fn pause_physics(&mut self) -> BridgeResult<()> {
        self.world_channel.send(CommandToken::PausePhysics)
    }

    /// Resume the physics loop.
    pub fn unpause_physics(&mut self) -> BridgeResult<()> {
        self.world_channel.send(CommandToken::UnpausePhysics)
    }

    /// Advance the simulation by one step.
    pub fn step_simulation(&mut self) -> BridgeResult<()> {
        self.world_channel.send(CommandToken::StepSimulation)
    }

    /// Reset the world, commanding joints to `initial_pose` first.
    ///
    /// With no pose, all joints are commanded to zero position. The pose
    /// write fully completes before the reset token is sent.
    pub fn reset_simulation(&mut self, initial_pose: Option<&[f64]>) -> BridgeResult<()> {
        match initial_pose {
            Some(pose) => self.set_command_positions(pose)?,
            None => {
                let zeros = vec![0.0; self.identity.num_joints];
                self.set_command_positions(&zeros)?;
            }
        }
        self.world_channel.send(CommandToken::ResetSimulation)
    }

    /// Set the real-time update rate and tell the simulator to apply it.
    pub fn set_real_time_update_rate(&mut self, rate: f64) -> BridgeResult<()> {
        let mut params: WorldParameters = self.segments.world_params.read_record(BLK_DATA)?;
        params.real_time_update_rate = rate;
        self.segments.world_params.write_record(BLK_DATA, &params)?;
        self.world_channel.send(CommandToken::UpdateWorldParameters)
    }

    /// Set the physics step size and tell the simulator to apply it.
    pub fn set_step_size(&mut self, step_size: f64) -> BridgeResult<()> {
        let mut params: WorldParameters = self.segments.world_params.read_record(BLK_DATA)?;
        params.step_size = step_size;
        self.segments.world_params.write_record(BLK_DATA, &params)?;
        self.world_channel.send(CommandToken::UpdateWorldParameters)
    }

    /// Run the simulation unthrottled (update rate 0).
    pub fn turn_on_ludicrous_mode(&mut self) -> BridgeResult<()> {
        self.set_real_time_update_rate(0.0)
    }

    /// Throttle the simulation back to real time.
    pub fn turn_off_ludicrous_mode(&mut self) -> BridgeResult<()> {
        self.set_real_time_update_rate(THROTTLED_UPDATE_RATE_HZ)
    }

    // ─── Model-channel operations (write-then-signal) ───────────────

    /// Switch the simulator's joint control mode.
    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> BridgeResult<()> {
        let mut params: ModelParameters = self.segments.model_params.read_record(BLK_DATA)?;
        params.set_mode(mode);
        self.segments.model_params.write_record(BLK_DATA, &params)?;
        self.model_channel.send(CommandToken::UpdateModelParameters)
    }

    /// Set the simulator's state publication rate.
    pub fn set_state_update_rate(&mut self, rate: f64) -> BridgeResult<()> {
        let mut params: ModelParameters = self.segments.model_params.read_record(BLK_DATA)?;
        params.state_update_rate = rate;
        self.segments.model_params.write_record(BLK_DATA, &params)?;
        self.model_channel.send(CommandToken::UpdateModelParameters)
    }

    /// Set position PID gains for all joints.
    ///
    /// Gains are written interleaved `[p, i, d]` per joint.
    pub fn set_all_position_pid_gains(
        &mut self,
        p_gains: &[f64],
        i_gains: &[f64],
        d_gains: &[f64],
    ) -> BridgeResult<()> {
        self.check_joint_shape(p_gains)?;
        self.check_joint_shape(i_gains)?;
        self.check_joint_shape(d_gains)?;

        let interleaved = interleave_gains(p_gains, i_gains, d_gains);
        self.segments
            .position_pid_gains
            .write_vec(BLK_DATA, &interleaved)?;
        self.model_channel.send(CommandToken::SetPositionPidGains)
    }

    /// Set position PID gains for a single joint, leaving the others
    /// untouched.
    pub fn set_joint_position_pid_gains(
        &mut self,
        joint_index: usize,
        p_gain: f64,
        i_gain: f64,
        d_gain: f64,
    ) -> BridgeResult<()> {
        if joint_index >= self.identity.num_joints {
            return Err(BridgeError::InvalidJointIndex {
                index: joint_index,
                num_joints: self.identity.num_joints,
            });
        }

        let mut gains = self.segments.position_pid_gains.read_vec(BLK_DATA)?;
        gains[3 * joint_index] = p_gain;
        gains[3 * joint_index + 1] = i_gain;
        gains[3 * joint_index + 2] = d_gain;
        self.segments
            .position_pid_gains
            .write_vec(BLK_DATA, &gains)?;
        self.model_channel.send(CommandToken::SetPositionPidGains)
    }

    /// Set joint position limits, interleaved `[lower, upper]` per joint.
    pub fn set_joint_limits(
        &mut self,
        lower_limits: &[f64],
        upper_limits: &[f64],
    ) -> BridgeResult<()> {
        self.check_joint_shape(lower_limits)?;
        self.check_joint_shape(upper_limits)?;

        let interleaved = interleave_limits(lower_limits, upper_limits);
        self.segments.joint_limits.write_vec(BLK_DATA, &interleaved)?;
        self.model_channel.send(CommandToken::SetJointLimits)
    }

    /// Set per-joint effort limits.
    pub fn set_effort_limits(&mut self, effort_limits: &[f64]) -> BridgeResult<()> {
        self.check_joint_shape(effort_limits)?;
        self.segments
            .effort_limits
            .write_vec(BLK_DATA, effort_limits)?;
        self.model_channel.send(CommandToken::SetEffortLimits)
    }

    /// Apply an external force to the base link.
    pub fn set_body_force(&mut self, force: &[f64; 3]) -> BridgeResult<()> {
        self.segments.body_force.write_vec(BLK_FORCE, force)?;
        self.model_channel.send(CommandToken::SetBodyForce)
    }

    /// Apply an external torque to the base link.
    pub fn set_body_torque(&mut self, torque: &[f64; 3]) -> BridgeResult<()> {
        self.segments.body_torque.write_vec(BLK_TORQUE, torque)?;
        self.model_channel.send(CommandToken::SetBodyTorque)
    }

    fn check_joint_shape(&self, data: &[f64]) -> BridgeResult<()> {
        if data.len() != self.identity.num_joints {
            return Err(BridgeError::ShapeMismatch {
                expected: self.identity.num_joints,
                actual: data.len(),
            });
        }
        Ok(())
    }
}

/// Interleave per-joint gain triples: `[p0, i0, d0, p1, i1, d1, ...]`.
///
/// Inputs are length-checked by the caller.
fn interleave_gains(p: &[f64], i: &[f64], d: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(3 * p.len());
    for joint in 0..p.len() {
        out.push(p[joint]);
        out.push(i[joint]);
        out.push(d[joint]);
    }
    out
}

/// Interleave per-joint limit pairs: `[lo0, hi0, lo1, hi1, ...]`.
fn interleave_limits(lower: &[f64], upper: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * lower.len());
    for joint in 0..lower.len() {
        out.push(lower[joint]);
        out.push(upper[joint]);
    }
    out
}
