//! Fixed catalog of shared segments for one robot/world pair.
//!
//! The catalog translates a [`RobotIdentity`] into concrete segment
//! declarations exactly once, at construction; shapes are never recomputed.
//! Opening the catalog performs the attach/create handshake: attach
//! everything, and if the first segment is missing, flip the whole registry
//! into initializer role, create every segment, then attach once more. A
//! failure on the second pass is a transport-level problem and is fatal.

use gaz::identity::RobotIdentity;
use gaz::params::{ModelParameters, WorldParameters};
use gazlink_shm::{BlockSpec, SegmentLayout, SegmentRole, SharedSegment, ShmError, ShmResult};
use std::path::Path;

// ─── Segment Name Constants ─────────────────────────────────────────

/// Segment name: world parameters (`"world_params"`, world namespace).
pub const SEG_WORLD_PARAMS: &str = "world_params";
/// Segment name: model parameters (`"model_params"`).
pub const SEG_MODEL_PARAMS: &str = "model_params";
/// Segment name: joint states (`"joint_states"`).
pub const SEG_JOINT_STATES: &str = "joint_states";
/// Segment name: joint force commands (`"force_commands"`).
pub const SEG_FORCE_COMMANDS: &str = "force_commands";
/// Segment name: position PID gains (`"position_pid_gains"`).
pub const SEG_POSITION_PID_GAINS: &str = "position_pid_gains";
/// Segment name: joint position commands (`"position_commands"`).
pub const SEG_POSITION_COMMANDS: &str = "position_commands";
/// Segment name: joint limits (`"joint_limits"`).
pub const SEG_JOINT_LIMITS: &str = "joint_limits";
/// Segment name: effort limits (`"effort_limits"`).
pub const SEG_EFFORT_LIMITS: &str = "effort_limits";
/// Segment name: body pose (`"body_pose"`).
pub const SEG_BODY_POSE: &str = "body_pose";
/// Segment name: IMU states (`"imu_states"`).
pub const SEG_IMU_STATES: &str = "imu_states";
/// Segment name: limb contact flags (`"limb_contacts"`).
pub const SEG_LIMB_CONTACTS: &str = "limb_contacts";
/// Segment name: body force (`"body_force"`).
pub const SEG_BODY_FORCE: &str = "body_force";
/// Segment name: body torque (`"body_torque"`).
pub const SEG_BODY_TORQUE: &str = "body_torque";

// ─── Block Name Constants ───────────────────────────────────────────

/// Block name used by single-block segments.
pub const BLK_DATA: &str = "data";
/// Simulation-time stamp block.
pub const BLK_TIME: &str = "time";
/// Position block (joint vector or body xyz).
pub const BLK_POSITION: &str = "position";
/// Velocity block (joint vector or body xyz).
pub const BLK_VELOCITY: &str = "velocity";
/// Force block (joint vector or body xyz).
pub const BLK_FORCE: &str = "force";
/// Body orientation quaternion block.
pub const BLK_QUATERNION: &str = "quaternion";
/// Body orientation Euler-angle block.
pub const BLK_EULER_ANGLES: &str = "euler_angles";
/// IMU linear acceleration block.
pub const BLK_ACCEL: &str = "accel";
/// IMU angular rate block.
pub const BLK_ANG_RATE: &str = "ang_rate";
/// Contact-sensor flag block.
pub const BLK_ON: &str = "on";
/// Body torque block.
pub const BLK_TORQUE: &str = "torque";

/// Which name a segment is namespaced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Shared world-level segment, prefixed by the world name.
    World,
    /// Per-robot segment, prefixed by the robot name.
    Robot,
}

/// Declaration of one catalog segment.
#[derive(Debug, Clone)]
pub struct SegmentDecl {
    /// Namespace selector.
    pub namespace: Namespace,
    /// Segment name within the namespace.
    pub name: &'static str,
    /// Declared block layout.
    pub layout: SegmentLayout,
}

/// The fixed segment catalog derived from one identity.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    identity: RobotIdentity,
    decls: Vec<SegmentDecl>,
}

impl SegmentCatalog {
    /// Build the catalog for a validated identity.
    pub fn new(identity: RobotIdentity) -> Self {
        let j = identity.num_joints;
        let c = identity.num_contact_sensors;

        let decls = vec![
            SegmentDecl {
                namespace: Namespace::World,
                name: SEG_WORLD_PARAMS,
                layout: SegmentLayout::new(vec![BlockSpec::record::<WorldParameters>(BLK_DATA)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_MODEL_PARAMS,
                layout: SegmentLayout::new(vec![BlockSpec::record::<ModelParameters>(BLK_DATA)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_JOINT_STATES,
                layout: SegmentLayout::new(vec![
                    BlockSpec::vector(BLK_TIME, 1),
                    BlockSpec::vector(BLK_POSITION, j),
                    BlockSpec::vector(BLK_VELOCITY, j),
                    BlockSpec::vector(BLK_FORCE, j),
                ]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_FORCE_COMMANDS,
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_DATA, j)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_POSITION_PID_GAINS,
                // Interleaved [p, i, d] per joint.
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_DATA, 3 * j)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_POSITION_COMMANDS,
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_DATA, j)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_JOINT_LIMITS,
                // Interleaved [lower, upper] per joint.
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_DATA, 2 * j)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_EFFORT_LIMITS,
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_DATA, j)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_BODY_POSE,
                layout: SegmentLayout::new(vec![
                    BlockSpec::vector(BLK_TIME, 1),
                    BlockSpec::vector(BLK_POSITION, 3),
                    BlockSpec::vector(BLK_QUATERNION, 4),
                    BlockSpec::vector(BLK_EULER_ANGLES, 3),
                    BlockSpec::vector(BLK_VELOCITY, 3),
                ]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_IMU_STATES,
                layout: SegmentLayout::new(vec![
                    BlockSpec::vector(BLK_TIME, 1),
                    BlockSpec::vector(BLK_ACCEL, 3),
                    BlockSpec::vector(BLK_ANG_RATE, 3),
                ]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_LIMB_CONTACTS,
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_ON, c)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_BODY_FORCE,
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_FORCE, 3)]),
            },
            SegmentDecl {
                namespace: Namespace::Robot,
                name: SEG_BODY_TORQUE,
                layout: SegmentLayout::new(vec![BlockSpec::vector(BLK_TORQUE, 3)]),
            },
        ];

        Self { identity, decls }
    }

    /// Catalog identity.
    pub fn identity(&self) -> &RobotIdentity {
        &self.identity
    }

    /// Declared segments in order.
    pub fn decls(&self) -> &[SegmentDecl] {
        &self.decls
    }

    /// Fully namespaced segment name, e.g. `bear_joint_states`.
    pub fn full_name(&self, decl: &SegmentDecl) -> String {
        let namespace = match decl.namespace {
            Namespace::World => &self.identity.world_name,
            Namespace::Robot => &self.identity.robot_name,
        };
        format!("{namespace}_{}", decl.name)
    }

    /// Attach every segment, creating the whole registry first if it does
    /// not exist yet.
    ///
    /// Exactly one of two racing processes ends up as
    /// [`SegmentRole::Initializer`]; the other attaches to live data.
    pub fn open(&self, dir: &Path) -> ShmResult<(Segments, SegmentRole)> {
        match self.attach_all(dir) {
            Ok(segments) => Ok((segments, SegmentRole::Attached)),
            Err(ShmError::NotFound { name }) => {
                tracing::info!(missing = %name, "segments absent, taking initializer role");
                self.create_all(dir)?;
                // One retry after creation; failing again is a transport
                // problem, not a startup race.
                let segments = self.attach_all(dir)?;
                Ok((segments, SegmentRole::Initializer))
            }
            Err(e) => Err(e),
        }
    }

    fn attach_one(&self, dir: &Path, name: &'static str) -> ShmResult<SharedSegment> {
        let decl = self
            .decls
            .iter()
            .find(|d| d.name == name)
            .expect("segment name is part of the fixed catalog");
        SharedSegment::attach(dir, &self.full_name(decl), decl.layout.clone())
    }

    fn attach_all(&self, dir: &Path) -> ShmResult<Segments> {
        Ok(Segments {
            world_params: self.attach_one(dir, SEG_WORLD_PARAMS)?,
            model_params: self.attach_one(dir, SEG_MODEL_PARAMS)?,
            joint_states: self.attach_one(dir, SEG_JOINT_STATES)?,
            force_commands: self.attach_one(dir, SEG_FORCE_COMMANDS)?,
            position_pid_gains: self.attach_one(dir, SEG_POSITION_PID_GAINS)?,
            position_commands: self.attach_one(dir, SEG_POSITION_COMMANDS)?,
            joint_limits: self.attach_one(dir, SEG_JOINT_LIMITS)?,
            effort_limits: self.attach_one(dir, SEG_EFFORT_LIMITS)?,
            body_pose: self.attach_one(dir, SEG_BODY_POSE)?,
            imu_states: self.attach_one(dir, SEG_IMU_STATES)?,
            limb_contacts: self.attach_one(dir, SEG_LIMB_CONTACTS)?,
            body_force: self.attach_one(dir, SEG_BODY_FORCE)?,
            body_torque: self.attach_one(dir, SEG_BODY_TORQUE)?,
        })
    }

    fn create_all(&self, dir: &Path) -> ShmResult<()> {
        for decl in &self.decls {
            match SharedSegment::create(dir, &self.full_name(decl), decl.layout.clone()) {
                Ok(_) => {}
                // Another process created this one concurrently; it owns
                // the zero-initialization and we will attach below.
                Err(ShmError::AlreadyExists { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// All attached segments for one robot/world pair.
///
/// Handles are explicit — no hidden process-wide state. The segments
/// themselves are jointly owned with the simulator process.
pub struct Segments {
    /// World parameters record.
    pub world_params: SharedSegment,
    /// Model parameters record.
    pub model_params: SharedSegment,
    /// Joint time/position/velocity/force, written by the simulator.
    pub joint_states: SharedSegment,
    /// Joint force commands, written by the controller.
    pub force_commands: SharedSegment,
    /// Interleaved position PID gains.
    pub position_pid_gains: SharedSegment,
    /// Joint position commands, written by the controller.
    pub position_commands: SharedSegment,
    /// Interleaved joint limits.
    pub joint_limits: SharedSegment,
    /// Per-joint effort limits.
    pub effort_limits: SharedSegment,
    /// Base-link pose, written by the simulator.
    pub body_pose: SharedSegment,
    /// IMU samples, written by the simulator.
    pub imu_states: SharedSegment,
    /// Contact-sensor flags, written by the simulator.
    pub limb_contacts: SharedSegment,
    /// External base-link force, written by the controller.
    pub body_force: SharedSegment,
    /// External base-link torque, written by the controller.
    pub body_torque: SharedSegment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazlink_shm::BlockKind;

    fn catalog(j: usize, c: usize) -> SegmentCatalog {
        let identity = RobotIdentity::with_details("bear", "world", j, c).unwrap();
        SegmentCatalog::new(identity)
    }

    fn vector_len(catalog: &SegmentCatalog, segment: &str, block: &str) -> usize {
        let decl = catalog.decls().iter().find(|d| d.name == segment).unwrap();
        let (_, spec) = decl.layout.find(block).unwrap();
        match spec.kind {
            BlockKind::Vector { len } => len,
            BlockKind::Record { .. } => panic!("{segment}/{block} is a record"),
        }
    }

    #[test]
    fn catalog_has_thirteen_segments() {
        assert_eq!(catalog(10, 4).decls().len(), 13);
    }

    #[test]
    fn shapes_follow_identity() {
        let cat = catalog(10, 4);

        assert_eq!(vector_len(&cat, SEG_JOINT_STATES, BLK_TIME), 1);
        assert_eq!(vector_len(&cat, SEG_JOINT_STATES, BLK_POSITION), 10);
        assert_eq!(vector_len(&cat, SEG_JOINT_STATES, BLK_VELOCITY), 10);
        assert_eq!(vector_len(&cat, SEG_JOINT_STATES, BLK_FORCE), 10);
        assert_eq!(vector_len(&cat, SEG_FORCE_COMMANDS, BLK_DATA), 10);
        assert_eq!(vector_len(&cat, SEG_POSITION_PID_GAINS, BLK_DATA), 30);
        assert_eq!(vector_len(&cat, SEG_POSITION_COMMANDS, BLK_DATA), 10);
        assert_eq!(vector_len(&cat, SEG_JOINT_LIMITS, BLK_DATA), 20);
        assert_eq!(vector_len(&cat, SEG_EFFORT_LIMITS, BLK_DATA), 10);
        assert_eq!(vector_len(&cat, SEG_BODY_POSE, BLK_POSITION), 3);
        assert_eq!(vector_len(&cat, SEG_BODY_POSE, BLK_QUATERNION), 4);
        assert_eq!(vector_len(&cat, SEG_BODY_POSE, BLK_EULER_ANGLES), 3);
        assert_eq!(vector_len(&cat, SEG_BODY_POSE, BLK_VELOCITY), 3);
        assert_eq!(vector_len(&cat, SEG_IMU_STATES, BLK_ACCEL), 3);
        assert_eq!(vector_len(&cat, SEG_IMU_STATES, BLK_ANG_RATE), 3);
        assert_eq!(vector_len(&cat, SEG_LIMB_CONTACTS, BLK_ON), 4);
        assert_eq!(vector_len(&cat, SEG_BODY_FORCE, BLK_FORCE), 3);
        assert_eq!(vector_len(&cat, SEG_BODY_TORQUE, BLK_TORQUE), 3);
    }

    #[test]
    fn parameter_segments_are_records() {
        let cat = catalog(2, 1);
        for name in [SEG_WORLD_PARAMS, SEG_MODEL_PARAMS] {
            let decl = cat.decls().iter().find(|d| d.name == name).unwrap();
            let (_, spec) = decl.layout.find(BLK_DATA).unwrap();
            assert_eq!(spec.kind, BlockKind::Record { size: 16 });
        }
    }

    #[test]
    fn world_params_use_world_namespace() {
        let identity = RobotIdentity::with_details("bear", "arena", 2, 1).unwrap();
        let cat = SegmentCatalog::new(identity);

        for decl in cat.decls() {
            let full = cat.full_name(decl);
            if decl.name == SEG_WORLD_PARAMS {
                assert_eq!(full, "arena_world_params");
            } else {
                assert!(full.starts_with("bear_"), "{full} should be robot-scoped");
            }
        }
    }

    #[test]
    fn open_creates_then_attaches() {
        let dir = tempfile::tempdir().unwrap();
        let cat = catalog(3, 1);

        let (segments, role) = cat.open(dir.path()).unwrap();
        assert_eq!(role, SegmentRole::Initializer);
        assert_eq!(
            segments.joint_states.read_vec(BLK_POSITION).unwrap(),
            [0.0; 3]
        );

        // Second open over the same directory attaches.
        let (_, role) = cat.open(dir.path()).unwrap();
        assert_eq!(role, SegmentRole::Attached);
    }

    #[test]
    fn open_attaches_to_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let cat = catalog(2, 1);

        let (mut first, _) = cat.open(dir.path()).unwrap();
        first
            .joint_limits
            .write_vec(BLK_DATA, &[-1.0, 1.0, -2.0, 2.0])
            .unwrap();

        let (second, role) = cat.open(dir.path()).unwrap();
        assert_eq!(role, SegmentRole::Attached);
        assert_eq!(
            second.joint_limits.read_vec(BLK_DATA).unwrap(),
            [-1.0, 1.0, -2.0, 2.0]
        );
    }
}
