//! End-to-end tests against a stub simulator.
//!
//! The stub binds the two command sockets, acknowledges every token, and on
//! `reset_simulation` snapshots the position-command block at the moment the
//! token arrives — which is what lets these tests pin down the
//! write-before-signal ordering.

use gazlink::registry::{
    BLK_DATA, BLK_POSITION, BLK_TIME, BLK_VELOCITY, SEG_FORCE_COMMANDS, SEG_JOINT_LIMITS,
    SEG_JOINT_STATES, SEG_MODEL_PARAMS, SEG_POSITION_COMMANDS, SEG_POSITION_PID_GAINS,
};
use gazlink::{
    BridgeError, ConnectionState, ModelParameters, OperatingMode, RobotIdentity, RobotInterface,
    SegmentCatalog,
};
use gazlink_shm::{SegmentRole, SharedSegment, list_segments};
use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Stand-in for the simulator process: two ack-everything command sockets.
struct StubSimulator {
    received: Arc<Mutex<Vec<String>>>,
    reset_snapshot: Arc<Mutex<Option<Vec<f64>>>>,
}

impl StubSimulator {
    /// Bind both sockets and start serving before returning, so a client
    /// connect succeeds on the first attempt.
    fn spawn(
        socket_dir: &Path,
        shm_dir: PathBuf,
        robot_name: &str,
        world_name: &str,
        num_joints: usize,
    ) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let reset_snapshot = Arc::new(Mutex::new(None));

        let world_listener = UnixListener::bind(socket_dir.join(world_name)).unwrap();
        let model_listener = UnixListener::bind(socket_dir.join(robot_name)).unwrap();

        let position_commands = format!("{robot_name}_{SEG_POSITION_COMMANDS}");
        {
            let received = Arc::clone(&received);
            let reset_snapshot = Arc::clone(&reset_snapshot);
            std::thread::spawn(move || {
                let (mut conn, _) = world_listener.accept().unwrap();
                let mut buf = [0u8; 256];
                loop {
                    let n = match conn.read(&mut buf) {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    let token = String::from_utf8_lossy(&buf[..n]).to_string();
                    if token == "reset_simulation" {
                        // Observe the position-command block exactly when
                        // the token arrives, before acknowledging.
                        let layout = gazlink_shm::SegmentLayout::new(vec![
                            gazlink_shm::BlockSpec::vector(BLK_DATA, num_joints),
                        ]);
                        let segment =
                            SharedSegment::attach(&shm_dir, &position_commands, layout).unwrap();
                        *reset_snapshot.lock().unwrap() =
                            Some(segment.read_vec(BLK_DATA).unwrap());
                    }
                    received.lock().unwrap().push(token);
                    conn.write_all(b"ok").unwrap();
                }
            });
        }

        {
            let received = Arc::clone(&received);
            std::thread::spawn(move || {
                let (mut conn, _) = model_listener.accept().unwrap();
                let mut buf = [0u8; 256];
                loop {
                    let n = match conn.read(&mut buf) {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    received
                        .lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&buf[..n]).to_string());
                    conn.write_all(b"ok").unwrap();
                }
            });
        }

        Self {
            received,
            reset_snapshot,
        }
    }

    fn tokens(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

struct Harness {
    _socket_dir: TempDir,
    shm_dir: TempDir,
    stub: StubSimulator,
    robot: RobotInterface,
}

fn connect(num_joints: usize) -> Harness {
    let socket_dir = tempfile::tempdir().unwrap();
    let shm_dir = tempfile::tempdir().unwrap();
    let stub = StubSimulator::spawn(
        socket_dir.path(),
        shm_dir.path().to_path_buf(),
        "bear",
        "world",
        num_joints,
    );

    let robot = RobotInterface::builder("bear", num_joints)
        .shm_dir(shm_dir.path())
        .socket_dir(socket_dir.path())
        .max_attempts(3)
        .backoff(Duration::from_millis(10))
        .connect()
        .unwrap();

    Harness {
        _socket_dir: socket_dir,
        shm_dir,
        stub,
        robot,
    }
}

/// Attach one registry segment the way the simulator side would.
fn attach_segment(shm_dir: &Path, name: &'static str, num_joints: usize) -> SharedSegment {
    let identity = RobotIdentity::with_details("bear", "world", num_joints, 1).unwrap();
    let catalog = SegmentCatalog::new(identity);
    let decl = catalog
        .decls()
        .iter()
        .find(|d| d.name == name)
        .unwrap()
        .clone();
    SharedSegment::attach(shm_dir, &catalog.full_name(&decl), decl.layout.clone()).unwrap()
}

#[test]
fn first_process_takes_initializer_role() {
    let harness = connect(4);
    assert_eq!(harness.robot.role(), SegmentRole::Initializer);
    assert_eq!(harness.robot.state(), ConnectionState::Connected);
    assert_eq!(harness.robot.num_joints(), 4);
}

#[test]
fn state_getters_see_simulator_writes() {
    let harness = connect(3);

    // Simulate the physics side publishing a joint-state sample.
    let mut states = attach_segment(harness.shm_dir.path(), SEG_JOINT_STATES, 3);
    states.write_vec(BLK_TIME, &[2.5]).unwrap();
    states.write_vec(BLK_POSITION, &[0.1, 0.2, 0.3]).unwrap();
    states.write_vec(BLK_VELOCITY, &[-1.0, 0.0, 1.0]).unwrap();

    assert_eq!(harness.robot.current_time().unwrap(), 2.5);
    assert_eq!(harness.robot.current_position().unwrap(), [0.1, 0.2, 0.3]);
    assert_eq!(harness.robot.current_velocity().unwrap(), [-1.0, 0.0, 1.0]);
}

#[test]
fn command_setters_are_visible_to_the_simulator_side() {
    let mut harness = connect(2);
    harness.robot.set_command_force(&[4.0, -4.0]).unwrap();

    let segment = attach_segment(harness.shm_dir.path(), SEG_FORCE_COMMANDS, 2);
    assert_eq!(segment.read_vec(BLK_DATA).unwrap(), [4.0, -4.0]);

    // Pure shared-memory path: no socket traffic.
    assert!(harness.stub.tokens().is_empty());
}

#[test]
fn pid_gains_are_interleaved_per_joint() {
    let mut harness = connect(2);
    harness
        .robot
        .set_all_position_pid_gains(&[1.0, 2.0], &[10.0, 20.0], &[100.0, 200.0])
        .unwrap();

    let gains = attach_segment(harness.shm_dir.path(), SEG_POSITION_PID_GAINS, 2);
    assert_eq!(
        gains.read_vec(BLK_DATA).unwrap(),
        [1.0, 10.0, 100.0, 2.0, 20.0, 200.0]
    );
    assert_eq!(harness.stub.tokens(), ["set_position_pid_gains"]);
}

#[test]
fn single_joint_gains_leave_others_untouched() {
    let mut harness = connect(2);
    harness
        .robot
        .set_all_position_pid_gains(&[1.0, 2.0], &[10.0, 20.0], &[100.0, 200.0])
        .unwrap();
    harness
        .robot
        .set_joint_position_pid_gains(1, 5.0, 50.0, 500.0)
        .unwrap();

    let gains = attach_segment(harness.shm_dir.path(), SEG_POSITION_PID_GAINS, 2);
    assert_eq!(
        gains.read_vec(BLK_DATA).unwrap(),
        [1.0, 10.0, 100.0, 5.0, 50.0, 500.0]
    );

    let result = harness.robot.set_joint_position_pid_gains(2, 0.0, 0.0, 0.0);
    assert!(matches!(
        result,
        Err(BridgeError::InvalidJointIndex {
            index: 2,
            num_joints: 2
        })
    ));
}

#[test]
fn joint_limits_are_interleaved_per_joint() {
    let mut harness = connect(2);
    harness
        .robot
        .set_joint_limits(&[-1.0, -2.0], &[1.0, 2.0])
        .unwrap();

    let limits = attach_segment(harness.shm_dir.path(), SEG_JOINT_LIMITS, 2);
    assert_eq!(limits.read_vec(BLK_DATA).unwrap(), [-1.0, 1.0, -2.0, 2.0]);
    assert_eq!(harness.stub.tokens(), ["set_joint_limits"]);
}

#[test]
fn reset_without_pose_zeroes_positions_before_the_token() {
    let mut harness = connect(3);

    // Leave something non-zero in the block first.
    harness.robot.set_command_positions(&[5.0, 5.0, 5.0]).unwrap();
    harness.robot.reset_simulation(None).unwrap();

    // The stub snapshots the block when the token arrives: it must already
    // contain the zero pose.
    let snapshot = harness.stub.reset_snapshot.lock().unwrap().clone();
    assert_eq!(snapshot.unwrap(), [0.0, 0.0, 0.0]);
    assert_eq!(harness.stub.tokens(), ["reset_simulation"]);
}

#[test]
fn reset_with_pose_writes_the_pose_first() {
    let mut harness = connect(2);
    harness.robot.reset_simulation(Some(&[0.5, -0.5])).unwrap();

    let snapshot = harness.stub.reset_snapshot.lock().unwrap().clone();
    assert_eq!(snapshot.unwrap(), [0.5, -0.5]);
}

#[test]
fn operating_mode_update_writes_record_then_signals() {
    let mut harness = connect(2);
    harness
        .robot
        .set_operating_mode(OperatingMode::PositionPid)
        .unwrap();

    let params = attach_segment(harness.shm_dir.path(), SEG_MODEL_PARAMS, 2);
    let record: ModelParameters = params.read_record(BLK_DATA).unwrap();
    assert_eq!(record.mode(), Some(OperatingMode::PositionPid));
    assert_eq!(harness.stub.tokens(), ["update_model_parameters"]);
}

#[test]
fn world_lifecycle_tokens_reach_the_world_socket() {
    let mut harness = connect(2);
    harness.robot.pause_physics().unwrap();
    harness.robot.step_simulation().unwrap();
    harness.robot.unpause_physics().unwrap();

    assert_eq!(
        harness.stub.tokens(),
        ["pause_physics", "step_simulation", "unpause_physics"]
    );
}

#[test]
fn ludicrous_mode_toggles_update_rate() {
    let mut harness = connect(2);
    harness.robot.turn_on_ludicrous_mode().unwrap();
    assert_eq!(
        harness.robot.world_parameters().unwrap().real_time_update_rate,
        0.0
    );

    harness.robot.turn_off_ludicrous_mode().unwrap();
    assert_eq!(
        harness.robot.world_parameters().unwrap().real_time_update_rate,
        1000.0
    );

    assert_eq!(
        harness.stub.tokens(),
        ["update_world_parameters", "update_world_parameters"]
    );
}

#[test]
fn shape_mismatch_is_rejected_before_writing() {
    let mut harness = connect(3);
    harness.robot.set_command_force(&[1.0, 2.0, 3.0]).unwrap();

    let result = harness.robot.set_command_force(&[1.0]);
    assert!(matches!(
        result,
        Err(BridgeError::ShapeMismatch {
            expected: 3,
            actual: 1
        })
    ));

    // The earlier contents survived the rejected write.
    let segment = attach_segment(harness.shm_dir.path(), SEG_FORCE_COMMANDS, 3);
    assert_eq!(segment.read_vec(BLK_DATA).unwrap(), [1.0, 2.0, 3.0]);
}

#[test]
fn unreachable_simulator_fails_after_bounded_retries() {
    // No stub: sockets never appear.
    let socket_dir = tempfile::tempdir().unwrap();
    let shm_dir = tempfile::tempdir().unwrap();

    let result = RobotInterface::builder("bear", 4)
        .shm_dir(shm_dir.path())
        .socket_dir(socket_dir.path())
        .max_attempts(3)
        .backoff(Duration::from_millis(1))
        .connect();

    assert!(matches!(
        result,
        Err(BridgeError::SimulatorNotReachable { attempts: 3 })
    ));

    // Segment creation happened before the socket phase and is not rolled
    // back; the simulator can attach to these on its next start.
    let segments = list_segments(shm_dir.path()).unwrap();
    assert_eq!(segments.len(), 13);
}
