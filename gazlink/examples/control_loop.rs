//! Joint-space PD hold over the bridge: reads joint states every
//! millisecond and streams torque commands back, with a one-time mode and
//! gain setup over the command channels.
//!
//! Start a simulator (or `cargo run --example sim_stub`) first, then:
//!
//! ```bash
//! cargo run --example control_loop -- bear 10
//! ```

use gazlink::{OperatingMode, RobotInterface};
use std::time::Duration;

const KP: f64 = 80.0;
const KD: f64 = 2.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    gazlink::init_tracing();

    let mut args = std::env::args().skip(1);
    let robot_name = args.next().unwrap_or_else(|| "bear".to_string());
    let num_joints: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(10);

    let mut robot = RobotInterface::connect(robot_name, num_joints)?;
    tracing::info!(role = ?robot.role(), "connected to simulator");

    robot.set_operating_mode(OperatingMode::Torque)?;
    robot.reset_simulation(None)?;

    loop {
        let position = robot.current_position()?;
        let velocity = robot.current_velocity()?;

        // PD hold around the zero pose.
        let torque: Vec<f64> = position
            .iter()
            .zip(&velocity)
            .map(|(q, qd)| -KP * q - KD * qd)
            .collect();
        robot.set_command_force(&torque)?;

        std::thread::sleep(Duration::from_millis(1));
    }
}
