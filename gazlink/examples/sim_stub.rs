//! Minimal stand-in simulator for developing against gazlink without a
//! real physics process: creates the segment registry, binds both command
//! sockets, acknowledges every token, and publishes a sine-wave joint state.
//!
//! ```bash
//! cargo run --example sim_stub -- bear 10
//! ```

use gazlink::registry::{BLK_POSITION, BLK_TIME, BLK_VELOCITY, SegmentCatalog};
use gazlink::{RobotIdentity, init_tracing};
use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let robot_name = args.next().unwrap_or_else(|| "bear".to_string());
    let num_joints: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(10);

    let identity = RobotIdentity::new(robot_name, num_joints)?;
    let catalog = SegmentCatalog::new(identity.clone());
    let (mut segments, role) = catalog.open(Path::new("/dev/shm"))?;
    tracing::info!(?role, "segment registry ready");

    for name in [&identity.world_name, &identity.robot_name] {
        let path = Path::new("/tmp").join(name);
        // A previous run may have left its socket file behind.
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        tracing::info!(socket = %path.display(), "command socket bound");
        std::thread::spawn(move || serve(listener));
    }

    let step = 0.001f64;
    let mut t = 0.0f64;
    loop {
        t += step;
        let position: Vec<f64> = (0..num_joints).map(|j| (t + j as f64).sin()).collect();
        let velocity: Vec<f64> = (0..num_joints).map(|j| (t + j as f64).cos()).collect();
        segments.joint_states.write_vec(BLK_TIME, &[t])?;
        segments.joint_states.write_vec(BLK_POSITION, &position)?;
        segments.joint_states.write_vec(BLK_VELOCITY, &velocity)?;
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn serve(listener: UnixListener) {
    for conn in listener.incoming() {
        let Ok(mut conn) = conn else { continue };
        std::thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match conn.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => {
                        tracing::info!(token = %String::from_utf8_lossy(&buf[..n]), "command");
                        if conn.write_all(b"ok").is_err() {
                            return;
                        }
                    }
                }
            }
        });
    }
}
