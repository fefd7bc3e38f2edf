//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Create the backing file exclusively and map it read/write.
///
/// The file is created with `O_EXCL` semantics so two racing creators are
/// serialized by the kernel: the loser gets [`ShmError::AlreadyExists`] and
/// must fall back to attaching. A freshly sized file reads as all zeros,
/// which doubles as the zero-initialization of every block.
pub fn create_segment_mmap(path: &Path, size: usize) -> ShmResult<MmapMut> {
    let name = path.display().to_string();
    let file = OpenOptions::new()
        .create_new(true) // Fail if already exists
        .read(true)
        .write(true)
        .mode(0o600) // Owner read/write only
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => ShmError::AlreadyExists { name: name.clone() },
            ErrorKind::PermissionDenied => ShmError::PermissionDenied { name: name.clone() },
            _ => ShmError::Io { source: e },
        })?;

    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().populate().map_mut(&file)? };
    Ok(mmap)
}

/// Attach to an existing backing file.
///
/// A missing file is [`ShmError::NotFound`] — the caller may react by
/// becoming the initializer. Any other open failure is surfaced as-is and
/// is fatal.
pub fn attach_segment_mmap(path: &Path) -> ShmResult<(MmapMut, usize)> {
    let name = path.display().to_string();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ShmError::NotFound { name: name.clone() },
            ErrorKind::PermissionDenied => ShmError::PermissionDenied { name: name.clone() },
            _ => ShmError::Io { source: e },
        })?;

    let len = file.metadata()?.len() as usize;
    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok((mmap, len))
}

/// Check if process is alive using kill(pid, 0)
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // Null signal tests for existence without delivering anything.
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(_) => true,
            Err(nix::Error::ESRCH) => false, // No such process
            Err(nix::Error::EPERM) => true,  // Process exists but no permission to signal
            Err(_) => false,
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Get current process ID
pub fn current_pid() -> u32 {
    getpid().as_raw() as u32
}
