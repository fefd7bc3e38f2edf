//! Segment discovery and metadata management

use crate::error::ShmResult;
use crate::platform::is_process_alive;
use gaz::consts::SHM_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shape of one block as recorded in the metadata sidecar.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BlockMeta {
    /// Block name
    pub name: String,
    /// Block size in bytes
    pub bytes: usize,
}

/// JSON metadata sidecar written next to every segment's backing file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SegmentMeta {
    /// Segment name
    pub name: String,
    /// Data section size in bytes
    pub data_size: usize,
    /// Creator process ID
    pub creator_pid: u32,
    /// Creation timestamp (epoch nanos)
    pub created_ts_ns: u64,
    /// Declared blocks in order
    pub blocks: Vec<BlockMeta>,
}

/// Discovery view of one segment: its metadata plus creator liveness.
///
/// A segment whose creator is gone is not an error — segments are designed
/// to outlive their creator — but the flag is useful for tooling that
/// wants to spot leftovers from a previous session.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    /// Recorded metadata
    pub meta: SegmentMeta,
    /// Whether the creator process is still running
    pub creator_alive: bool,
}

/// List all gazlink segments under `dir` by scanning for prefixed backing
/// files with a readable metadata sidecar.
pub fn list_segments(dir: &Path) -> ShmResult<Vec<SegmentInfo>> {
    let mut segments = Vec::new();

    if !dir.exists() {
        return Ok(segments);
    }

    let prefix = format!("{SHM_PREFIX}_");
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if !file_name.starts_with(&prefix) || file_name.ends_with(".meta") {
            continue;
        }

        let meta_path = entry.path().with_extension("meta");
        let Ok(content) = std::fs::read_to_string(&meta_path) else {
            // Backing file without sidecar: created by something else, skip.
            continue;
        };
        let Ok(meta) = serde_json::from_str::<SegmentMeta>(&content) else {
            tracing::warn!(file = %meta_path.display(), "unreadable segment metadata");
            continue;
        };

        let creator_alive = is_process_alive(meta.creator_pid);
        segments.push(SegmentInfo {
            meta,
            creator_alive,
        });
    }

    // Newest first.
    segments.sort_by(|a, b| b.meta.created_ts_ns.cmp(&a.meta.created_ts_ns));
    Ok(segments)
}

/// Find one segment by name.
pub fn find_segment(dir: &Path, name: &str) -> ShmResult<Option<SegmentInfo>> {
    Ok(list_segments(dir)?
        .into_iter()
        .find(|info| info.meta.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BlockSpec, SegmentLayout};
    use crate::platform::current_pid;
    use crate::segment::SharedSegment;
    use tempfile::tempdir;

    fn small_layout() -> SegmentLayout {
        SegmentLayout::new(vec![BlockSpec::vector("data", 3)])
    }

    #[test]
    fn created_segments_are_discoverable() {
        let dir = tempdir().unwrap();
        let _a = SharedSegment::create(dir.path(), "bear_force_commands", small_layout()).unwrap();
        let _b = SharedSegment::create(dir.path(), "bear_body_force", small_layout()).unwrap();

        let segments = list_segments(dir.path()).unwrap();
        assert_eq!(segments.len(), 2);
        for info in &segments {
            assert_eq!(info.meta.creator_pid, current_pid());
            assert!(info.creator_alive);
        }
    }

    #[test]
    fn find_segment_by_name() {
        let dir = tempdir().unwrap();
        let _seg = SharedSegment::create(dir.path(), "bear_body_torque", small_layout()).unwrap();

        let found = find_segment(dir.path(), "bear_body_torque").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().meta.data_size, 24);

        assert!(find_segment(dir.path(), "missing").unwrap().is_none());
    }

    #[test]
    fn empty_dir_lists_nothing() {
        let dir = tempdir().unwrap();
        assert!(list_segments(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_dir_lists_nothing() {
        assert!(
            list_segments(Path::new("/nonexistent/gazlink"))
                .unwrap()
                .is_empty()
        );
    }
}
