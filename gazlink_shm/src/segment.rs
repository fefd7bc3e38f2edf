//! Shared memory segment structures and operations

use crate::discovery::{BlockMeta, SegmentMeta};
use crate::error::{ShmError, ShmResult};
use crate::layout::{BlockKind, BlockSpec, SegmentLayout};
use crate::platform::{attach_segment_mmap, create_segment_mmap, current_pid};
use gaz::consts::SHM_PREFIX;
use memmap2::MmapMut;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering, fence};
use std::time::{SystemTime, UNIX_EPOCH};

/// Magic number identifying a valid gazlink segment: `"GAZLINK\0"`.
pub const GAZ_SHM_MAGIC: u64 = u64::from_le_bytes(*b"GAZLINK\0");

/// Torn-read retries before reporting contention.
const MAX_READ_RETRIES: usize = 10;

/// Segment header with cache-line alignment
///
/// The version counter uses the odd/even protocol: odd = write in
/// progress (reader must retry), even = committed. One counter guards the
/// whole segment, so every single-block read is internally consistent;
/// consistency across separate reads is explicitly not provided.
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic number for validation
    pub magic: u64,
    /// Version counter for optimistic concurrency
    pub version: AtomicU64,
    /// Creator process ID
    pub creator_pid: u32,
    /// Hash of the declared block layout
    pub layout_hash: u32,
    /// Data section size in bytes
    pub data_size: u64,
    /// Creation timestamp (epoch nanos)
    pub created_ts: u64,
    /// Padding to a 128-byte header
    _padding: [u8; 88],
}

impl SegmentHeader {
    /// Create new segment header
    pub fn new(layout_hash: u32, data_size: usize, creator_pid: u32) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        Self {
            magic: GAZ_SHM_MAGIC,
            version: AtomicU64::new(0),
            creator_pid,
            layout_hash,
            data_size: data_size as u64,
            created_ts: now,
            _padding: [0; 88],
        }
    }

    /// Validate magic, layout hash and data size against a declaration.
    pub fn validate(&self, name: &str, layout: &SegmentLayout) -> ShmResult<()> {
        if self.magic != GAZ_SHM_MAGIC {
            return Err(ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: "invalid magic".to_string(),
            });
        }
        if self.layout_hash != layout.hash() {
            return Err(ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: format!(
                    "layout hash {:#010x} != declared {:#010x}",
                    self.layout_hash,
                    layout.hash()
                ),
            });
        }
        if self.data_size != layout.data_size() as u64 {
            return Err(ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: format!(
                    "data size {} != declared {}",
                    self.data_size,
                    layout.data_size()
                ),
            });
        }
        Ok(())
    }
}

/// Role this process ended up with for one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    /// This process created and zero-initialized the segment.
    Initializer,
    /// The segment already existed; attached without touching its contents.
    Attached,
}

/// Marker for `repr(C)` records that may travel through a record block.
///
/// # Safety
///
/// Implementors must be `repr(C)` with fixed-size numeric fields only, and
/// every bit pattern must be a valid value (the record is copied byte-wise
/// out of shared memory written by another process).
pub unsafe trait ShmRecord: Copy {}

unsafe impl ShmRecord for gaz::params::WorldParameters {}
unsafe impl ShmRecord for gaz::params::ModelParameters {}

/// One mapped shared memory segment: a 128-byte header followed by the
/// blocks declared in its [`SegmentLayout`].
///
/// Jointly owned by both endpoint processes; whole-block writes become
/// visible to the other side on its next read. There is no cross-process
/// write exclusion beyond the header's version counter.
pub struct SharedSegment {
    name: String,
    path: PathBuf,
    layout: SegmentLayout,
    mmap: MmapMut,
}

impl SharedSegment {
    /// Backing file path for a segment name under `dir`.
    pub fn backing_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{SHM_PREFIX}_{name}"))
    }

    /// Create the segment, zero-initialized, failing if it already exists.
    ///
    /// Exactly one racing process succeeds here; the losers receive
    /// [`ShmError::AlreadyExists`] and must attach instead, so an existing
    /// segment is never re-initialized.
    pub fn create(dir: &Path, name: &str, layout: SegmentLayout) -> ShmResult<Self> {
        let path = Self::backing_path(dir, name);
        let total_size = std::mem::size_of::<SegmentHeader>() + layout.data_size();

        let mut mmap = create_segment_mmap(&path, total_size).map_err(|e| match e {
            ShmError::AlreadyExists { .. } => ShmError::AlreadyExists {
                name: name.to_string(),
            },
            other => other,
        })?;

        // The freshly sized file reads as zeros, which is exactly the
        // initial value of every block. Only the header needs writing.
        let header = SegmentHeader::new(layout.hash(), layout.data_size(), current_pid());
        unsafe {
            std::ptr::write(mmap.as_mut_ptr() as *mut SegmentHeader, header);
        }
        fence(Ordering::Release);

        Self::write_meta_file(&path, name, &layout)?;

        tracing::info!(segment = name, size = total_size, "created shared segment");

        Ok(Self {
            name: name.to_string(),
            path,
            layout,
            mmap,
        })
    }

    /// Attach to an existing segment and validate it against `layout`.
    ///
    /// A missing backing file is [`ShmError::NotFound`] — the signal that
    /// the caller should flip into initializer role. Any other failure
    /// (permissions, size or layout disagreement) is fatal.
    pub fn attach(dir: &Path, name: &str, layout: SegmentLayout) -> ShmResult<Self> {
        let path = Self::backing_path(dir, name);
        let (mmap, file_len) = attach_segment_mmap(&path).map_err(|e| match e {
            ShmError::NotFound { .. } => ShmError::NotFound {
                name: name.to_string(),
            },
            ShmError::PermissionDenied { .. } => ShmError::PermissionDenied {
                name: name.to_string(),
            },
            other => other,
        })?;

        let expected_len = std::mem::size_of::<SegmentHeader>() + layout.data_size();
        if file_len != expected_len {
            return Err(ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: format!("backing file is {file_len} bytes, expected {expected_len}"),
            });
        }

        let segment = Self {
            name: name.to_string(),
            path,
            layout,
            mmap,
        };
        segment.header().validate(&segment.name, &segment.layout)?;

        tracing::debug!(segment = name, "attached shared segment");
        Ok(segment)
    }

    /// Attach if the segment exists, otherwise create it.
    ///
    /// Idempotent across two racing processes: exactly one becomes the
    /// [`SegmentRole::Initializer`]; the other attaches to the
    /// initializer's data without re-zeroing it.
    pub fn create_or_attach(
        dir: &Path,
        name: &str,
        layout: SegmentLayout,
    ) -> ShmResult<(Self, SegmentRole)> {
        match Self::attach(dir, name, layout.clone()) {
            Ok(segment) => Ok((segment, SegmentRole::Attached)),
            Err(ShmError::NotFound { .. }) => match Self::create(dir, name, layout.clone()) {
                Ok(segment) => Ok((segment, SegmentRole::Initializer)),
                // Lost the creation race: the winner initializes, we attach.
                Err(ShmError::AlreadyExists { .. }) => {
                    let segment = Self::attach(dir, name, layout)?;
                    Ok((segment, SegmentRole::Attached))
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Segment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared block layout
    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    /// Creator process ID recorded at initialization
    pub fn creator_pid(&self) -> u32 {
        self.header().creator_pid
    }

    /// Read a whole `f64` vector block.
    ///
    /// Returns the latest fully committed snapshot of this block. Two
    /// consecutive calls may observe different write cycles — callers
    /// needing temporal alignment cross-check the segment's `time` block.
    pub fn read_vec(&self, block: &str) -> ShmResult<Vec<f64>> {
        let (offset, spec) = self.find_block(block)?;
        let len = match spec.kind {
            BlockKind::Vector { len } => len,
            BlockKind::Record { size } => {
                return Err(ShmError::RecordSizeMismatch {
                    block: block.to_string(),
                    expected: size,
                    actual: 0,
                });
            }
        };

        let mut out = vec![0.0f64; len];
        let byte_len = len * std::mem::size_of::<f64>();
        // f64 has no invalid bit patterns, so a byte-wise copy into the
        // vector's storage is sound.
        let dst =
            unsafe { std::slice::from_raw_parts_mut(out.as_mut_ptr() as *mut u8, byte_len) };
        self.read_block_bytes(offset, dst)?;
        Ok(out)
    }

    /// Replace the full contents of one `f64` vector block.
    ///
    /// Partial writes are not part of the contract; `data` must match the
    /// declared element count exactly or nothing is written.
    pub fn write_vec(&mut self, block: &str, data: &[f64]) -> ShmResult<()> {
        let (offset, spec) = self.find_block(block)?;
        let len = match spec.kind {
            BlockKind::Vector { len } => len,
            BlockKind::Record { size } => {
                return Err(ShmError::RecordSizeMismatch {
                    block: block.to_string(),
                    expected: size,
                    actual: data.len() * std::mem::size_of::<f64>(),
                });
            }
        };
        if data.len() != len {
            return Err(ShmError::ShapeMismatch {
                block: block.to_string(),
                expected: len,
                actual: data.len(),
            });
        }

        let byte_len = len * std::mem::size_of::<f64>();
        let src = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, byte_len) };
        self.write_block_bytes(offset, src);
        Ok(())
    }

    /// Read a record block as `T`.
    pub fn read_record<T: ShmRecord>(&self, block: &str) -> ShmResult<T> {
        let (offset, spec) = self.find_block(block)?;
        let size = std::mem::size_of::<T>();
        if spec.byte_len() != size {
            return Err(ShmError::RecordSizeMismatch {
                block: block.to_string(),
                expected: spec.byte_len(),
                actual: size,
            });
        }

        let mut value = std::mem::MaybeUninit::<T>::uninit();
        let dst =
            unsafe { std::slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, size) };
        self.read_block_bytes(offset, dst)?;
        // Fully overwritten above; every bit pattern is valid per ShmRecord.
        Ok(unsafe { value.assume_init() })
    }

    /// Replace a record block with `value`.
    pub fn write_record<T: ShmRecord>(&mut self, block: &str, value: &T) -> ShmResult<()> {
        let (offset, spec) = self.find_block(block)?;
        let size = std::mem::size_of::<T>();
        if spec.byte_len() != size {
            return Err(ShmError::RecordSizeMismatch {
                block: block.to_string(),
                expected: spec.byte_len(),
                actual: size,
            });
        }

        let src =
            unsafe { std::slice::from_raw_parts(value as *const T as *const u8, size) };
        self.write_block_bytes(offset, src);
        Ok(())
    }

    fn find_block(&self, block: &str) -> ShmResult<(usize, &BlockSpec)> {
        self.layout
            .find(block)
            .ok_or_else(|| ShmError::UnknownBlock {
                segment: self.name.clone(),
                block: block.to_string(),
            })
    }

    fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.mmap.as_ptr() as *const SegmentHeader) }
    }

    fn data_ptr(&self) -> *const u8 {
        unsafe { self.mmap.as_ptr().add(std::mem::size_of::<SegmentHeader>()) }
    }

    /// Copy `src` into the data section under the odd/even write protocol.
    fn write_block_bytes(&mut self, offset: usize, src: &[u8]) {
        if src.is_empty() {
            return;
        }

        let header_ptr = self.header() as *const SegmentHeader;
        let dst = unsafe {
            self.mmap
                .as_mut_ptr()
                .add(std::mem::size_of::<SegmentHeader>() + offset)
        };

        // A counter left odd by a writer that died mid-write is re-evened
        // here before the cycle starts.
        let version = unsafe { (*header_ptr).version.load(Ordering::Acquire) } & !1;

        // Begin write operation (odd version)
        unsafe {
            (*header_ptr).version.store(version + 1, Ordering::Release);
        }
        fence(Ordering::Release);

        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
        }

        fence(Ordering::Release);

        // Complete write operation (even version)
        unsafe {
            (*header_ptr).version.store(version + 2, Ordering::Release);
        }
    }

    /// Copy one block out of the data section, retrying torn reads.
    fn read_block_bytes(&self, offset: usize, dst: &mut [u8]) -> ShmResult<()> {
        if dst.is_empty() {
            return Ok(());
        }

        let header = self.header();

        for _attempt in 0..MAX_READ_RETRIES {
            let version_before = header.version.load(Ordering::Acquire);

            // Skip if write is in progress (odd version)
            if version_before % 2 == 1 {
                std::thread::yield_now();
                continue;
            }

            fence(Ordering::Acquire);

            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.data_ptr().add(offset),
                    dst.as_mut_ptr(),
                    dst.len(),
                );
            }

            fence(Ordering::Acquire);

            let version_after = header.version.load(Ordering::Acquire);
            if version_before == version_after {
                return Ok(());
            }

            // Version changed during read - retry
            std::thread::yield_now();
        }

        Err(ShmError::ReadContention {
            name: self.name.clone(),
        })
    }

    /// Create JSON metadata sidecar for discovery.
    fn write_meta_file(path: &Path, name: &str, layout: &SegmentLayout) -> ShmResult<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        let meta = SegmentMeta {
            name: name.to_string(),
            data_size: layout.data_size(),
            creator_pid: current_pid(),
            created_ts_ns: now,
            blocks: layout
                .blocks()
                .iter()
                .map(|b| BlockMeta {
                    name: b.name.to_string(),
                    bytes: b.byte_len(),
                })
                .collect(),
        };

        let meta_path = path.with_extension("meta");
        let json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(&meta_path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BlockSpec;
    use gaz::params::{ModelParameters, WorldParameters};
    use tempfile::tempdir;

    fn joint_layout(num_joints: usize) -> SegmentLayout {
        SegmentLayout::new(vec![
            BlockSpec::vector("time", 1),
            BlockSpec::vector("position", num_joints),
            BlockSpec::vector("velocity", num_joints),
            BlockSpec::vector("force", num_joints),
        ])
    }

    #[test]
    fn header_is_128_bytes_cache_aligned() {
        assert_eq!(std::mem::size_of::<SegmentHeader>(), 128);
        assert_eq!(std::mem::align_of::<SegmentHeader>(), 64);
    }

    #[test]
    fn create_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let mut seg = SharedSegment::create(dir.path(), "bear_states", joint_layout(4)).unwrap();

        let position = [0.1, -0.2, 0.3, -0.4];
        seg.write_vec("position", &position).unwrap();
        seg.write_vec("time", &[1.25]).unwrap();

        assert_eq!(seg.read_vec("position").unwrap(), position);
        assert_eq!(seg.read_vec("time").unwrap(), [1.25]);
        // Untouched blocks read as zeros.
        assert_eq!(seg.read_vec("velocity").unwrap(), [0.0; 4]);
    }

    #[test]
    fn attacher_sees_creator_data_without_rezeroing() {
        let dir = tempdir().unwrap();
        let mut creator =
            SharedSegment::create(dir.path(), "bear_states", joint_layout(2)).unwrap();
        creator.write_vec("force", &[5.0, -5.0]).unwrap();

        let (attached, role) =
            SharedSegment::create_or_attach(dir.path(), "bear_states", joint_layout(2)).unwrap();
        assert_eq!(role, SegmentRole::Attached);
        assert_eq!(attached.read_vec("force").unwrap(), [5.0, -5.0]);
    }

    #[test]
    fn create_or_attach_initializes_when_absent() {
        let dir = tempdir().unwrap();
        let (seg, role) =
            SharedSegment::create_or_attach(dir.path(), "bear_states", joint_layout(2)).unwrap();
        assert_eq!(role, SegmentRole::Initializer);
        assert_eq!(seg.read_vec("position").unwrap(), [0.0, 0.0]);
    }

    #[test]
    fn writes_visible_through_other_mapping() {
        let dir = tempdir().unwrap();
        let mut writer =
            SharedSegment::create(dir.path(), "bear_comms", joint_layout(3)).unwrap();
        let reader = SharedSegment::attach(dir.path(), "bear_comms", joint_layout(3)).unwrap();

        writer.write_vec("position", &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(reader.read_vec("position").unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn shape_mismatch_rejected_before_write() {
        let dir = tempdir().unwrap();
        let mut seg = SharedSegment::create(dir.path(), "bear_states", joint_layout(4)).unwrap();
        seg.write_vec("position", &[9.0, 9.0, 9.0, 9.0]).unwrap();

        let result = seg.write_vec("position", &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(ShmError::ShapeMismatch {
                expected: 4,
                actual: 2,
                ..
            })
        ));
        // Failed write left the block untouched.
        assert_eq!(seg.read_vec("position").unwrap(), [9.0; 4]);
    }

    #[test]
    fn unknown_block_rejected() {
        let dir = tempdir().unwrap();
        let seg = SharedSegment::create(dir.path(), "bear_states", joint_layout(4)).unwrap();
        assert!(matches!(
            seg.read_vec("torque"),
            Err(ShmError::UnknownBlock { .. })
        ));
    }

    #[test]
    fn record_roundtrip() {
        let dir = tempdir().unwrap();
        let layout = SegmentLayout::new(vec![BlockSpec::record::<WorldParameters>("data")]);
        let mut seg = SharedSegment::create(dir.path(), "world_params", layout).unwrap();

        let params = WorldParameters {
            step_size: 0.001,
            real_time_update_rate: 1000.0,
        };
        seg.write_record("data", &params).unwrap();
        assert_eq!(seg.read_record::<WorldParameters>("data").unwrap(), params);
    }

    #[test]
    fn record_size_checked() {
        let dir = tempdir().unwrap();
        let layout = SegmentLayout::new(vec![BlockSpec::vector("data", 1)]);
        let mut seg = SharedSegment::create(dir.path(), "small", layout).unwrap();

        let params = ModelParameters::default();
        assert!(matches!(
            seg.write_record("data", &params),
            Err(ShmError::RecordSizeMismatch { .. })
        ));
    }

    #[test]
    fn attach_with_different_layout_rejected() {
        let dir = tempdir().unwrap();
        let _seg = SharedSegment::create(dir.path(), "bear_states", joint_layout(4)).unwrap();

        let result = SharedSegment::attach(dir.path(), "bear_states", joint_layout(6));
        assert!(matches!(result, Err(ShmError::LayoutMismatch { .. })));
    }

    #[test]
    fn attach_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let result = SharedSegment::attach(dir.path(), "nothing_here", joint_layout(1));
        assert!(matches!(result, Err(ShmError::NotFound { .. })));
    }

    #[test]
    fn zero_length_block_reads_empty() {
        let dir = tempdir().unwrap();
        let layout = SegmentLayout::new(vec![BlockSpec::vector("on", 0)]);
        let mut seg = SharedSegment::create(dir.path(), "contacts", layout).unwrap();

        assert!(seg.read_vec("on").unwrap().is_empty());
        seg.write_vec("on", &[]).unwrap();
    }

    #[test]
    fn meta_sidecar_written() {
        let dir = tempdir().unwrap();
        let seg = SharedSegment::create(dir.path(), "bear_states", joint_layout(2)).unwrap();
        let meta_path = seg.path().with_extension("meta");
        assert!(meta_path.exists());

        let meta: SegmentMeta =
            serde_json::from_str(&std::fs::read_to_string(meta_path).unwrap()).unwrap();
        assert_eq!(meta.name, "bear_states");
        assert_eq!(meta.creator_pid, current_pid());
        assert_eq!(meta.blocks.len(), 4);
    }
}
