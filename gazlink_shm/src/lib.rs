//! # Gazlink Shared Memory Transport
//!
//! Lock-free, single-writer multi-reader shared memory segments for the
//! gazlink simulator bridge. Each segment is a named file in `/dev/shm`
//! holding a 128-byte header and an ordered set of fixed-shape numeric
//! blocks, mapped read/write by both endpoint processes.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐      ┌──────────────────────┐      ┌─────────────────┐
//! │ Control process │      │  /dev/shm/gaz_<ns>_* │      │    Simulator    │
//! │                 │◄────►│                      │◄────►│                 │
//! │  SharedSegment  │      │ [Header|Blocks.....] │      │  (C++ plugin)   │
//! │                 │      │  version counter     │      │                 │
//! └─────────────────┘      └──────────────────────┘      └─────────────────┘
//! ```
//!
//! ## Consistency model
//!
//! - Every whole-block read is internally consistent: the header's odd/even
//!   version counter detects torn reads and the reader retries.
//! - No atomicity across blocks: a caller may observe `position` from cycle
//!   N and `velocity` from cycle N+1. Callers needing temporal alignment
//!   cross-check the segment's `time` block.
//! - Writes are whole-block replacements; partial writes are not offered.
//!
//! ## Lifecycle
//!
//! `create` is exclusive: exactly one of two racing processes becomes the
//! initializer and zero-populates the segment; the other attaches and never
//! re-initializes. Segments deliberately outlive their creator — removal of
//! the backing file is an external concern.
//!
//! ## Usage
//!
//! ```rust
//! use gazlink_shm::{BlockSpec, SegmentLayout, SharedSegment};
//! # fn main() -> Result<(), gazlink_shm::ShmError> {
//! # let dir = tempfile::tempdir().unwrap();
//! let layout = SegmentLayout::new(vec![
//!     BlockSpec::vector("time", 1),
//!     BlockSpec::vector("position", 10),
//! ]);
//! let (mut segment, _role) =
//!     SharedSegment::create_or_attach(dir.path(), "bear_joint_states", layout)?;
//!
//! segment.write_vec("time", &[0.001])?;
//! let position = segment.read_vec("position")?;
//! assert_eq!(position.len(), 10);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod discovery;
pub mod error;
pub mod layout;
pub mod platform;
pub mod segment;

pub use discovery::{BlockMeta, SegmentInfo, SegmentMeta, find_segment, list_segments};
pub use error::{ShmError, ShmResult};
pub use layout::{BlockKind, BlockSpec, SegmentLayout};
pub use segment::{GAZ_SHM_MAGIC, SegmentHeader, SegmentRole, SharedSegment, ShmRecord};
