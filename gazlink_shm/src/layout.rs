//! Declarative block layout for shared memory segments.
//!
//! A segment's contents are an ordered set of named blocks, each with a
//! fixed shape declared once at construction. All vector blocks are `f64`;
//! the two parameter segments carry a single `repr(C)` record block. Shapes
//! never change for the lifetime of a segment — there is no reshape
//! operation.
//!
//! The layout hash travels in the segment header so that an attaching
//! process refuses to connect to a segment whose declared shapes disagree
//! with its own.

/// Shape of one block within a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Fixed-length vector of `f64` elements.
    Vector {
        /// Element count.
        len: usize,
    },
    /// Raw `repr(C)` record of fixed byte size.
    Record {
        /// Record size in bytes.
        size: usize,
    },
}

/// Declaration of one named block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Block name, unique within its segment.
    pub name: &'static str,
    /// Fixed shape.
    pub kind: BlockKind,
}

impl BlockSpec {
    /// Declare an `f64` vector block of `len` elements.
    pub const fn vector(name: &'static str, len: usize) -> Self {
        Self {
            name,
            kind: BlockKind::Vector { len },
        }
    }

    /// Declare a record block sized for `T`.
    pub const fn record<T>(name: &'static str) -> Self {
        Self {
            name,
            kind: BlockKind::Record {
                size: core::mem::size_of::<T>(),
            },
        }
    }

    /// Byte length of this block in the mapped segment.
    pub const fn byte_len(&self) -> usize {
        match self.kind {
            BlockKind::Vector { len } => len * core::mem::size_of::<f64>(),
            BlockKind::Record { size } => size,
        }
    }
}

/// Ordered, immutable set of block declarations for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLayout {
    blocks: Vec<BlockSpec>,
}

impl SegmentLayout {
    /// Build a layout from ordered block declarations.
    ///
    /// # Panics
    ///
    /// Panics on duplicate block names — the catalog is static, so a
    /// duplicate is a programming error, not a runtime condition.
    pub fn new(blocks: impl Into<Vec<BlockSpec>>) -> Self {
        let blocks = blocks.into();
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[..i] {
                assert_ne!(a.name, b.name, "duplicate block name '{}'", a.name);
            }
        }
        Self { blocks }
    }

    /// Declared blocks in order.
    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    /// Total data size in bytes.
    ///
    /// Every block length is a multiple of 8, so sequential packing keeps
    /// all blocks naturally aligned for `f64` access.
    pub fn data_size(&self) -> usize {
        self.blocks.iter().map(BlockSpec::byte_len).sum()
    }

    /// Byte offset and declaration of a named block.
    pub fn find(&self, name: &str) -> Option<(usize, &BlockSpec)> {
        let mut offset = 0;
        for block in &self.blocks {
            if block.name == name {
                return Some((offset, block));
            }
            offset += block.byte_len();
        }
        None
    }

    /// FNV-1a style hash over block names and shapes.
    ///
    /// Carried in the segment header; an attaching process with a different
    /// declaration set refuses to connect. Does not detect semantic changes
    /// that keep names and sizes identical.
    pub fn hash(&self) -> u32 {
        let mut h: u32 = 0x811C_9DC5;
        let mut mix = |byte: u8| {
            h ^= byte as u32;
            h = h.wrapping_mul(0x0100_0193);
        };
        for block in &self.blocks {
            for &b in block.name.as_bytes() {
                mix(b);
            }
            mix(0);
            for b in (block.byte_len() as u64).to_le_bytes() {
                mix(b);
            }
        }
        h
    }
}
