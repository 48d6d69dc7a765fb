//! Build-time constants shared across the storage engine.

/// Size in bytes of every on-disk page. No structure straddles this boundary.
pub const PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity, in frames.
pub const DEFAULT_NUM_PAGES: usize = 50;

/// Width in bytes of an `INT` field.
pub const INT_SIZE: usize = 4;

/// Width in bytes of a `DOUBLE` field.
pub const DOUBLE_SIZE: usize = 8;

/// Width in bytes of a `CHAR` field (a null-padded string prefix).
pub const CHAR_SIZE: usize = 64;

/// Width in bytes of an on-disk page/child reference. Chosen as `u32` so the
/// file format does not depend on the host's word size.
pub const CHILD_REF_SIZE: usize = 4;
