pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

pub const FALSE: u8 = 0xf4;
pub const TRUE: u8 = 0xf5;
pub const NULL: u8 = 0xf6;
pub const FLOAT16: u8 = 0xf9;
pub const FLOAT32: u8 = 0xfa;
pub const FLOAT64: u8 = 0xfb;

/// Additional-info value marking an indefinite-length item.
pub const INDEFINITE: u8 = 31;

/// Private-use tag wrapping a blob reference map.
pub const BLOB_TAG: u64 = 0xb10b;

/// Nesting limit applied by [`crate::validate`] when callers have no opinion.
pub const DEFAULT_MAX_DEPTH: usize = 64;
