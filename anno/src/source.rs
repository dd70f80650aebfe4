//! Types related to source files.

use std::fmt;
use std::ops::Range;

/// File id, indexing into the driver's file database.
pub type FileId = usize;

/// Byte offsets into source files.
pub type BytePos = usize;

/// Byte ranges in source files.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ByteRange {
    file_id: FileId,
    start: BytePos,
    end: BytePos,
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteRange({}, {}..{})", self.file_id, self.start, self.end)
    }
}

impl ByteRange {
    pub const fn new(file_id: FileId, start: BytePos, end: BytePos) -> ByteRange {
        ByteRange {
            file_id,
            start,
            end,
        }
    }

    pub const fn file_id(&self) -> FileId {
        self.file_id
    }

    pub const fn start(&self) -> BytePos {
        self.start
    }

    pub const fn end(&self) -> BytePos {
        self.end
    }

    pub fn merge(&self, other: &ByteRange) -> ByteRange {
        debug_assert_eq!(self.file_id, other.file_id);
        ByteRange::new(
            self.file_id,
            self.start.min(other.start),
            self.end.max(other.end),
        )
    }
}

impl From<ByteRange> for Range<usize> {
    fn from(range: ByteRange) -> Range<usize> {
        range.start..range.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_commutative() {
        let a = ByteRange::new(1, 2, 5);
        let b = ByteRange::new(1, 4, 9);
        assert_eq!(a.merge(&b), b.merge(&a));
        assert_eq!(a.merge(&b), ByteRange::new(1, 2, 9));
    }
}
