//! Shared, reference-counted, immutable-once-shared byte buffers.
//!
//! Mirrors the `AVBufferRef` ownership model in the original C framework:
//! many units may reference overlapping ranges of the same buffer, and the
//! bytes live until the last reference drops. `Arc<[u8]>` is the idiomatic
//! Rust stand-in.

use std::ops::Range;
use std::sync::Arc;

pub type Buffer = Arc<[u8]>;

pub fn buffer_from_vec(data: Vec<u8>) -> Buffer {
    Arc::from(data)
}

pub fn buffer_from_slice(data: &[u8]) -> Buffer {
    Arc::from(data)
}

/// A view into a shared buffer: an offset/length range plus the buffer that
/// owns the bytes. This is what a unit's `data` field actually is.
#[derive(Debug, Clone)]
pub struct BufferView {
    buffer: Buffer,
    range: Range<usize>,
    /// Number of bits to ignore in the final byte, for non-byte-aligned
    /// trailers (MPEG-2 slice data, AV1 padding OBUs with an odd bit count).
    bit_padding: usize,
}

impl BufferView {
    pub fn new(buffer: Buffer, range: Range<usize>) -> Self {
        debug_assert!(range.end <= buffer.len());
        Self {
            buffer,
            range,
            bit_padding: 0,
        }
    }

    pub fn with_bit_padding(mut self, bit_padding: usize) -> Self {
        self.bit_padding = bit_padding;
        self
    }

    pub fn whole(buffer: Buffer) -> Self {
        let len = buffer.len();
        Self::new(buffer, 0..len)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn bit_padding(&self) -> usize {
        self.bit_padding
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_slices_into_shared_buffer() {
        let buf = buffer_from_vec(vec![1, 2, 3, 4, 5]);
        let view = BufferView::new(buf.clone(), 1..3);
        assert_eq!(view.as_slice(), &[2, 3]);
        assert_eq!(Arc::strong_count(&buf), 2);
    }

    #[test]
    fn clone_bumps_refcount_not_bytes() {
        let buf = buffer_from_vec(vec![0u8; 16]);
        let view_a = BufferView::whole(buf.clone());
        let view_b = view_a.clone();
        assert_eq!(Arc::strong_count(&buf), 3);
        assert_eq!(view_a.as_slice(), view_b.as_slice());
    }
}
