use crate::error::{FrameError, Result};

/// Fixed-capacity circular byte store.
///
/// Writes never overwrite unread data: when the buffer is full the incoming
/// byte is refused and the caller decides how to report it. Storage is
/// allocated once, so sustained overflow costs data, never memory.
pub struct RingBuffer {
    data: Box<[u8]>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Append one byte, or refuse it when full.
    pub fn write(&mut self, byte: u8) -> Result<()> {
        if self.is_full() {
            return Err(FrameError::BufferFull {
                capacity: self.capacity(),
            });
        }
        let tail = (self.head + self.len) % self.capacity();
        self.data[tail] = byte;
        self.len += 1;
        Ok(())
    }

    /// Peek at the byte `offset` positions from the front.
    pub fn read_at(&self, offset: usize) -> Option<u8> {
        if offset >= self.len {
            return None;
        }
        Some(self.data[(self.head + offset) % self.capacity()])
    }

    /// Discard up to `count` bytes from the front.
    pub fn delete_front(&mut self, count: usize) {
        let count = count.min(self.len);
        if count == 0 {
            return;
        }
        self.head = (self.head + count) % self.capacity();
        self.len -= count;
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Maximum number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}
