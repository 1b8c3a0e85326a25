use std::ops::{Deref, DerefMut};

/// Recycles byte buffers for packet staging so the hot path stops paying
/// for an allocation per packet.
///
/// Buffers are handed out cleared with at least the requested capacity and
/// must be given back through [`BufferPool::return_buffer`]; the next
/// borrower may receive the same allocation immediately, so anything
/// long-lived has to be copied into an exactly-sized allocation before the
/// return. The pool is owned by a single thread, same as the bus.
pub struct BufferPool {
    available: Vec<Vec<u8>>,
    borrowed_count: usize,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            available: Vec::new(),
            borrowed_count: 0,
        }
    }

    /// Hands out a cleared buffer with capacity of at least `min_size`,
    /// reusing a previously returned allocation when one is big enough.
    pub fn borrow_buffer(&mut self, min_size: usize) -> PooledBuffer {
        self.borrowed_count += 1;
        let reusable = self
            .available
            .iter()
            .position(|bytes| bytes.capacity() >= min_size);
        let mut bytes = match reusable {
            Some(index) => self.available.swap_remove(index),
            None => Vec::with_capacity(min_size),
        };
        bytes.clear();
        PooledBuffer { bytes }
    }

    /// Takes a buffer back for reuse. Its contents belong to the next
    /// borrower from here on.
    pub fn return_buffer(&mut self, buffer: PooledBuffer) {
        self.borrowed_count = self.borrowed_count.saturating_sub(1);
        self.available.push(buffer.bytes);
    }

    /// Number of buffers currently out on loan. A buffer that was dropped
    /// instead of returned stays counted; its allocation is gone and the
    /// pool will never see it again.
    pub fn borrowed_count(&self) -> usize {
        self.borrowed_count
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer on loan from a [`BufferPool`]. Dereferences to the underlying
/// `Vec<u8>`; hand it back with [`BufferPool::return_buffer`] when done.
pub struct PooledBuffer {
    bytes: Vec<u8>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.bytes
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}
