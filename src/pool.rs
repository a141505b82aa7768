//! Reusable scratch buffers for encoding.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Buffers that grew past this many bytes are dropped instead of pooled.
const MAX_RETAINED_CAPACITY: usize = 1 << 20;

/// Pool of byte buffers owned by one instance.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_pooled: usize,
}

impl BufferPool {
    /// Create a pool that keeps at most `max_pooled` idle buffers.
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_pooled)),
            max_pooled,
        }
    }

    /// Take an empty buffer; it returns to the pool when the guard drops.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let mut buf = self.free.lock().pop().unwrap_or_default();
        buf.clear();
        PooledBuffer { pool: self, buf }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, buf: Vec<u8>) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(buf);
        }
    }
}

/// Scoped handle to a pooled buffer.
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
