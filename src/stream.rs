//! Producer/consumer stream buffers
//!
//! Fixed capacity, blocking-with-timeout producer and consumer sides,
//! no allocation after construction.
//!
//! Two flavors exist because the two halves of the subsystem move
//! different atoms:
//!
//! - [`ByteStream`] carries packet bytes between API callers and the TxRx
//!   worker. Writes are all-or-nothing; packet boundaries are the
//!   caller's business, the stream never splits a write.
//! - [`PulseStream`] carries [`LevelDuration`] units from the file
//!   encoder to the radio's TX feeder. The consumer side is strictly
//!   non-blocking (it runs at modulation rate) and reports producer lag
//!   with the [`LevelDuration::Wait`] sentinel instead of stalling.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::types::LevelDuration;

/// Fixed-capacity byte ring with blocking-with-timeout semantics
pub struct ByteStream {
    inner: Mutex<ByteRing>,
    readable: Condvar,
    writable: Condvar,
}

struct ByteRing {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl ByteRing {
    fn free(&self) -> usize {
        self.buf.len() - self.len
    }

    fn push_all(&mut self, data: &[u8]) {
        let cap = self.buf.len();
        for &byte in data {
            self.buf[(self.head + self.len) % cap] = byte;
            self.len += 1;
        }
    }

    fn pop_into(&mut self, out: &mut [u8]) -> usize {
        let cap = self.buf.len();
        let n = out.len().min(self.len);
        for slot in out.iter_mut().take(n) {
            *slot = self.buf[self.head];
            self.head = (self.head + 1) % cap;
            self.len -= 1;
        }
        n
    }
}

impl ByteStream {
    /// Create a stream holding up to `capacity` bytes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ByteRing {
                buf: vec![0; capacity].into_boxed_slice(),
                head: 0,
                len: 0,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ByteRing> {
        // Poisoning means a worker panicked mid-operation: a firmware
        // defect, fatal by the error taxonomy.
        self.inner.lock().expect("byte stream mutex poisoned")
    }

    /// Bytes currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len
    }

    /// Whether the stream holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can be written without waiting
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.lock().free()
    }

    /// Enqueue `data` whole, waiting up to `timeout` for space
    ///
    /// All-or-nothing: returns `false` without writing anything when the
    /// space never materializes (or `data` exceeds the capacity outright).
    pub fn write(&self, data: &[u8], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut ring = self.lock();
        if data.len() > ring.buf.len() {
            return false;
        }
        while ring.free() < data.len() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .writable
                .wait_timeout(ring, deadline - now)
                .expect("byte stream mutex poisoned");
            ring = guard;
        }
        ring.push_all(data);
        self.readable.notify_all();
        true
    }

    /// Dequeue up to `out.len()` bytes, waiting up to `timeout` for the
    /// first byte
    ///
    /// Returns the number of bytes copied; `0` after a timeout. Never
    /// waits once at least one byte is available.
    pub fn read(&self, out: &mut [u8], timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ring = self.lock();
        while ring.len == 0 {
            let now = Instant::now();
            if now >= deadline {
                return 0;
            }
            let (guard, _) = self
                .readable
                .wait_timeout(ring, deadline - now)
                .expect("byte stream mutex poisoned");
            ring = guard;
        }
        let n = ring.pop_into(out);
        self.writable.notify_all();
        n
    }

    /// Drop all buffered bytes
    pub fn clear(&self) {
        self.lock().len = 0;
        self.writable.notify_all();
    }
}

/// Fixed-capacity [`LevelDuration`] ring, counted in units
///
/// The producer refills in batches behind a low-water check
/// ([`PulseStream::wait_for_space`]); the consumer pops without ever
/// blocking.
pub struct PulseStream {
    inner: Mutex<VecDeque<LevelDuration>>,
    space: Condvar,
    capacity: usize,
}

impl PulseStream {
    /// Create a stream holding up to `capacity` units
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            space: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LevelDuration>> {
        self.inner.lock().expect("pulse stream mutex poisoned")
    }

    /// Units currently buffered
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the stream holds no units
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Units that can be pushed without dropping
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.capacity - self.lock().len()
    }

    /// Append one unit; `false` when the stream is full
    pub fn push(&self, value: LevelDuration) -> bool {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(value);
        true
    }

    /// Block until at least `units` of free space exist, up to `timeout`
    ///
    /// Returns `true` when the space is available.
    pub fn wait_for_space(&self, units: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();
        while self.capacity - queue.len() < units {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .space
                .wait_timeout(queue, deadline - now)
                .expect("pulse stream mutex poisoned");
            queue = guard;
        }
        true
    }

    /// Pop the next unit without blocking
    ///
    /// Returns [`LevelDuration::Wait`] when the producer has fallen
    /// behind; the caller is expected to hold its previous level rather
    /// than stall the carrier.
    pub fn pop(&self) -> LevelDuration {
        let mut queue = self.lock();
        match queue.pop_front() {
            Some(value) => {
                self.space.notify_all();
                value
            }
            None => LevelDuration::Wait,
        }
    }

    /// Drop all buffered units
    pub fn clear(&self) {
        self.lock().clear();
        self.space.notify_all();
    }
}
