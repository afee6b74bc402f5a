// SPDX-License-Identifier: LGPL-3.0-or-later

//! Lock-free single-producer/single-consumer ring buffer.
//!
//! A fixed-capacity circular store of fixed-size elements, safe for exactly
//! one writer thread and one reader thread concurrently with no further
//! synchronization. The buffer is split at creation into a [`Producer`] and
//! a [`Consumer`] half, so the one-writer/one-reader protocol is enforced by
//! ownership rather than by convention.
//!
//! Capacity is always a power of two, enabling bitmask indexing. The read
//! and write cursors increase monotonically and are masked only when
//! indexing the backing store; their wrapping difference is the exact
//! occupied element count, so a completely full buffer stays distinguishable
//! from an empty one even when writes are allowed to use every slot.
//!
//! Both copying ([`Producer::write`], [`Consumer::read`], [`Consumer::peek`])
//! and zero-copy vectored ([`Producer::write_vector`],
//! [`Consumer::read_vector`]) access paths are provided. No operation blocks
//! or allocates; copying transfers return the element count actually moved.
//!
//! # Examples
//! ```
//! use engine_units::transport::ring_buffer::RingBuffer;
//!
//! let (mut producer, mut consumer) = RingBuffer::<f32>::create(256, true).unwrap();
//! assert_eq!(producer.write(&[1.0, 2.0, 3.0]), 3);
//!
//! let mut out = [0.0f32; 3];
//! assert_eq!(consumer.read(&mut out), 3);
//! assert_eq!(out, [1.0, 2.0, 3.0]);
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use thiserror::Error;

/// Error returned when a ring buffer cannot be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreateError {
    /// The requested element count cannot be rounded up to a power of two,
    /// or the backing store would exceed the addressable byte range.
    #[error("ring buffer of {requested} elements exceeds the addressable size")]
    TooLarge {
        /// The element count passed to [`RingBuffer::create`].
        requested: usize,
    },
}

/// Shared core of a single-producer/single-consumer ring buffer.
///
/// Created with [`RingBuffer::create`], which returns the two halves; the
/// core itself is never handed out directly. The cursors are cache-line
/// padded so the producer and consumer cores do not false-share, and padded
/// against the immutable configuration fields that both sides read.
pub struct RingBuffer<T> {
    /// Monotonic write cursor. Written only by the producer.
    write_ptr: CachePadded<AtomicUsize>,
    /// Monotonic read cursor. Written only by the consumer.
    read_ptr: CachePadded<AtomicUsize>,

    /// Usable element count: `capacity - 1` when writes are limited,
    /// `capacity` otherwise.
    write_size: usize,
    /// Bitmask for indexing (`capacity - 1`).
    mask: usize,
    /// Backing store, `capacity` elements.
    buffer: Box<[UnsafeCell<T>]>,
}

// Safety: the element cells are only ever accessed from one side at a time.
// The producer touches slots in `[write, write + writeSpace)` and publishes
// them with a release store; the consumer touches slots in
// `[read, read + readSpace)` after an acquire load. The two ranges are
// disjoint by construction.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer holding at least `min_elements` elements.
    ///
    /// The capacity is rounded up to the next power of two strictly greater
    /// than `min_elements`, even if it is already a power of two, so the
    /// requested amount is always writable. When `limit_writes` is true one
    /// slot is reserved and the usable write size is `capacity - 1`;
    /// otherwise every slot may be filled.
    ///
    /// All elements start zeroed (`T::default()`).
    ///
    /// # Arguments
    /// * `min_elements` - Minimum number of elements the buffer must hold
    /// * `limit_writes` - Reserve one slot instead of permitting full use
    ///
    /// # Errors
    /// [`CreateError::TooLarge`] when the rounded capacity or the byte size
    /// of the backing store would overflow.
    pub fn create(
        min_elements: usize,
        limit_writes: bool,
    ) -> Result<(Producer<T>, Consumer<T>), CreateError> {
        let too_large = CreateError::TooLarge {
            requested: min_elements,
        };
        let capacity = min_elements
            .checked_add(1)
            .and_then(usize::checked_next_power_of_two)
            .ok_or(too_large)?;
        capacity
            .checked_mul(mem::size_of::<T>())
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or(too_large)?;

        let buffer: Box<[UnsafeCell<T>]> =
            (0..capacity).map(|_| UnsafeCell::new(T::default())).collect();
        let shared = Arc::new(RingBuffer {
            write_ptr: CachePadded::new(AtomicUsize::new(0)),
            read_ptr: CachePadded::new(AtomicUsize::new(0)),
            write_size: if limit_writes { capacity - 1 } else { capacity },
            mask: capacity - 1,
            buffer,
        });

        Ok((
            Producer {
                shared: Arc::clone(&shared),
            },
            Consumer { shared },
        ))
    }
}

impl<T> RingBuffer<T> {
    /// Reset both cursors to zero.
    ///
    /// Taking both halves by `&mut` proves no concurrent reader or writer is
    /// active, which the cursor stores rely on.
    ///
    /// # Panics
    /// Panics when the two halves do not belong to the same buffer.
    pub fn reset(producer: &mut Producer<T>, consumer: &mut Consumer<T>) {
        assert!(
            Arc::ptr_eq(&producer.shared, &consumer.shared),
            "reset requires both halves of the same ring buffer"
        );
        // Quiescence is guaranteed by the exclusive borrows.
        producer.shared.write_ptr.store(0, Ordering::Relaxed);
        producer.shared.read_ptr.store(0, Ordering::Relaxed);
    }

    /// Allocated capacity in elements (always a power of two).
    fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Occupied element count, observable from either thread.
    fn read_space(&self) -> usize {
        let w = self.write_ptr.load(Ordering::Acquire);
        let r = self.read_ptr.load(Ordering::Acquire);
        w.wrapping_sub(r)
    }

    /// Pointer to the first element of the backing store.
    ///
    /// `UnsafeCell<T>` has the layout of `T`, so the cell slice doubles as a
    /// plain element array once the access protocol is upheld.
    fn base_ptr(&self) -> *mut T {
        self.buffer.as_ptr() as *mut T
    }
}

/// Writing half of a [`RingBuffer`]. Exactly one exists per buffer.
///
/// `Producer` is `Send` but not `Clone`: it may be moved to the producing
/// thread, and all mutating operations take `&mut self`, ruling out
/// concurrent or reentrant writes.
pub struct Producer<T> {
    shared: Arc<RingBuffer<T>>,
}

impl<T: Copy + Default> Producer<T> {
    /// Allocated capacity in elements (always a power of two).
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Usable element count per the `limit_writes` policy.
    pub fn write_size(&self) -> usize {
        self.shared.write_size
    }

    /// Number of elements currently available for reading.
    pub fn read_space(&self) -> usize {
        self.shared.read_space()
    }

    /// Number of elements currently available for writing.
    pub fn write_space(&self) -> usize {
        self.shared.write_size - self.shared.read_space()
    }

    /// Copy up to `src.len()` elements into the buffer.
    ///
    /// Bounded by the available write space; never blocks.
    ///
    /// # Returns
    /// The number of elements actually written.
    pub fn write(&mut self, src: &[T]) -> usize {
        let shared = &*self.shared;
        let w = shared.write_ptr.load(Ordering::Relaxed);
        let r = shared.read_ptr.load(Ordering::Acquire);
        let free = shared.write_size - w.wrapping_sub(r);

        let count = src.len().min(free);
        if count == 0 {
            return 0;
        }

        let idx = w & shared.mask;
        let first = count.min(shared.capacity() - idx);
        // Safety: `[idx, idx + count)` (mod capacity) lies in the writable
        // region, which the consumer does not touch until the release store
        // below publishes it.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), shared.base_ptr().add(idx), first);
            ptr::copy_nonoverlapping(src.as_ptr().add(first), shared.base_ptr(), count - first);
        }
        shared.write_ptr.store(w.wrapping_add(count), Ordering::Release);
        count
    }

    /// Return the writable region as two contiguous spans.
    ///
    /// The spans are split at the physical end of the backing store; the
    /// second span is empty when the region does not wrap. This is the
    /// zero-copy path: fill the spans in order, then commit with
    /// [`write_advance`](Self::write_advance).
    pub fn write_vector(&mut self) -> (&mut [T], &mut [T]) {
        let shared = &*self.shared;
        let w = shared.write_ptr.load(Ordering::Relaxed);
        let r = shared.read_ptr.load(Ordering::Acquire);
        let free = shared.write_size - w.wrapping_sub(r);

        let idx = w & shared.mask;
        let first = free.min(shared.capacity() - idx);
        // Safety: as in `write`; the borrow of `self` keeps the spans alive
        // only until the next producer operation.
        unsafe {
            (
                std::slice::from_raw_parts_mut(shared.base_ptr().add(idx), first),
                std::slice::from_raw_parts_mut(shared.base_ptr(), free - first),
            )
        }
    }

    /// Advance the write cursor by `count` elements after a zero-copy write.
    ///
    /// `count` must not exceed the space reported by the corresponding
    /// [`write_vector`](Self::write_vector) call.
    pub fn write_advance(&mut self, count: usize) {
        debug_assert!(count <= self.write_space(), "write_advance past free space");
        let shared = &*self.shared;
        let w = shared.write_ptr.load(Ordering::Relaxed);
        shared.write_ptr.store(w.wrapping_add(count), Ordering::Release);
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.shared.capacity())
            .field("write_size", &self.shared.write_size)
            .finish_non_exhaustive()
    }
}

/// Reading half of a [`RingBuffer`]. Exactly one exists per buffer.
pub struct Consumer<T> {
    shared: Arc<RingBuffer<T>>,
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.shared.capacity())
            .field("read_space", &self.shared.read_space())
            .finish_non_exhaustive()
    }
}

impl<T: Copy + Default> Consumer<T> {
    /// Allocated capacity in elements (always a power of two).
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Usable element count per the `limit_writes` policy.
    pub fn write_size(&self) -> usize {
        self.shared.write_size
    }

    /// Number of elements currently available for reading.
    pub fn read_space(&self) -> usize {
        self.shared.read_space()
    }

    /// Number of elements currently available for writing.
    pub fn write_space(&self) -> usize {
        self.shared.write_size - self.shared.read_space()
    }

    /// Copy up to `dst.len()` elements out of the buffer and consume them.
    ///
    /// # Returns
    /// The number of elements actually read.
    pub fn read(&mut self, dst: &mut [T]) -> usize {
        let count = self.copy_out(dst);
        let shared = &*self.shared;
        let r = shared.read_ptr.load(Ordering::Relaxed);
        shared.read_ptr.store(r.wrapping_add(count), Ordering::Release);
        count
    }

    /// Copy up to `dst.len()` elements without consuming them.
    ///
    /// # Returns
    /// The number of elements actually copied.
    pub fn peek(&mut self, dst: &mut [T]) -> usize {
        self.copy_out(dst)
    }

    /// Return the readable region as two contiguous spans.
    ///
    /// The spans are split at the physical end of the backing store; the
    /// second span is empty when the region does not wrap. Consume with
    /// [`read_advance`](Self::read_advance).
    pub fn read_vector(&mut self) -> (&[T], &[T]) {
        let shared = &*self.shared;
        let w = shared.write_ptr.load(Ordering::Acquire);
        let r = shared.read_ptr.load(Ordering::Relaxed);
        let avail = w.wrapping_sub(r);

        let idx = r & shared.mask;
        let first = avail.min(shared.capacity() - idx);
        // Safety: the readable region was published by the producer's
        // release store and is not rewritten until `read_advance` frees it.
        unsafe {
            (
                std::slice::from_raw_parts(shared.base_ptr().add(idx), first),
                std::slice::from_raw_parts(shared.base_ptr(), avail - first),
            )
        }
    }

    /// Advance the read cursor by `count` elements after a zero-copy read.
    ///
    /// `count` must not exceed the space reported by the corresponding
    /// [`read_vector`](Self::read_vector) call.
    pub fn read_advance(&mut self, count: usize) {
        debug_assert!(count <= self.read_space(), "read_advance past available data");
        let shared = &*self.shared;
        let r = shared.read_ptr.load(Ordering::Relaxed);
        shared.read_ptr.store(r.wrapping_add(count), Ordering::Release);
    }

    fn copy_out(&self, dst: &mut [T]) -> usize {
        let shared = &*self.shared;
        let w = shared.write_ptr.load(Ordering::Acquire);
        let r = shared.read_ptr.load(Ordering::Relaxed);
        let avail = w.wrapping_sub(r);

        let count = dst.len().min(avail);
        if count == 0 {
            return 0;
        }

        let idx = r & shared.mask;
        let first = count.min(shared.capacity() - idx);
        // Safety: see `read_vector`.
        unsafe {
            ptr::copy_nonoverlapping(shared.base_ptr().add(idx), dst.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(
                shared.base_ptr(),
                dst.as_mut_ptr().add(first),
                count - first,
            );
        }
        count
    }
}
