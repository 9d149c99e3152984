//! A fixed-capacity single-producer, single-consumer (SPSC) byte queue.

use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicU32, Ordering},
};

/// Number of slots used by [`Serial`](crate::Serial) when no capacity is given.
///
/// One slot is always kept free, so a buffer of this size holds 63 bytes.
pub const DEFAULT_CAPACITY: usize = 64;

/// A single-producer, single-consumer (SPSC) lock-free queue storing up to `N - 1` bytes.
///
/// The slot in front of `head` is never filled, so `head == tail` means empty and
/// `tail + 1 == head` (mod `N`) means full. No length field is shared between the
/// two sides.
///
/// The producer owns `tail` and the slot it points at. The consumer owns `head` and
/// every slot in `head..tail`. Each side only ever stores its own index.
pub(crate) struct RingBuffer<const N: usize> {
    /// Where the next read starts.
    ///
    /// The RingBuffer always guarantees `head < N`.
    head: AtomicU32,
    /// Where the next write starts.
    ///
    /// The RingBuffer always guarantees `tail < N`.
    tail: AtomicU32,
    buf: [UnsafeCell<u8>; N],
}

// SAFETY: The buffer is shared between one producer and one consumer:
// - `head` and `tail` are atomics, each stored by exactly one side.
// - A slot is written only by the producer while it is outside `head..tail`,
//   and read only by the consumer while it is inside `head..tail`. The
//   Release store / Acquire load pairs on the indices order those accesses.
// - The single-producer and single-consumer requirements are carried by the
//   `unsafe` contracts of `push`, `write_slot`, `commit` and `pop`.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    /// Creates an empty buffer with zeroed storage.
    pub(crate) const fn new() -> Self {
        const {
            assert!(N >= 2, "a ring buffer needs at least two slots");
            assert!(N as u64 <= u32::MAX as u64, "ring buffer indices are 32 bits wide");
        }
        RingBuffer {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            buf: [const { UnsafeCell::new(0) }; N],
        }
    }

    #[cfg(test)]
    pub(crate) fn with_indices(head: u32, tail: u32) -> Self {
        let b = Self::new();
        b.head.store(head, Ordering::Relaxed);
        b.tail.store(tail, Ordering::Relaxed);
        b
    }

    #[inline]
    const fn next(index: usize) -> usize {
        if index + 1 == N { 0 } else { index + 1 }
    }

    /// Largest number of bytes the buffer can hold.
    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of buffered bytes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        // Acquire on both: either side may ask.
        let head = self.head.load(Ordering::Acquire) as usize;
        let tail = self.tail.load(Ordering::Acquire) as usize;
        // Adding `N` keeps the subtraction in range once `tail` has wrapped past `head`.
        (tail + N - head) % N
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire) as usize;
        let tail = self.tail.load(Ordering::Acquire) as usize;
        Self::next(tail) == head
    }

    /// Appends `byte`, or returns `false` if the buffer is full.
    ///
    /// # Safety
    ///
    /// Must only be called from the single producer context of this buffer.
    #[inline]
    pub(crate) unsafe fn push(&self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        // SAFETY: The caller is the producer, and the buffer was just seen not full.
        // Only the producer can make it fuller, so it is still not full.
        unsafe {
            self.write_slot(byte);
            self.commit();
        }
        true
    }

    /// Stores `byte` in the slot at `tail` without publishing it.
    ///
    /// The consumer does not see the byte until [`RingBuffer::commit`].
    ///
    /// # Safety
    ///
    /// Must only be called from the single producer context of this buffer.
    #[inline]
    pub(crate) unsafe fn write_slot(&self, byte: u8) {
        // Relaxed: the producer owns `tail`.
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        // SAFETY: `tail < N` by the field invariant. The slot at `tail` is never inside
        // `head..tail`, so the consumer does not read it, and the caller is the only producer.
        unsafe { *self.buf[tail].get() = byte };
    }

    /// Publishes the byte stored by [`RingBuffer::write_slot`] by advancing `tail`.
    ///
    /// # Safety
    ///
    /// - Must only be called from the single producer context of this buffer.
    /// - The buffer must not be full. A `!is_full()` observed earlier by the producer
    ///   stays true, since the consumer can only free slots.
    #[inline]
    pub(crate) unsafe fn commit(&self) {
        debug_assert!(!self.is_full());
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        // Release: the slot write must be visible before the consumer sees the new `tail`.
        self.tail.store(Self::next(tail) as u32, Ordering::Release);
    }

    /// Removes the oldest byte, or returns `None` if the buffer is empty.
    ///
    /// # Safety
    ///
    /// Must only be called from the single consumer context of this buffer.
    #[inline]
    pub(crate) unsafe fn pop(&self) -> Option<u8> {
        // Acquire: synchronizes with the producer's Release store in `commit`.
        let tail = self.tail.load(Ordering::Acquire) as usize;
        // Relaxed: the consumer owns `head`.
        let head = self.head.load(Ordering::Relaxed) as usize;
        if head == tail {
            return None;
        }
        // SAFETY: `head < N` by the field invariant, and `head != tail` puts the slot inside
        // `head..tail`, which the producer does not write until `head` moves past it.
        let byte = unsafe { *self.buf[head].get() };
        // Release: the slot read must complete before the producer may reuse it.
        self.head.store(Self::next(head) as u32, Ordering::Release);
        Some(byte)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BUF_SIZE: usize = 8;

    #[test]
    fn starts_empty_and_zeroed() {
        let b = RingBuffer::<BUF_SIZE>::new();
        assert!(b.is_empty());
        assert!(!b.is_full());
        assert_eq!(b.len(), 0);
        assert_eq!(b.capacity(), BUF_SIZE - 1);
        assert!(b.buf.iter().all(|c| unsafe { *c.get() } == 0));
    }

    #[test]
    fn fifo_order() {
        let b = RingBuffer::<BUF_SIZE>::new();
        for n in 1..BUF_SIZE {
            for i in 0..n as u8 {
                assert!(unsafe { b.push(i) });
            }
            assert_eq!(b.len(), n);
            for i in 0..n as u8 {
                assert_eq!(unsafe { b.pop() }, Some(i));
            }
            assert!(b.is_empty());
        }
    }

    #[test]
    fn fills_at_capacity_minus_one() {
        let b = RingBuffer::<BUF_SIZE>::new();
        for i in 0..(BUF_SIZE - 1) as u8 {
            assert!(unsafe { b.push(i) });
        }
        assert!(b.is_full());
        assert!(!unsafe { b.push(0xff) });
        assert_eq!(b.len(), BUF_SIZE - 1);

        // Freeing one slot lets exactly one more byte in, wrapping `tail`.
        assert_eq!(unsafe { b.pop() }, Some(0));
        assert!(unsafe { b.push(100) });
        assert!(!unsafe { b.push(101) });

        for i in 1..(BUF_SIZE - 1) as u8 {
            assert_eq!(unsafe { b.pop() }, Some(i));
        }
        assert_eq!(unsafe { b.pop() }, Some(100));
        assert_eq!(unsafe { b.pop() }, None);
    }

    #[test]
    fn len_after_wraparound() {
        let b = RingBuffer::<BUF_SIZE>::with_indices(6, 6);
        for i in 0..5 {
            assert!(unsafe { b.push(i) });
        }
        // head = 6, tail wrapped to 3.
        assert_eq!(b.tail.load(Ordering::Relaxed), 3);
        assert_eq!(b.len(), 5);

        assert_eq!(unsafe { b.pop() }, Some(0));
        assert_eq!(unsafe { b.pop() }, Some(1));
        assert_eq!(b.len(), 3);
        assert_eq!(b.head.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn len_uses_actual_capacity() {
        // head = 60, tail = 2 in a 64 slot buffer is 6 bytes, not 256 - 60 + 2.
        let b = RingBuffer::<64>::with_indices(60, 2);
        assert_eq!(b.len(), 6);
        let b = RingBuffer::<64>::with_indices(3, 2);
        assert!(b.is_full());
        assert_eq!(b.len(), 63);
    }

    #[test]
    fn pop_empty_is_idempotent() {
        let b = RingBuffer::<BUF_SIZE>::with_indices(5, 5);
        for _ in 0..3 {
            assert_eq!(unsafe { b.pop() }, None);
        }
        assert_eq!(b.head.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn write_slot_invisible_until_commit() {
        let b = RingBuffer::<BUF_SIZE>::new();
        unsafe { b.write_slot(42) };
        assert!(b.is_empty());
        assert_eq!(unsafe { b.pop() }, None);

        unsafe { b.commit() };
        assert_eq!(b.len(), 1);
        assert_eq!(unsafe { b.pop() }, Some(42));
    }

    #[test]
    fn smallest_buffer() {
        let b = RingBuffer::<2>::new();
        assert!(unsafe { b.push(1) });
        assert!(!unsafe { b.push(2) });
        assert_eq!(unsafe { b.pop() }, Some(1));
        assert!(unsafe { b.push(3) });
        assert_eq!(b.len(), 1);
        assert_eq!(unsafe { b.pop() }, Some(3));
    }
}
