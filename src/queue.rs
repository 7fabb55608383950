//! The queue core: a ring guarded by one mutex, two condition variables, and
//! per-role handle refcounts that drive shutdown.
//!
//! [`channel`] returns one [`Producer`] and one [`Consumer`]. Handles are
//! cloned to add producers or consumers and dropped to retire them; the
//! refcounts live on the shared core and are only touched under the lock.
//! Once every producer is gone, consumers drain what remains and then see
//! end-of-stream. Once every consumer is gone, the buffer is released on the
//! spot and later pushes fall through as no-ops.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{PipeError, Result};
use crate::ring::{next_pow2, Ring, DEFAULT_MIN_CAP};

/// Everything the lock guards: the buffer plus the live-handle counts.
struct State {
    ring: Ring,
    producers: usize,
    consumers: usize,
}

struct Shared {
    /// Byte width of one record. Immutable, readable without the lock.
    elem_size: usize,
    /// Element ceiling for a bounded queue, `usize::MAX` when unbounded.
    /// Immutable, readable without the lock.
    max_cap: usize,
    state: Mutex<State>,
    /// Signaled after records land in the buffer.
    just_pushed: Condvar,
    /// Signaled after records leave the buffer, and when the last consumer
    /// retires so that stalled producers can bail out.
    just_popped: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }
}

/// Creates a queue of `elem_size`-byte records and returns its first pair of
/// handles.
///
/// A `limit` of zero makes the queue unbounded. Otherwise the queue holds at
/// most `next_pow2(limit)` records (never less than the minimum capacity) and
/// pushes block once that many are buffered.
pub fn channel(elem_size: usize, limit: usize) -> Result<(Producer, Consumer)> {
    if elem_size == 0 {
        return Err(PipeError::ZeroElementSize);
    }

    let max_cap = if limit == 0 {
        usize::MAX
    } else {
        next_pow2(limit.max(DEFAULT_MIN_CAP))
    };

    let ring = Ring::new(elem_size, DEFAULT_MIN_CAP, max_cap)?;
    let shared = Arc::new(Shared {
        elem_size,
        max_cap,
        state: Mutex::new(State {
            ring,
            producers: 1,
            consumers: 1,
        }),
        just_pushed: Condvar::new(),
        just_popped: Condvar::new(),
    });

    Ok((
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    ))
}

/// The push side of a queue.
///
/// Cloning registers another producer; dropping retires this one. When the
/// last producer is gone, consumers observe end-of-stream after draining.
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Pushes whole records into the queue, blocking while it is at capacity.
    ///
    /// `records` must be a whole number of records; anything else is a caller
    /// bug and panics. Records from a single call land contiguously and in
    /// order. A batch larger than the free space is admitted in pieces: each
    /// piece is published and waiting consumers are woken before the call
    /// blocks for more room, so a single oversized push cannot starve the
    /// consumers draining behind it.
    ///
    /// Once every consumer is gone the buffer no longer exists, and pushes
    /// return immediately without storing anything.
    pub fn push(&self, records: &[u8]) {
        let elem_size = self.shared.elem_size;
        assert!(
            records.len() % elem_size == 0,
            "push of {} bytes is not a whole number of {}-byte records",
            records.len(),
            elem_size
        );

        let max_cap = self.shared.max_cap;
        let mut rest = records;
        while !rest.is_empty() {
            let mut state = self.shared.lock();
            while state.ring.len() == max_cap && state.consumers > 0 {
                self.shared.just_popped.wait(&mut state);
            }

            // No consumer will ever drain these records; the buffer has
            // already been released. No waiter can exist either, so there is
            // nothing to signal.
            if state.consumers == 0 {
                return;
            }

            let admitted = (rest.len() / elem_size).min(max_cap - state.ring.len());
            let bytes = admitted * elem_size;
            state.ring.push_bytes(&rest[..bytes]);
            drop(state);

            self.shared.just_pushed.notify_all();
            rest = &rest[bytes..];
        }
    }

    /// Pre-sizes the buffer so pushes of up to `count` records will not
    /// reallocate, and keeps it from shrinking back below that. A `count` of
    /// zero resets the floor to the default.
    pub fn reserve(&self, count: usize) {
        self.shared.lock().ring.reserve(count);
    }

    /// Byte width of one record.
    pub fn elem_size(&self) -> usize {
        self.shared.elem_size
    }

    /// Records currently buffered.
    pub fn len(&self) -> usize {
        self.shared.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records the buffer can hold before the next reallocation.
    pub fn capacity(&self) -> usize {
        self.shared.lock().ring.capacity()
    }
}

impl Clone for Producer {
    fn clone(&self) -> Self {
        self.shared.lock().producers += 1;
        Producer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.producers -= 1;
        let last = state.producers == 0;
        drop(state);

        if last {
            // Consumers parked in `pop` must wake to observe end-of-stream.
            self.shared.just_pushed.notify_all();
        }
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("elem_size", &self.shared.elem_size)
            .field("len", &self.len())
            .finish()
    }
}

/// The pop side of a queue.
///
/// Cloning registers another consumer; dropping retires this one. When the
/// last consumer is gone, the buffer is released immediately and producers
/// push into the void.
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    /// Pops records into `out`, blocking until the whole request can be
    /// satisfied or no producer remains. Returns how many records were
    /// written.
    ///
    /// `out` must be a whole number of records; anything else is a caller
    /// bug and panics. Requests beyond the queue's capacity bound are clamped
    /// to it. Waiting for the full request amortizes the lock over batches;
    /// once the last producer retires, whatever is buffered is returned
    /// instead, and a return of zero on a nonzero request is the
    /// end-of-stream signal. An empty `out` returns zero immediately.
    pub fn pop(&self, out: &mut [u8]) -> usize {
        let elem_size = self.shared.elem_size;
        assert!(
            out.len() % elem_size == 0,
            "pop into {} bytes is not a whole number of {}-byte records",
            out.len(),
            elem_size
        );

        let want = (out.len() / elem_size).min(self.shared.max_cap);

        let mut state = self.shared.lock();
        while state.ring.len() < want && state.producers > 0 {
            self.shared.just_pushed.wait(&mut state);
        }

        let got = want.min(state.ring.len());
        if got > 0 {
            state.ring.pop_bytes(&mut out[..got * elem_size]);
        }
        drop(state);

        self.shared.just_popped.notify_all();
        got
    }

    /// Byte width of one record.
    pub fn elem_size(&self) -> usize {
        self.shared.elem_size
    }

    /// Records currently buffered.
    pub fn len(&self) -> usize {
        self.shared.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records the buffer can hold before the next reallocation.
    pub fn capacity(&self) -> usize {
        self.shared.lock().ring.capacity()
    }
}

impl Clone for Consumer {
    fn clone(&self) -> Self {
        self.shared.lock().consumers += 1;
        Consumer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.consumers -= 1;
        let last = state.consumers == 0;
        if last {
            // Nothing can drain the buffer anymore; hand the memory back now
            // rather than when the producers finish.
            state.ring.release();
        }
        drop(state);

        if last {
            // Producers parked at the capacity bound must wake to see that
            // the consumer side is gone.
            self.shared.just_popped.notify_all();
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("elem_size", &self.shared.elem_size)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batched_roundtrip_in_order() {
        let (tx, rx) = channel(4, 0).unwrap();
        tx.push(&[0x01, 0x02, 0x03, 0x04]);
        tx.push(&[0x05, 0x06, 0x07, 0x08]);
        tx.push(&[0x09, 0x0A, 0x0B, 0x0C]);

        let mut out = [0u8; 12];
        assert_eq!(rx.pop(&mut out), 3);
        assert_eq!(
            out,
            [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C]
        );
    }

    #[test]
    fn zero_record_width_is_rejected() {
        assert!(matches!(channel(0, 0), Err(PipeError::ZeroElementSize)));
    }

    #[test]
    fn empty_push_and_empty_pop_are_noops() {
        let (tx, rx) = channel(2, 0).unwrap();
        tx.push(&[]);
        assert_eq!(rx.pop(&mut []), 0);
        assert!(rx.is_empty());
    }

    #[test]
    #[should_panic(expected = "whole number")]
    fn ragged_push_panics() {
        let (tx, _rx) = channel(2, 0).unwrap();
        tx.push(&[1, 2, 3]);
    }

    #[test]
    fn cloned_producer_keeps_the_stream_open() {
        let (tx, rx) = channel(1, 0).unwrap();
        let tx2 = tx.clone();
        drop(tx);

        tx2.push(&[42]);
        drop(tx2);

        let mut one = [0u8; 1];
        assert_eq!(rx.pop(&mut one), 1);
        assert_eq!(one[0], 42);
        assert_eq!(rx.pop(&mut one), 0);
    }

    #[test]
    fn cloned_consumer_keeps_the_buffer_alive() {
        let (tx, rx) = channel(1, 0).unwrap();
        let rx2 = rx.clone();
        drop(rx);

        tx.push(&[7]);
        let mut one = [0u8; 1];
        assert_eq!(rx2.pop(&mut one), 1);
        assert_eq!(one[0], 7);
    }

    #[test]
    fn push_after_last_consumer_is_dropped_on_the_floor() {
        let (tx, rx) = channel(1, 0).unwrap();
        tx.push(&[1, 2, 3]);
        drop(rx);

        tx.push(&[4, 5, 6]);
        assert_eq!(tx.len(), 0);
        assert_eq!(tx.capacity(), 0);
    }

    #[test]
    fn partial_batch_at_end_of_stream() {
        let (tx, rx) = channel(1, 0).unwrap();
        tx.push(&[7, 8, 9]);
        drop(tx);

        let mut out = [0u8; 10];
        assert_eq!(rx.pop(&mut out), 3);
        assert_eq!(&out[..3], &[7, 8, 9]);
        assert_eq!(rx.pop(&mut out), 0);
    }

    #[test]
    fn reserve_prevents_reallocation_and_resets() {
        let (tx, rx) = channel(1, 0).unwrap();
        tx.reserve(1000);
        assert_eq!(tx.capacity(), 1000);

        tx.push(&[0u8; 1000]);
        assert_eq!(tx.capacity(), 1000);

        let mut out = vec![0u8; 1000];
        assert_eq!(rx.pop(&mut out), 1000);
        assert_eq!(rx.capacity(), 1000);

        tx.reserve(0);
        assert_eq!(tx.capacity(), DEFAULT_MIN_CAP);
    }

    #[test]
    fn bounded_queue_reports_its_capacity_bound() {
        let (tx, _rx) = channel(1, 20).unwrap();
        tx.push(&[1u8; 32]);
        assert_eq!(tx.len(), 32);
        assert_eq!(tx.capacity(), 32);
    }
}
