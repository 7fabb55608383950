//! A thread-safe queue of fixed-size byte records for moving batches of data
//! between cooperating threads, with a pipeline builder on top.
//!
//! The queue is multi-producer/multi-consumer and either bounded or
//! unbounded. Producers push batches and block while a bounded queue is at
//! capacity; consumers pop batches and block until their request can be
//! satisfied. Storage is a circular byte buffer that grows by powers of two
//! and shrinks once occupancy falls off, so an idle queue does not hold on
//! to a burst's worth of memory.
//!
//! Shutdown is driven by handle refcounts rather than a close call: when the
//! last [`Producer`] is dropped, consumers drain what remains and then see
//! end-of-stream (a `pop` returning zero); when the last [`Consumer`] is
//! dropped, the buffer is released immediately and later pushes become
//! no-ops.
//!
//! # Features
//!
//! - Batched, blocking `push`/`pop` over opaque fixed-size records
//! - Bounded queues with real backpressure, or unbounded growth
//! - Capacity hysteresis: grow to the next power of two, shrink at a
//!   quarter occupancy
//! - Deterministic refcount-based shutdown, no poisoned-lock handling
//! - A builder that chains queues through per-stage worker threads
//!
//! # Example
//!
//! ```
//! use bytepipe::channel;
//!
//! // Four-byte records, unbounded.
//! let (tx, rx) = channel(4, 0).unwrap();
//! tx.push(&[1, 2, 3, 4, 5, 6, 7, 8]);
//! drop(tx);
//!
//! let mut out = [0u8; 8];
//! assert_eq!(rx.pop(&mut out), 2);
//! assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
//!
//! // All producers are gone and the buffer is empty: end-of-stream.
//! assert_eq!(rx.pop(&mut out), 0);
//! ```

mod ring;

pub mod error;
pub mod pipeline;
pub mod queue;
pub mod stage;

// Re-exports for convenience
pub use error::{PipeError, Result};
pub use pipeline::PipelineBuilder;
pub use queue::{channel, Consumer, Producer};
pub use stage::{FilterStage, MapStage, PassthroughStage, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
