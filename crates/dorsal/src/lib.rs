//! Durable, gapless sequence allocation per partition.
//!
//! Each partition key (an event id, a ticket pool, an invoice book) owns an
//! independent counter. [`Allocator::allocate`] returns the next integer of
//! that counter, starting at `1`, and only after the new value has been
//! durably committed through a [`SequenceStore`]. Concurrent callers race on a
//! conditional write keyed by a [`Version`]; the loser re-reads and retries
//! with backoff, so no value is ever handed out twice.
//!
//! ```
//! use dorsal::{Allocator, AllocatorConfig, MemoryStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let allocator: Allocator<_> = Allocator::new(MemoryStore::new(), AllocatorConfig::default());
//!
//! assert_eq!(allocator.allocate("event-42").await?, 1);
//! assert_eq!(allocator.allocate("event-42").await?, 2);
//! assert_eq!(allocator.allocate("event-7").await?, 1);
//! assert_eq!(allocator.current("event-42").await?, 2);
//! # Ok::<(), dorsal::Error>(())
//! # }).unwrap();
//! ```

mod allocator;
mod error;
mod futures;
mod partition;
mod sequence;
mod status;
mod store;

pub use crate::allocator::*;
pub use crate::error::*;
pub use crate::futures::*;
pub use crate::partition::*;
pub use crate::sequence::*;
pub use crate::status::*;
pub use crate::store::*;
