//! Triple-buffered handoff of per-tick state from simulation to render.
//!
//! Three state instances rotate through the write, staging and read roles by
//! swapping boxes. The producer owns the write instance outright, the
//! consumers share the read instance behind the read lock, and the staging
//! instance sits behind its own lock between them.
//!
//! # Invariants
//! - The read and write instances are never the same object.
//! - The producer only ever takes the staging lock; it never waits on a render frame.
//! - A staged tick is published at most once, so the read tick never goes backwards.

mod slots;
mod stats;
mod triple;

pub use slots::StateSlot;
pub use stats::{FrameTimer, SyncStats};
pub use triple::{Consumer, FrameState, Producer, ReadGuard, TripleBuffer, TripleBufferBuilder};

pub fn crate_info() -> &'static str {
    "vista-sync v0.1.0"
}
