use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_buffer_id() -> u64 {
    NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) type SlotValue = Box<dyn Any + Send>;
pub(crate) type SlotFactory = Box<dyn Fn() -> SlotValue>;

/// Typed handle to a custom per-tick value registered on a triple buffer.
///
/// Returned by [`crate::TripleBufferBuilder::register_state`]. The same
/// handle indexes the slot in whichever instance currently plays a role.
pub struct StateSlot<T> {
    pub(crate) index: usize,
    pub(crate) buffer: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateSlot<T> {
    pub(crate) fn new(index: usize, buffer: u64) -> Self {
        Self {
            index,
            buffer,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for StateSlot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateSlot<T> {}

impl<T> PartialEq for StateSlot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.buffer == other.buffer
    }
}

impl<T> Eq for StateSlot<T> {}

impl<T> fmt::Debug for StateSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSlot")
            .field("index", &self.index)
            .field("buffer", &self.buffer)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
