use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::slots::{SlotFactory, SlotValue, StateSlot, next_buffer_id};
use crate::stats::{Counters, SyncStats};

/// One of the three rotating instances: the caller's state plus any
/// registered custom slots.
pub struct FrameState<S> {
    state: S,
    slots: Vec<SlotValue>,
    tick: u64,
    buffer: u64,
}

impl<S> FrameState<S> {
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Producer tick this instance was last staged with. Zero until first staged.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// # Panics
    /// If `slot` was registered on a different triple buffer.
    pub fn slot<T: 'static>(&self, slot: &StateSlot<T>) -> &T {
        self.check_slot(slot);
        self.slots[slot.index]
            .downcast_ref::<T>()
            .unwrap_or_else(|| panic!("state slot {} does not hold its registered type", slot.index))
    }

    /// # Panics
    /// If `slot` was registered on a different triple buffer.
    pub fn slot_mut<T: 'static>(&mut self, slot: &StateSlot<T>) -> &mut T {
        self.check_slot(slot);
        self.slots[slot.index]
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("state slot {} does not hold its registered type", slot.index))
    }

    fn check_slot<T>(&self, slot: &StateSlot<T>) {
        assert_eq!(
            slot.buffer, self.buffer,
            "state slot used with a triple buffer it was not registered on"
        );
    }
}

impl<S> Deref for FrameState<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.state
    }
}

impl<S> DerefMut for FrameState<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.state
    }
}

struct Staged<S> {
    frame: Box<FrameState<S>>,
    /// Holds a tick the reader has not taken yet.
    fresh: bool,
}

struct ReadSide<S> {
    frame: Box<FrameState<S>>,
}

/// Shared core of the handoff: the staging and read instances and their locks.
///
/// Built through [`TripleBuffer::new`] or [`TripleBuffer::builder`], which
/// hand back the [`Producer`] and [`Consumer`] endpoints.
pub struct TripleBuffer<S> {
    read: Mutex<ReadSide<S>>,
    staging: Mutex<Staged<S>>,
    counters: Counters,
}

impl<S: Send + 'static> TripleBuffer<S> {
    /// Three instances from `factory`, no custom slots.
    pub fn new(factory: impl Fn() -> S + 'static) -> (Producer<S>, Consumer<S>) {
        Self::builder(factory).build()
    }

    pub fn builder(factory: impl Fn() -> S + 'static) -> TripleBufferBuilder<S> {
        TripleBufferBuilder {
            factory: Box::new(factory),
            slots: Vec::new(),
            buffer: next_buffer_id(),
        }
    }
}

impl<S> TripleBuffer<S> {
    fn lock_staging(&self) -> MutexGuard<'_, Staged<S>> {
        // The guarded sections only swap boxes, so a poisoned lock still holds
        // three valid instances.
        self.staging.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_read(&self) -> MutexGuard<'_, ReadSide<S>> {
        self.read.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Setup step: register custom per-tick slots, then build.
///
/// Slots can only be added here, so all three instances always have the
/// same shape.
pub struct TripleBufferBuilder<S> {
    factory: Box<dyn Fn() -> S>,
    slots: Vec<SlotFactory>,
    buffer: u64,
}

impl<S: Send + 'static> TripleBufferBuilder<S> {
    /// Append a slot of type `T` to all three instances.
    pub fn register_state<T: Send + 'static>(&mut self, factory: impl Fn() -> T + 'static) -> StateSlot<T> {
        let index = self.slots.len();
        self.slots.push(Box::new(move || Box::new(factory()) as SlotValue));
        StateSlot::new(index, self.buffer)
    }

    pub fn build(self) -> (Producer<S>, Consumer<S>) {
        let make = || {
            Box::new(FrameState {
                state: (self.factory)(),
                slots: self.slots.iter().map(|f| f()).collect(),
                tick: 0,
                buffer: self.buffer,
            })
        };
        let (write, staging, read) = (make(), make(), make());
        let shared = Arc::new(TripleBuffer {
            read: Mutex::new(ReadSide { frame: read }),
            staging: Mutex::new(Staged {
                frame: staging,
                fresh: false,
            }),
            counters: Counters::default(),
        });
        tracing::debug!(slots = self.slots.len(), "triple buffer built");
        (
            Producer {
                write,
                shared: Arc::clone(&shared),
                tick: 0,
            },
            Consumer { shared },
        )
    }
}

/// Simulation-side endpoint. Owns the write instance.
pub struct Producer<S> {
    write: Box<FrameState<S>>,
    shared: Arc<TripleBuffer<S>>,
    tick: u64,
}

impl<S> Producer<S> {
    /// The instance to fill this tick.
    ///
    /// After a swap this is whichever instance was staged or read before,
    /// so it holds old data; overwrite it fully.
    pub fn write_state(&mut self) -> &mut FrameState<S> {
        &mut self.write
    }

    /// Ticks staged so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// End of tick: the written instance becomes the staging candidate and
    /// the previous staging instance becomes the next write target.
    ///
    /// Takes only the staging lock. Returns the tick number just staged.
    pub fn swap_staging(&mut self) -> u64 {
        self.tick += 1;
        self.write.tick = self.tick;
        let dropped = {
            let mut staged = self.shared.lock_staging();
            std::mem::swap(&mut self.write, &mut staged.frame);
            std::mem::replace(&mut staged.fresh, true)
        };
        self.shared.counters.produced(dropped);
        tracing::trace!(tick = self.tick, dropped, "staged tick");
        self.tick
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.counters.snapshot()
    }
}

/// Render-side endpoint. Clones share the single read instance.
pub struct Consumer<S> {
    shared: Arc<TripleBuffer<S>>,
}

impl<S> Clone for Consumer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> Consumer<S> {
    /// Take the read lock and borrow the current read instance.
    pub fn start_read(&self) -> ReadGuard<'_, S> {
        ReadGuard {
            side: self.shared.lock_read(),
            shared: &self.shared,
        }
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.counters.snapshot()
    }

    /// True if a staged tick is waiting to be published.
    pub fn has_pending(&self) -> bool {
        self.shared.lock_staging().fresh
    }
}

/// The read instance, held under the read lock for the duration of a frame.
///
/// Dropping the guard releases the lock without publishing anything.
pub struct ReadGuard<'a, S> {
    side: MutexGuard<'a, ReadSide<S>>,
    shared: &'a TripleBuffer<S>,
}

impl<S> ReadGuard<'_, S> {
    /// Finish the frame and promote the staged tick unless `prevent_swap`
    /// objects.
    ///
    /// `prevent_swap(staging, read)` is only consulted when a tick is
    /// actually waiting. A refusal is normal back-pressure: the reader keeps
    /// its instance and the staged tick stays available. Returns whether the
    /// read instance changed.
    pub fn stop_read<F>(mut self, prevent_swap: F) -> bool
    where
        F: FnOnce(&FrameState<S>, &FrameState<S>) -> bool,
    {
        let mut staged = self.shared.lock_staging();
        if !staged.fresh {
            return false;
        }
        if prevent_swap(&staged.frame, &self.side.frame) {
            self.shared.counters.deferred();
            tracing::trace!(staged = staged.frame.tick, read = self.side.frame.tick, "swap deferred");
            return false;
        }
        std::mem::swap(&mut self.side.frame, &mut staged.frame);
        staged.fresh = false;
        self.shared.counters.published();
        tracing::trace!(tick = self.side.frame.tick, "published tick");
        true
    }

    /// [`ReadGuard::stop_read`] with nothing holding the swap back.
    pub fn stop_read_unconditionally(self) -> bool {
        self.stop_read(|_, _| false)
    }
}

impl<S> Deref for ReadGuard<'_, S> {
    type Target = FrameState<S>;

    fn deref(&self) -> &FrameState<S> {
        &self.side.frame
    }
}
