//! Fixed-capacity object pool for scrolling world entities
//!
//! Every instance is created up front. Spawning pops a slot off the free
//! list and re-initialises it; despawning pushes it back. The pool never
//! grows, and a full pool answers `None` rather than allocating.
//!
//! Callers refer to instances through [`PoolHandle`]s. A handle carries the
//! slot generation, so a handle kept past its despawn stops resolving
//! instead of aliasing whatever was spawned into the slot next.

use std::rc::Rc;

use glam::Vec2;

/// How far past the bottom of the viewport an entity travels before the
/// pool reclaims it
pub const DESPAWN_MARGIN: f32 = 100.0;

/// An entity a pool can recycle
pub trait Poolable {
    /// Per-spawn initial state
    type Params;
    /// Shared read-only resources (sprite sizes, hitboxes)
    type Assets;

    /// Inactive instance created at pool construction
    fn placeholder(assets: &Self::Assets) -> Self;

    /// Overwrite every mutable field for a fresh spawn
    fn respawn(&mut self, params: Self::Params, assets: &Self::Assets);

    /// Move by `scroll_delta` along y plus any motion of its own
    fn advance(&mut self, scroll_delta: f32, dt: f32);

    fn position(&self) -> Vec2;
}

/// Reference to a live pool instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    item: T,
    generation: u32,
    active: bool,
}

/// Pool of `capacity` pre-built `T`s sharing one asset handle
pub struct ObjectPool<T: Poolable> {
    slots: Vec<Slot<T>>,
    /// Inactive slot indices; spawn pops from the end
    free: Vec<usize>,
    assets: Rc<T::Assets>,
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new(capacity: usize, assets: Rc<T::Assets>) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                item: T::placeholder(&assets),
                generation: 0,
                active: false,
            })
            .collect();
        // Reversed so the first spawn takes slot 0
        let free = (0..capacity).rev().collect();
        Self {
            slots,
            free,
            assets,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn inactive_count(&self) -> usize {
        self.free.len()
    }

    pub fn assets(&self) -> &Rc<T::Assets> {
        &self.assets
    }

    /// Activate a free instance with `params`; `None` if every slot is in use
    pub fn spawn(&mut self, params: T::Params) -> Option<PoolHandle> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index];
        slot.item.respawn(params, &self.assets);
        slot.generation = slot.generation.wrapping_add(1);
        slot.active = true;
        Some(PoolHandle {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Return an instance to the free list. `false` for a stale or unknown
    /// handle.
    pub fn despawn(&mut self, handle: PoolHandle) -> bool {
        if self.resolve(handle).is_none() {
            return false;
        }
        self.release(handle.index());
        true
    }

    fn release(&mut self, index: usize) {
        self.slots[index].active = false;
        self.free.push(index);
    }

    /// Despawn every active instance
    pub fn despawn_all(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].active {
                self.release(index);
            }
        }
    }

    fn resolve(&self, handle: PoolHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.active && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.resolve(handle).map(|slot| &slot.item)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.active && slot.generation == handle.generation)
            .map(|slot| &mut slot.item)
    }

    /// Active instances in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| {
                let handle = PoolHandle {
                    index: index as u32,
                    generation: slot.generation,
                };
                (handle, &slot.item)
            })
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| {
                let handle = PoolHandle {
                    index: index as u32,
                    generation: slot.generation,
                };
                (handle, &mut slot.item)
            })
    }

    /// Scroll every active instance, then reclaim those that left the
    /// bottom of the viewport. Returns how many were reclaimed.
    pub fn update(&mut self, scroll_speed: f32, dt: f32, viewport_height: f32) -> usize {
        let scroll_delta = scroll_speed * dt;
        let limit = viewport_height + DESPAWN_MARGIN;
        let mut reclaimed = 0;
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if !slot.active {
                continue;
            }
            slot.item.advance(scroll_delta, dt);
            if slot.item.position().y > limit {
                self.release(index);
                reclaimed += 1;
            }
        }
        reclaimed
    }
}
