//! Shape pool
//!
//! Owns every shape instance for the lifetime of the session. A slot is
//! either active (in the arena) or pooled (inert, waiting in `available`),
//! never both. Pooled slots are reused oldest-released first.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;
use thiserror::Error;

use super::shape::{Shape, ShapeHandle};
use crate::consts::MIN_RANK;

/// Reasons the pool refuses to hand out a shape
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("rank {0} is below the minimum shape rank")]
    RankTooLow(u32),
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    active: bool,
    shape: Shape,
}

/// Reusable inventory of shapes
#[derive(Debug, Default)]
pub struct ShapePool {
    slots: Vec<Slot>,
    available: VecDeque<u32>,
    active: BTreeSet<ShapeHandle>,
    total_created: u32,
}

impl ShapePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool pre-filled with `count` inert shapes
    pub fn with_warmup(count: u32) -> Self {
        let mut pool = Self::new();
        pool.warm_up(count);
        pool
    }

    /// Add `count` inert shapes to the available queue
    pub fn warm_up(&mut self, count: u32) {
        for _ in 0..count {
            let index = self.create_slot();
            self.available.push_back(index);
        }
        log::debug!("Shape pool warmed up with {} shapes", self.available.len());
    }

    fn create_slot(&mut self) -> u32 {
        let index = self.slots.len() as u32;
        let mut shape = Shape::new(MIN_RANK, Vec2::ZERO);
        shape.retire();
        self.slots.push(Slot {
            generation: 0,
            active: false,
            shape,
        });
        self.total_created += 1;
        index
    }

    /// Hand out a configured, active shape
    pub fn acquire(&mut self, rank: u32, pos: Vec2) -> Result<ShapeHandle, PoolError> {
        if rank < MIN_RANK {
            return Err(PoolError::RankTooLow(rank));
        }

        let index = match self.available.pop_front() {
            Some(index) => {
                log::trace!(
                    "Reusing pooled shape slot {}, {} left in pool",
                    index,
                    self.available.len()
                );
                index
            }
            None => {
                let index = self.create_slot();
                log::debug!(
                    "Pool empty, created shape slot {} (total {})",
                    index,
                    self.total_created
                );
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.active = true;
        slot.shape.configure(rank, pos);

        let handle = ShapeHandle::new(index, slot.generation);
        self.active.insert(handle);
        Ok(handle)
    }

    /// Return a shape to the pool. Returns false (and does nothing) if the
    /// handle is stale or already released.
    pub fn release(&mut self, handle: ShapeHandle) -> bool {
        if !self.active.remove(&handle) {
            log::trace!("Ignoring release of inactive shape {}", handle);
            return false;
        }

        let slot = &mut self.slots[handle.index() as usize];
        slot.active = false;
        slot.shape.retire();
        self.available.push_back(handle.index());
        true
    }

    /// Whether the handle refers to a shape currently in play
    #[inline]
    pub fn is_active(&self, handle: ShapeHandle) -> bool {
        self.active.contains(&handle)
    }

    /// Active shape for a live handle
    pub fn get(&self, handle: ShapeHandle) -> Option<&Shape> {
        if self.is_active(handle) {
            self.slots.get(handle.index() as usize).map(|s| &s.shape)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: ShapeHandle) -> Option<&mut Shape> {
        if self.is_active(handle) {
            self.slots.get_mut(handle.index() as usize).map(|s| &mut s.shape)
        } else {
            None
        }
    }

    /// Active handles in slot order
    pub fn active_handles(&self) -> impl Iterator<Item = ShapeHandle> + '_ {
        self.active.iter().copied()
    }

    /// Active shapes in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (ShapeHandle, &Shape)> + '_ {
        self.active
            .iter()
            .map(|&h| (h, &self.slots[h.index() as usize].shape))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.available.len()
    }

    /// Number of shapes ever constructed (never decreases until `clear`)
    pub fn total_created(&self) -> u32 {
        self.total_created
    }

    /// Tear down every instance, active or pooled
    pub fn clear(&mut self) {
        self.slots.clear();
        self.available.clear();
        self.active.clear();
        self.total_created = 0;
        log::debug!("Shape pool cleared");
    }

    #[cfg(test)]
    fn assert_partition(&self) {
        assert_eq!(self.slots.len() as u32, self.total_created);
        assert_eq!(self.available.len() + self.active.len(), self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            let pooled = self.available.iter().filter(|&&a| a as usize == i).count();
            let active = self
                .active
                .iter()
                .filter(|h| h.index() as usize == i)
                .count();
            assert_eq!(pooled + active, 1, "slot {} must be in exactly one set", i);
            assert_eq!(slot.active, active == 1);
            assert_eq!(slot.shape.visible, slot.active);
        }
    }
}
