//! Reusable object storage backing pooled projectiles.

/// Slot-based pool that recycles released values instead of dropping them.
///
/// Free slots are kept on a stack, so the most recently released slot is
/// handed out first. When no free slot remains, a new one is appended.
#[derive(Clone, Debug)]
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

#[derive(Clone, Debug)]
struct Slot<T> {
    value: T,
    active: bool,
}

impl<T> ObjectPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Pre-allocates `count` inactive values built by `make`.
    ///
    /// Slots are stacked so that the lowest new slot is acquired first.
    pub fn fill<F>(&mut self, count: usize, mut make: F)
    where
        F: FnMut() -> T,
    {
        let start = self.slots.len();
        self.slots.reserve(count);
        for _ in 0..count {
            self.slots.push(Slot {
                value: make(),
                active: false,
            });
        }
        self.free.extend((start..start + count).rev());
    }

    /// Activates a pooled value, growing the pool with `make` when empty.
    ///
    /// Returns the slot index together with the value so callers can reset it.
    pub fn acquire<F>(&mut self, make: F) -> (usize, &mut T)
    where
        F: FnOnce() -> T,
    {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    value: make(),
                    active: false,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.active = true;
        (index, &mut slot.value)
    }

    /// Returns an active slot to the pool. Releasing an inactive or unknown
    /// slot is a no-op and reports `false`.
    pub fn release(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.active => {
                slot.active = false;
                self.free.push(index);
                true
            }
            _ => false,
        }
    }

    /// Active value stored in `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots
            .get(index)
            .filter(|slot| slot.active)
            .map(|slot| &slot.value)
    }

    /// Iterator over active slots in index order.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| (index, &slot.value))
    }

    /// Mutable iterator over active slots in index order.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, slot)| (index, &mut slot.value))
    }

    /// Number of active values.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total number of slots, active or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
