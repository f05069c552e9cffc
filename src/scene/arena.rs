use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// A typed index into an [`Arena`], checked against the slot's generation.
pub trait ArenaHandle: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(self) -> u32;
    fn generation(self) -> u32;
}

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl ArenaHandle for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.index, self.generation)
            }
        }
    };
}

arena_handle!(
    /// Handle to a scene object.
    ObjectId
);
arena_handle!(
    /// Handle to a material.
    MaterialId
);
arena_handle!(
    /// Handle to an image datablock.
    ImageId
);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage whose handles stop resolving once their entry is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Arena<H, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    #[serde(skip)]
    marker: PhantomData<H>,
}

impl<H, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            marker: PhantomData,
        }
    }
}

impl<H: ArenaHandle, T> Arena<H, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> H {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return H::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        H::from_parts(index, 0)
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    /// Remove an entry. Every outstanding handle to it becomes stale.
    pub fn remove(&mut self, handle: H) -> Option<T> {
        let index = handle.index();
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (H::from_parts(i as u32, slot.generation), v))
        })
    }

    pub fn handles(&self) -> Vec<H> {
        self.iter().map(|(h, _)| h).collect()
    }
}
