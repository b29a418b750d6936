//! Reference-counted handle tables
//!
//! Every engine resource (variables, statements, LOBs, row identifiers and
//! objects) lives in a [`HandleTable`] and is addressed by a typed
//! [`Handle`] made of a slot index and a generation. Releasing the last
//! reference frees the slot and bumps its generation, so a stale handle is
//! detected instead of reaching a reused slot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::dbobject::DbObject;
use crate::error::{Error, Result};
use crate::statement::Statement;
use crate::types::{Lob, RowId};
use crate::variable::Var;

/// Typed handle to a resource in a [`HandleTable`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

/// Handle to a variable
pub type VarHandle = Handle<Var>;
/// Handle to a statement
pub type StmtHandle = Handle<Statement>;
/// Handle to a LOB stream
pub type LobHandle = Handle<Lob>;
/// Handle to a row identifier
pub type RowidHandle = Handle<RowId>;
/// Handle to an object instance
pub type ObjectHandle = Handle<DbObject>;

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation at the time the handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
enum Entry<T> {
    Vacant,
    Occupied { value: T, refs: u32 },
    CheckedOut { refs: u32 },
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Entry<T>,
}

/// Generational arena of reference-counted resources
#[derive(Debug)]
pub struct HandleTable<T> {
    kind: &'static str,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    /// Create an empty table; `kind` names the resource in errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn invalid(&self) -> Error {
        Error::InvalidHandle { kind: self.kind }
    }

    fn slot(&self, handle: Handle<T>) -> Result<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or_else(|| self.invalid())
    }

    fn slot_mut(&mut self, handle: Handle<T>) -> Result<&mut Slot<T>> {
        let kind = self.kind;
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(Error::InvalidHandle { kind })
    }

    /// Store a resource with a reference count of one
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.live += 1;
        let entry = Entry::Occupied { value, refs: 1 };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = entry;
                Handle::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry,
                });
                Handle::new((self.slots.len() - 1) as u32, 0)
            }
        }
    }

    /// Borrow a resource
    pub fn get(&self, handle: Handle<T>) -> Result<&T> {
        match &self.slot(handle)?.entry {
            Entry::Occupied { value, .. } => Ok(value),
            _ => Err(self.invalid()),
        }
    }

    /// Mutably borrow a resource
    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T> {
        let kind = self.kind;
        match &mut self.slot_mut(handle)?.entry {
            Entry::Occupied { value, .. } => Ok(value),
            _ => Err(Error::InvalidHandle { kind }),
        }
    }

    /// Check if the handle refers to a live resource
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slot(handle)
            .map(|slot| !matches!(slot.entry, Entry::Vacant))
            .unwrap_or(false)
    }

    /// Current reference count
    pub fn ref_count(&self, handle: Handle<T>) -> Result<u32> {
        match self.slot(handle)?.entry {
            Entry::Occupied { refs, .. } | Entry::CheckedOut { refs } => Ok(refs),
            Entry::Vacant => Err(self.invalid()),
        }
    }

    /// Take an additional reference
    pub fn add_ref(&mut self, handle: Handle<T>) -> Result<()> {
        let kind = self.kind;
        match &mut self.slot_mut(handle)?.entry {
            Entry::Occupied { refs, .. } | Entry::CheckedOut { refs } => {
                *refs += 1;
                Ok(())
            }
            Entry::Vacant => Err(Error::InvalidHandle { kind }),
        }
    }

    /// Drop a reference, returning the resource when the last one goes away
    pub fn release(&mut self, handle: Handle<T>) -> Result<Option<T>> {
        let kind = self.kind;
        let slot = self.slot_mut(handle)?;
        let refs = match &mut slot.entry {
            Entry::Occupied { refs, .. } | Entry::CheckedOut { refs } => refs,
            Entry::Vacant => return Err(Error::InvalidHandle { kind }),
        };
        if *refs > 1 {
            *refs -= 1;
            return Ok(None);
        }
        if matches!(slot.entry, Entry::CheckedOut { .. }) {
            return Err(Error::InvalidHandle { kind });
        }
        let entry = std::mem::replace(&mut slot.entry, Entry::Vacant);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        match entry {
            Entry::Occupied { value, .. } => Ok(Some(value)),
            _ => Err(Error::Internal("handle slot changed during release".into())),
        }
    }

    /// Check a resource out of the table while it needs access to the table itself
    ///
    /// The slot keeps its reference count and must be given back with
    /// [`restore`](Self::restore). Lookups of a checked-out handle fail.
    pub fn take(&mut self, handle: Handle<T>) -> Result<T> {
        let kind = self.kind;
        let slot = self.slot_mut(handle)?;
        let refs = match slot.entry {
            Entry::Occupied { refs, .. } => refs,
            _ => return Err(Error::InvalidHandle { kind }),
        };
        match std::mem::replace(&mut slot.entry, Entry::CheckedOut { refs }) {
            Entry::Occupied { value, .. } => Ok(value),
            _ => Err(Error::Internal("handle slot changed during checkout".into())),
        }
    }

    /// Return a resource checked out with [`take`](Self::take)
    pub fn restore(&mut self, handle: Handle<T>, value: T) -> Result<()> {
        let kind = self.kind;
        let slot = self.slot_mut(handle)?;
        match slot.entry {
            Entry::CheckedOut { refs } => {
                slot.entry = Entry::Occupied { value, refs };
                Ok(())
            }
            _ => Err(Error::InvalidHandle { kind }),
        }
    }

    /// Number of live resources
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if the table holds no live resources
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
