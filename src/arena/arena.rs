use std::{
    fmt::Debug,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::size_of,
};

use crate::errors::errors::ErrorImpl;

/// Size of one commit step.
pub const PAGE_BYTES: usize = 4096;

/// Default upper bound, in elements, an arena may grow to.
pub const DEFAULT_RESERVE: usize = 1 << 22;

/// Typed index of a value stored in an [`Arena`].
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub(crate) fn new(index: usize) -> Self {
        Id {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// A contiguous run of values allocated together.
pub struct IdRange<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> IdRange<T> {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, n: usize) -> Option<Id<T>> {
        if n < self.len() {
            Some(Id::new(self.start as usize + n))
        } else {
            None
        }
    }
}

impl<T> Clone for IdRange<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IdRange<T> {}

impl<T> Debug for IdRange<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}..#{}", self.start, self.start + self.len)
    }
}

/// Bump arena over values of one type.
///
/// Storage is reserved up to `reserve` elements and committed one page at a
/// time as allocations need it. A single allocation larger than a page grows
/// the committed region by exactly what it needs.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
    committed: usize,
    reserve: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena::with_reserve(DEFAULT_RESERVE)
    }

    pub fn with_reserve(reserve: usize) -> Self {
        Arena {
            items: Vec::new(),
            committed: 0,
            reserve,
        }
    }

    /// Number of elements in one commit step.
    pub fn page_len() -> usize {
        (PAGE_BYTES / size_of::<T>().max(1)).max(1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current bump offset, in elements.
    pub fn offset(&self) -> usize {
        self.items.len()
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn reserve(&self) -> usize {
        self.reserve
    }

    fn commit(&mut self, additional: usize) -> Result<(), ErrorImpl> {
        let needed = self.items.len() + additional;
        if needed <= self.committed {
            return Ok(());
        }
        if needed > self.reserve {
            return Err(ErrorImpl::ArenaExhausted {
                capacity: self.reserve,
            });
        }

        let step = additional.max(Self::page_len());
        let target = (self.committed + step).min(self.reserve).max(needed);
        self.items.reserve_exact(target - self.items.len());
        self.committed = target;
        Ok(())
    }

    pub fn alloc(&mut self, value: T) -> Result<Id<T>, ErrorImpl> {
        self.commit(1)?;
        let id = Id::new(self.items.len());
        self.items.push(value);
        Ok(id)
    }

    /// Allocates every value of `values` contiguously.
    pub fn alloc_slice(&mut self, values: Vec<T>) -> Result<IdRange<T>, ErrorImpl> {
        self.commit(values.len())?;
        let start = self.items.len() as u32;
        let len = values.len() as u32;
        self.items.extend(values);
        Ok(IdRange {
            start,
            len,
            _marker: PhantomData,
        })
    }

    #[track_caller]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.items[id.index()]
    }

    #[track_caller]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.items[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (Id::new(index), item))
    }

    /// Discards everything allocated after `offset`.
    pub(crate) fn rewind(&mut self, offset: usize) {
        self.items.truncate(offset);
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }
}

/// Stack-discipline region carved out of a parent arena.
///
/// Allocations go on top of the parent with a fixed ceiling; dropping the
/// sub-arena rewinds the parent to where the sub-arena started.
#[derive(Debug)]
pub struct SubArena<'p, T> {
    parent: &'p mut Arena<T>,
    base: usize,
    ceiling: usize,
}

impl<'p, T> SubArena<'p, T> {
    pub fn new(parent: &'p mut Arena<T>, ceiling: usize) -> Self {
        let base = parent.offset();
        SubArena {
            parent,
            base,
            ceiling,
        }
    }

    pub fn len(&self) -> usize {
        self.parent.offset() - self.base
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn alloc(&mut self, value: T) -> Result<Id<T>, ErrorImpl> {
        if self.len() >= self.ceiling {
            return Err(ErrorImpl::SubArenaOverflow {
                ceiling: self.ceiling,
            });
        }
        self.parent.alloc(value)
    }

    /// Releases the most recent allocation.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            self.parent.pop()
        }
    }

    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            None
        } else {
            self.parent.items.last_mut()
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.parent.items[self.base..]
    }
}

impl<T> Drop for SubArena<'_, T> {
    fn drop(&mut self) {
        self.parent.rewind(self.base);
    }
}
