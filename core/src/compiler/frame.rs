use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::ast::DeclId;

/// Frame offsets assigned to local variables during code generation.
///
/// A local's offset is the negated stack height at the moment its
/// initializer has been pushed, so `height + offset` is its displacement from
/// the stack pointer at any later point of the same method. Each declaration
/// is assigned exactly once per compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOffsets {
    offsets: HashMap<DeclId, i32>,
}

impl FrameOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: DeclId) -> Option<i32> {
        self.offsets.get(&id).copied()
    }

    /// Record the offset of `id`.
    ///
    /// Returns the existing offset instead if `id` was already assigned.
    pub fn assign(&mut self, id: DeclId, offset: i32) -> Result<(), i32> {
        match self.offsets.entry(id) {
            Entry::Occupied(existing) => Err(*existing.get()),
            Entry::Vacant(slot) => {
                slot.insert(offset);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// All assignments ordered by declaration id.
    pub fn sorted(&self) -> Vec<(DeclId, i32)> {
        let mut entries: Vec<_> = self.offsets.iter().map(|(id, off)| (*id, *off)).collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }
}
