use crate::context::ContextId;
use crate::error::FatalBug;

const INITIAL_CAPACITY: usize = 8;

/// Growable stack of node handles plus the cursor used while a cascade
/// walks it.
///
/// The cursor is an index, not a reference, so growth never invalidates an
/// iteration in flight. During the update cascade it runs from `len() - 1`
/// down to `-1`, where `-1` stands for the owning context itself.
#[derive(Debug, Default, Clone)]
pub struct ContextStack {
    contents: Vec<ContextId>,
    pos: isize,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.contents.capacity()
    }

    pub fn push(&mut self, id: ContextId) {
        if self.contents.len() >= self.contents.capacity() {
            let target = (self.contents.capacity() * 2).max(INITIAL_CAPACITY);
            self.contents.reserve_exact(target - self.contents.len());
        }
        self.contents.push(id);
    }

    /// Remove `id`, scanning from the most recent entry backward, and return
    /// the index it occupied.
    pub fn remove(&mut self, id: ContextId) -> Result<usize, FatalBug> {
        let index = self
            .contents
            .iter()
            .rposition(|entry| *entry == id)
            .ok_or(FatalBug::StackMiss(id))?;
        self.contents.remove(index);
        Ok(index)
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.contents.contains(&id)
    }

    pub fn get(&self, index: usize) -> Option<ContextId> {
        self.contents.get(index).copied()
    }

    pub fn top(&self) -> Option<ContextId> {
        self.contents.last().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ContextId> + '_ {
        self.contents.iter().copied()
    }

    pub fn as_slice(&self) -> &[ContextId] {
        &self.contents
    }

    pub fn pos(&self) -> isize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: isize) {
        self.pos = pos;
    }

    /// Entry under the cursor, if the cursor points inside the stack.
    pub(crate) fn at_pos(&self) -> Option<ContextId> {
        usize::try_from(self.pos).ok().and_then(|index| self.get(index))
    }

    /// Keep an in-flight walk aligned after the entry at `removed` was taken
    /// out from under it.
    pub(crate) fn adjust_for_removal(&mut self, removed: usize) {
        if removed as isize <= self.pos {
            self.pos -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<ContextId> {
        (0..n).map(ContextId).collect()
    }

    #[test]
    fn push_grows_by_doubling() {
        let mut stack = ContextStack::new();
        assert_eq!(stack.capacity(), 0);
        for id in ids(9) {
            stack.push(id);
        }
        assert_eq!(stack.len(), 9);
        assert!(stack.capacity() >= 16);
    }

    #[test]
    fn lifo_removal_leaves_difference() {
        let mut stack = ContextStack::new();
        let all = ids(6);
        for id in &all {
            stack.push(*id);
        }
        for id in all.iter().rev().take(4) {
            stack.remove(*id).unwrap();
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.as_slice(), &all[..2]);
    }

    #[test]
    fn remove_reports_index_and_preserves_order() {
        let mut stack = ContextStack::new();
        for id in ids(4) {
            stack.push(id);
        }
        assert_eq!(stack.remove(ContextId(1)), Ok(1));
        assert_eq!(
            stack.as_slice(),
            &[ContextId(0), ContextId(2), ContextId(3)]
        );
    }

    #[test]
    fn missing_entry_is_a_fatal_miss() {
        let mut stack = ContextStack::new();
        stack.push(ContextId(1));
        assert_eq!(
            stack.remove(ContextId(7)),
            Err(FatalBug::StackMiss(ContextId(7)))
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn removal_at_or_before_cursor_moves_it_back() {
        let mut stack = ContextStack::new();
        for id in ids(4) {
            stack.push(id);
        }
        stack.set_pos(2);
        stack.adjust_for_removal(3);
        assert_eq!(stack.pos(), 2);
        stack.adjust_for_removal(2);
        assert_eq!(stack.pos(), 1);
        stack.adjust_for_removal(0);
        assert_eq!(stack.pos(), 0);
    }

    #[test]
    fn cursor_outside_stack_has_no_entry() {
        let mut stack = ContextStack::new();
        stack.push(ContextId(5));
        stack.set_pos(-1);
        assert_eq!(stack.at_pos(), None);
        stack.set_pos(0);
        assert_eq!(stack.at_pos(), Some(ContextId(5)));
    }
}
