use smallvec::SmallVec;

/// Head-indexed FIFO with inline storage for the common short burst.
///
/// Items are taken out of their slot on pop; the slots are released once the
/// head catches up with the tail so a long stream does not keep growing them.
#[derive(Debug)]
pub struct PendingQueue<T> {
    slots: SmallVec<[Option<T>; 4]>,
    head: usize,
}

impl<T> PendingQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, item: T) {
        self.slots.push(Some(item));
    }

    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        let item = self.slots.get_mut(self.head)?.take();
        self.head += 1;
        if self.head == self.slots.len() {
            self.clear();
        }
        item
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.head
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for PendingQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.slots.extend(iter.into_iter().map(Some));
    }
}
