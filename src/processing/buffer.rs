// BUFFER COMPONENT ------------------------------------------------------------

/// Fixed-capacity ring that overwrites its oldest entry once full.
///
/// `index` is always the slot of the *next* write. Logical position `0` is the
/// oldest retained entry; callers never see physical slots.
#[derive(Clone, Debug)]
pub struct CircularBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    index: usize,
    len: usize,
}

impl<T: Copy + Default> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self::filled(capacity, T::default())
    }
}

impl<T: Copy> CircularBuffer<T> {
    /// Creates a ring whose unwritten slots hold `fill`.
    pub fn filled(capacity: usize, fill: T) -> Self {
        assert!(capacity > 0, "CircularBuffer capacity must be non-zero");
        Self {
            buffer: vec![fill; capacity],
            capacity,
            index: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, element: T) {
        self.buffer[self.index] = element;
        self.index = (self.index + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot that the next `push` will write.
    pub fn write_index(&self) -> usize {
        self.index
    }

    fn physical(&self, logical: usize) -> usize {
        // (index - len + logical) mod capacity, without going negative
        (self.index + self.capacity - self.len + logical) % self.capacity
    }

    /// Entry at `logical` position, oldest first.
    pub fn get(&self, logical: usize) -> Option<T> {
        if logical >= self.len {
            return None;
        }
        Some(self.buffer[self.physical(logical)])
    }

    /// Most recently written entry.
    pub fn last(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// The last `count` entries (fewer if not yet written), oldest first.
    pub fn latest(&self, count: usize) -> impl Iterator<Item = T> + '_ {
        let count = count.min(self.len);
        let skip = self.len - count;
        (skip..self.len).map(move |logical| self.buffer[self.physical(logical)])
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.latest(self.len)
    }
}
