/// Fixed-capacity FIFO that evicts the oldest entry on overflow.
///
/// Every bounded history in the engine (detection history, emotion timeline,
/// gesture buckets, pitch samples) is one of these.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    buf: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || None);
        Self {
            buf,
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value`, returning the evicted oldest entry when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let cap = self.capacity();
        let idx = (self.head + self.len) % cap;

        if self.len < cap {
            self.buf[idx] = Some(value);
            self.len += 1;
            None
        } else {
            let evicted = self.buf[self.head].take();
            self.buf[self.head] = Some(value);
            self.head = (self.head + 1) % cap;
            evicted
        }
    }

    pub fn get(&self, index_from_oldest: usize) -> Option<&T> {
        if index_from_oldest >= self.len {
            return None;
        }
        let cap = self.capacity();
        let idx = (self.head + index_from_oldest) % cap;
        self.buf[idx].as_ref()
    }

    pub fn last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// The trailing `n` entries (fewer if not yet filled), oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let start = self.len.saturating_sub(n);
        (start..self.len).filter_map(move |i| self.get(i))
    }

    pub fn clear(&mut self) {
        for slot in &mut self.buf {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
