use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ring buffer empty")]
pub struct BufferEmpty;

/// A growable FIFO queue over a circular backing store.
///
/// `push` and `pop` are amortized O(1); `at` gives random access to anything
/// pushed but not yet popped. When full, the store doubles and the live
/// elements are moved to the front in queue order.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data:  Vec<Option<T>>,
    front: usize,
    len:   usize,
}

impl<T> RingBuffer<T> {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A zero capacity is bumped to one so growth always has something to double.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity.max(1));
        data.resize_with(capacity.max(1), || None);
        RingBuffer { data, front: 0, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, n: usize) -> usize {
        (self.front + n) % self.data.len()
    }

    pub fn push(&mut self, item: T) {
        if self.len == self.data.len() {
            self.grow();
        }
        let back = self.slot(self.len);
        self.data[back] = Some(item);
        self.len += 1;
    }

    pub fn pop(&mut self) -> Result<T, BufferEmpty> {
        if self.len == 0 {
            return Err(BufferEmpty);
        }
        let item = self.data[self.front].take().ok_or(BufferEmpty)?;
        self.front = self.slot(1);
        self.len -= 1;
        Ok(item)
    }

    /// The `n`th element from the front, `0` being the next to pop.
    pub fn at(&self, n: usize) -> Option<&T> {
        if n >= self.len {
            return None;
        }
        self.data[self.slot(n)].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |n| self.at(n))
    }

    // Walks the old store in queue order, not slot order, so a wrapped
    // queue comes out contiguous starting at 0.
    fn grow(&mut self) {
        let capacity = self.data.len() * 2;
        let mut data: Vec<Option<T>> = Vec::with_capacity(capacity);
        for n in 0..self.len {
            let slot = self.slot(n);
            data.push(self.data[slot].take());
        }
        data.resize_with(capacity, || None);
        self.data = data;
        self.front = 0;
    }
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn pop_on_empty_fails() {
        let mut buffer: RingBuffer<u32> = RingBuffer::with_capacity(2);
        assert_eq!(buffer.pop(), Err(BufferEmpty));
        assert!(buffer.is_empty());
    }

    #[test]
    fn fifo_order() {
        let mut buffer = RingBuffer::with_capacity(4);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        assert_eq!(buffer.pop(), Ok(1));
        assert_eq!(buffer.at(0), Some(&2));
        assert_eq!(buffer.at(1), Some(&3));
        assert_eq!(buffer.at(2), None);
    }

    #[test]
    fn grows_when_wrapped() {
        let mut buffer = RingBuffer::with_capacity(3);
        buffer.push('a');
        buffer.push('b');
        buffer.push('c');
        assert_eq!(buffer.pop(), Ok('a'));
        assert_eq!(buffer.pop(), Ok('b'));
        // back wraps around to slot 0 and 1
        buffer.push('d');
        buffer.push('e');
        assert_eq!(buffer.capacity(), 3);

        buffer.push('f');
        assert_eq!(buffer.capacity(), 6);
        assert_eq!(buffer.len(), 4);
        let live: Vec<char> = buffer.iter().copied().collect();
        assert_eq!(live, vec!['c', 'd', 'e', 'f']);
    }

    #[test]
    fn zero_capacity_still_grows() {
        let mut buffer = RingBuffer::with_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        for i in 0..5 {
            buffer.push(i);
        }
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.at(4), Some(&4));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u16),
        Pop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![3 => any::<u16>().prop_map(Op::Push), 1 => Just(Op::Pop)]
    }

    proptest! {
        #[test]
        fn behaves_like_a_deque(ops in proptest::collection::vec(op(), 0..200), capacity in 0usize..6) {
            let mut buffer = RingBuffer::with_capacity(capacity);
            let mut model = VecDeque::new();
            let mut pushes = 0usize;
            let mut pops = 0usize;

            for op in ops {
                match op {
                    Op::Push(value) => {
                        buffer.push(value);
                        model.push_back(value);
                        pushes += 1;
                    }
                    Op::Pop => {
                        let got = buffer.pop().ok();
                        prop_assert_eq!(got, model.pop_front());
                        if got.is_some() {
                            pops += 1;
                        }
                    }
                }

                prop_assert!(buffer.len() <= buffer.capacity());
                prop_assert_eq!(buffer.len(), pushes - pops);
                for (i, expected) in model.iter().enumerate() {
                    prop_assert_eq!(buffer.at(i), Some(expected));
                }
                prop_assert_eq!(buffer.at(model.len()), None);
            }
        }
    }
}
