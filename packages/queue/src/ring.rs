//! Fixed-capacity ring of job slots.

use queue_core::JobRef;

/// Power-of-two ring buffer of job references.
///
/// `head == tail` means empty; one slot is always left free so that
/// `next(tail) == head` means full. Slots in `[head, tail)` are occupied.
pub(crate) struct Ring<P> {
    slots: Box<[Option<JobRef<P>>]>,
    mask: usize,
    head: usize,
    tail: usize,
}

impl<P> Ring<P> {
    /// `capacity` must already be validated as a power of two >= 2.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity >= 2 && capacity.is_power_of_two());
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
            head: 0,
            tail: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    pub(crate) fn tail(&self) -> usize {
        self.tail
    }

    pub(crate) fn next(&self, index: usize) -> usize {
        (index + 1) & self.mask
    }

    pub(crate) fn len(&self) -> usize {
        self.tail.wrapping_sub(self.head) & self.mask
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub(crate) fn is_full(&self) -> bool {
        self.next(self.tail) == self.head
    }

    /// Place a job at the tail, handing it back if the ring is full.
    pub(crate) fn push(&mut self, job: JobRef<P>) -> Result<(), JobRef<P>> {
        if self.is_full() {
            return Err(job);
        }
        self.slots[self.tail] = Some(job);
        self.tail = self.next(self.tail);
        Ok(())
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&JobRef<P>> {
        self.slots[index & self.mask].as_ref()
    }

    pub(crate) fn front(&self) -> Option<&JobRef<P>> {
        if self.is_empty() {
            None
        } else {
            self.slot(self.head)
        }
    }

    /// Forget the job at the head and advance past its slot.
    pub(crate) fn retire_head(&mut self) -> Option<JobRef<P>> {
        if self.is_empty() {
            return None;
        }
        let job = self.slots[self.head].take();
        self.head = self.next(self.head);
        job
    }

    /// Occupied slots from head to tail.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &JobRef<P>> + '_ {
        let mut index = self.head;
        std::iter::from_fn(move || {
            while index != self.tail {
                let current = index;
                index = self.next(index);
                if let Some(job) = self.slots[current].as_ref() {
                    return Some(job);
                }
            }
            None
        })
    }
}
