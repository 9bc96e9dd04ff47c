use crate::domain::entry::RequestEntry;
use std::collections::VecDeque;

// FIFO queue of waiting tickets. All mutation happens under the engine's
// single lock, which is what makes `retrieve` an indivisible test-and-remove:
// no other caller can observe an entry between the predicate passing and the
// removal.
#[derive(Debug, Default)]
pub struct RequestQueue {
    entries: VecDeque<RequestEntry>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, entry: RequestEntry) {
        self.entries.push_back(entry);
    }

    // Remove and return the first entry satisfying the predicate, scanning in
    // arrival order.
    pub fn retrieve<P>(&mut self, predicate: P) -> Option<RequestEntry>
    where
        P: Fn(&RequestEntry) -> bool,
    {
        let index = self.entries.iter().position(|entry| predicate(entry))?;
        self.entries.remove(index)
    }

    // Drop every entry failing `keep` and hand the removed entries back so the
    // sweeper can emit timeout events for them.
    pub fn clean<P>(&mut self, keep: P) -> Vec<RequestEntry>
    where
        P: Fn(&RequestEntry) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if keep(&entry) {
                kept.push_back(entry);
            } else {
                removed.push(entry);
            }
        }
        self.entries = kept;
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
