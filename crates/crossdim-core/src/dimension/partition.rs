//! Arrival-ordered record partitions.

/// Records tagged with their arrival sequence, kept in ascending sequence
/// order through every split and merge.
pub(crate) struct Partition<R> {
    records: Vec<R>,
    seqs: Vec<u64>,
}

impl<R> Default for Partition<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            seqs: Vec::new(),
        }
    }
}

impl<R> Partition<R> {
    /// Append a record. `seq` must exceed every sequence already held.
    pub(crate) fn push(&mut self, seq: u64, record: R) {
        debug_assert!(self.seqs.last().is_none_or(|last| *last < seq));
        self.seqs.push(seq);
        self.records.push(record);
    }

    pub(crate) fn as_slice(&self) -> &[R] {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.seqs.clear();
    }

    /// Split into `(passing, failing)`, both in arrival order.
    pub(crate) fn split_by(self, mut predicate: impl FnMut(&R) -> bool) -> (Self, Self) {
        let mut passing = Self::default();
        let mut failing = Self::default();
        for (seq, record) in self.seqs.into_iter().zip(self.records) {
            if predicate(&record) {
                passing.push(seq, record);
            } else {
                failing.push(seq, record);
            }
        }
        (passing, failing)
    }

    /// Merge `other` in by arrival sequence.
    pub(crate) fn merge(&mut self, other: Self) {
        if other.seqs.is_empty() {
            return;
        }

        let ours = std::mem::take(self);
        let mut left = ours.seqs.into_iter().zip(ours.records).peekable();
        let mut right = other.seqs.into_iter().zip(other.records).peekable();

        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some((a, _)), Some((b, _))) => a < b,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            if let Some((seq, record)) = next {
                self.push(seq, record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Partition;

    fn of(items: &[(u64, char)]) -> Partition<char> {
        let mut partition = Partition::default();
        for (seq, record) in items {
            partition.push(*seq, *record);
        }
        partition
    }

    #[test]
    fn split_keeps_arrival_order() {
        let (vowels, rest) =
            of(&[(0, 'a'), (1, 'b'), (2, 'e'), (3, 'c')]).split_by(|c| "ae".contains(*c));
        assert_eq!(vowels.as_slice(), ['a', 'e']);
        assert_eq!(rest.as_slice(), ['b', 'c']);
    }

    #[test]
    fn merge_interleaves_by_sequence() {
        let mut partition = of(&[(1, 'b'), (4, 'e')]);
        partition.merge(of(&[(0, 'a'), (2, 'c'), (3, 'd'), (7, 'h')]));
        assert_eq!(partition.as_slice(), ['a', 'b', 'c', 'd', 'e', 'h']);
        assert_eq!(partition.len(), 6);
    }
}
