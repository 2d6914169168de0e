/// Lazy fixed-size batching over any iterator.
///
/// Each chunk holds at most `size` items in source order. The source is
/// only advanced far enough to fill the chunk being pulled. An exhausted
/// source never produces an empty trailing chunk; a source that runs out
/// mid-chunk produces one final short chunk. The retry loop in the
/// pipeline leans on this boundary to detect an emptied queue.
pub struct Chunks<I: Iterator> {
    inner: I,
    size: usize,
}

/// Panics if `size` is zero.
pub fn chunks<I>(iter: I, size: usize) -> Chunks<I::IntoIter>
where
    I: IntoIterator,
{
    assert!(size > 0, "chunk size must be positive");
    Chunks {
        inner: iter.into_iter(),
        size,
    }
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Vec<I::Item>> {
        // pull the first item up front so exhaustion ends the chunk
        // sequence instead of yielding an empty chunk
        let first = self.inner.next()?;
        let mut chunk = Vec::with_capacity(self.size);
        chunk.push(first);
        while chunk.len() < self.size {
            match self.inner.next() {
                Some(item) => chunk.push(item),
                None => break,
            }
        }
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::chunks;

    #[test]
    fn fourteen_items_in_chunks_of_five() {
        let mut it = chunks(0..14, 5);
        assert_eq!(it.next().unwrap().len(), 5);
        assert_eq!(it.next().unwrap().len(), 5);
        assert_eq!(it.next().unwrap().len(), 4);
        assert!(it.next().is_none());
        // stays exhausted
        assert!(it.next().is_none());
    }

    #[test]
    fn concatenated_chunks_reproduce_the_source() {
        for n in 1..8usize {
            let rebuilt: Vec<i32> = chunks(0..14, n).flatten().collect();
            assert_eq!(rebuilt, (0..14).collect::<Vec<i32>>());
            for chunk in chunks(0..14, n) {
                assert!(!chunk.is_empty());
                assert!(chunk.len() <= n);
            }
        }
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let sizes: Vec<usize> = chunks(0..10, 5).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![5, 5]);
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(chunks(std::iter::empty::<u8>(), 3).next().is_none());
    }

    #[test]
    fn chunks_are_pulled_lazily() {
        let pulled = std::cell::Cell::new(0);
        let counted = (0..100).inspect(|_| pulled.set(pulled.get() + 1));
        let mut it = chunks(counted, 5);
        let _ = it.next();
        assert_eq!(pulled.get(), 5);
    }

    #[test]
    #[should_panic(expected = "chunk size must be positive")]
    fn zero_chunk_size_panics() {
        let _ = chunks(0..3, 0);
    }
}
