//! Read caches that sit between a read handle and its range fetcher.

use crate::FsResult;

/// Which cache a read handle uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    /// Every read becomes exactly one range fetch
    None,
    /// Each fetch is widened by one block; sequential reads are served from the retained window
    #[default]
    ReadAhead,
}

/// Per-handle read cache.
///
/// `fetch` answers `[start, end)` of a file of `size` bytes, calling `fetcher` for anything it
/// does not already hold. Ranges are clamped to `size`.
#[derive(Debug)]
pub(crate) enum ReadCache {
    None,
    ReadAhead {
        block_size: usize,
        start: u64,
        buffer: Vec<u8>,
    },
}

impl ReadCache {
    pub(crate) fn new(kind: CacheKind, block_size: usize) -> Self {
        match kind {
            CacheKind::None => ReadCache::None,
            CacheKind::ReadAhead => ReadCache::ReadAhead {
                block_size,
                start: 0,
                buffer: Vec::new(),
            },
        }
    }

    pub(crate) fn fetch(
        &mut self,
        start: u64,
        end: u64,
        size: u64,
        fetcher: impl FnOnce(u64, u64) -> FsResult<Vec<u8>>,
    ) -> FsResult<Vec<u8>> {
        let end = end.min(size);
        if start >= end {
            return Ok(Vec::new());
        }

        match self {
            ReadCache::None => fetcher(start, end),
            ReadCache::ReadAhead {
                block_size,
                start: cached_start,
                buffer,
            } => {
                let cached_end = *cached_start + buffer.len() as u64;

                if start >= *cached_start && end <= cached_end {
                    let from = (start - *cached_start) as usize;
                    let to = (end - *cached_start) as usize;
                    return Ok(buffer[from..to].to_vec());
                }

                // Keep the cached tail that overlaps the request, fetch the rest.
                let (mut out, fetch_from) = if *cached_start <= start && start < cached_end {
                    let from = (start - *cached_start) as usize;
                    (buffer[from..].to_vec(), cached_end)
                } else {
                    (Vec::new(), start)
                };
                let wanted = (end - start) as usize - out.len();

                let fetch_to = end.saturating_add(*block_size as u64).min(size);
                let fetched = fetcher(fetch_from, fetch_to)?;

                out.extend_from_slice(&fetched[..wanted.min(fetched.len())]);
                *cached_start = fetch_from;
                *buffer = fetched;
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const DATA: &[u8] = b"0123456789abcdefghij";

    fn fetcher<'a>(
        calls: &'a RefCell<Vec<(u64, u64)>>,
    ) -> impl FnOnce(u64, u64) -> FsResult<Vec<u8>> + 'a {
        move |start, end| {
            calls.borrow_mut().push((start, end));
            Ok(DATA[start as usize..end as usize].to_vec())
        }
    }

    #[test]
    fn test_no_cache_fetches_exact_range() {
        let calls = RefCell::new(Vec::new());
        let mut cache = ReadCache::new(CacheKind::None, 4);

        assert_eq!(cache.fetch(2, 5, 20, fetcher(&calls)).unwrap(), b"234");
        assert_eq!(cache.fetch(2, 5, 20, fetcher(&calls)).unwrap(), b"234");
        assert_eq!(*calls.borrow(), vec![(2, 5), (2, 5)]);
    }

    #[test]
    fn test_read_ahead_serves_sequential_reads_from_window() {
        let calls = RefCell::new(Vec::new());
        let mut cache = ReadCache::new(CacheKind::ReadAhead, 4);

        assert_eq!(cache.fetch(0, 3, 20, fetcher(&calls)).unwrap(), b"012");
        assert_eq!(cache.fetch(3, 6, 20, fetcher(&calls)).unwrap(), b"345");
        assert_eq!(*calls.borrow(), vec![(0, 7)]);
    }

    #[test]
    fn test_read_ahead_keeps_overlapping_tail() {
        let calls = RefCell::new(Vec::new());
        let mut cache = ReadCache::new(CacheKind::ReadAhead, 4);

        cache.fetch(0, 3, 20, fetcher(&calls)).unwrap();
        assert_eq!(cache.fetch(5, 10, 20, fetcher(&calls)).unwrap(), b"56789");
        assert_eq!(*calls.borrow(), vec![(0, 7), (7, 14)]);
    }

    #[test]
    fn test_read_ahead_refetches_outside_window() {
        let calls = RefCell::new(Vec::new());
        let mut cache = ReadCache::new(CacheKind::ReadAhead, 4);

        cache.fetch(10, 12, 20, fetcher(&calls)).unwrap();
        assert_eq!(cache.fetch(0, 2, 20, fetcher(&calls)).unwrap(), b"01");
        assert_eq!(*calls.borrow(), vec![(10, 16), (0, 6)]);
    }

    #[test]
    fn test_range_is_clamped_to_size() {
        let calls = RefCell::new(Vec::new());
        let mut cache = ReadCache::new(CacheKind::ReadAhead, 4);

        assert_eq!(cache.fetch(18, 40, 20, fetcher(&calls)).unwrap(), b"ij");
        assert!(cache.fetch(20, 25, 20, fetcher(&calls)).unwrap().is_empty());
        assert_eq!(*calls.borrow(), vec![(18, 20)]);
    }
}
