//! Byte-range planning for chunked uploads.

/// Splits a file of `file_size` bytes into ranges of at most `chunk_size`.
///
/// The plan is pure arithmetic; no bytes are read until a chunk is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Creates a plan. A zero `chunk_size` produces an empty plan.
    #[must_use]
    pub fn new(file_size: u64, chunk_size: u64) -> Self {
        Self {
            file_size,
            chunk_size,
        }
    }

    /// Number of chunks: `ceil(file_size / chunk_size)`.
    #[must_use]
    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.file_size.div_ceil(self.chunk_size)
    }

    /// Iterates the byte ranges in sequence order.
    pub fn ranges(self) -> impl Iterator<Item = ChunkRange> {
        let count = self.chunk_count();
        (0..count).map(move |index| {
            let offset = index * self.chunk_size;
            let length = self.chunk_size.min(self.file_size - offset);
            ChunkRange {
                sequence: index + 1,
                offset,
                length,
                is_last: index + 1 == count,
            }
        })
    }

    /// Pairs each range with its upload URL.
    ///
    /// Stops at the shorter of the two sequences; sessions are validated
    /// against the plan before any chunk is built.
    pub fn chunks(self, urls: &[String]) -> impl Iterator<Item = Chunk> + '_ {
        self.ranges().zip(urls).map(|(range, url)| Chunk {
            range,
            url: url.clone(),
        })
    }
}

/// One byte range of the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// 1-based position in the upload.
    pub sequence: u64,
    /// Offset of the first byte.
    pub offset: u64,
    /// Number of bytes.
    pub length: u64,
    /// `true` for the final range.
    pub is_last: bool,
}

/// A byte range together with the URL it must be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The bytes to send.
    pub range: ChunkRange,
    /// Pre-assigned upload URL.
    pub url: String,
}

impl Chunk {
    /// 1-based chunk number sent as `X-Chunk-Number`.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.range.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_lengths_sum_to_file_size() {
        for (size, chunk) in [(1, 1), (10, 4), (12, 4), (4_194_305, 4_194_304), (7, 100)] {
            let plan = ChunkPlan::new(size, chunk);
            let total: u64 = plan.ranges().map(|r| r.length).sum();
            assert_eq!(total, size, "size {size} chunk {chunk}");
            assert_eq!(plan.ranges().count() as u64, size.div_ceil(chunk));
        }
    }

    #[test]
    fn test_ranges_are_contiguous_and_last_is_flagged() {
        let ranges: Vec<_> = ChunkPlan::new(10, 4).ranges().collect();
        assert_eq!(ranges.len(), 3);
        assert_eq!((ranges[0].offset, ranges[0].length), (0, 4));
        assert_eq!((ranges[1].offset, ranges[1].length), (4, 4));
        assert_eq!((ranges[2].offset, ranges[2].length), (8, 2));
        assert_eq!(ranges[2].sequence, 3);
        assert!(ranges[2].is_last);
        assert!(!ranges[0].is_last && !ranges[1].is_last);
    }

    #[test]
    fn test_empty_file_and_zero_chunk_size_yield_no_chunks() {
        assert_eq!(ChunkPlan::new(0, 4).chunk_count(), 0);
        assert_eq!(ChunkPlan::new(10, 0).chunk_count(), 0);
        assert_eq!(ChunkPlan::new(10, 0).ranges().count(), 0);
    }

    #[test]
    fn test_chunks_pair_urls_in_order() {
        let urls = vec!["https://u/1".to_string(), "https://u/2".to_string()];
        let chunks: Vec<_> = ChunkPlan::new(6, 3).chunks(&urls).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].url, "https://u/1");
        assert_eq!(chunks[1].sequence(), 2);
        assert!(chunks[1].range.is_last);
    }
}
