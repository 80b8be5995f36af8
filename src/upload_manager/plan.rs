/// 指定大小的文件采用哪种方式上传。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStrategy {
    /// 一次请求携带全部内容。
    Direct,
    /// 通过上传会话按偏移顺序发送分片。
    Chunked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferPlan {
    pub strategy: TransferStrategy,
    pub chunk_size: u64,
    pub total_size: u64,
}

impl TransferPlan {
    /// 不超过 `limit` 字节（含）的文件直接上传；更大的文件按 `chunk_size`
    /// 切分，最后一片可能较短。
    pub fn new(size_bytes: u64, limit: u64, chunk_size: u64) -> Self {
        if size_bytes <= limit {
            TransferPlan {
                strategy: TransferStrategy::Direct,
                chunk_size: size_bytes,
                total_size: size_bytes,
            }
        } else {
            TransferPlan {
                strategy: TransferStrategy::Chunked,
                chunk_size: chunk_size.max(1),
                total_size: size_bytes,
            }
        }
    }

    pub fn chunk_count(&self) -> u64 {
        if self.total_size == 0 {
            return 0;
        }
        self.total_size.div_ceil(self.chunk_size.max(1))
    }

    /// 返回新的分片迭代器，总是从偏移 0 开始。
    pub fn chunks(&self) -> ChunkRanges {
        ChunkRanges {
            next_offset: 0,
            chunk_size: self.chunk_size.max(1),
            total_size: self.total_size,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    pub offset: u64,
    pub len: u64,
}

impl ChunkRange {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// 按顺序覆盖 `[0, total_size)` 的连续且不重叠的分片。
#[derive(Clone, Debug)]
pub struct ChunkRanges {
    next_offset: u64,
    chunk_size: u64,
    total_size: u64,
}

impl Iterator for ChunkRanges {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        let remaining = self.total_size.saturating_sub(self.next_offset);
        if remaining == 0 {
            return None;
        }
        let range = ChunkRange {
            offset: self.next_offset,
            len: remaining.min(self.chunk_size),
        };
        self.next_offset = range.end();
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self
            .total_size
            .saturating_sub(self.next_offset)
            .div_ceil(self.chunk_size);
        let left = usize::try_from(left).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}
