//! Resources stored as a sequence of independently compressed blocks.
use super::{ExportStream, Exporter};
use crate::accessor::ArcReader;
use crate::error::{ArcError, ArcResult};
use crate::ext::io::MemReader;
use std::io::Read;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    /// Absolute offset of the stored block.
    pub offset: u64,
    pub compressed_length: u64,
    pub decompressed_length: u64,
}

/// Concatenates the outputs of one codec applied to each block in turn.
#[derive(Clone, Debug)]
pub struct BlockExporter {
    inner: Arc<dyn Exporter>,
    blocks: Vec<Block>,
}

impl BlockExporter {
    pub fn new(inner: Arc<dyn Exporter>, blocks: Vec<Block>) -> Self {
        BlockExporter { inner, blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn decompressed_length(&self) -> u64 {
        self.blocks.iter().map(|b| b.decompressed_length).sum()
    }

    pub fn compressed_length(&self) -> u64 {
        self.blocks.iter().map(|b| b.compressed_length).sum()
    }
}

/// Compresses `data` in `block_size` chunks. Block offsets are relative to
/// the start of the returned buffer.
pub fn pack_blocks(inner: &dyn Exporter, data: &[u8], block_size: usize) -> ArcResult<(Vec<u8>, Vec<Block>)> {
    if block_size == 0 {
        return Err(ArcError::implausible("block size", 0));
    }
    let mut out = Vec::new();
    let mut blocks = Vec::with_capacity(data.len().div_ceil(block_size));
    for chunk in data.chunks(block_size) {
        let packed = inner.pack(chunk)?;
        blocks.push(Block {
            offset: out.len() as u64,
            compressed_length: packed.len() as u64,
            decompressed_length: chunk.len() as u64,
        });
        out.extend_from_slice(&packed);
    }
    Ok((out, blocks))
}

enum BlockSource<'a> {
    /// Blocks are fetched from their absolute offsets.
    Absolute(&'a mut ArcReader),
    /// Blocks follow one another in a single stream.
    Sequential(Box<dyn Read + 'a>),
}

struct BlockStream<'a> {
    source: BlockSource<'a>,
    inner: Arc<dyn Exporter>,
    blocks: Vec<Block>,
    next: usize,
    current: Option<Box<dyn Read + 'static>>,
    current_left: u64,
}

impl BlockStream<'_> {
    fn open_next(&mut self) -> ArcResult<bool> {
        let block = match self.blocks.get(self.next) {
            Some(b) => *b,
            None => return Ok(false),
        };
        self.next += 1;
        let data = match &mut self.source {
            BlockSource::Absolute(reader) => {
                reader.read_bytes_at(block.offset, block.compressed_length)?
            }
            BlockSource::Sequential(source) => {
                let mut data = Vec::new();
                source.take(block.compressed_length).read_to_end(&mut data)?;
                if data.len() as u64 != block.compressed_length {
                    return Err(ArcError::codec("blocks", "stored block is truncated"));
                }
                data
            }
        };
        let decoder = self.inner.decoder(
            Box::new(MemReader::new(data)),
            block.compressed_length,
            block.decompressed_length,
        )?;
        self.current = Some(Box::new(decoder.take(block.decompressed_length)));
        self.current_left = block.decompressed_length;
        Ok(true)
    }
}

impl Read for BlockStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(current) = self.current.as_mut() {
                if self.current_left > 0 {
                    let n = current.read(buf)?;
                    if n == 0 {
                        let index = self.next - 1;
                        return Err(ArcError::codec(
                            "blocks",
                            format!("block {} ended {} bytes short", index, self.current_left),
                        )
                        .into());
                    }
                    self.current_left -= n as u64;
                    return Ok(n);
                }
                self.current = None;
            }
            if !self.open_next()? {
                return Ok(0);
            }
        }
    }
}

impl Exporter for BlockExporter {
    fn name(&self) -> &'static str {
        "blocks"
    }

    /// Reads the blocks back to back from `source`.
    fn decoder<'a>(
        &self,
        source: Box<dyn Read + 'a>,
        _compressed_len: u64,
        _decompressed_len: u64,
    ) -> ArcResult<Box<dyn Read + 'a>> {
        Ok(Box::new(BlockStream {
            source: BlockSource::Sequential(source),
            inner: self.inner.clone(),
            blocks: self.blocks.clone(),
            next: 0,
            current: None,
            current_left: 0,
        }))
    }

    /// Block offsets are absolute, so `offset` and `compressed_len` only
    /// need to describe the span the blocks occupy.
    fn open<'a>(
        &self,
        reader: &'a mut ArcReader,
        _offset: u64,
        _compressed_len: u64,
        decompressed_len: u64,
    ) -> ArcResult<ExportStream<'a>> {
        let total = self.decompressed_length();
        if total != decompressed_len {
            return Err(ArcError::Mismatch {
                field: "decompressedLength",
                expected: total.to_string(),
                found: decompressed_len.to_string(),
            });
        }
        for block in &self.blocks {
            if block
                .offset
                .checked_add(block.compressed_length)
                .is_none_or(|end| end > reader.len())
            {
                return Err(ArcError::OutOfBounds {
                    pos: block.offset,
                    len: block.compressed_length,
                    size: reader.len(),
                });
            }
        }
        let stream = BlockStream {
            source: BlockSource::Absolute(reader),
            inner: self.inner.clone(),
            blocks: self.blocks.clone(),
            next: 0,
            current: None,
            current_left: 0,
        };
        Ok(ExportStream::new(self.name(), Box::new(stream), total))
    }

    fn can_pack(&self) -> bool {
        self.inner.can_pack()
    }

    /// Packs into blocks of the same decompressed sizes as this exporter's.
    fn pack(&self, data: &[u8]) -> ArcResult<Vec<u8>> {
        let block_size = self
            .blocks
            .first()
            .map(|b| b.decompressed_length as usize)
            .filter(|&s| s > 0)
            .unwrap_or(data.len().max(1));
        Ok(pack_blocks(self.inner.as_ref(), data, block_size)?.0)
    }
}
