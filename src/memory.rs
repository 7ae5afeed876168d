use crate::common::word::Word;
use crate::error::ExceptionalHalt;

/// Anything past this is unpayable with any realistic gas limit.
const MAX_MEMORY: u64 = u32::MAX as u64;

/// A non-empty memory range resolved from stack operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub size: usize,
}

impl Region {
    /// `None` for zero size: such a range never expands memory, whatever its offset.
    pub fn resolve(offset: Word, size: Word) -> Result<Option<Region>, ExceptionalHalt> {
        if size.is_zero() {
            return Ok(None);
        }
        let offset = offset.to_u64().ok_or(ExceptionalHalt::OutOfGas)?;
        let size = size.to_u64().ok_or(ExceptionalHalt::OutOfGas)?;
        let end = offset.checked_add(size).ok_or(ExceptionalHalt::OutOfGas)?;
        if end > MAX_MEMORY {
            return Err(ExceptionalHalt::OutOfGas);
        }
        Ok(Some(Region {
            offset: offset as usize,
            size: size as usize,
        }))
    }

    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Byte-addressable frame memory, grown in 32-byte words, never shrunk.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes after growing to cover `end`, rounded up to a word.
    pub fn size_for(&self, end: usize) -> usize {
        self.data.len().max(end.div_ceil(32) * 32)
    }

    pub fn resize(&mut self, size: usize) {
        if size > self.data.len() {
            self.data.resize(size, 0);
        }
    }

    pub fn load(&self, offset: usize) -> Word {
        Word::from_bytes(&self.data[offset..offset + 32])
    }

    pub fn store(&mut self, offset: usize, word: &Word) {
        self.data[offset..offset + 32].copy_from_slice(&word.into_bytes());
    }

    pub fn store_byte(&mut self, offset: usize, byte: u8) {
        self.data[offset] = byte;
    }

    pub fn get(&self, region: Option<Region>) -> &[u8] {
        match region {
            Some(Region { offset, size }) => &self.data[offset..offset + size],
            None => &[],
        }
    }

    /// Copies `region.size` bytes of `src` starting at `src_offset`, zero-filling
    /// whatever lies past the end of `src`.
    pub fn copy_padded(&mut self, region: Region, src: &[u8], src_offset: u64) {
        let dst = &mut self.data[region.offset..region.end()];
        let start = usize::try_from(src_offset).unwrap_or(usize::MAX).min(src.len());
        let available = (src.len() - start).min(region.size);
        dst[..available].copy_from_slice(&src[start..start + available]);
        dst[available..].fill(0);
    }

    /// Writes as much of `src` as fits into `region`, leaving the rest untouched.
    pub fn write_truncated(&mut self, region: Region, src: &[u8]) {
        let n = region.size.min(src.len());
        self.data[region.offset..region.offset + n].copy_from_slice(&src[..n]);
    }

    pub fn copy_within(&mut self, src: usize, dst: usize, size: usize) {
        self.data.copy_within(src..src + size, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(Region::resolve(Word::max(), Word::zero()), Ok(None));
        assert_eq!(
            Region::resolve(Word::from(4u8), Word::from(8u8)),
            Ok(Some(Region { offset: 4, size: 8 }))
        );
        assert_eq!(
            Region::resolve(Word::max(), Word::one()),
            Err(ExceptionalHalt::OutOfGas)
        );
        assert_eq!(
            Region::resolve(Word::from(u64::MAX), Word::from(2u8)),
            Err(ExceptionalHalt::OutOfGas)
        );
    }

    #[test]
    fn test_word_aligned_growth() {
        let mut memory = Memory::new();
        assert_eq!(memory.size_for(1), 32);
        assert_eq!(memory.size_for(33), 64);
        memory.resize(memory.size_for(33));
        assert_eq!(memory.len(), 64);
        assert_eq!(memory.size_for(10), 64);
        memory.resize(32);
        assert_eq!(memory.len(), 64);
        assert!(memory.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_copy_padded() {
        let mut memory = Memory::new();
        memory.resize(32);
        memory.store(0, &Word::max());
        memory.copy_padded(Region { offset: 0, size: 4 }, &[1, 2, 3], 1);
        assert_eq!(&memory.data()[..5], &[2, 3, 0, 0, 0xff]);
        memory.copy_padded(Region { offset: 0, size: 2 }, &[1, 2, 3], u64::MAX);
        assert_eq!(&memory.data()[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_load_store() {
        let mut memory = Memory::new();
        memory.resize(64);
        memory.store(1, &Word::from(0xabcdu32));
        assert_eq!(memory.load(1), Word::from(0xabcdu32));
        memory.store_byte(63, 7);
        assert_eq!(&memory.data()[31..33], &[0xab, 0xcd]);
        assert_eq!(memory.data()[63], 7);
        memory.copy_within(31, 0, 2);
        assert_eq!(&memory.data()[..2], &[0xab, 0xcd]);
    }
}
