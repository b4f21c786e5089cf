// Flattened firmware image storage
// Holds the contiguous binary produced from a raw .bin or an unwrapped UF2

use crate::uf2;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("read of {len} bytes at offset {offset:#x} is outside the {image_len}-byte image")]
    OutOfBounds {
        offset: usize,
        len: usize,
        image_len: usize,
    },

    #[error("string at offset {offset:#x} runs past the end of the image")]
    UnterminatedString { offset: usize },
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Immutable byte store for one flattened firmware binary, addressed by
/// offset from the start of flash. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Vec<u8>,
}

impl Image {
    /// Create an image from already-contiguous binary data.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create an image by unwrapping a UF2 container.
    pub fn from_uf2(data: &[u8]) -> Self {
        Self::new(uf2::unwrap_blocks(data))
    }

    /// Load an image from disk. A `.uf2` extension (case-insensitive) selects
    /// container unwrapping; any other file is taken as a raw binary.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_uf2 = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("uf2"));

        let mut file = File::open(path)?;
        if is_uf2 {
            Ok(Self::new(uf2::read_uf2(file)?))
        } else {
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            Ok(Self::new(data))
        }
    }

    /// Number of bytes in the image.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the image holds any bytes at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a chunk of the image from `offset` for `length` bytes.
    /// If `length` is `None`, returns everything from `offset` to the end.
    pub fn get(&self, offset: usize, length: Option<usize>) -> Result<&[u8]> {
        let end = match length {
            Some(len) => offset.checked_add(len).unwrap_or(usize::MAX),
            None => self.data.len().max(offset),
        };
        if offset > self.data.len() || end > self.data.len() {
            return Err(ImageError::OutOfBounds {
                offset,
                len: end.saturating_sub(offset),
                image_len: self.data.len(),
            });
        }
        Ok(&self.data[offset..end])
    }

    /// Read a NUL-terminated string starting at `offset`. Invalid UTF-8 is
    /// replaced rather than rejected; a string with no terminator before the
    /// end of the image is an error.
    pub fn cstr_at(&self, offset: usize) -> Result<String> {
        let tail = self.get(offset, None)?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(ImageError::UnterminatedString { offset })?;
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }

    /// Find the first occurrence of `needle` at or after `from`.
    pub fn find(&self, needle: &[u8], from: usize) -> Option<usize> {
        if needle.is_empty() || from > self.data.len() {
            return None;
        }
        self.data[from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| from + pos)
    }

    /// The entire image as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Image {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Image {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl AsRef<[u8]> for Image {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({} bytes)", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_creation() {
        let image = Image::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(image.len(), 5);
        assert!(!image.is_empty());
        assert_eq!(image.to_string(), "Image(5 bytes)");

        let empty = Image::new(Vec::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_get_bounds_checking() {
        let image = Image::new(vec![1, 2, 3]);

        assert_eq!(image.get(0, Some(3)).unwrap(), &[1, 2, 3]);
        assert_eq!(image.get(1, None).unwrap(), &[2, 3]);
        assert_eq!(image.get(3, None).unwrap(), &[] as &[u8]);

        assert!(image.get(5, Some(1)).is_err());
        assert!(image.get(2, Some(5)).is_err());
        assert!(image.get(0, Some(usize::MAX)).is_err());
    }

    #[test]
    fn test_cstr_at() {
        let image = Image::new(b"hi\0tail\0".to_vec());
        assert_eq!(image.cstr_at(0).unwrap(), "hi");
        assert_eq!(image.cstr_at(3).unwrap(), "tail");

        // Empty string: terminator is the first byte read.
        assert_eq!(image.cstr_at(2).unwrap(), "");
    }

    #[test]
    fn test_cstr_at_unterminated() {
        let image = Image::new(b"no terminator".to_vec());
        assert!(matches!(
            image.cstr_at(0),
            Err(ImageError::UnterminatedString { offset: 0 })
        ));
    }

    #[test]
    fn test_cstr_at_lossy_utf8() {
        let image = Image::new(vec![0x68, 0x69, 0xFF, 0x00]);
        assert_eq!(image.cstr_at(0).unwrap(), "hi\u{FFFD}");
    }

    #[test]
    fn test_find() {
        let image = Image::new(b"xxMAGICyyMAGICzz".to_vec());
        assert_eq!(image.find(b"MAGIC", 0), Some(2));
        assert_eq!(image.find(b"MAGIC", 3), Some(9));
        assert_eq!(image.find(b"MAGIC", 10), None);
        assert_eq!(image.find(b"MAGIC", 1000), None);
        assert_eq!(image.find(b"missing", 0), None);
    }

    #[test]
    fn test_open_raw_binary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xAA, 0xBB, 0xCC]).unwrap();
        file.flush().unwrap();

        let image = Image::open(file.path()).unwrap();
        assert_eq!(image.as_bytes(), &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_open_uf2_unwraps() {
        let mut block = vec![0u8; uf2::BLOCK_SIZE];
        block[uf2::HEADER_SIZE..uf2::HEADER_SIZE + uf2::DATA_SIZE].fill(0x5A);

        let mut file = tempfile::Builder::new()
            .suffix(".UF2")
            .tempfile()
            .unwrap();
        file.write_all(&block).unwrap();
        file.flush().unwrap();

        let image = Image::open(file.path()).unwrap();
        assert_eq!(image.as_bytes(), &[0x5A; uf2::DATA_SIZE]);
    }
}
