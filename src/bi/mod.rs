// Binary-info table decoding for RP2040 firmware images
// Reference: https://github.com/raspberrypi/pico-sdk/tree/master/src/common/pico_binary_info

pub mod entry;
pub mod names;
pub mod profile;
pub mod report;
pub mod validate;

use crate::image::{Image, ImageError};
use nom::number::complete::le_u32;
use nom::IResult;
use std::path::Path;
use thiserror::Error;

// Re-export commonly used types
pub use profile::{DeviceProfile, BI_MARKER_END, BI_MARKER_START, XIP_BASE};
pub use report::{Key, PinInfo, Report, Value};
pub use validate::{verify_layout, ValidationMessage};

/// Size of the block bracketed by the two table markers.
pub const DESCRIPTOR_SIZE: usize = 12;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("info table start marker not found")]
    StartMarkerNotFound,

    #[error("info table end marker not found")]
    EndMarkerNotFound,

    #[error("info table descriptor is {0} bytes, expected 12")]
    DescriptorSize(usize),

    #[error("entry range 0x{start:08x}..0x{end:08x} is not ascending")]
    InvalidEntryRange { start: u32, end: u32 },

    #[error("entry table length {0:#x} is not a multiple of 4")]
    MisalignedEntryTable(u32),

    #[error("truncated {0} record in info table")]
    TruncatedEntry(&'static str),

    #[error(transparent)]
    Image(#[from] ImageError),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// The info-table descriptor: device-address bounds of the entry pointer
/// array plus the address mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub entries_start: u32,
    pub entries_end: u32,
    pub mapping_table: u32,
}

fn descriptor_body(input: &[u8]) -> IResult<&[u8], Descriptor> {
    let (input, entries_start) = le_u32(input)?;
    let (input, entries_end) = le_u32(input)?;
    let (input, mapping_table) = le_u32(input)?;
    Ok((
        input,
        Descriptor {
            entries_start,
            entries_end,
            mapping_table,
        },
    ))
}

/// Table decoder bound to one device profile. The default profile matches
/// the RP2040 XIP flash mapping.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    profile: DeviceProfile,
}

impl Decoder {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    pub fn rp2040() -> Self {
        Self::new(DeviceProfile::rp2040())
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Locate the info table inside the image and read its descriptor.
    /// The marker scan starts at the first byte and accepts any offset.
    pub fn descriptor(&self, image: &Image) -> Result<Descriptor> {
        let start = image
            .find(&self.profile.marker_start, 0)
            .ok_or(ParseError::StartMarkerNotFound)?;
        let after = start + self.profile.marker_start.len();
        let end = image
            .find(&self.profile.marker_end, after)
            .ok_or(ParseError::EndMarkerNotFound)?;

        let len = end - after;
        if len != DESCRIPTOR_SIZE {
            return Err(ParseError::DescriptorSize(len));
        }

        let body = image.get(after, Some(DESCRIPTOR_SIZE))?;
        let (_, descriptor) = descriptor_body(body).map_err(|_| ParseError::DescriptorSize(len))?;

        tracing::debug!(
            "info table at {:#x}: entries {:#x}..{:#x}, mapping table {:#x}",
            start,
            descriptor.entries_start,
            descriptor.entries_end,
            descriptor.mapping_table
        );
        Ok(descriptor)
    }

    /// Decode the whole table into an aggregated report.
    pub fn decode(&self, image: &Image) -> Result<Report> {
        let descriptor = self.descriptor(image)?;
        let pointers = self.entry_pointers(image, &descriptor)?;
        tracing::debug!("decoding {} info entries", pointers.len());

        let mut pairs = Vec::new();
        for addr in pointers {
            let offset = self.profile.addr_to_offset(addr);
            if let Some(pair) = entry::decode_entry(image, &self.profile, offset)? {
                pairs.push(pair);
            }
        }
        Ok(Report::from_pairs(pairs))
    }

    fn entry_pointers(&self, image: &Image, descriptor: &Descriptor) -> Result<Vec<u32>> {
        if descriptor.entries_end < descriptor.entries_start {
            return Err(ParseError::InvalidEntryRange {
                start: descriptor.entries_start,
                end: descriptor.entries_end,
            });
        }

        let bytes_len = descriptor.entries_end - descriptor.entries_start;
        if bytes_len % 4 != 0 {
            return Err(ParseError::MisalignedEntryTable(bytes_len));
        }

        let offset = self.profile.addr_to_offset(descriptor.entries_start);
        let table = image.get(offset, Some(bytes_len as usize))?;

        Ok(table
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect())
    }
}

/// Load a firmware file (UF2 or raw binary, by extension) and decode its
/// info table with the default RP2040 profile.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Report> {
    let image = Image::open(path)?;
    Decoder::default().decode(&image)
}
