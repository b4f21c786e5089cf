// Entry records referenced by the info-table pointer array
// Reference: https://github.com/raspberrypi/pico-sdk/blob/master/src/common/pico_binary_info/include/pico/binary_info/structure.h

use super::names;
use super::profile::DeviceProfile;
use super::report::{BlockDevice, Key, NamedGroup, PinInfo, PinMap, Value};
use super::{ParseError, Result};
use crate::image::Image;
use nom::number::complete::{le_u16, le_u32};
use nom::IResult;

/// Entry type codes carried in the first half-word of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    RawData,
    SizedData,
    ZeroTerminatedList,
    Bson,
    IdAndInt,
    IdAndString,
    BlockDevice,
    PinsWithFunc,
    PinsWithName,
    NamedGroup,
    Unknown(u16),
}

impl EntryType {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => EntryType::RawData,
            2 => EntryType::SizedData,
            3 => EntryType::ZeroTerminatedList,
            4 => EntryType::Bson,
            5 => EntryType::IdAndInt,
            6 => EntryType::IdAndString,
            7 => EntryType::BlockDevice,
            8 => EntryType::PinsWithFunc,
            9 => EntryType::PinsWithName,
            10 => EntryType::NamedGroup,
            other => EntryType::Unknown(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            EntryType::RawData => 1,
            EntryType::SizedData => 2,
            EntryType::ZeroTerminatedList => 3,
            EntryType::Bson => 4,
            EntryType::IdAndInt => 5,
            EntryType::IdAndString => 6,
            EntryType::BlockDevice => 7,
            EntryType::PinsWithFunc => 8,
            EntryType::PinsWithName => 9,
            EntryType::NamedGroup => 10,
            EntryType::Unknown(code) => *code,
        }
    }

    /// Display label used in log messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntryType::RawData => "Raw Data",
            EntryType::SizedData => "Sized Data",
            EntryType::ZeroTerminatedList => "Zero Terminated List",
            EntryType::Bson => "BSON",
            EntryType::IdAndInt => "ID & Int",
            EntryType::IdAndString => "ID & Str",
            EntryType::BlockDevice => "Block Device",
            EntryType::PinsWithFunc => "Pins With Func",
            EntryType::PinsWithName => "Pins With Name",
            EntryType::NamedGroup => "Named Group",
            EntryType::Unknown(_) => "Unknown",
        }
    }
}

struct BlockDeviceBody {
    name_addr: u32,
    address: u32,
    size: u32,
    flags: u16,
}

struct NamedGroupBody {
    parent: u32,
    flags: u16,
    tag: u16,
    id: u32,
    label_addr: u32,
}

/// Every entry opens with a type code and a two-byte owner tag.
fn entry_header(input: &[u8]) -> IResult<&[u8], (u16, [u8; 2])> {
    let (input, type_code) = le_u16(input)?;
    let (input, tag) = le_u16(input)?;
    Ok((input, (type_code, tag.to_le_bytes())))
}

/// Two consecutive words: (id, value), (id, string address) or
/// (pin mask, string address) depending on the entry type.
fn word_pair(input: &[u8]) -> IResult<&[u8], (u32, u32)> {
    let (input, first) = le_u32(input)?;
    let (input, second) = le_u32(input)?;
    Ok((input, (first, second)))
}

fn packed_pins(input: &[u8]) -> IResult<&[u8], u32> {
    le_u32(input)
}

fn block_device_body(input: &[u8]) -> IResult<&[u8], BlockDeviceBody> {
    let (input, name_addr) = le_u32(input)?;
    let (input, address) = le_u32(input)?;
    let (input, size) = le_u32(input)?;
    let (input, _more_info_addr) = le_u32(input)?;
    let (input, flags) = le_u16(input)?;
    Ok((
        input,
        BlockDeviceBody {
            name_addr,
            address,
            size,
            flags,
        },
    ))
}

fn named_group_body(input: &[u8]) -> IResult<&[u8], NamedGroupBody> {
    let (input, parent) = le_u32(input)?;
    let (input, flags) = le_u16(input)?;
    let (input, tag) = le_u16(input)?;
    let (input, id) = le_u32(input)?;
    let (input, label_addr) = le_u32(input)?;
    Ok((
        input,
        NamedGroupBody {
            parent,
            flags,
            tag,
            id,
            label_addr,
        },
    ))
}

/// Unpack a pins-with-function word. Bits 0-2 select the encoding, bits
/// 3-6 the function code and the remaining bits the pin data. Encoding 1
/// carries five 5-bit pin slots (lowest bits first, all five decoded, so
/// unused slots alias pin 0); encoding 2 an inclusive range with the end
/// in the low slot and the start in the next.
pub fn unpack_pins_with_func(packed: u32) -> (u8, Vec<u8>) {
    let encoding = packed & 0b111;
    let func = ((packed >> 3) & 0b1111) as u8;
    let mut data = packed >> 7;

    let pins = match encoding {
        0b001 => {
            let mut pins = Vec::with_capacity(5);
            for _ in 0..5 {
                pins.push((data & 0b11111) as u8);
                data >>= 5;
            }
            pins
        }
        0b010 => {
            let end = (data & 0b11111) as u8;
            let start = ((data >> 5) & 0b11111) as u8;
            (start..=end).collect()
        }
        other => {
            tracing::debug!("unrecognized pin encoding {} in {:#010x}", other, packed);
            Vec::new()
        }
    };

    (func, pins)
}

/// Follow a device-address pointer to its NUL-terminated string.
fn read_string(image: &Image, profile: &DeviceProfile, addr: u32) -> Result<String> {
    Ok(image.cstr_at(profile.addr_to_offset(addr))?)
}

/// Decode the entry at `offset` into a (key, value) pair. Entries whose
/// tag is not in the profile's include list, or whose type has no
/// decoder, come back as `Ok(None)`.
pub fn decode_entry(
    image: &Image,
    profile: &DeviceProfile,
    offset: usize,
) -> Result<Option<(Key, Value)>> {
    let input = image.get(offset, None)?;
    let (input, (type_code, tag)) =
        entry_header(input).map_err(|_| ParseError::TruncatedEntry("entry header"))?;

    if !profile.tag_included(tag) {
        tracing::debug!(
            "skipping entry at {:#x} with tag {:?}",
            offset,
            String::from_utf8_lossy(&tag)
        );
        return Ok(None);
    }

    let kind = EntryType::from_code(type_code);
    match kind {
        EntryType::IdAndInt => {
            let (_, (id, value)) =
                word_pair(input).map_err(|_| ParseError::TruncatedEntry("id and int"))?;
            Ok(Some((Key::for_id(id), Value::Int(value))))
        }
        EntryType::IdAndString => {
            let (_, (id, str_addr)) =
                word_pair(input).map_err(|_| ParseError::TruncatedEntry("id and string"))?;
            let value = read_string(image, profile, str_addr)?;
            Ok(Some((Key::for_id(id), Value::Str(value))))
        }
        EntryType::BlockDevice => {
            let (_, body) =
                block_device_body(input).map_err(|_| ParseError::TruncatedEntry("block device"))?;
            let name = read_string(image, profile, body.name_addr)?;
            Ok(Some((
                Key::name("BlockDevice"),
                Value::Device(BlockDevice {
                    name,
                    address: body.address,
                    size: body.size,
                    flags: body.flags,
                }),
            )))
        }
        EntryType::PinsWithFunc => {
            let (_, packed) =
                packed_pins(input).map_err(|_| ParseError::TruncatedEntry("pins with func"))?;
            let (func, pins) = unpack_pins_with_func(packed);
            let function = names::gpio_func_name(func).map(str::to_string);

            let mut map = PinMap::new();
            for pin in pins {
                map.insert(
                    pin,
                    PinInfo {
                        function: function.clone(),
                        name: None,
                    },
                );
            }
            Ok(Some((Key::name("Pins"), Value::Pins(map))))
        }
        EntryType::PinsWithName => {
            let (_, (mask, name_addr)) =
                word_pair(input).map_err(|_| ParseError::TruncatedEntry("pins with name"))?;
            if mask == 0 {
                tracing::warn!("pins-with-name entry at {:#x} has an empty pin mask", offset);
                return Ok(None);
            }

            let name = read_string(image, profile, name_addr)?;
            let mut map = PinMap::new();
            map.insert(
                // Only the lowest set bit names a pin.
                mask.trailing_zeros() as u8,
                PinInfo {
                    function: None,
                    name: Some(name),
                },
            );
            Ok(Some((Key::name("Pins"), Value::Pins(map))))
        }
        EntryType::NamedGroup => {
            let (_, body) =
                named_group_body(input).map_err(|_| ParseError::TruncatedEntry("named group"))?;
            let label = read_string(image, profile, body.label_addr)?;
            Ok(Some((
                Key::name("NamedGroup"),
                Value::Group(NamedGroup {
                    label,
                    parent: body.parent,
                    flags: body.flags,
                    tag: body.tag,
                    id: body.id,
                    data: None,
                }),
            )))
        }
        EntryType::RawData
        | EntryType::SizedData
        | EntryType::ZeroTerminatedList
        | EntryType::Bson
        | EntryType::Unknown(_) => {
            tracing::debug!(
                "no decoder for {} entry (type {}) at {:#x}",
                kind.label(),
                type_code,
                offset
            );
            Ok(None)
        }
    }
}
