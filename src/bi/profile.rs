// Device layout configuration for locating and decoding the info table
// Reference: pico-sdk src/common/pico_binary_info (marker words, XIP base)

/// RP2040 XIP base: flash is memory-mapped at this device address.
pub const XIP_BASE: u32 = 0x1000_0000;

/// Byte sequence opening the descriptor record (BINARY_INFO_MARKER_START,
/// little-endian).
pub const BI_MARKER_START: [u8; 4] = [0xF2, 0xEB, 0x88, 0x71];

/// Byte sequence closing the descriptor record (BINARY_INFO_MARKER_END,
/// little-endian).
pub const BI_MARKER_END: [u8; 4] = [0x90, 0xA3, 0x1A, 0xE7];

/// Entry tags decoded by default: Raspberry Pi SDK and MicroPython.
pub const DEFAULT_INCLUDE_TAGS: [[u8; 2]; 2] = [*b"RP", *b"MP"];

/// Everything about the target device the decoder must not hardcode: where
/// flash is mapped, how the info table is delimited and which entry tags
/// are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Device address at which the flattened image begins.
    pub flash_base: u32,

    /// Marker sequence opening the descriptor record.
    pub marker_start: [u8; 4],

    /// Marker sequence closing the descriptor record.
    pub marker_end: [u8; 4],

    /// Entry tags that are decoded; entries carrying other tags are skipped.
    pub include_tags: Vec<[u8; 2]>,
}

impl DeviceProfile {
    /// The standard RP2040 layout.
    pub fn rp2040() -> Self {
        Self {
            flash_base: XIP_BASE,
            marker_start: BI_MARKER_START,
            marker_end: BI_MARKER_END,
            include_tags: DEFAULT_INCLUDE_TAGS.to_vec(),
        }
    }

    /// Translate a device address to an image offset. No bounds checking
    /// happens here: an address below the base wraps to a huge offset and
    /// fails at read time instead.
    pub fn addr_to_offset(&self, addr: u32) -> usize {
        addr.wrapping_sub(self.flash_base) as usize
    }

    /// Translate an image offset back to a device address.
    pub fn offset_to_addr(&self, offset: usize) -> u32 {
        (offset as u32).wrapping_add(self.flash_base)
    }

    /// Whether entries carrying `tag` should be decoded.
    pub fn tag_included(&self, tag: [u8; 2]) -> bool {
        self.include_tags.contains(&tag)
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::rp2040()
    }
}
