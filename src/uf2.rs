// UF2 flashing-container unwrapping
// Reference: https://github.com/microsoft/uf2 (block layout)

use std::io::{self, Read};

/// Size of one UF2 transport block.
pub const BLOCK_SIZE: usize = 512;

/// Bytes of header at the start of every block: eight little-endian u32
/// fields (magic_start0, magic_start1, flags, target_addr, payload_size,
/// block_no, num_blocks, family_id).
pub const HEADER_SIZE: usize = 32;

/// Payload bytes carried by a full-size block, immediately after the header.
pub const DATA_SIZE: usize = 256;

/// Trailing magic word at the end of every block.
pub const FOOTER_SIZE: usize = 4;

/// First header magic, spells "UF2\n".
pub const MAGIC_START0: u32 = 0x0A32_4655;

/// Second header magic.
pub const MAGIC_START1: u32 = 0x9E5D_5157;

/// Footer magic.
pub const MAGIC_END: u32 = 0x0AB1_6F30;

/// Family id the RP2040 bootrom accepts.
pub const FAMILY_ID_RP2040: u32 = 0xE48B_FF56;

/// Extract and concatenate the payload regions of a UF2 byte stream.
///
/// Each 512-byte block contributes the 256 bytes that follow its 32-byte
/// header; the padding and footer are discarded. A trailing fragment shorter
/// than the header ends the stream, and a fragment between header size and
/// block size contributes whatever payload bytes it carries. Header fields,
/// including both magics and the block sequence numbers, are not checked.
pub fn unwrap_blocks(data: &[u8]) -> Vec<u8> {
    let mut image = Vec::with_capacity((data.len() / BLOCK_SIZE + 1) * DATA_SIZE);

    for block in data.chunks(BLOCK_SIZE) {
        if block.len() < HEADER_SIZE {
            break;
        }
        let end = block.len().min(HEADER_SIZE + DATA_SIZE);
        image.extend_from_slice(&block[HEADER_SIZE..end]);
    }

    image
}

/// Read an entire UF2 stream and unwrap it into a contiguous binary image.
pub fn read_uf2<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(unwrap_blocks(&data))
}
