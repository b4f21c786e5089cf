// Well-known identifier and GPIO function name tables
// Reference: pico-sdk pico/binary_info/code.h and hardware/gpio.h

use lazy_static::lazy_static;
use std::collections::HashMap;

pub const ID_PROGRAM_NAME: u32 = 0x02031C86;
pub const ID_PROGRAM_VERSION_STRING: u32 = 0x11A9BC3A;
pub const ID_PROGRAM_BUILD_DATE_STRING: u32 = 0x9DA22254;
pub const ID_BINARY_END: u32 = 0x68F465DE;
pub const ID_PROGRAM_URL: u32 = 0x1856239A;
pub const ID_PROGRAM_DESCRIPTION: u32 = 0xB6A07C19;
pub const ID_PROGRAM_FEATURE: u32 = 0xA1F4B453;
pub const ID_PROGRAM_BUILD_ATTRIBUTE: u32 = 0x4275F0D3;
pub const ID_SDK_VERSION: u32 = 0x5360B3AB;
pub const ID_PICO_BOARD: u32 = 0xB63CFFBB;
pub const ID_BOOT2_NAME: u32 = 0x7F8882E1;

/// Emitted by MicroPython for each frozen/built-in module. Not in the
/// display-name table: the entries keep raw integer keys, and a named
/// group claims them by id during aggregation.
pub const ID_MP_BUILTIN_MODULE: u32 = 0x4A99D719;

/// Filesystem region marker, also left out of the display-name table.
pub const ID_FILESYSTEM: u32 = 0x1009BE7E;

lazy_static! {
    /// Display names for the well-known identifiers.
    static ref ID_NAMES: HashMap<u32, &'static str> = [
        (ID_PROGRAM_NAME, "Program Name"),
        (ID_PROGRAM_VERSION_STRING, "Program Version"),
        (ID_PROGRAM_BUILD_DATE_STRING, "Build Date"),
        (ID_BINARY_END, "Binary End Address"),
        (ID_PROGRAM_URL, "Program URL"),
        (ID_PROGRAM_DESCRIPTION, "Program Description"),
        (ID_PROGRAM_FEATURE, "Program Feature"),
        (ID_PROGRAM_BUILD_ATTRIBUTE, "Program Build Attribute"),
        (ID_SDK_VERSION, "SDK Version"),
        (ID_PICO_BOARD, "Pico Board"),
        (ID_BOOT2_NAME, "Boot Stage 2 Name"),
    ]
    .into_iter()
    .collect();

    /// GPIO function selector names, indexed by the 4-bit function code.
    static ref GPIO_FUNCS: HashMap<u8, &'static str> = [
        (0x0, "XIP"),
        (0x1, "SPI"),
        (0x2, "UART"),
        (0x3, "I2C"),
        (0x4, "PWM"),
        (0x5, "SIO"),
        (0x6, "PIO0"),
        (0x7, "PIO1"),
        (0x8, "GPCK"),
        (0x9, "USB"),
        (0xF, "NULL"),
    ]
    .into_iter()
    .collect();
}

/// Display name for a well-known identifier, e.g. "Binary End Address".
pub fn id_name(id: u32) -> Option<&'static str> {
    ID_NAMES.get(&id).copied()
}

/// Aggregate-key form of an identifier's display name: spaces stripped,
/// e.g. "BinaryEndAddress".
pub fn id_key_name(id: u32) -> Option<String> {
    id_name(id).map(|name| name.replace(' ', ""))
}

/// Name of a GPIO function selector code. Codes outside the table (0xA-0xE)
/// have no name.
pub fn gpio_func_name(code: u8) -> Option<&'static str> {
    GPIO_FUNCS.get(&code).copied()
}
