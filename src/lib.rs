// PICO-DECL: decoder for the binary info block in RP2040 firmware
// Reads UF2 or raw flash images and reports the embedded program metadata

pub mod bi;
pub mod image;
pub mod uf2;

// Re-export commonly used types
pub use bi::{
    decode_file, names, validate, Decoder, DeviceProfile, Key, ParseError, Report, Value,
};
pub use image::{Image, ImageError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
