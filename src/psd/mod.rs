//! Adobe Photoshop (.psd / .psb) decoding
//!
//! Decodes a whole document held in memory into a [`Document`]: header
//! metadata, image resources, every layer with its record fields and
//! composited RGBA pixels, and the merged composite image.

pub mod channel;
pub mod compose;
pub mod compression;
pub mod cursor;
pub mod descriptor;
pub mod error;
mod header;
mod image_data;
pub mod info;
pub mod layer_record;
pub mod options;
mod reader;
pub mod resources;
pub mod section;
pub mod types;

pub use error::PsdError;
pub use info::{BlockContext, InfoHandler, InfoRegistry};
pub use options::DecodeOptions;
pub use reader::{parse_from_buffer, parse_from_path, parse_with_options, parse_with_registry};
pub use types::{BlendMode, ColorMode, Document, Layer, Rectangle, SizeMode};

/// Map a PSD 4-byte blend key to its blend mode; unknown keys yield `None`
pub fn blend_mode_from_key(key: &[u8; 4]) -> Option<BlendMode> {
    let mode = match key {
        b"pass" => BlendMode::PassThrough,
        b"norm" => BlendMode::Normal,
        b"diss" => BlendMode::Dissolve,
        b"dark" => BlendMode::Darken,
        b"mul " => BlendMode::Multiply,
        b"idiv" => BlendMode::ColorBurn,
        b"lbrn" => BlendMode::LinearBurn,
        b"dkCl" => BlendMode::DarkerColor,
        b"lite" => BlendMode::Lighten,
        b"scrn" => BlendMode::Screen,
        b"div " => BlendMode::ColorDodge,
        b"lddg" => BlendMode::LinearDodge,
        b"lgCl" => BlendMode::LighterColor,
        b"over" => BlendMode::Overlay,
        b"sLit" => BlendMode::SoftLight,
        b"hLit" => BlendMode::HardLight,
        b"vLit" => BlendMode::VividLight,
        b"lLit" => BlendMode::LinearLight,
        b"pLit" => BlendMode::PinLight,
        b"hMix" => BlendMode::HardMix,
        b"diff" => BlendMode::Difference,
        b"smud" => BlendMode::Exclusion,
        b"fsub" => BlendMode::Subtract,
        b"fdiv" => BlendMode::Divide,
        b"hue " => BlendMode::Hue,
        b"sat " => BlendMode::Saturation,
        b"colr" => BlendMode::Color,
        b"lum " => BlendMode::Luminosity,
        _ => return None,
    };
    Some(mode)
}

#[cfg(test)]
mod tests;
