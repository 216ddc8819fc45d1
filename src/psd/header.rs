//! File header section

use super::cursor::{tag_str, ByteCursor};
use super::error::PsdError;
use super::types::{ColorMode, SizeMode, PSD_SIGNATURE};

/// Fixed 26-byte header at the start of every document
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub size_mode: SizeMode,
    pub channels: u16,
    pub height: u32,
    pub width: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
}

pub(crate) fn read_header(cursor: &mut ByteCursor<'_>) -> Result<Header, PsdError> {
    let sig = cursor.read_signature()?;
    if &sig != PSD_SIGNATURE {
        return Err(PsdError::Format(format!(
            "wrong file signature '{}'",
            tag_str(&sig)
        )));
    }

    let size_mode = SizeMode::from_version(cursor.read_u16()?)?;
    cursor.skip(6)?; // Reserved

    Ok(Header {
        size_mode,
        channels: cursor.read_u16()?,
        height: cursor.read_u32()?,
        width: cursor.read_u32()?,
        depth: cursor.read_u16()?,
        color_mode: ColorMode::from_u16(cursor.read_u16()?),
    })
}
