//! Layer record parsing
//!
//! A layer record holds everything about a layer except its pixels: bounds,
//! channel table, blend settings, mask, blending ranges, name and the
//! additional information blocks. Channel data follows all records and is
//! handled by [`super::section`].

use super::blend_mode_from_key;
use super::cursor::{tag_str, ByteCursor};
use super::error::PsdError;
use super::info::{has_wide_length, BlockContext, InfoRegistry};
use super::options::DecodeOptions;
use super::types::{
    BlendingRange, Layer, LayerChannel, LayerMask, RealMask, Rectangle, SizeMode,
    B64_SIGNATURE, BIM_SIGNATURE,
};

/// Size of a mask block that carries no real mask
const SHORT_MASK_SIZE: u32 = 20;

/// Bytes per blending range entry
const BLENDING_RANGE_SIZE: u32 = 8;

/// Convert the stored opacity byte to a percentage, rounding up
pub fn opacity_percent(byte: u8) -> u8 {
    // ceil(byte / 255 * 100) without float error
    ((byte as u32 * 100 + 254) / 255) as u8
}

/// Padding after a Pascal name so that `1 + len` is a multiple of 4
pub fn name_padding(len: usize) -> usize {
    (4 - (1 + len) % 4) % 4
}

pub(crate) fn read_rectangle(cursor: &mut ByteCursor<'_>) -> Result<Rectangle, PsdError> {
    let top = cursor.read_i32()?;
    let left = cursor.read_i32()?;
    let bottom = cursor.read_i32()?;
    let right = cursor.read_i32()?;
    Ok(Rectangle::new(top, left, bottom, right))
}

/// Parses layer records for one document
#[derive(Debug, Clone, Copy)]
pub struct LayerRecordParser<'a> {
    pub size_mode: SizeMode,
    pub registry: &'a InfoRegistry,
    pub options: &'a DecodeOptions,
}

impl<'a> LayerRecordParser<'a> {
    pub fn new(size_mode: SizeMode, registry: &'a InfoRegistry, options: &'a DecodeOptions) -> Self {
        Self {
            size_mode,
            registry,
            options,
        }
    }

    /// Parse the record of layer `index`
    pub fn parse_record(&self, cursor: &mut ByteCursor<'_>, index: usize) -> Result<Layer, PsdError> {
        let mut layer = Layer {
            rect: read_rectangle(cursor)?,
            ..Default::default()
        };

        let channel_count = cursor.read_i16()?;
        if channel_count < 0 {
            return Err(PsdError::Format(format!(
                "negative channel count {} in layer #{}",
                channel_count, index
            )));
        }
        layer.channels.reserve(channel_count as usize);
        for _ in 0..channel_count {
            let id = cursor.read_i16()?;
            let length = cursor.read_length(self.size_mode.is_large())?;
            layer.channels.push(LayerChannel { id, length });
        }

        let sig = cursor.read_signature()?;
        if &sig != BIM_SIGNATURE {
            return Err(PsdError::Format(format!(
                "wrong blend mode signature of layer #{}: '{}'",
                index,
                tag_str(&sig)
            )));
        }

        let key = cursor.read_signature()?;
        layer.blend_mode = blend_mode_from_key(&key);
        if layer.blend_mode.is_none() {
            tracing::debug!("Layer #{}: unknown blend mode key '{}'", index, tag_str(&key));
        }

        layer.opacity = opacity_percent(cursor.read_u8()?);
        layer.clipping = cursor.read_u8()?;
        layer.flags = cursor.read_u8()?;
        cursor.skip(1)?; // Filler

        // Mask, ranges, name and info blocks never leave this window
        let extra_length = cursor.read_u32()?;
        let mut extra = cursor.take(extra_length as u64)?;

        layer.mask = read_mask(&mut extra)?;
        layer.blending_ranges = read_blending_ranges(&mut extra)?;

        let name = extra.read_pascal_bytes()?;
        extra.skip(name_padding(name.len()) as u64)?;
        layer.name = String::from_utf8_lossy(name).into_owned();

        self.read_info_blocks(&mut extra, &mut layer, index)?;

        tracing::debug!(
            "Layer #{} '{}': {}x{}, {} channels, opacity {}%",
            index,
            layer.name,
            layer.width(),
            layer.height(),
            layer.channels.len(),
            layer.opacity
        );

        Ok(layer)
    }

    fn read_info_blocks(
        &self,
        extra: &mut ByteCursor<'_>,
        layer: &mut Layer,
        index: usize,
    ) -> Result<(), PsdError> {
        let mut info_index = 0;
        while !extra.is_empty() {
            let sig = extra.read_signature()?;
            if &sig != BIM_SIGNATURE && &sig != B64_SIGNATURE {
                return Err(PsdError::Format(format!(
                    "[Layer #{} '{}'] wrong signature of additional info #{}: '{}'",
                    index,
                    layer.name,
                    info_index,
                    tag_str(&sig)
                )));
            }

            let key = extra.read_signature()?;
            let wide = self.size_mode.is_large() && has_wide_length(&key);
            let declared = extra.read_length(wide)?;
            let mut length = declared.saturating_add(1) & !1;
            // Tolerate a missing pad byte on the last block
            if length > extra.remaining() as u64 && declared <= extra.remaining() as u64 {
                length = declared;
            }

            tracing::trace!(
                "Layer #{}: info #{} '{}' at {} ({} bytes)",
                index,
                info_index,
                tag_str(&key),
                extra.position(),
                length
            );

            // The parent resumes at data_pos + length regardless of the handler
            let mut block = extra.take(length)?;
            let ctx = BlockContext {
                key,
                length,
                layer_index: index,
                options: self.options,
            };
            match self.registry.handler(&key)(&mut block, layer, &ctx) {
                Ok(()) => {}
                Err(e) if e.is_truncation() => {
                    tracing::warn!(
                        "[Layer #{}] additional info #{} '{}' is shorter than expected: {}",
                        index,
                        info_index,
                        tag_str(&key),
                        e
                    );
                }
                Err(e) => return Err(e),
            }

            info_index += 1;
        }
        Ok(())
    }
}

fn read_mask(cursor: &mut ByteCursor<'_>) -> Result<Option<LayerMask>, PsdError> {
    let size = cursor.read_u32()?;
    if size == 0 {
        return Ok(None);
    }

    // Trailing mask parameters, if any, are skipped with the block
    let mut block = cursor.take(size as u64)?;
    let rect = read_rectangle(&mut block)?;
    let default_color = block.read_u8()?;
    let flags = block.read_u8()?;

    let real = if size == SHORT_MASK_SIZE {
        let _padding = block.read_i16()?;
        None
    } else {
        let real_flags = block.read_u8()?;
        let background = block.read_u8()?;
        let real_rect = read_rectangle(&mut block)?;
        Some(RealMask {
            flags: real_flags,
            background,
            rect: real_rect,
        })
    };

    Ok(Some(LayerMask {
        rect,
        default_color,
        flags,
        real,
    }))
}

fn read_blending_ranges(cursor: &mut ByteCursor<'_>) -> Result<Vec<BlendingRange>, PsdError> {
    let length = cursor.read_u32()?;
    let mut block = cursor.take(length as u64)?;

    let count = length / BLENDING_RANGE_SIZE;
    let mut ranges = Vec::with_capacity(count as usize);
    for i in 0..count {
        let name = if i == 0 {
            "Gray".to_string()
        } else {
            format!("Channel{}", i - 1)
        };
        ranges.push(BlendingRange {
            name,
            source_black: block.read_i16()?,
            source_white: block.read_i16()?,
            dest_black: block.read_i16()?,
            dest_white: block.read_i16()?,
        });
    }
    Ok(ranges)
}
