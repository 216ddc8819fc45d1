//! Channel image data decoding
//!
//! Each channel's payload is a 2-byte compression tag followed by raw or
//! PackBits-compressed scanlines.

use super::compression::{decoded_capacity, packbits_decode};
use super::cursor::ByteCursor;
use super::error::PsdError;
use super::types::{Layer, LayerChannel, SizeMode};

/// Compression method of channel and merged image data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Raw,
    Rle,
    Zip,
    ZipPrediction,
}

impl Compression {
    pub fn from_u16(value: u16) -> Result<Self, PsdError> {
        match value {
            0 => Ok(Compression::Raw),
            1 => Ok(Compression::Rle),
            2 => Ok(Compression::Zip),
            3 => Ok(Compression::ZipPrediction),
            v => Err(PsdError::Format(format!("unknown compression method {}", v))),
        }
    }
}

/// Total byte count of a `width * height` plane
pub(crate) fn plane_size(width: u32, height: u32) -> Result<usize, PsdError> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| PsdError::Format(format!("plane of {}x{} is too large", width, height)))
}

/// Read the per-row byte counts of an RLE block
pub(crate) fn read_row_counts(
    cursor: &mut ByteCursor<'_>,
    rows: usize,
    size_mode: SizeMode,
) -> Result<Vec<usize>, PsdError> {
    let mut counts = Vec::with_capacity(rows.min(cursor.remaining()));
    for _ in 0..rows {
        let count = if size_mode.is_large() {
            cursor.read_u32()? as usize
        } else {
            cursor.read_u16()? as usize
        };
        counts.push(count);
    }
    Ok(counts)
}

/// Expand RLE rows of `width` bytes each, appending to `out`
pub(crate) fn expand_rows(
    cursor: &mut ByteCursor<'_>,
    counts: &[usize],
    width: usize,
    out: &mut Vec<u8>,
) -> Result<(), PsdError> {
    for &count in counts {
        let row = cursor.read_bytes(count)?;
        out.extend_from_slice(&packbits_decode(row, width)?);
    }
    Ok(())
}

/// Decode one channel payload into exactly `width * height` bytes
pub fn decode_channel(
    cursor: &mut ByteCursor<'_>,
    width: u32,
    height: u32,
    size_mode: SizeMode,
) -> Result<Vec<u8>, PsdError> {
    let size = plane_size(width, height)?;

    match Compression::from_u16(cursor.read_u16()?)? {
        Compression::Raw => Ok(cursor.read_bytes(size)?.to_vec()),
        Compression::Rle => {
            let counts = read_row_counts(cursor, height as usize, size_mode)?;
            let mut data = Vec::with_capacity(decoded_capacity(size, cursor.remaining()));
            expand_rows(cursor, &counts, width as usize, &mut data)?;
            Ok(data)
        }
        other => Err(PsdError::Format(format!(
            "unsupported compression method {:?}",
            other
        ))),
    }
}

/// Pixel dimensions of a channel: masks use their own rectangles
pub fn channel_dimensions(layer: &Layer, channel_id: i16) -> (u32, u32) {
    let rect = match (channel_id, layer.mask.as_ref()) {
        (-2, Some(mask)) => mask.rect,
        (-3, Some(mask)) => mask.real.as_ref().map_or(mask.rect, |real| real.rect),
        _ => layer.rect,
    };
    (rect.width(), rect.height())
}

/// Decode every channel of a layer, in record order
///
/// Each payload is read from a cursor bounded by the declared channel length.
pub fn read_layer_channels(
    cursor: &mut ByteCursor<'_>,
    layer: &Layer,
    index: usize,
    size_mode: SizeMode,
) -> Result<Vec<Vec<u8>>, PsdError> {
    let mut planes = Vec::with_capacity(layer.channels.len());
    for channel in &layer.channels {
        let mut block = cursor.take(channel.length)?;
        let plane = decode_layer_channel(&mut block, layer, channel, size_mode)
            .map_err(|e| channel_error(e, layer, index, channel))?;
        planes.push(plane);
    }
    Ok(planes)
}

fn decode_layer_channel(
    block: &mut ByteCursor<'_>,
    layer: &Layer,
    channel: &LayerChannel,
    size_mode: SizeMode,
) -> Result<Vec<u8>, PsdError> {
    let (width, height) = channel_dimensions(layer, channel.id);
    if block.is_empty() && plane_size(width, height)? == 0 {
        return Ok(Vec::new());
    }
    decode_channel(block, width, height, size_mode)
}

fn channel_error(err: PsdError, layer: &Layer, index: usize, channel: &LayerChannel) -> PsdError {
    match err {
        PsdError::Truncated { .. } => PsdError::Format(format!(
            "[Layer #{} '{}'] channel {} overruns its declared length of {} bytes: {}",
            index, layer.name, channel.id, channel.length, err
        )),
        PsdError::Format(msg) => PsdError::Format(format!(
            "[Layer #{} '{}'] channel {}: {}",
            index, layer.name, channel.id, msg
        )),
        other => other,
    }
}
