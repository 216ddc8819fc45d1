//! Merged image data section
//!
//! The composite of all layers, stored as planar channels after the layer
//! section. Only 8-bit RGB and grayscale documents are turned into an image.

use image::RgbaImage;

use super::channel::{expand_rows, plane_size, read_row_counts, Compression};
use super::compression::decoded_capacity;
use super::cursor::ByteCursor;
use super::error::PsdError;
use super::header::Header;
use super::types::ColorMode;

pub(crate) fn read_merged_image(
    cursor: &mut ByteCursor<'_>,
    header: &Header,
) -> Result<Option<RgbaImage>, PsdError> {
    let compression = Compression::from_u16(cursor.read_u16()?)?;

    let color_channels = match header.color_mode {
        ColorMode::Rgb => 3,
        ColorMode::Grayscale => 1,
        other => {
            tracing::debug!("Merged image in {:?} mode is not decoded", other);
            return Ok(None);
        }
    };
    if header.depth != 8 {
        tracing::debug!("Merged image at depth {} is not decoded", header.depth);
        return Ok(None);
    }
    let channels = header.channels as usize;
    if channels < color_channels {
        return Err(PsdError::Format(format!(
            "{:?} document declares only {} channels",
            header.color_mode, channels
        )));
    }

    let size = plane_size(header.width, header.height)?;
    let total = size
        .checked_mul(channels)
        .ok_or_else(|| PsdError::Format("merged image is too large".into()))?;

    let planar = match compression {
        Compression::Raw => cursor.read_bytes(total)?.to_vec(),
        Compression::Rle => {
            let rows = channels * header.height as usize;
            let counts = read_row_counts(cursor, rows, header.size_mode)?;
            let mut data = Vec::with_capacity(decoded_capacity(total, cursor.remaining()));
            expand_rows(cursor, &counts, header.width as usize, &mut data)?;
            data
        }
        other => {
            return Err(PsdError::UnsupportedFeature(format!(
                "merged image with {:?} compression",
                other
            )))
        }
    };

    let plane = |i: usize| &planar[i * size..(i + 1) * size];
    let alpha = (channels > color_channels).then(|| plane(color_channels));

    let mut rgba = Vec::with_capacity(size * 4);
    for i in 0..size {
        let a = alpha.map_or(255, |a| a[i]);
        if color_channels == 3 {
            rgba.extend_from_slice(&[plane(0)[i], plane(1)[i], plane(2)[i], a]);
        } else {
            let gray = plane(0)[i];
            rgba.extend_from_slice(&[gray, gray, gray, a]);
        }
    }

    RgbaImage::from_raw(header.width, header.height, rgba)
        .map(Some)
        .ok_or_else(|| PsdError::Format("invalid merged image size".into()))
}
