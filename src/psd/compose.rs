//! Channel planes to RGBA composition

use image::RgbaImage;

use super::channel::plane_size;
use super::error::PsdError;

/// Compose decoded channel planes into an RGBA image
///
/// Planes are taken in order as alpha, red, green, blue; further planes are
/// ignored. A zero-sized layer yields `None`; a plane shorter than the layer
/// is an `UnsupportedFeature`.
pub fn compose(channels: &[Vec<u8>], width: u32, height: u32) -> Result<Option<RgbaImage>, PsdError> {
    if width == 0 || height == 0 {
        return Ok(None);
    }

    if channels.len() < 4 {
        return Err(PsdError::UnsupportedFeature(format!(
            "composition of {} channel layers",
            channels.len()
        )));
    }

    let size = plane_size(width, height)?;
    let planes = &channels[..4];
    if let Some(short) = planes.iter().position(|p| p.len() < size) {
        return Err(PsdError::UnsupportedFeature(format!(
            "channel {} holds {} bytes, expected {}",
            short,
            planes[short].len(),
            size
        )));
    }

    let (alpha, red, green, blue) = (&planes[0], &planes[1], &planes[2], &planes[3]);
    let mut rgba = Vec::with_capacity(size * 4);
    for i in 0..size {
        rgba.extend_from_slice(&[red[i], green[i], blue[i], alpha[i]]);
    }

    RgbaImage::from_raw(width, height, rgba)
        .map(Some)
        .ok_or_else(|| PsdError::Format("invalid RGBA buffer size".into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_none() {
        assert!(compose(&[], 0, 5).unwrap().is_none());
        assert!(compose(&[vec![], vec![]], 5, 0).unwrap().is_none());
    }

    #[test]
    fn test_three_channels_unsupported() {
        let plane = vec![0u8; 4];
        let err = compose(&[plane.clone(), plane.clone(), plane], 2, 2).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_channel_order_and_offsets() {
        let alpha = vec![10, 11, 12, 13, 14, 15];
        let red = vec![20, 21, 22, 23, 24, 25];
        let green = vec![30, 31, 32, 33, 34, 35];
        let blue = vec![40, 41, 42, 43, 44, 45];
        let extra = vec![0; 6];
        let image = compose(&[alpha, red, green, blue, extra], 3, 2)
            .unwrap()
            .unwrap();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0, [20, 30, 40, 10]);
        // x + y * width
        assert_eq!(image.get_pixel(2, 1).0, [25, 35, 45, 15]);
        assert_eq!(image.get_pixel(1, 1).0, [24, 34, 44, 14]);
    }

    #[test]
    fn test_short_plane_is_unsupported() {
        let full = vec![1u8; 4];
        let err = compose(&[full.clone(), full.clone(), vec![1u8; 3], full], 2, 2).unwrap_err();
        assert!(err.is_unsupported());
    }
}
