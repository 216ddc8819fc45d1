//! Document decoding entry points

use std::path::Path;

use super::cursor::ByteCursor;
use super::error::PsdError;
use super::header::read_header;
use super::image_data::read_merged_image;
use super::info::InfoRegistry;
use super::options::DecodeOptions;
use super::resources::read_resources;
use super::section::LayerSectionReader;
use super::types::Document;

/// Read a whole file and decode it with default options
pub fn parse_from_path(path: impl AsRef<Path>) -> Result<Document, PsdError> {
    let path = path.as_ref();
    tracing::info!("Loading PSD file: {:?}", path);
    let data = std::fs::read(path)?;
    parse_from_buffer(&data)
}

/// Decode a document with default options
pub fn parse_from_buffer(data: &[u8]) -> Result<Document, PsdError> {
    parse_with_options(data, &DecodeOptions::default())
}

pub fn parse_with_options(data: &[u8], options: &DecodeOptions) -> Result<Document, PsdError> {
    parse_with_registry(data, options, &InfoRegistry::default())
}

/// Decode a document, dispatching additional layer info through `registry`
pub fn parse_with_registry(
    data: &[u8],
    options: &DecodeOptions,
    registry: &InfoRegistry,
) -> Result<Document, PsdError> {
    let mut cursor = ByteCursor::new(data);

    let header = read_header(&mut cursor)?;
    tracing::info!(
        "PSD {:?}: {}x{}, {} channels, depth {}, {:?}",
        header.size_mode,
        header.width,
        header.height,
        header.channels,
        header.depth,
        header.color_mode
    );

    let mut doc = Document {
        size_mode: header.size_mode,
        channels: header.channels,
        height: header.height,
        width: header.width,
        depth: header.depth,
        color_mode: header.color_mode,
        ..Default::default()
    };

    if cursor.is_empty() {
        return Ok(doc);
    }
    let color_data_length = cursor.read_u32()?;
    cursor.skip(color_data_length as u64)?;
    tracing::debug!("Color mode data: {} bytes", color_data_length);

    if cursor.is_empty() {
        return Ok(doc);
    }
    let resources_length = cursor.read_u32()?;
    let mut resources = cursor.take(resources_length as u64)?;
    doc.resources = read_resources(&mut resources)?;
    tracing::debug!("Image resources: {}", doc.resources.len());

    if cursor.is_empty() {
        return Ok(doc);
    }
    let section = LayerSectionReader::new(header.size_mode, registry, options).read(&mut cursor)?;
    doc.layers = section.layers;
    doc.merged_alpha = section.merged_alpha;
    tracing::info!("Decoded {} layers", doc.layers.len());

    if cursor.is_empty() || !options.decode_merged_image {
        return Ok(doc);
    }
    doc.image = match read_merged_image(&mut cursor, &header) {
        Ok(image) => image,
        Err(e) if e.is_unsupported() => {
            tracing::warn!("{}", e);
            None
        }
        Err(e) => return Err(e),
    };

    Ok(doc)
}
