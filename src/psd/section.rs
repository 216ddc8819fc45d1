//! Layer and mask information section
//!
//! The section holds the layer count, every layer record, then every layer's
//! channel data in the same order, followed by global mask info and tagged
//! blocks which are skipped.

use super::channel::read_layer_channels;
use super::compose::compose;
use super::cursor::ByteCursor;
use super::error::PsdError;
use super::info::InfoRegistry;
use super::layer_record::LayerRecordParser;
use super::options::DecodeOptions;
use super::types::{Layer, SizeMode};

/// Layers decoded from one layer and mask information section
#[derive(Debug, Default)]
pub struct LayerSection {
    pub layers: Vec<Layer>,
    /// Set when the stored layer count is negative
    pub merged_alpha: bool,
}

/// Reads the layer and mask information section of a document
#[derive(Debug, Clone, Copy)]
pub struct LayerSectionReader<'a> {
    parser: LayerRecordParser<'a>,
}

/// User mask (-2) and real user mask (-3) channels
fn is_mask_channel(id: i16) -> bool {
    matches!(id, -2 | -3)
}

/// Split off a declared block, clamping it to the end of input
///
/// A short block is allowed so that input ending on a record boundary can
/// still be decoded; ending mid-record fails in the record reader.
fn take_declared<'a>(
    cursor: &mut ByteCursor<'a>,
    declared: u64,
    what: &str,
) -> Result<ByteCursor<'a>, PsdError> {
    let available = cursor.remaining() as u64;
    if declared > available {
        tracing::debug!(
            "{} declares {} bytes but only {} remain",
            what,
            declared,
            available
        );
        return cursor.take(available);
    }
    cursor.take(declared)
}

impl<'a> LayerSectionReader<'a> {
    pub fn new(size_mode: SizeMode, registry: &'a InfoRegistry, options: &'a DecodeOptions) -> Self {
        Self {
            parser: LayerRecordParser::new(size_mode, registry, options),
        }
    }

    pub fn read(&self, cursor: &mut ByteCursor<'_>) -> Result<LayerSection, PsdError> {
        let large = self.parser.size_mode.is_large();

        let section_length = cursor.read_length(large)?;
        let mut section = take_declared(cursor, section_length, "Layer and mask section")?;
        tracing::debug!(
            "Layer and mask section at {}: {} bytes",
            section.position(),
            section_length
        );
        if section.is_empty() {
            return Ok(LayerSection::default());
        }

        let info_length = section.read_length(large)?.saturating_add(1) & !1;
        let mut info = take_declared(&mut section, info_length, "Layer info")?;
        if info.is_empty() {
            return Ok(LayerSection::default());
        }

        let count = info.read_i16()?;
        let merged_alpha = count < 0;
        let count = count.unsigned_abs() as usize;
        tracing::debug!("Layer count: {} (merged alpha: {})", count, merged_alpha);

        let mut layers = Vec::with_capacity(count);
        for index in 0..count {
            if info.is_empty() {
                tracing::debug!("Input ends before layer record #{}", index);
                break;
            }
            layers.push(self.parser.parse_record(&mut info, index)?);
        }

        self.read_channel_data(&mut info, &mut layers)?;

        if !section.is_empty() {
            tracing::debug!(
                "Skipping {} bytes of global mask info and tagged blocks",
                section.remaining()
            );
        }

        Ok(LayerSection {
            layers,
            merged_alpha,
        })
    }

    fn read_channel_data(
        &self,
        cursor: &mut ByteCursor<'_>,
        layers: &mut [Layer],
    ) -> Result<(), PsdError> {
        for (index, layer) in layers.iter_mut().enumerate() {
            if cursor.is_empty() {
                tracing::debug!("Input ends before channel data of layer #{}", index);
                break;
            }

            if !self.parser.options.decode_pixels {
                for channel in &layer.channels {
                    cursor.skip(channel.length)?;
                }
                continue;
            }

            let planes = read_layer_channels(cursor, layer, index, self.parser.size_mode)?;
            // Masks have their own geometry and never feed the color planes
            let color_planes: Vec<Vec<u8>> = layer
                .channels
                .iter()
                .zip(planes)
                .filter(|(channel, _)| !is_mask_channel(channel.id))
                .map(|(_, plane)| plane)
                .collect();
            match compose(&color_planes, layer.width(), layer.height()) {
                Ok(image) => layer.image = image,
                Err(e) if e.is_unsupported() => {
                    tracing::warn!("Layer #{} '{}': {}", index, layer.name, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
