//! Image resources section
//!
//! Resources are kept as opaque payloads tagged by their kind; none of them
//! is interpreted.

use indexmap::IndexMap;

use super::cursor::{tag_str, ByteCursor};
use super::error::PsdError;

/// Signatures accepted on resource blocks
const RESOURCE_SIGNATURES: [&[u8; 4]; 5] = [b"8BIM", b"MeSa", b"PHUT", b"AgHg", b"DCSR"];

/// Image resource IDs
pub mod id {
    pub const RESOLUTION_INFO: u16 = 0x03ED;
    pub const ALPHA_CHANNEL_NAMES: u16 = 0x03EE;
    pub const PRINT_FLAGS: u16 = 0x03F3;
    pub const COLOR_HALFTONING_INFO: u16 = 0x03F5;
    pub const COLOR_TRANSFER_FUNCTIONS: u16 = 0x03F6;
    pub const LAYER_STATE_INFO: u16 = 0x0400;
    pub const LAYERS_GROUP_INFO: u16 = 0x0402;
    pub const THUMBNAIL: u16 = 0x0409;
    pub const ICC_PROFILE: u16 = 0x040F;
    pub const ICC_UNTAGGED_PROFILE: u16 = 0x0410;
    pub const ID_SEED_NUMBER: u16 = 0x0414;
    pub const VERSION_INFO: u16 = 0x0421;
    pub const EXIF_DATA: u16 = 0x0422;
    pub const XMP_METADATA: u16 = 0x0424;
}

/// Kind of an image resource, carrying its raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    ResolutionInfo(Vec<u8>),
    AlphaChannelNames(Vec<u8>),
    PrintFlags(Vec<u8>),
    ColorHalftoningInfo(Vec<u8>),
    ColorTransferFunctions(Vec<u8>),
    LayerStateInfo(Vec<u8>),
    LayersGroupInfo(Vec<u8>),
    Thumbnail(Vec<u8>),
    IccProfile(Vec<u8>),
    IccUntaggedProfile(Vec<u8>),
    IdSeedNumber(Vec<u8>),
    VersionInfo(Vec<u8>),
    ExifData(Vec<u8>),
    XmpMetadata(Vec<u8>),
    Unrecognized(Vec<u8>),
}

impl ResourceKind {
    pub fn from_id(resource_id: u16, data: Vec<u8>) -> Self {
        match resource_id {
            id::RESOLUTION_INFO => ResourceKind::ResolutionInfo(data),
            id::ALPHA_CHANNEL_NAMES => ResourceKind::AlphaChannelNames(data),
            id::PRINT_FLAGS => ResourceKind::PrintFlags(data),
            id::COLOR_HALFTONING_INFO => ResourceKind::ColorHalftoningInfo(data),
            id::COLOR_TRANSFER_FUNCTIONS => ResourceKind::ColorTransferFunctions(data),
            id::LAYER_STATE_INFO => ResourceKind::LayerStateInfo(data),
            id::LAYERS_GROUP_INFO => ResourceKind::LayersGroupInfo(data),
            id::THUMBNAIL => ResourceKind::Thumbnail(data),
            id::ICC_PROFILE => ResourceKind::IccProfile(data),
            id::ICC_UNTAGGED_PROFILE => ResourceKind::IccUntaggedProfile(data),
            id::ID_SEED_NUMBER => ResourceKind::IdSeedNumber(data),
            id::VERSION_INFO => ResourceKind::VersionInfo(data),
            id::EXIF_DATA => ResourceKind::ExifData(data),
            id::XMP_METADATA => ResourceKind::XmpMetadata(data),
            _ => ResourceKind::Unrecognized(data),
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            ResourceKind::ResolutionInfo(d)
            | ResourceKind::AlphaChannelNames(d)
            | ResourceKind::PrintFlags(d)
            | ResourceKind::ColorHalftoningInfo(d)
            | ResourceKind::ColorTransferFunctions(d)
            | ResourceKind::LayerStateInfo(d)
            | ResourceKind::LayersGroupInfo(d)
            | ResourceKind::Thumbnail(d)
            | ResourceKind::IccProfile(d)
            | ResourceKind::IccUntaggedProfile(d)
            | ResourceKind::IdSeedNumber(d)
            | ResourceKind::VersionInfo(d)
            | ResourceKind::ExifData(d)
            | ResourceKind::XmpMetadata(d)
            | ResourceKind::Unrecognized(d) => d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub id: u16,
    pub name: String,
    pub kind: ResourceKind,
}

/// Read resource blocks until the cursor is exhausted
pub(crate) fn read_resources(
    cursor: &mut ByteCursor<'_>,
) -> Result<IndexMap<u16, ImageResource>, PsdError> {
    let mut resources = IndexMap::new();

    while !cursor.is_empty() {
        let sig = cursor.read_signature()?;
        if !RESOURCE_SIGNATURES.contains(&&sig) {
            return Err(PsdError::Format(format!(
                "wrong image resource signature '{}' at {}",
                tag_str(&sig),
                cursor.position() - 4
            )));
        }

        let resource_id = cursor.read_u16()?;
        let name = cursor.read_pascal_bytes()?;
        // Length byte plus name, padded to even
        cursor.skip(((1 + name.len()) % 2) as u64)?;
        let size = cursor.read_u32()? as u64;
        let data = cursor.read_bytes(size as usize)?.to_vec();
        // Final pad byte may be missing
        let pad = (size % 2).min(cursor.remaining() as u64);
        cursor.skip(pad)?;

        tracing::trace!("Image resource 0x{:04X}: {} bytes", resource_id, size);

        resources.insert(
            resource_id,
            ImageResource {
                id: resource_id,
                name: String::from_utf8_lossy(name).into_owned(),
                kind: ResourceKind::from_id(resource_id, data),
            },
        );
    }

    Ok(resources)
}
