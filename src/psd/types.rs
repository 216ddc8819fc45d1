//! PSD document model
//!
//! Everything here is produced once by a single decode pass and is not
//! mutated afterwards. All multi-byte values in the source are Big-Endian.

use std::fmt;

use image::RgbaImage;
use indexmap::IndexMap;
use serde::Serialize;

use super::descriptor::Descriptor;
use super::error::PsdError;
use super::resources::ImageResource;

/// PSD file signature
pub const PSD_SIGNATURE: &[u8; 4] = b"8BPS";

/// Signature of layer records and standard additional info blocks
pub const BIM_SIGNATURE: &[u8; 4] = b"8BIM";

/// Signature of additional info blocks written by large-document aware tools
pub const B64_SIGNATURE: &[u8; 4] = b"8B64";

/// Document size mode, selected by the header version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// Version 1: .psd
    #[default]
    Standard,
    /// Version 2: .psb, with 64-bit section and channel lengths
    Large,
}

impl SizeMode {
    pub fn from_version(version: u16) -> Result<Self, PsdError> {
        match version {
            1 => Ok(SizeMode::Standard),
            2 => Ok(SizeMode::Large),
            v => Err(PsdError::Format(format!("unsupported version: {}", v))),
        }
    }

    pub fn is_large(self) -> bool {
        self == SizeMode::Large
    }
}

/// PSD color modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    #[default]
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
    Other(u16),
}

impl ColorMode {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => ColorMode::Bitmap,
            1 => ColorMode::Grayscale,
            2 => ColorMode::Indexed,
            3 => ColorMode::Rgb,
            4 => ColorMode::Cmyk,
            7 => ColorMode::Multichannel,
            8 => ColorMode::Duotone,
            9 => ColorMode::Lab,
            other => ColorMode::Other(other),
        }
    }
}

/// Named compositing rule of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    PassThrough,
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// Bounding rectangle; width and height are always derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rectangle {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Rectangle {
    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Width in pixels; inverted rectangles are empty
    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64).clamp(0, u32::MAX as i64) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64).clamp(0, u32::MAX as i64) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.top, self.left, self.bottom, self.right
        )
    }
}

/// Channel information in a layer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerChannel {
    /// Channel ID: -1=transparency, -2=user mask, -3=real mask, 0.. = color
    pub id: i16,
    /// Declared length of channel data, including the compression tag
    pub length: u64,
}

/// Layer blending range thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlendingRange {
    /// "Gray" for the composite range, "Channel{n}" afterwards
    pub name: String,
    pub source_black: i16,
    pub source_white: i16,
    pub dest_black: i16,
    pub dest_white: i16,
}

/// Layer mask / adjustment layer data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerMask {
    pub rect: Rectangle,
    /// 0 or 255
    pub default_color: u8,
    pub flags: u8,
    /// Present only in the long form of the mask block
    pub real: Option<RealMask>,
}

/// Second ("real") mask carried by the long form of the mask block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealMask {
    pub flags: u8,
    pub background: u8,
    pub rect: Rectangle,
}

/// Layer record flags
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerFlags {
    pub transparency_protected: bool,
    pub visible: bool,
    pub obsolete: bool,
    pub has_useful_info: bool,
    pub pixel_data_irrelevant: bool,
}

impl LayerFlags {
    pub fn from_byte(b: u8) -> Self {
        Self {
            transparency_protected: (b & 0x01) != 0,
            visible: (b & 0x02) == 0, // Note: bit clear = visible
            obsolete: (b & 0x04) != 0,
            has_useful_info: (b & 0x08) != 0,
            pixel_data_irrelevant: (b & 0x10) != 0,
        }
    }
}

/// Layer sheet color setting (`lclr`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SheetColor(pub [u16; 4]);

impl SheetColor {
    /// Photoshop only uses the first component, as a color label index
    pub fn label(&self) -> &'static str {
        match self.0[0] {
            0 => "none",
            1 => "red",
            2 => "orange",
            3 => "yellow",
            4 => "green",
            5 => "blue",
            6 => "violet",
            7 => "gray",
            _ => "unknown",
        }
    }
}

/// Kind of a section divider (`lsct`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Other,
    OpenFolder,
    ClosedFolder,
    /// Hidden marker closing a group
    BoundingDivider,
    Unknown(u32),
}

impl SectionKind {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => SectionKind::Other,
            1 => SectionKind::OpenFolder,
            2 => SectionKind::ClosedFolder,
            3 => SectionKind::BoundingDivider,
            other => SectionKind::Unknown(other),
        }
    }
}

/// Folder section setting of a layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionDivider {
    pub kind: SectionKind,
    pub blend_mode: Option<BlendMode>,
    /// 0 = normal, 1 = scene group
    pub sub_type: Option<u32>,
}

/// Type tool object setting (`TySh`)
#[derive(Debug, Clone)]
pub struct TypeTool {
    pub text: Descriptor,
    pub warp: Descriptor,
}

/// A single layer of the document
#[derive(Debug, Clone, Default, Serialize)]
pub struct Layer {
    pub id: i32,
    pub name: String,
    #[serde(rename = "rectangle")]
    pub rect: Rectangle,
    pub channels: Vec<LayerChannel>,
    /// `None` when the blend key is not a known mode
    pub blend_mode: Option<BlendMode>,
    /// 0-100
    pub opacity: u8,
    pub clipping: u8,
    pub flags: u8,
    pub mask: Option<LayerMask>,
    pub blending_ranges: Vec<BlendingRange>,
    pub is_background: bool,
    pub blend_clipped_elements: bool,
    pub blend_interior_elements: bool,
    pub knockout: bool,
    pub protection_flags: u32,
    pub sheet_color: Option<SheetColor>,
    pub reference_point: Option<[f64; 2]>,
    pub section: Option<SectionDivider>,
    #[serde(skip)]
    pub effects: Option<Descriptor>,
    #[serde(skip)]
    pub type_tool: Option<TypeTool>,
    /// Composited RGBA pixels, in layer-local coordinates
    #[serde(skip)]
    pub image: Option<RgbaImage>,
}

impl Layer {
    pub fn is_visible(&self) -> bool {
        LayerFlags::from_byte(self.flags).visible
    }

    pub fn is_folder(&self) -> bool {
        self.section
            .as_ref()
            .is_some_and(|s| !matches!(s.kind, SectionKind::Other))
    }

    pub fn width(&self) -> u32 {
        self.rect.width()
    }

    pub fn height(&self) -> u32 {
        self.rect.height()
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.rect)
    }
}

/// A decoded PSD/PSB document
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    pub size_mode: SizeMode,
    pub channels: u16,
    pub height: u32,
    pub width: u32,
    pub depth: u16,
    pub color_mode: ColorMode,
    /// Image resources in file order, keyed by resource id
    #[serde(skip)]
    pub resources: IndexMap<u16, ImageResource>,
    /// The first alpha channel of the merged result carries transparency
    pub merged_alpha: bool,
    pub layers: Vec<Layer>,
    /// Merged composite image, when its mode and depth are supported
    #[serde(skip)]
    pub image: Option<RgbaImage>,
}

impl Document {
    pub fn is_large(&self) -> bool {
        self.size_mode.is_large()
    }

    pub fn layers_by_name(&self, name: &str) -> Vec<&Layer> {
        self.layers.iter().filter(|l| l.name == name).collect()
    }

    pub fn layer_by_id(&self, id: i32) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn resource(&self, id: u16) -> Option<&ImageResource> {
        self.resources.get(&id)
    }

    pub fn to_json(&self) -> Result<String, PsdError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PsdError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
