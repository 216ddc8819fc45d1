//! Additional layer information blocks
//!
//! Each block after the layer name is `signature, key, length, data`. Blocks
//! are dispatched by key through an [`InfoRegistry`]; keys without a handler
//! are skipped. Handlers always receive a cursor bounded to the block, so the
//! record stream resumes at `data_pos + data_length` whatever they consume.

use std::collections::HashMap;
use std::fmt;

use super::blend_mode_from_key;
use super::cursor::{tag_str, ByteCursor};
use super::descriptor::{read_descriptor, read_versioned_descriptor};
use super::error::PsdError;
use super::options::DecodeOptions;
use super::types::{
    Layer, SectionDivider, SectionKind, SheetColor, TypeTool, BIM_SIGNATURE,
};

/// Keys whose length field is 64-bit in large documents
pub const WIDE_LENGTH_KEYS: [&[u8; 4]; 13] = [
    b"LMsk", b"Lr16", b"Lr32", b"Layr", b"Mt16", b"Mt32", b"Mtrn", b"Alph", b"FMsk", b"lnk2",
    b"FEid", b"FXid", b"PxSD",
];

pub fn has_wide_length(key: &[u8; 4]) -> bool {
    WIDE_LENGTH_KEYS.iter().any(|k| *k == key)
}

/// What a handler knows about the block it is decoding
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    pub key: [u8; 4],
    /// Declared length, rounded up to even
    pub length: u64,
    pub layer_index: usize,
    pub options: &'a DecodeOptions,
}

/// Decodes one block into the layer; `cursor` covers exactly the block data
pub type InfoHandler =
    fn(&mut ByteCursor<'_>, &mut Layer, &BlockContext<'_>) -> Result<(), PsdError>;

/// Maps 4-byte block keys to handlers
#[derive(Clone)]
pub struct InfoRegistry {
    handlers: HashMap<[u8; 4], InfoHandler>,
}

impl fmt::Debug for InfoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.handlers.keys().map(tag_str).collect();
        keys.sort();
        f.debug_struct("InfoRegistry").field("keys", &keys).finish()
    }
}

impl Default for InfoRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(*b"luni", read_unicode_name);
        registry.register(*b"lnsr", read_name_source);
        registry.register(*b"lyid", read_layer_id);
        registry.register(*b"clbl", read_blend_clipped);
        registry.register(*b"infx", read_blend_interior);
        registry.register(*b"knko", read_knockout);
        registry.register(*b"lspf", read_protection);
        registry.register(*b"lclr", read_sheet_color);
        registry.register(*b"fxrp", read_reference_point);
        registry.register(*b"lsct", read_section_divider);
        registry.register(*b"lfx2", read_effects);
        registry.register(*b"TySh", read_type_tool);
        registry
    }
}

impl InfoRegistry {
    /// Registry without any handlers: every block is skipped
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Install or replace the handler for `key`, returning the previous one
    pub fn register(&mut self, key: [u8; 4], handler: InfoHandler) -> Option<InfoHandler> {
        self.handlers.insert(key, handler)
    }

    pub fn handler(&self, key: &[u8; 4]) -> InfoHandler {
        self.handlers.get(key).copied().unwrap_or(skip_block)
    }
}

fn skip_block(
    cursor: &mut ByteCursor<'_>,
    _layer: &mut Layer,
    ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    cursor.skip(ctx.length)
}

fn read_unicode_name(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.name = cursor.read_unicode_string()?;
    Ok(())
}

// layr / bgnd
fn read_name_source(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.is_background = &cursor.read_signature()? == b"bgnd";
    Ok(())
}

fn read_layer_id(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.id = cursor.read_i32()?;
    Ok(())
}

/// Boolean stored as one byte followed by 3 padding bytes
fn read_flag(cursor: &mut ByteCursor<'_>) -> Result<bool, PsdError> {
    let value = cursor.read_u8()? == 1;
    cursor.skip(3)?;
    Ok(value)
}

fn read_blend_clipped(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.blend_clipped_elements = read_flag(cursor)?;
    Ok(())
}

fn read_blend_interior(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.blend_interior_elements = read_flag(cursor)?;
    Ok(())
}

fn read_knockout(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.knockout = read_flag(cursor)?;
    Ok(())
}

fn read_protection(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    layer.protection_flags = cursor.read_u32()?;
    Ok(())
}

fn read_sheet_color(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    let mut color = [0u16; 4];
    for component in &mut color {
        *component = cursor.read_u16()?;
    }
    layer.sheet_color = Some(SheetColor(color));
    Ok(())
}

fn read_reference_point(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    _ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    let x = cursor.read_f64()?;
    let y = cursor.read_f64()?;
    layer.reference_point = Some([x, y]);
    Ok(())
}

fn read_section_divider(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    let kind = SectionKind::from_u32(cursor.read_u32()?);

    let mut blend_mode = None;
    if ctx.length >= 12 {
        let sig = cursor.read_signature()?;
        if &sig != BIM_SIGNATURE {
            return Err(PsdError::Format(format!(
                "[Layer #{}] wrong section divider signature '{}'",
                ctx.layer_index,
                tag_str(&sig)
            )));
        }
        blend_mode = blend_mode_from_key(&cursor.read_signature()?);
    }

    let sub_type = if ctx.length >= 16 {
        Some(cursor.read_u32()?)
    } else {
        None
    };

    layer.section = Some(SectionDivider {
        kind,
        blend_mode,
        sub_type,
    });
    Ok(())
}

/// Descriptor content is optional metadata: failures are logged, not fatal
fn tolerate<T>(result: Result<T, PsdError>, ctx: &BlockContext<'_>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                "[Layer #{}] ignoring undecodable '{}' block: {}",
                ctx.layer_index,
                tag_str(&ctx.key),
                e
            );
            None
        }
    }
}

fn read_effects(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    if !ctx.options.decode_descriptors {
        return Ok(());
    }
    let result = cursor
        .read_u32() // Object effects version
        .and_then(|_| read_versioned_descriptor(cursor));
    layer.effects = tolerate(result, ctx);
    Ok(())
}

fn read_type_tool(
    cursor: &mut ByteCursor<'_>,
    layer: &mut Layer,
    ctx: &BlockContext<'_>,
) -> Result<(), PsdError> {
    if !ctx.options.decode_descriptors {
        return Ok(());
    }
    let mut read = || -> Result<TypeTool, PsdError> {
        // Version, transform (6 doubles), text version, descriptor version
        cursor.skip(56)?;
        let text = read_descriptor(cursor)?;
        // Warp version, descriptor version
        cursor.skip(6)?;
        let warp = read_descriptor(cursor)?;
        // Left, top, right, bottom
        cursor.skip(32)?;
        Ok(TypeTool { text, warp })
    };
    layer.type_tool = tolerate(read(), ctx);
    Ok(())
}
