//! Photoshop Action Descriptor reader
//!
//! Descriptors are the self-describing key/value records embedded in layer
//! effects (`lfx2`) and type tool (`TySh`) blocks.

use indexmap::IndexMap;

use super::cursor::{tag_str, ByteCursor};
use super::error::PsdError;

/// Nesting limit for descriptors, lists and objects
const MAX_DEPTH: usize = 64;

/// Only descriptor version written by Photoshop
const DESCRIPTOR_VERSION: u32 = 16;

/// A parsed descriptor: class information plus ordered items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub class_id: String,
    pub items: IndexMap<String, DescriptorValue>,
}

impl Descriptor {
    pub fn get(&self, key: &str) -> Option<&DescriptorValue> {
        self.items.get(key)
    }
}

/// Descriptor value types
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorValue {
    Descriptor(Descriptor),
    List(Vec<DescriptorValue>),
    Double(f64),
    UnitFloat { unit: String, value: f64 },
    UnitFloats { unit: String, values: Vec<f64> },
    String(String),
    Boolean(bool),
    Integer(i32),
    LargeInteger(i64),
    Enum { type_id: String, value: String },
    Class { name: String, class_id: String },
    Alias(Vec<u8>),
    Reference(Vec<ReferenceItem>),
    RawData(Vec<u8>),
}

/// One entry of an `obj ` reference value
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceItem {
    Property { class_id: String, key: String },
    Class { class_id: String },
    Enumerated { class_id: String, type_id: String, value: String },
    Offset { class_id: String, offset: u32 },
    Identifier(u32),
    Index(u32),
    Name { class_id: String, name: String },
}

/// Helper to read a key: 4-byte id when the length prefix is 0
fn read_key(cursor: &mut ByteCursor<'_>) -> Result<String, PsdError> {
    let len = cursor.read_u32()?;
    let len = if len == 0 { 4 } else { len as usize };
    Ok(String::from_utf8_lossy(cursor.read_bytes(len)?).into_owned())
}

/// Helper to read a 4-byte type identifier
fn read_type(cursor: &mut ByteCursor<'_>) -> Result<[u8; 4], PsdError> {
    cursor.read_signature()
}

fn read_raw(cursor: &mut ByteCursor<'_>) -> Result<Vec<u8>, PsdError> {
    let len = cursor.read_u32()? as usize;
    Ok(cursor.read_bytes(len)?.to_vec())
}

/// Read a descriptor that is preceded by its 32-bit version
pub fn read_versioned_descriptor(cursor: &mut ByteCursor<'_>) -> Result<Descriptor, PsdError> {
    let version = cursor.read_u32()?;
    if version != DESCRIPTOR_VERSION {
        return Err(PsdError::Format(format!(
            "unknown descriptor version: {}",
            version
        )));
    }
    read_descriptor(cursor)
}

/// Read a descriptor body (name, class id, items)
pub fn read_descriptor(cursor: &mut ByteCursor<'_>) -> Result<Descriptor, PsdError> {
    read_descriptor_at(cursor, 0)
}

fn read_descriptor_at(cursor: &mut ByteCursor<'_>, depth: usize) -> Result<Descriptor, PsdError> {
    if depth > MAX_DEPTH {
        return Err(PsdError::Format(format!(
            "descriptor nesting deeper than {} at offset {}",
            MAX_DEPTH,
            cursor.position()
        )));
    }

    let name = cursor.read_unicode_string()?;
    let class_id = read_key(cursor)?;
    let count = cursor.read_u32()?;

    let mut items = IndexMap::new();
    for _ in 0..count {
        let key = read_key(cursor)?;
        let value_type = read_type(cursor)?;
        let value = read_value(cursor, &value_type, depth)?;
        items.insert(key, value);
    }

    Ok(Descriptor {
        name,
        class_id,
        items,
    })
}

/// Parse a value based on its type code
fn read_value(
    cursor: &mut ByteCursor<'_>,
    value_type: &[u8; 4],
    depth: usize,
) -> Result<DescriptorValue, PsdError> {
    let value = match value_type {
        b"Objc" | b"GlbO" => DescriptorValue::Descriptor(read_descriptor_at(cursor, depth + 1)?),
        b"VlLs" => {
            let count = cursor.read_u32()?;
            let mut list = Vec::new();
            for _ in 0..count {
                let item_type = read_type(cursor)?;
                list.push(read_value(cursor, &item_type, depth + 1)?);
            }
            DescriptorValue::List(list)
        }
        b"doub" => DescriptorValue::Double(cursor.read_f64()?),
        b"UntF" => {
            // e.g. '#Prc' (percent), '#Pxl' (pixels)
            let unit = tag_str(&read_type(cursor)?);
            let value = cursor.read_f64()?;
            DescriptorValue::UnitFloat { unit, value }
        }
        b"UnFl" => {
            let unit = tag_str(&read_type(cursor)?);
            let count = cursor.read_u32()?;
            let mut values = Vec::new();
            for _ in 0..count {
                values.push(cursor.read_f64()?);
            }
            DescriptorValue::UnitFloats { unit, values }
        }
        b"TEXT" => DescriptorValue::String(cursor.read_unicode_string()?),
        b"bool" => DescriptorValue::Boolean(cursor.read_u8()? != 0),
        b"long" => DescriptorValue::Integer(cursor.read_i32()?),
        b"comp" => DescriptorValue::LargeInteger(cursor.read_i64()?),
        b"enum" => {
            let type_id = read_key(cursor)?;
            let value = read_key(cursor)?;
            DescriptorValue::Enum { type_id, value }
        }
        b"type" | b"GlbC" => {
            let name = cursor.read_unicode_string()?;
            let class_id = read_key(cursor)?;
            DescriptorValue::Class { name, class_id }
        }
        b"alis" => DescriptorValue::Alias(read_raw(cursor)?),
        b"tdta" => DescriptorValue::RawData(read_raw(cursor)?),
        b"obj " => DescriptorValue::Reference(read_reference(cursor)?),
        other => {
            return Err(PsdError::UnsupportedFeature(format!(
                "descriptor value type '{}' at offset {}",
                tag_str(other),
                cursor.position()
            )))
        }
    };
    Ok(value)
}

fn read_reference(cursor: &mut ByteCursor<'_>) -> Result<Vec<ReferenceItem>, PsdError> {
    let count = cursor.read_u32()?;
    let mut items = Vec::new();
    for _ in 0..count {
        let ref_type = read_type(cursor)?;
        let item = match &ref_type {
            b"prop" => {
                let _name = cursor.read_unicode_string()?;
                let class_id = read_key(cursor)?;
                let key = read_key(cursor)?;
                ReferenceItem::Property { class_id, key }
            }
            b"Clss" => {
                let _name = cursor.read_unicode_string()?;
                ReferenceItem::Class {
                    class_id: read_key(cursor)?,
                }
            }
            b"Enmr" => {
                let _name = cursor.read_unicode_string()?;
                let class_id = read_key(cursor)?;
                let type_id = read_key(cursor)?;
                let value = read_key(cursor)?;
                ReferenceItem::Enumerated {
                    class_id,
                    type_id,
                    value,
                }
            }
            b"rele" => {
                let _name = cursor.read_unicode_string()?;
                let class_id = read_key(cursor)?;
                let offset = cursor.read_u32()?;
                ReferenceItem::Offset { class_id, offset }
            }
            b"Idnt" => ReferenceItem::Identifier(cursor.read_u32()?),
            b"indx" => ReferenceItem::Index(cursor.read_u32()?),
            b"name" => {
                let _name = cursor.read_unicode_string()?;
                let class_id = read_key(cursor)?;
                let name = cursor.read_unicode_string()?;
                ReferenceItem::Name { class_id, name }
            }
            other => {
                return Err(PsdError::UnsupportedFeature(format!(
                    "reference item type '{}' at offset {}",
                    tag_str(other),
                    cursor.position()
                )))
            }
        };
        items.push(item);
    }
    Ok(items)
}
