#![allow(clippy::unwrap_used)]
//! Whole-document decoding over synthetic files

use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

use super::compression::tests::packbits_encode;
use super::layer_record::tests::{info_block, RecordBuilder};
use super::types::{ColorMode, Rectangle, SizeMode};
use super::{
    parse_from_buffer, parse_from_path, parse_with_options, parse_with_registry, DecodeOptions,
    InfoRegistry, PsdError,
};

fn raw_channel(plane: &[u8]) -> Vec<u8> {
    let mut buf = vec![0, 0];
    buf.extend_from_slice(plane);
    buf
}

fn rle_channel(rows: &[Vec<u8>], large: bool) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = rows.iter().map(|r| packbits_encode(r)).collect();
    let mut buf = Vec::new();
    buf.write_u16::<BigEndian>(1).unwrap();
    for row in &encoded {
        if large {
            buf.write_u32::<BigEndian>(row.len() as u32).unwrap();
        } else {
            buf.write_u16::<BigEndian>(row.len() as u16).unwrap();
        }
    }
    for row in encoded {
        buf.extend(row);
    }
    buf
}

struct TestLayer {
    record: RecordBuilder,
    /// (channel id, payload including compression tag)
    channels: Vec<(i16, Vec<u8>)>,
}

impl TestLayer {
    fn new(name: &str, rect: (i32, i32, i32, i32)) -> Self {
        Self {
            record: RecordBuilder {
                rect,
                name: name.as_bytes().to_vec(),
                ..Default::default()
            },
            channels: Vec::new(),
        }
    }

    /// Four raw channels (alpha, red, green, blue) filled with constants
    fn solid(name: &str, rect: (i32, i32, i32, i32), argb: [u8; 4]) -> Self {
        let mut layer = Self::new(name, rect);
        let size = ((rect.2 - rect.0) * (rect.3 - rect.1)).max(0) as usize;
        for (id, value) in [-1i16, 0, 1, 2].into_iter().zip(argb) {
            layer.channels.push((id, raw_channel(&vec![value; size])));
        }
        layer
    }
}

struct DocBuilder {
    large: bool,
    width: u32,
    height: u32,
    channels: u16,
    color_mode: u16,
    resources: Vec<u8>,
    layers: Vec<TestLayer>,
    negative_count: bool,
    merged: Vec<u8>,
}

impl Default for DocBuilder {
    fn default() -> Self {
        Self {
            large: false,
            width: 2,
            height: 2,
            channels: 3,
            color_mode: 3,
            resources: Vec::new(),
            layers: Vec::new(),
            negative_count: false,
            merged: Vec::new(),
        }
    }
}

impl DocBuilder {
    fn write_length(&self, buf: &mut Vec<u8>, length: usize) {
        if self.large {
            buf.write_u64::<BigEndian>(length as u64).unwrap();
        } else {
            buf.write_u32::<BigEndian>(length as u32).unwrap();
        }
    }

    fn build(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_all(b"8BPS").unwrap();
        buf.write_u16::<BigEndian>(if self.large { 2 } else { 1 }).unwrap();
        buf.write_all(&[0u8; 6]).unwrap();
        buf.write_u16::<BigEndian>(self.channels).unwrap();
        buf.write_u32::<BigEndian>(self.height).unwrap();
        buf.write_u32::<BigEndian>(self.width).unwrap();
        buf.write_u16::<BigEndian>(8).unwrap();
        buf.write_u16::<BigEndian>(self.color_mode).unwrap();

        buf.write_u32::<BigEndian>(0).unwrap(); // Color mode data
        buf.write_u32::<BigEndian>(self.resources.len() as u32).unwrap();
        buf.write_all(&self.resources).unwrap();

        let mut info = Vec::new();
        let count = self.layers.len() as i16;
        info.write_i16::<BigEndian>(if self.negative_count { -count } else { count })
            .unwrap();
        for layer in &mut self.layers {
            layer.record.large = self.large;
            layer.record.channels = layer
                .channels
                .iter()
                .map(|(id, data)| (*id, data.len() as u64))
                .collect();
            info.extend(layer.record.build());
        }
        for layer in &self.layers {
            for (_, data) in &layer.channels {
                info.extend(data);
            }
        }
        if info.len() % 2 == 1 {
            info.push(0);
        }

        let mut section = Vec::new();
        self.write_length(&mut section, info.len());
        section.extend(info);
        section.write_u32::<BigEndian>(0).unwrap(); // Global layer mask info

        self.write_length(&mut buf, section.len());
        buf.extend(section);
        buf.extend(&self.merged);
        buf
    }
}

#[test]
fn test_two_by_two_document() {
    let mut builder = DocBuilder {
        layers: vec![TestLayer::solid("Layer 1", (0, 0, 2, 2), [10, 20, 30, 40])],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    assert_eq!(doc.size_mode, SizeMode::Standard);
    assert_eq!((doc.width, doc.height), (2, 2));
    assert_eq!(doc.color_mode, ColorMode::Rgb);
    assert_eq!(doc.layers.len(), 1);

    let layer = &doc.layers[0];
    assert_eq!(layer.name, "Layer 1");
    assert_eq!(layer.opacity, 100);
    let image = layer.image.as_ref().unwrap();
    assert_eq!(image.dimensions(), (2, 2));
    for pixel in image.pixels() {
        assert_eq!(pixel.0, [20, 30, 40, 10]);
    }
    assert!(doc.image.is_none());
}

#[test]
fn test_corrupted_signature_names_layer() {
    let mut layers: Vec<TestLayer> = (0..4)
        .map(|i| TestLayer::solid(&format!("L{i}"), (0, 0, 1, 1), [255, 1, 2, 3]))
        .collect();
    layers[2].record.signature = *b"XXXX";
    let mut builder = DocBuilder {
        layers,
        ..Default::default()
    };

    let err = parse_from_buffer(&builder.build()).unwrap_err();
    match err {
        PsdError::Format(msg) => assert!(msg.contains("#2"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_zero_size_layer_then_decoded_layer() {
    let mut empty = TestLayer::new("Group end", (0, 0, 0, 0));
    for id in [-1, 0, 1, 2] {
        empty.channels.push((id, raw_channel(&[])));
    }
    let mut builder = DocBuilder {
        layers: vec![
            empty,
            TestLayer::solid("Paint", (1, 1, 2, 3), [200, 5, 6, 7]),
        ],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    assert!(doc.layers[0].image.is_none());
    let image = doc.layers[1].image.as_ref().unwrap();
    assert_eq!(image.dimensions(), (2, 1));
    assert_eq!(image.get_pixel(1, 0).0, [5, 6, 7, 200]);
}

#[test]
fn test_rle_channels() {
    let rows = vec![vec![1, 1, 1, 2], vec![3, 4, 4, 4], vec![9, 9, 9, 9]];
    let mut layer = TestLayer::new("RLE", (0, 0, 3, 4));
    layer.channels.push((-1, rle_channel(&vec![vec![255; 4]; 3], false)));
    layer.channels.push((0, rle_channel(&rows, false)));
    layer.channels.push((1, raw_channel(&[0; 12])));
    layer.channels.push((2, rle_channel(&rows, false)));
    let mut builder = DocBuilder {
        layers: vec![layer],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    let image = doc.layers[0].image.as_ref().unwrap();
    assert_eq!(image.get_pixel(3, 0).0, [2, 0, 2, 255]);
    assert_eq!(image.get_pixel(0, 1).0, [3, 0, 3, 255]);
    assert_eq!(image.get_pixel(2, 2).0, [9, 0, 9, 255]);
}

#[test]
fn test_large_document() {
    let rows = vec![vec![7, 7], vec![8, 8]];
    let mut layer = TestLayer::new("Big", (0, 0, 2, 2));
    for id in [-1, 0, 1, 2] {
        layer.channels.push((id, rle_channel(&rows, true)));
    }
    layer.record.info = info_block(b"lyid", &[0, 0, 0, 77]);
    let mut builder = DocBuilder {
        large: true,
        layers: vec![layer],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    assert!(doc.is_large());
    assert_eq!(doc.layers[0].id, 77);
    // Tag, two 32-bit row counts, two 3-byte literal rows
    assert_eq!(doc.layers[0].channels[0].length, 2 + 2 * 4 + 2 * 3);
    let image = doc.layers[0].image.as_ref().unwrap();
    assert_eq!(image.get_pixel(0, 1).0, [8, 8, 8, 8]);
}

#[test]
fn test_negative_layer_count_sets_merged_alpha() {
    let mut builder = DocBuilder {
        layers: vec![TestLayer::solid("A", (0, 0, 1, 1), [1, 2, 3, 4])],
        negative_count: true,
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();
    assert!(doc.merged_alpha);
    assert_eq!(doc.layers.len(), 1);
}

#[test]
fn test_three_channel_layer_has_no_image() {
    let mut layer = TestLayer::new("RGB only", (0, 0, 1, 1));
    for id in [0, 1, 2] {
        layer.channels.push((id, raw_channel(&[50])));
    }
    let mut builder = DocBuilder {
        layers: vec![layer, TestLayer::solid("Next", (0, 0, 1, 1), [1, 2, 3, 4])],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();
    assert!(doc.layers[0].image.is_none());
    assert!(doc.layers[1].image.is_some());
}

#[test]
fn test_clean_end_after_records() {
    let mut layer = TestLayer::new("Only", (0, 0, 1, 1));
    layer.record.channels = vec![(-1, 3), (0, 3), (1, 3), (2, 3)];
    let record = layer.record.build();

    let mut builder = DocBuilder::default();
    let mut data = builder.build();
    // Replace the layer section with one that ends after the first record
    data.truncate(26 + 8);
    data.write_u32::<BigEndian>(1000).unwrap();
    data.write_u32::<BigEndian>(990).unwrap();
    data.write_i16::<BigEndian>(2).unwrap();
    data.extend(&record);

    let doc = parse_from_buffer(&data).unwrap();
    assert_eq!(doc.layers.len(), 1);
    assert_eq!(doc.layers[0].name, "Only");
    assert!(doc.layers[0].image.is_none());
}

#[test]
fn test_truncated_record_is_error() {
    let mut builder = DocBuilder {
        layers: vec![TestLayer::solid("Cut", (0, 0, 1, 1), [1, 2, 3, 4])],
        ..Default::default()
    };
    let data = builder.build();
    // Header, color data, resources, section and info lengths, count, 10 record bytes
    let cut = 26 + 8 + 8 + 2 + 10;
    let err = parse_from_buffer(&data[..cut]).unwrap_err();
    assert!(err.is_truncation(), "{err}");
}

#[test]
fn test_header_only_document() {
    let mut data = DocBuilder::default().build();
    data.truncate(26);
    let doc = parse_from_buffer(&data).unwrap();
    assert_eq!((doc.width, doc.height), (2, 2));
    assert!(doc.layers.is_empty());
}

#[test]
fn test_merged_image_and_metadata_only() {
    let mut merged = vec![0, 0];
    for value in [11u8, 22, 33] {
        merged.extend([value; 4]);
    }
    let mut builder = DocBuilder {
        layers: vec![TestLayer::solid("A", (0, 0, 2, 2), [1, 2, 3, 4])],
        merged,
        ..Default::default()
    };
    let data = builder.build();

    let doc = parse_from_buffer(&data).unwrap();
    let merged = doc.image.as_ref().unwrap();
    assert_eq!(merged.get_pixel(1, 1).0, [11, 22, 33, 255]);

    // Channels skipped by length still leave the cursor on the merged image
    let options = DecodeOptions {
        decode_pixels: false,
        ..Default::default()
    };
    let doc = parse_with_options(&data, &options).unwrap();
    assert!(doc.layers[0].image.is_none());
    assert!(doc.image.is_some());

    let doc = parse_with_options(&data, &DecodeOptions::metadata_only()).unwrap();
    assert_eq!(doc.layers.len(), 1);
    assert!(doc.image.is_none());
}

#[test]
fn test_resources_are_kept() {
    let mut resources = Vec::new();
    resources.write_all(b"8BIM").unwrap();
    resources.write_u16::<BigEndian>(0x0424).unwrap();
    resources.write_all(&[0, 0]).unwrap(); // Empty name, padded
    resources.write_u32::<BigEndian>(2).unwrap();
    resources.write_all(b"<>").unwrap();
    let mut builder = DocBuilder {
        resources,
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();
    assert_eq!(doc.resource(0x0424).unwrap().kind.data(), b"<>");
}

#[test]
fn test_lookups_and_json() {
    let mut first = TestLayer::solid("Ink", (0, 0, 1, 1), [1, 2, 3, 4]);
    first.record.info = info_block(b"lyid", &[0, 0, 0, 5]);
    let mut second = TestLayer::solid("Ink", (0, 0, 1, 1), [1, 2, 3, 4]);
    second.record.info = info_block(b"lyid", &[0, 0, 0, 6]);
    let mut builder = DocBuilder {
        layers: vec![first, second, TestLayer::solid("Paper", (0, 0, 1, 1), [1, 2, 3, 4])],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    assert_eq!(doc.layers_by_name("Ink").len(), 2);
    assert!(doc.layers_by_name("Missing").is_empty());
    assert_eq!(doc.layer_by_id(6).unwrap().name, "Ink");
    assert!(doc.layer_by_id(99).is_none());
    assert_eq!(doc.layer(2).unwrap().name, "Paper");
    assert!(doc.layer(3).is_none());

    let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
    assert_eq!(json["layers"][2]["name"], "Paper");
    assert_eq!(json["layers"][0]["rectangle"]["right"], 1);
    assert_eq!(json["layers"][0]["blend_mode"], "normal");
    assert!(json["layers"][0].get("image").is_none());
}

#[test]
fn test_custom_registry_handler() {
    let mut layer = TestLayer::solid("Tagged", (0, 0, 1, 1), [1, 2, 3, 4]);
    layer.record.info = info_block(b"cust", &[0, 0, 0, 9]);
    let mut builder = DocBuilder {
        layers: vec![layer],
        ..Default::default()
    };
    let data = builder.build();

    let mut registry = InfoRegistry::default();
    registry.register(*b"cust", |cursor, layer, _| {
        layer.protection_flags = cursor.read_u32()?;
        Ok(())
    });
    let doc = parse_with_registry(&data, &DecodeOptions::default(), &registry).unwrap();
    assert_eq!(doc.layers[0].protection_flags, 9);

    let doc = parse_from_buffer(&data).unwrap();
    assert_eq!(doc.layers[0].protection_flags, 0);
}

#[test]
fn test_parse_from_path() {
    let mut builder = DocBuilder {
        layers: vec![TestLayer::solid("File", (0, 0, 1, 1), [1, 2, 3, 4])],
        ..Default::default()
    };
    let path = std::env::temp_dir().join(format!("psd-layers-test-{}.psd", std::process::id()));
    std::fs::write(&path, builder.build()).unwrap();

    let doc = parse_from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(doc.layers[0].name, "File");
    assert_eq!(doc.layers[0].rect, Rectangle::new(0, 0, 1, 1));

    assert!(matches!(
        parse_from_path(path.with_extension("missing")),
        Err(PsdError::Io(_))
    ));
}

/// Short user mask block: rect, default color, flags, padding
fn short_mask(rect: (i32, i32, i32, i32)) -> Vec<u8> {
    let mut mask = Vec::new();
    for v in [rect.0, rect.1, rect.2, rect.3] {
        mask.write_i32::<BigEndian>(v).unwrap();
    }
    mask.extend([0, 0, 0, 0]);
    mask
}

#[test]
fn test_user_mask_among_first_four_channels() {
    // RGB layer with a user mask and no transparency channel
    let mut masked = TestLayer::new("Masked", (0, 0, 4, 4));
    masked.record.mask = short_mask((0, 0, 2, 2));
    for id in [0, 1, 2] {
        masked.channels.push((id, raw_channel(&[80; 16])));
    }
    masked.channels.push((-2, raw_channel(&[255; 4])));

    let mut builder = DocBuilder {
        layers: vec![masked, TestLayer::solid("After", (0, 0, 1, 1), [9, 8, 7, 6])],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    assert_eq!(doc.layers.len(), 2);
    assert_eq!(doc.layers[0].mask.as_ref().unwrap().rect, Rectangle::new(0, 0, 2, 2));
    assert!(doc.layers[0].image.is_none());
    assert_eq!(
        doc.layers[1].image.as_ref().unwrap().get_pixel(0, 0).0,
        [8, 7, 6, 9]
    );
}

#[test]
fn test_user_mask_after_color_channels_is_ignored() {
    let mut masked = TestLayer::solid("Masked", (0, 0, 2, 2), [255, 1, 2, 3]);
    masked.record.mask = short_mask((0, 0, 1, 1));
    masked.channels.insert(1, (-2, raw_channel(&[0])));

    let mut builder = DocBuilder {
        layers: vec![masked],
        ..Default::default()
    };
    let doc = parse_from_buffer(&builder.build()).unwrap();

    let image = doc.layers[0].image.as_ref().unwrap();
    assert_eq!(image.get_pixel(1, 1).0, [1, 2, 3, 255]);
}

#[test]
fn test_oversized_layer_with_empty_rows_is_error() {
    // 4294967295 x 1000 layer whose RLE rows are all zero-length
    let mut huge = TestLayer::new("Huge", (0, i32::MIN, 1000, i32::MAX));
    let mut channel = vec![0, 1];
    channel.extend(vec![0u8; 2 * 1000]);
    for id in [-1, 0, 1, 2] {
        huge.channels.push((id, channel.clone()));
    }
    let mut builder = DocBuilder {
        layers: vec![huge],
        ..Default::default()
    };

    let err = parse_from_buffer(&builder.build()).unwrap_err();
    match err {
        PsdError::Format(msg) => assert!(msg.contains("Layer #0"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}
