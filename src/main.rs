use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use psd_layers::{parse_with_options, DecodeOptions};

#[derive(Parser)]
#[clap(version, about)]
struct Args {
    /// Path to the .psd or .psb file
    input_file: PathBuf,

    /// Pretty-print the document JSON
    #[clap(short, long)]
    pretty: bool,

    /// Directory to write each decoded layer as a PNG
    #[clap(short, long)]
    export_dir: Option<PathBuf>,

    /// Skip channel data; layers get no images
    #[clap(long)]
    no_pixels: bool,

    /// Skip effects and type tool descriptors
    #[clap(long)]
    no_descriptors: bool,

    /// Skip the merged composite image
    #[clap(long)]
    no_merged: bool,
}

/// File-system friendly form of a layer name
fn file_stem(index: usize, name: &str) -> String {
    let clean: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{index:03}_{clean}")
}

fn main() -> Result<()> {
    psd_layers::init_logging();
    let args = Args::parse();

    let options = DecodeOptions {
        decode_pixels: !args.no_pixels,
        decode_descriptors: !args.no_descriptors,
        decode_merged_image: !args.no_merged,
    };

    let raw = fs::read(&args.input_file)
        .with_context(|| format!("reading {}", args.input_file.display()))?;
    let doc = parse_with_options(&raw, &options)?;

    let json = if args.pretty {
        doc.to_json_pretty()?
    } else {
        doc.to_json()?
    };
    println!("{json}");

    if let Some(dir) = args.export_dir {
        fs::create_dir_all(&dir)?;

        for (i, layer) in doc.layers.iter().enumerate() {
            let Some(image) = &layer.image else {
                tracing::debug!("Layer #{} '{}' has no image", i, layer.name);
                continue;
            };
            let path = dir.join(format!("{}.png", file_stem(i, &layer.name)));
            image.save(&path)?;
            tracing::info!("Exported {}", path.display());
        }

        if let Some(image) = &doc.image {
            let path = dir.join("merged.png");
            image.save(&path)?;
            tracing::info!("Exported {}", path.display());
        }
    }

    Ok(())
}
