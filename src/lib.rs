//! psd-layers - layered Photoshop document decoder
//!
//! Decodes PSD and PSB files held in memory into a [`Document`] with every
//! layer's record fields and composited RGBA pixels.

pub mod psd;

pub use psd::{
    parse_from_buffer, parse_from_path, parse_with_options, parse_with_registry, BlendMode,
    ColorMode, DecodeOptions, Document, InfoRegistry, Layer, PsdError, Rectangle, SizeMode,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a `RUST_LOG`-driven tracing subscriber
///
/// Intended for binaries; the library itself never installs one.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "psd_layers=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
