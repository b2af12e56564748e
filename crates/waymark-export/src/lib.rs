//! waymark-export: Pure route overlay serializers (sans-IO)
//!
//! Converts computed routes into output formats. Currently supports SVG.

pub mod svg;

pub use svg::{SvgMetadata, build_path_data, floor_runs, to_svg};
