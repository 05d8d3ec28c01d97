//! Text model pipeline and legacy layout for Lumen
//!
//! This crate provides:
//! - An incremental text model: logical tables (scripts, fonts, line breaks,
//!   bidirectional info) and visual tables (glyphs, positions, colors) kept in
//!   sync with edits by the [`ModelUpdater`]
//! - Pluggable font client, shaper and hyphenator seams with pure Rust
//!   defaults
//! - The legacy paragraph/word layout with its overflow policies and
//!   shrink-to-fit

pub mod bidi;
pub mod color_segmentation;
pub mod config;
pub mod error;
pub mod fonts;
pub mod hyphenation;
pub mod layout;
pub mod logical_model;
pub mod model_updater;
pub mod preedit;
pub mod scripts;
pub mod segmentation;
pub mod shaper;
pub mod text_model;
pub mod types;
pub mod visual_model;

pub use config::{TextConfig, DEFAULT_POINT_SIZE, POINTS_PER_UNIT};
pub use error::{TextError, TextResult};
pub use fonts::{BasicFontClient, FontClient};
pub use hyphenation::{DictionaryHyphenator, Hyphenator, NoHyphenation};
pub use logical_model::LogicalModel;
pub use model_updater::{ModelUpdater, OperationsMask};
pub use preedit::{PreeditAttribute, PreeditState, PreeditStyle};
pub use shaper::{ClusterShaper, Shaper};
pub use text_model::{FontDefaults, TextModel, TextUpdateInfo};
pub use types::*;
pub use visual_model::VisualModel;
