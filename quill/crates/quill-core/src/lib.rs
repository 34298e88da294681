//! Core types for quill.
//!
//! This crate provides the building blocks shared by every other quill crate:
//!
//! - [`color`]: ANSI, palette and RGB colors with depth downgrading
//! - [`color_depth`]: the four supported output color depths
//! - [`style`]: style strings, class rules and attribute resolution
//! - [`formatted_text`]: `(style, text)` fragment lists
//! - [`markup`]: a tag syntax producing formatted text
//! - [`width`]: cell widths of characters and strings
//! - [`geometry`]: cell positions and sizes
//! - [`id`]: window identifiers
//! - [`error`]: error types
//!
//! # Examples
//!
//! ```
//! use quill_core::color::Color;
//! use quill_core::color_depth::ColorDepth;
//! use quill_core::style::Style;
//!
//! let style = Style::from_rules([("title", "bold #ff8800")]).unwrap();
//! let attrs = style.attrs_for_style_str("class:title underline");
//! assert!(attrs.bold() && attrs.underline());
//! assert_eq!(attrs.fg.downgrade(ColorDepth::Depth8Bit), Color::Indexed(208));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::match_same_arms)]

pub mod color;
pub mod color_depth;
pub mod error;
pub mod formatted_text;
pub mod geometry;
pub mod id;
pub mod markup;
pub mod style;
pub mod width;

// Re-export commonly used types at the crate root for convenience
pub use color::{AnsiColor, Color};
pub use color_depth::ColorDepth;
pub use error::{ColorParseError, Error, MarkupError, Result, StyleError};
pub use formatted_text::{Fragment, FormattedText};
pub use geometry::{Point, Size};
pub use id::WindowId;
pub use style::{default_ui_style, AttrFlags, Attrs, AttrsPatch, Style};
