//! Terminal colors.
//!
//! A [`Color`] is one of the 16 ANSI colors, an index into the 256 color
//! palette, or a 24-bit RGB value. Colors parse from the spellings used in
//! style strings:
//!
//! - ANSI names: `ansired`, `ansibrightblack`, `ansidefault`, ...
//! - Named colors: `red`, `darkblue`, `orange`, ...
//! - Hex: `#f00`, `#ff0000` or a bare `ff0000`
//! - Functional: `rgb(255, 0, 0)`
//!
//! Downgrading to a lower [`ColorDepth`] maps truecolor to the 256 palette
//! (gray ramp for unsaturated colors, 6x6x6 cube otherwise) and 256 colors to
//! the nearest of the 16 ANSI colors.

use crate::color_depth::ColorDepth;
use crate::error::ColorParseError;
use once_cell::sync::Lazy;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// The 16 ANSI colors plus the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    Gray,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    White,
}

impl AnsiColor {
    /// All colors in palette order.
    pub const ALL: [Self; 16] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::Gray,
        Self::BrightBlack,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
        Self::White,
    ];

    /// The SGR foreground code (30-37, 90-97).
    pub const fn fg_code(self) -> u8 {
        match self {
            Self::Black => 30,
            Self::Red => 31,
            Self::Green => 32,
            Self::Yellow => 33,
            Self::Blue => 34,
            Self::Magenta => 35,
            Self::Cyan => 36,
            Self::Gray => 37,
            Self::BrightBlack => 90,
            Self::BrightRed => 91,
            Self::BrightGreen => 92,
            Self::BrightYellow => 93,
            Self::BrightBlue => 94,
            Self::BrightMagenta => 95,
            Self::BrightCyan => 96,
            Self::White => 97,
        }
    }

    /// The SGR background code (40-47, 100-107).
    pub const fn bg_code(self) -> u8 {
        self.fg_code() + 10
    }

    /// Index of this color in the 256 color palette.
    pub const fn index(self) -> u8 {
        match self {
            Self::Black => 0,
            Self::Red => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Blue => 4,
            Self::Magenta => 5,
            Self::Cyan => 6,
            Self::Gray => 7,
            Self::BrightBlack => 8,
            Self::BrightRed => 9,
            Self::BrightGreen => 10,
            Self::BrightYellow => 11,
            Self::BrightBlue => 12,
            Self::BrightMagenta => 13,
            Self::BrightCyan => 14,
            Self::White => 15,
        }
    }

    /// Approximate RGB value as rendered by xterm.
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Black => (0x00, 0x00, 0x00),
            Self::Red => (0xcd, 0x00, 0x00),
            Self::Green => (0x00, 0xcd, 0x00),
            Self::Yellow => (0xcd, 0xcd, 0x00),
            Self::Blue => (0x00, 0x00, 0xcd),
            Self::Magenta => (0xcd, 0x00, 0xcd),
            Self::Cyan => (0x00, 0xcd, 0xcd),
            Self::Gray => (0xe5, 0xe5, 0xe5),
            Self::BrightBlack => (0x7f, 0x7f, 0x7f),
            Self::BrightRed => (0xff, 0x00, 0x00),
            Self::BrightGreen => (0x00, 0xff, 0x00),
            Self::BrightYellow => (0xff, 0xff, 0x00),
            Self::BrightBlue => (0x00, 0x00, 0xff),
            Self::BrightMagenta => (0xff, 0x00, 0xff),
            Self::BrightCyan => (0x00, 0xff, 0xff),
            Self::White => (0xff, 0xff, 0xff),
        }
    }

    /// The style-string name, e.g. `ansibrightred`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Black => "ansiblack",
            Self::Red => "ansired",
            Self::Green => "ansigreen",
            Self::Yellow => "ansiyellow",
            Self::Blue => "ansiblue",
            Self::Magenta => "ansimagenta",
            Self::Cyan => "ansicyan",
            Self::Gray => "ansigray",
            Self::BrightBlack => "ansibrightblack",
            Self::BrightRed => "ansibrightred",
            Self::BrightGreen => "ansibrightgreen",
            Self::BrightYellow => "ansibrightyellow",
            Self::BrightBlue => "ansibrightblue",
            Self::BrightMagenta => "ansibrightmagenta",
            Self::BrightCyan => "ansibrightcyan",
            Self::White => "ansiwhite",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let name = match name {
            "ansilightgray" => "ansigray",
            "ansidarkgray" => "ansibrightblack",
            other => other,
        };
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    fn is_grayish(self) -> bool {
        matches!(
            self,
            Self::Black | Self::Gray | Self::BrightBlack | Self::White
        )
    }
}

/// A terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default foreground or background.
    #[default]
    Default,
    /// One of the 16 ANSI colors.
    Ansi(AnsiColor),
    /// An entry of the 256 color palette.
    Indexed(u8),
    /// A 24-bit color.
    Rgb(u8, u8, u8),
}

static NAMED_COLORS: Lazy<HashMap<&'static str, (u8, u8, u8)>> = Lazy::new(|| {
    [
        ("aqua", (0x00, 0xff, 0xff)),
        ("beige", (0xf5, 0xf5, 0xdc)),
        ("black", (0x00, 0x00, 0x00)),
        ("blue", (0x00, 0x00, 0xff)),
        ("brown", (0xa5, 0x2a, 0x2a)),
        ("chocolate", (0xd2, 0x69, 0x1e)),
        ("coral", (0xff, 0x7f, 0x50)),
        ("crimson", (0xdc, 0x14, 0x3c)),
        ("cyan", (0x00, 0xff, 0xff)),
        ("darkblue", (0x00, 0x00, 0x8b)),
        ("darkcyan", (0x00, 0x8b, 0x8b)),
        ("darkgray", (0xa9, 0xa9, 0xa9)),
        ("darkgreen", (0x00, 0x64, 0x00)),
        ("darkgrey", (0xa9, 0xa9, 0xa9)),
        ("darkmagenta", (0x8b, 0x00, 0x8b)),
        ("darkorange", (0xff, 0x8c, 0x00)),
        ("darkred", (0x8b, 0x00, 0x00)),
        ("darkviolet", (0x94, 0x00, 0xd3)),
        ("deeppink", (0xff, 0x14, 0x93)),
        ("deepskyblue", (0x00, 0xbf, 0xff)),
        ("dimgray", (0x69, 0x69, 0x69)),
        ("firebrick", (0xb2, 0x22, 0x22)),
        ("forestgreen", (0x22, 0x8b, 0x22)),
        ("fuchsia", (0xff, 0x00, 0xff)),
        ("gold", (0xff, 0xd7, 0x00)),
        ("gray", (0x80, 0x80, 0x80)),
        ("green", (0x00, 0x80, 0x00)),
        ("greenyellow", (0xad, 0xff, 0x2f)),
        ("grey", (0x80, 0x80, 0x80)),
        ("hotpink", (0xff, 0x69, 0xb4)),
        ("indigo", (0x4b, 0x00, 0x82)),
        ("ivory", (0xff, 0xff, 0xf0)),
        ("khaki", (0xf0, 0xe6, 0x8c)),
        ("lavender", (0xe6, 0xe6, 0xfa)),
        ("lightblue", (0xad, 0xd8, 0xe6)),
        ("lightcyan", (0xe0, 0xff, 0xff)),
        ("lightgray", (0xd3, 0xd3, 0xd3)),
        ("lightgreen", (0x90, 0xee, 0x90)),
        ("lightgrey", (0xd3, 0xd3, 0xd3)),
        ("lightpink", (0xff, 0xb6, 0xc1)),
        ("lightyellow", (0xff, 0xff, 0xe0)),
        ("lime", (0x00, 0xff, 0x00)),
        ("magenta", (0xff, 0x00, 0xff)),
        ("maroon", (0x80, 0x00, 0x00)),
        ("navy", (0x00, 0x00, 0x80)),
        ("olive", (0x80, 0x80, 0x00)),
        ("orange", (0xff, 0xa5, 0x00)),
        ("orangered", (0xff, 0x45, 0x00)),
        ("orchid", (0xda, 0x70, 0xd6)),
        ("pink", (0xff, 0xc0, 0xcb)),
        ("plum", (0xdd, 0xa0, 0xdd)),
        ("purple", (0x80, 0x00, 0x80)),
        ("red", (0xff, 0x00, 0x00)),
        ("royalblue", (0x41, 0x69, 0xe1)),
        ("salmon", (0xfa, 0x80, 0x72)),
        ("seagreen", (0x2e, 0x8b, 0x57)),
        ("silver", (0xc0, 0xc0, 0xc0)),
        ("skyblue", (0x87, 0xce, 0xeb)),
        ("steelblue", (0x46, 0x82, 0xb4)),
        ("tan", (0xd2, 0xb4, 0x8c)),
        ("teal", (0x00, 0x80, 0x80)),
        ("tomato", (0xff, 0x63, 0x47)),
        ("turquoise", (0x40, 0xe0, 0xd0)),
        ("violet", (0xee, 0x82, 0xee)),
        ("wheat", (0xf5, 0xde, 0xb3)),
        ("white", (0xff, 0xff, 0xff)),
        ("yellow", (0xff, 0xff, 0x00)),
        ("yellowgreen", (0x9a, 0xcd, 0x32)),
    ]
    .into_iter()
    .collect()
});

impl Color {
    /// Parses a color from its style-string spelling.
    ///
    /// ```
    /// use quill_core::color::{AnsiColor, Color};
    ///
    /// assert_eq!(Color::parse("ansired"), Ok(Color::Ansi(AnsiColor::Red)));
    /// assert_eq!(Color::parse("#ff8000"), Ok(Color::Rgb(255, 128, 0)));
    /// assert_eq!(Color::parse("rgb(1, 2, 3)"), Ok(Color::Rgb(1, 2, 3)));
    /// ```
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ColorParseError::EmptyInput);
        }
        let lower = input.to_ascii_lowercase();

        if lower == "default" || lower == "ansidefault" {
            return Ok(Self::Default);
        }
        if lower.starts_with("ansi") {
            return AnsiColor::from_name(&lower)
                .map(Self::Ansi)
                .ok_or(ColorParseError::UnknownColor(lower));
        }
        if let Some(hex) = lower.strip_prefix('#') {
            return Self::from_hex(hex);
        }
        if let Some(args) = lower
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::from_rgb_args(args);
        }
        if let Some(&(r, g, b)) = NAMED_COLORS.get(lower.as_str()) {
            return Ok(Self::Rgb(r, g, b));
        }
        if lower.len() == 6 && lower.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(&lower);
        }
        Err(ColorParseError::UnknownColor(lower))
    }

    fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digit = |c: char| c.to_digit(16).ok_or(ColorParseError::InvalidHexChar);
        let chars: Vec<char> = hex.chars().collect();
        match chars.len() {
            3 => {
                let r = digit(chars[0])? as u8;
                let g = digit(chars[1])? as u8;
                let b = digit(chars[2])? as u8;
                Ok(Self::Rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let pair = |i: usize| -> Result<u8, ColorParseError> {
                    Ok((digit(chars[i])? * 16 + digit(chars[i + 1])?) as u8)
                };
                Ok(Self::Rgb(pair(0)?, pair(2)?, pair(4)?))
            }
            n => Err(ColorParseError::InvalidLength(n)),
        }
    }

    fn from_rgb_args(args: &str) -> Result<Self, ColorParseError> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ColorParseError::InvalidRgb(args.to_string()));
        }
        let mut values = [0u8; 3];
        for (slot, part) in values.iter_mut().zip(parts) {
            *slot = part
                .parse::<u8>()
                .map_err(|_| ColorParseError::InvalidRgb(args.to_string()))?;
        }
        Ok(Self::Rgb(values[0], values[1], values[2]))
    }

    /// The RGB approximation of this color, if it has one.
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Default => None,
            Self::Ansi(ansi) => Some(ansi.rgb()),
            Self::Indexed(index) => Some(index_to_rgb(index)),
            Self::Rgb(r, g, b) => Some((r, g, b)),
        }
    }

    /// Maps this color to what an output of `depth` can display.
    ///
    /// The result is a fixed point: downgrading it again to the same depth
    /// returns it unchanged.
    pub fn downgrade(self, depth: ColorDepth) -> Self {
        match depth {
            ColorDepth::Depth1Bit => Self::Default,
            ColorDepth::Depth4Bit => match self {
                Self::Default | Self::Ansi(_) => self,
                Self::Indexed(index) => Self::Ansi(closest_ansi(index_to_rgb(index))),
                Self::Rgb(r, g, b) => Self::Ansi(closest_ansi((r, g, b))),
            },
            ColorDepth::Depth8Bit => match self {
                Self::Rgb(r, g, b) => Self::Indexed(rgb_to_256(r, g, b)),
                other => other,
            },
            ColorDepth::Depth24Bit => self,
        }
    }

    /// SGR parameters selecting this color as foreground or background.
    pub fn sgr_params(self, background: bool) -> SmallVec<[u8; 5]> {
        let mut params = SmallVec::new();
        match self {
            Self::Default => params.push(if background { 49 } else { 39 }),
            Self::Ansi(ansi) => params.push(if background {
                ansi.bg_code()
            } else {
                ansi.fg_code()
            }),
            Self::Indexed(index) => {
                params.extend_from_slice(&[if background { 48 } else { 38 }, 5, index]);
            }
            Self::Rgb(r, g, b) => {
                params.extend_from_slice(&[if background { 48 } else { 38 }, 2, r, g, b]);
            }
        }
        params
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Ansi(ansi) => f.write_str(ansi.name()),
            Self::Indexed(index) => {
                let (r, g, b) = index_to_rgb(*index);
                write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
            }
            Self::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
        }
    }
}

/// RGB value of a 256 palette entry.
pub fn index_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => AnsiColor::ALL[index as usize].rgb(),
        16..=231 => {
            let idx = index - 16;
            let level = |n: u8| if n == 0 { 0 } else { 55 + n * 40 };
            (level(idx / 36), level((idx % 36) / 6), level(idx % 6))
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    }
}

/// Saturation component of the HLS representation, in `0.0..=1.0`.
fn hls_saturation(r: u8, g: u8, b: u8) -> f32 {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if (max - min).abs() < f32::EPSILON {
        return 0.0;
    }
    let lightness = (max + min) / 2.0;
    if lightness <= 0.5 {
        (max - min) / (max + min)
    } else {
        (max - min) / (2.0 - max - min)
    }
}

/// Maps an RGB color onto the 256 palette.
pub fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
    if hls_saturation(r, g, b) < 0.1 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        if avg < 4 {
            return 16;
        }
        if avg > 246 {
            return 231;
        }
        let step = ((avg.saturating_sub(8) + 5) / 10).min(23) as u8;
        return 232 + step;
    }
    16 + 36 * cube_index(r) + 6 * cube_index(g) + cube_index(b)
}

fn cube_index(val: u8) -> u8 {
    // Cube levels: 0, 95, 135, 175, 215, 255
    if val < 48 {
        0
    } else if val < 115 {
        1
    } else if val < 155 {
        2
    } else if val < 195 {
        3
    } else if val < 235 {
        4
    } else {
        5
    }
}

/// Nearest ANSI color by euclidean distance.
///
/// Saturated colors never map onto the gray entries.
pub fn closest_ansi((r, g, b): (u8, u8, u8)) -> AnsiColor {
    let saturation = r.abs_diff(g) as u32 + g.abs_diff(b) as u32 + b.abs_diff(r) as u32;
    let distance = |c: AnsiColor| {
        let (cr, cg, cb) = c.rgb();
        let dr = cr as i32 - r as i32;
        let dg = cg as i32 - g as i32;
        let db = cb as i32 - b as i32;
        dr * dr + dg * dg + db * db
    };
    AnsiColor::ALL
        .into_iter()
        .filter(|c| saturation <= 30 || !c.is_grayish())
        .min_by_key(|c| distance(*c))
        .unwrap_or(AnsiColor::Black)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ansi_names() {
        assert_eq!(
            Color::parse("ansibrightblack"),
            Ok(Color::Ansi(AnsiColor::BrightBlack))
        );
        assert_eq!(Color::parse("ansidefault"), Ok(Color::Default));
        assert_eq!(
            Color::parse("ansidarkgray"),
            Ok(Color::Ansi(AnsiColor::BrightBlack))
        );
        assert!(matches!(
            Color::parse("ansipurple"),
            Err(ColorParseError::UnknownColor(_))
        ));
    }

    #[test]
    fn test_parse_hex_and_named() {
        assert_eq!(Color::parse("#f00"), Ok(Color::Rgb(255, 0, 0)));
        assert_eq!(Color::parse("#00FF7f"), Ok(Color::Rgb(0, 255, 127)));
        assert_eq!(Color::parse("aabbcc"), Ok(Color::Rgb(0xaa, 0xbb, 0xcc)));
        assert_eq!(Color::parse("red"), Ok(Color::Rgb(255, 0, 0)));
        assert_eq!(Color::parse("#12345"), Err(ColorParseError::InvalidLength(5)));
        assert_eq!(Color::parse("#ggg"), Err(ColorParseError::InvalidHexChar));
        assert_eq!(Color::parse(""), Err(ColorParseError::EmptyInput));
    }

    #[test]
    fn test_parse_rgb_function() {
        assert_eq!(Color::parse("rgb(10, 20,30)"), Ok(Color::Rgb(10, 20, 30)));
        assert!(matches!(
            Color::parse("rgb(10, 20)"),
            Err(ColorParseError::InvalidRgb(_))
        ));
        assert!(matches!(
            Color::parse("rgb(300, 0, 0)"),
            Err(ColorParseError::InvalidRgb(_))
        ));
    }

    #[test]
    fn test_rgb_to_256_gray_and_cube() {
        assert_eq!(rgb_to_256(0, 0, 0), 16);
        assert_eq!(rgb_to_256(255, 255, 255), 231);
        let gray = rgb_to_256(128, 128, 128);
        assert!((232..=255).contains(&gray));
        assert_eq!(rgb_to_256(255, 0, 0), 196);
        assert_eq!(rgb_to_256(0, 0, 255), 21);
    }

    #[test]
    fn test_closest_ansi() {
        assert_eq!(closest_ansi((250, 5, 5)), AnsiColor::BrightRed);
        assert_eq!(closest_ansi((200, 0, 0)), AnsiColor::Red);
        assert_eq!(closest_ansi((10, 10, 10)), AnsiColor::Black);
        assert_eq!(closest_ansi((128, 128, 128)), AnsiColor::BrightBlack);
    }

    #[test]
    fn test_downgrade_is_idempotent() {
        let samples = [
            Color::Default,
            Color::Ansi(AnsiColor::Cyan),
            Color::Indexed(33),
            Color::Indexed(244),
            Color::Rgb(12, 200, 99),
            Color::Rgb(90, 90, 91),
        ];
        for depth in [
            ColorDepth::Depth1Bit,
            ColorDepth::Depth4Bit,
            ColorDepth::Depth8Bit,
            ColorDepth::Depth24Bit,
        ] {
            for color in samples {
                let once = color.downgrade(depth);
                assert_eq!(once.downgrade(depth), once, "{color:?} at {depth:?}");
            }
        }
    }

    #[test]
    fn test_downgrade_targets() {
        assert_eq!(
            Color::Rgb(255, 0, 0).downgrade(ColorDepth::Depth8Bit),
            Color::Indexed(196)
        );
        assert_eq!(
            Color::Indexed(196).downgrade(ColorDepth::Depth4Bit),
            Color::Ansi(AnsiColor::BrightRed)
        );
        assert_eq!(
            Color::Ansi(AnsiColor::Red).downgrade(ColorDepth::Depth1Bit),
            Color::Default
        );
    }

    #[test]
    fn test_sgr_params() {
        assert_eq!(Color::Default.sgr_params(false).as_slice(), &[39]);
        assert_eq!(Color::Default.sgr_params(true).as_slice(), &[49]);
        assert_eq!(
            Color::Ansi(AnsiColor::BrightRed).sgr_params(true).as_slice(),
            &[101]
        );
        assert_eq!(Color::Indexed(200).sgr_params(false).as_slice(), &[38, 5, 200]);
        assert_eq!(
            Color::Rgb(1, 2, 3).sgr_params(true).as_slice(),
            &[48, 2, 1, 2, 3]
        );
    }

    #[test]
    fn test_index_to_rgb() {
        assert_eq!(index_to_rgb(196), (255, 0, 0));
        assert_eq!(index_to_rgb(232), (8, 8, 8));
        assert_eq!(index_to_rgb(1), (0xcd, 0, 0));
    }
}
