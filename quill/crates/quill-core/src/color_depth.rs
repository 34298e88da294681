//! Terminal color depth.

use std::fmt;
use std::str::FromStr;

/// Name of the environment variable that overrides the default color depth.
pub const COLOR_DEPTH_ENV: &str = "QUILL_COLOR_DEPTH";

/// Number of colors an output can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ColorDepth {
    /// Monochrome; only attributes such as bold and reverse are emitted.
    Depth1Bit,
    /// The 16 ANSI colors.
    Depth4Bit,
    /// The 256 color palette.
    #[default]
    Depth8Bit,
    /// 24-bit true color.
    Depth24Bit,
}

impl ColorDepth {
    /// Alias for [`ColorDepth::Depth1Bit`].
    pub const MONOCHROME: Self = Self::Depth1Bit;
    /// Alias for [`ColorDepth::Depth4Bit`].
    pub const ANSI_COLORS_ONLY: Self = Self::Depth4Bit;
    /// Alias for [`ColorDepth::Depth24Bit`].
    pub const TRUE_COLOR: Self = Self::Depth24Bit;

    /// Parses an environment value.
    ///
    /// Accepts `one_bit`, `four_bit`, `eight_bit`, `twenty_four_bit` and the
    /// `DEPTH_1_BIT` .. `DEPTH_24_BIT` spellings, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "one_bit" | "depth_1_bit" | "monochrome" => Some(Self::Depth1Bit),
            "four_bit" | "depth_4_bit" | "ansi_colors_only" => Some(Self::Depth4Bit),
            "eight_bit" | "depth_8_bit" | "default" => Some(Self::Depth8Bit),
            "twenty_four_bit" | "depth_24_bit" | "true_color" | "truecolor" => {
                Some(Self::Depth24Bit)
            }
            _ => None,
        }
    }

    /// The canonical environment spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Depth1Bit => "one_bit",
            Self::Depth4Bit => "four_bit",
            Self::Depth8Bit => "eight_bit",
            Self::Depth24Bit => "twenty_four_bit",
        }
    }

    /// Number of bits per color.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Depth1Bit => 1,
            Self::Depth4Bit => 4,
            Self::Depth8Bit => 8,
            Self::Depth24Bit => 24,
        }
    }
}

impl fmt::Display for ColorDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown color depth: {s}"))
    }
}
