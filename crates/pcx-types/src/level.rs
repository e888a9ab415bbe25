use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Compression level for the Deflate codec.
///
/// ```text
/// ┌───────────────┬───────┬──────────────────────────────────────────┐
/// │ Level         │ zlib  │ Notes                                    │
/// ├───────────────┼───────┼──────────────────────────────────────────┤
/// │ NoCompression │ 0     │ stored blocks; output grows by framing   │
/// │ Fastest       │ 1     │ fastest useful compression               │
/// │ Optimal       │ 6     │ default balance of speed and ratio       │
/// │ SmallestSize  │ 9     │ best ratio, slowest                      │
/// └───────────────┴───────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompressionLevel {
    NoCompression,
    Fastest,
    #[default]
    Optimal,
    SmallestSize,
}

impl CompressionLevel {
    /// The zlib-style numeric level (0–9).
    pub fn as_u32(self) -> u32 {
        match self {
            Self::NoCompression => 0,
            Self::Fastest => 1,
            Self::Optimal => 6,
            Self::SmallestSize => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NoCompression => "none",
            Self::Fastest => "fastest",
            Self::Optimal => "optimal",
            Self::SmallestSize => "smallest",
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "no-compression" | "store" | "0" => Ok(Self::NoCompression),
            "fastest" | "fast" | "1" => Ok(Self::Fastest),
            "optimal" | "default" | "6" => Ok(Self::Optimal),
            "smallest" | "smallest-size" | "best" | "9" => Ok(Self::SmallestSize),
            _ => Err(ConfigError::UnknownLevel { name: s.to_owned() }),
        }
    }
}
