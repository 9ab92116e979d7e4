use std::fmt;
use std::str::FromStr;

/// 24-bit RGB color, stored as `0xRRGGBB`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xffffff);

    pub const fn from_hex(hex: u32) -> Self {
        Rgb(hex & 0x00ff_ffff)
    }

    pub fn r(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub fn b(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRgbError(pub String);

impl fmt::Display for ParseRgbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color: {:?}", self.0)
    }
}

impl std::error::Error for ParseRgbError {}

/// Accepts `#rrggbb`, `0xrrggbb` and `rrggbb`.
impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let digits = t
            .strip_prefix('#')
            .or_else(|| t.strip_prefix("0x"))
            .or_else(|| t.strip_prefix("0X"))
            .unwrap_or(t);
        if digits.len() != 6 {
            return Err(ParseRgbError(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Rgb)
            .map_err(|_| ParseRgbError(s.to_string()))
    }
}
