//! Label-to-color palette: hex string parsing plus `label mod size` lookup
//! (spec §3/§4.5, "Palette extent").

use crate::error::{HyperscatterError, Result};

/// Point labels are 16-bit, so a palette can never usefully exceed this.
pub const MAX_PALETTE_SIZE: usize = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Rgba8 { r, g, b, a: 255 }
    }
}

/// Parses `#rgb`, `#rrggbb`, or `#rrggbbaa` hex color strings.
pub fn parse_hex_color(s: &str) -> Result<Rgba8> {
    let hex = s
        .strip_prefix('#')
        .ok_or_else(|| HyperscatterError::InvalidColor(s.to_string()))?;

    let digit = |c: u8| -> Result<u8> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(HyperscatterError::InvalidColor(s.to_string())),
        }
    };
    let byte_pair = |hi: u8, lo: u8| -> Result<u8> { Ok(digit(hi)? * 16 + digit(lo)?) };
    let nibble_doubled = |c: u8| -> Result<u8> {
        let d = digit(c)?;
        Ok(d * 16 + d)
    };

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => Ok(Rgba8 {
            r: nibble_doubled(bytes[0])?,
            g: nibble_doubled(bytes[1])?,
            b: nibble_doubled(bytes[2])?,
            a: 255,
        }),
        6 => Ok(Rgba8 {
            r: byte_pair(bytes[0], bytes[1])?,
            g: byte_pair(bytes[2], bytes[3])?,
            b: byte_pair(bytes[4], bytes[5])?,
            a: 255,
        }),
        8 => Ok(Rgba8 {
            r: byte_pair(bytes[0], bytes[1])?,
            g: byte_pair(bytes[2], bytes[3])?,
            b: byte_pair(bytes[4], bytes[5])?,
            a: byte_pair(bytes[6], bytes[7])?,
        }),
        _ => Err(HyperscatterError::InvalidColor(s.to_string())),
    }
}

/// A label→color table indexed by `label mod colors.len()`, backing both
/// the candidate renderer's palette texture and the reference renderer's
/// per-point fill color.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Rgba8>,
}

impl Palette {
    pub fn from_hex_strings(hex: &[&str]) -> Result<Self> {
        if hex.len() > MAX_PALETTE_SIZE {
            return Err(HyperscatterError::PaletteTooLarge {
                requested: hex.len(),
                limit: MAX_PALETTE_SIZE,
            });
        }
        let colors = hex
            .iter()
            .map(|s| parse_hex_color(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Palette { colors })
    }

    pub fn from_colors(colors: Vec<Rgba8>) -> Result<Self> {
        if colors.len() > MAX_PALETTE_SIZE {
            return Err(HyperscatterError::PaletteTooLarge {
                requested: colors.len(),
                limit: MAX_PALETTE_SIZE,
            });
        }
        Ok(Palette { colors })
    }

    /// A small built-in categorical palette, used when the caller supplies
    /// no colors of their own.
    pub fn default_categorical() -> Self {
        Palette {
            colors: vec![
                Rgba8::opaque(0x1f, 0x77, 0xb4),
                Rgba8::opaque(0xff, 0x7f, 0x0e),
                Rgba8::opaque(0x2c, 0xa0, 0x2c),
                Rgba8::opaque(0xd6, 0x27, 0x28),
                Rgba8::opaque(0x94, 0x67, 0xbd),
                Rgba8::opaque(0x8c, 0x56, 0x4b),
                Rgba8::opaque(0xe3, 0x77, 0xc2),
                Rgba8::opaque(0x7f, 0x7f, 0x7f),
                Rgba8::opaque(0xbc, 0xbd, 0x22),
                Rgba8::opaque(0x17, 0xbe, 0xcf),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn color_for_label(&self, label: u16) -> Rgba8 {
        self.colors[label as usize % self.colors.len()]
    }

    /// RGBA8 byte rows, in palette order, suitable for uploading as a 1D/2D
    /// texture (candidate renderer) keyed the same way as `color_for_label`.
    pub fn as_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.colors.len() * 4);
        for c in &self.colors {
            out.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_form() {
        let c = parse_hex_color("#f00").unwrap();
        assert_eq!(c, Rgba8::opaque(0xff, 0x00, 0x00));
    }

    #[test]
    fn parses_rrggbb() {
        let c = parse_hex_color("#1f77b4").unwrap();
        assert_eq!(c, Rgba8::opaque(0x1f, 0x77, 0xb4));
    }

    #[test]
    fn parses_rrggbbaa() {
        let c = parse_hex_color("#1f77b480").unwrap();
        assert_eq!(c, Rgba8 { r: 0x1f, g: 0x77, b: 0xb4, a: 0x80 });
    }

    #[test]
    fn rejects_missing_hash_and_bad_length() {
        assert!(parse_hex_color("1f77b4").is_err());
        assert!(parse_hex_color("#1f77b").is_err());
    }

    #[test]
    fn label_wraps_modulo_palette_size() {
        let palette = Palette::from_hex_strings(&["#fff", "#000"]).unwrap();
        assert_eq!(palette.color_for_label(0), palette.color_for_label(2));
        assert_eq!(palette.color_for_label(1), palette.color_for_label(3));
    }

    #[test]
    fn rejects_palette_over_max_size() {
        let hex = vec!["#fff"; MAX_PALETTE_SIZE + 1];
        let err = Palette::from_hex_strings(&hex).unwrap_err();
        assert!(matches!(err, HyperscatterError::PaletteTooLarge { .. }));
    }
}
