//! RGB triples plus color parsing and formatting for config values.

use serde::Serialize;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Largest absolute per-channel difference to `other`.
    pub fn max_channel_diff(&self, other: Rgb) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_color(*self))
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Decimal triple: `"255,0,0"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`, `"off"`/`"black"`
pub fn parse_color(s: &str) -> crate::error::Result<Rgb> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(Rgb::new(0xFF, 0x00, 0x00)),
        "green" => return Ok(Rgb::new(0x00, 0xFF, 0x00)),
        "blue" => return Ok(Rgb::new(0x00, 0x00, 0xFF)),
        "white" => return Ok(Rgb::WHITE),
        "orange" => return Ok(Rgb::new(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(Rgb::new(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(Rgb::new(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(Rgb::new(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(Rgb::BLACK),
        _ => {}
    }

    if s.contains(',') {
        return parse_triple(s);
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(crate::AtmoError::Color(format!(
            "Invalid color: {s} (use #RRGGBB, R,G,B or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| crate::AtmoError::Color(format!("Invalid hex color: {s}")))?;
    Ok(Rgb::new((val >> 16) as u8, (val >> 8) as u8, val as u8))
}

fn parse_triple(s: &str) -> crate::error::Result<Rgb> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(crate::AtmoError::Color(format!(
            "Invalid color: {s} (expected three components)"
        )));
    };
    let channel = |c: &str| {
        c.parse::<u8>()
            .map_err(|_| crate::AtmoError::Color(format!("Invalid channel value: {c}")))
    };
    Ok(Rgb::new(channel(r)?, channel(g)?, channel(b)?))
}

/// Format a color as `#RRGGBB`.
pub fn format_color(c: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}
