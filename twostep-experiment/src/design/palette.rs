//! Stimulus colors and the distance metric used to keep them apart.

pub const PLANET_COLORS: [&str; 6] = [
    "#5b7c65", "#706081", "#7f5d5d", "#5f6f81", "#d16ba5", "#d9b24c",
];
pub const FONT_COLORS: [&str; 6] = [
    "#398667", "#754198", "#aa5349", "#416598", "#b33c86", "#b38600",
];
pub const COLOR_NAMES: [&str; 6] = ["green", "purple", "red", "blue", "pink", "yellow"];

/// Rocket colors; none of them is a planet color.
pub const ROCKET_PALETTE: [&str; 12] = [
    "#FFD700",   // gold
    "#FF69B4",   // hot pink
    "#00CED1",   // neon blue
    "#9DE82B",   // neon green
    "#FFA500",   // orange
    "#8A2BE2",   // violet
    "#FF4500",   // orange red
    "#4de0a0ff", // turquoise
    "#0681aaff", // deep blue
    "#8a6dbfff", // pastel purple
    "#FF1493",   // deep pink
    "#354e1bff", // deep green
];

/// Squared RGB distance two colors must exceed to count as distinct.
pub const MIN_DISTANCE_SQ: u32 = 80 * 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#RRGGBB` or `#RRGGBBAA`; the alpha channel is ignored.
    pub fn parse(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let rgb = match digits.len() {
            6 => digits,
            8 => digits.get(..6)?,
            _ => return None,
        };
        let value = u32::from_str_radix(rgb, 16).ok()?;
        Some(Self {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        })
    }

    pub fn distance_sq(self, other: Rgb) -> u32 {
        let channel = |a: u8, b: u8| {
            let d = i32::from(a) - i32::from(b);
            (d * d) as u32
        };
        channel(self.r, other.r) + channel(self.g, other.g) + channel(self.b, other.b)
    }
}

/// Squared distance between two hex colors; `None` when either fails to parse.
pub fn distance_sq(a: &str, b: &str) -> Option<u32> {
    Some(Rgb::parse(a)?.distance_sq(Rgb::parse(b)?))
}

/// Smallest squared distance from `color` to any of `others`.
pub fn min_distance_sq(color: Rgb, others: &[Rgb]) -> u32 {
    others
        .iter()
        .map(|other| color.distance_sq(*other))
        .min()
        .unwrap_or(u32::MAX)
}
