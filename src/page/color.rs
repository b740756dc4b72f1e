use std::fmt;

/// A parsed CSS color. Only the notations the storefront theme and its
/// competing stylesheets actually use are understood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= f32::EPSILON
    }

    /// Parses `#rgb`, `#rrggbb`, `rgb()`, `rgba()` and a handful of keywords.
    /// A trailing `!important` is tolerated.
    pub fn parse(input: &str) -> Option<Self> {
        let value = input.trim().trim_end_matches("!important").trim();
        let lower = value.to_ascii_lowercase();

        match lower.as_str() {
            "transparent" => return Some(Self::TRANSPARENT),
            "white" => return Some(Self::opaque(255, 255, 255)),
            "black" => return Some(Self::opaque(0, 0, 0)),
            _ => {}
        }

        if let Some(hex) = lower.strip_prefix('#') {
            return parse_hex(hex);
        }

        let (args, has_alpha) = if let Some(rest) = lower.strip_prefix("rgba(") {
            (rest.strip_suffix(')')?, true)
        } else if let Some(rest) = lower.strip_prefix("rgb(") {
            (rest.strip_suffix(')')?, false)
        } else {
            return None;
        };

        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        match (parts.len(), has_alpha) {
            (3, false) => Some(Self::opaque(
                parse_channel(parts[0])?,
                parse_channel(parts[1])?,
                parse_channel(parts[2])?,
            )),
            (4, true) => Some(Self {
                r: parse_channel(parts[0])?,
                g: parse_channel(parts[1])?,
                b: parse_channel(parts[2])?,
                a: parse_alpha(parts[3])?,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Rgba {
    /// Serializes the way browsers report computed colors.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digit = |idx: usize| u8::from_str_radix(hex.get(idx..idx + 1)?, 16).ok();
    let pair = |idx: usize| u8::from_str_radix(hex.get(idx..idx + 2)?, 16).ok();

    match hex.len() {
        3 => Some(Rgba::opaque(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
        6 => Some(Rgba::opaque(pair(0)?, pair(2)?, pair(4)?)),
        _ => None,
    }
}

fn parse_number(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|number| number.is_finite())
}

fn parse_channel(value: &str) -> Option<u8> {
    Some(parse_number(value)?.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(value: &str) -> Option<f32> {
    Some(parse_number(value)?.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_notations_agree() {
        let white = Rgba::opaque(255, 255, 255);
        for input in ["#fff", "#FFFFFF", "rgb(255, 255, 255)", "white", "#ffffff !important"] {
            assert_eq!(Rgba::parse(input), Some(white), "{input}");
        }
    }

    #[test]
    fn transparent_notations_agree() {
        assert!(Rgba::parse("transparent").unwrap().is_transparent());
        assert!(Rgba::parse("rgba(0, 0, 0, 0)").unwrap().is_transparent());
        assert!(!Rgba::parse("rgba(0, 0, 0, 0.3)").unwrap().is_transparent());
    }

    #[test]
    fn rejects_unknown_notation() {
        assert_eq!(Rgba::parse("hsl(0, 0%, 100%)"), None);
        assert_eq!(Rgba::parse("#ffff"), None);
        assert_eq!(Rgba::parse("rgb(1, 2)"), None);
    }

    #[test]
    fn non_finite_components_are_rejected() {
        assert_eq!(Rgba::parse("rgba(0, 0, 0, nan)"), None);
        assert_eq!(Rgba::parse("rgba(0,0,0,NaN)"), None);
        assert_eq!(Rgba::parse("rgba(0, 0, 0, inf)"), None);
        assert_eq!(Rgba::parse("rgb(nan, 0, 0)"), None);
        assert_eq!(Rgba::parse("rgb(0, -inf, 0)"), None);
        assert_eq!(Rgba::parse("rgba(0, 0, 0, 7)").map(|c| c.a), Some(1.0));
    }

    #[test]
    fn displays_like_computed_style() {
        assert_eq!(Rgba::parse("#333").unwrap().to_string(), "rgb(51, 51, 51)");
        assert_eq!(Rgba::TRANSPARENT.to_string(), "rgba(0, 0, 0, 0)");
    }
}
