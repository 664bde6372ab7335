use std::fmt;

// ============================================================================
// SRGB / OKLCH CONVERSION
// ============================================================================

/// Gamma-encoded sRGB, nominally in `[0, 1]` per channel. Values produced by
/// [`oklch_to_rgb`] are left unclamped so callers can test [`in_gamut`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Srgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Srgb {
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }

    /// Channels clamped and rounded to 0..=255.
    pub fn to_u8(&self) -> [u8; 3] {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_u8();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    pub fn in_gamut(&self) -> bool {
        in_gamut(self.r, self.g, self.b)
    }
}

/// Lightness in `[0, 1]`, chroma, hue in degrees `[0, 360)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OkLch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

/// Parse `#rgb` or `#rrggbb` (case-insensitive).
pub fn parse_hex(hex: &str) -> Option<Srgb> {
    let digits = hex.trim().strip_prefix('#')?;
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, ch) in digits.chars().enumerate() {
                let v = ch.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Srgb::from_u8(rgb[0], rgb[1], rgb[2]))
        }
        6 => Some(Srgb::from_u8(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        _ => None,
    }
}

fn srgb_to_linear(v: f64) -> f64 {
    if v > 0.04045 {
        ((v + 0.055) / 1.055).powf(2.4)
    } else {
        v / 12.92
    }
}

fn linear_to_srgb(v: f64) -> f64 {
    if v > 0.0031308 {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * v
    }
}

/// sRGB to OKLCH through linear light and OKLab.
pub fn rgb_to_oklch(rgb: Srgb) -> OkLch {
    let r = srgb_to_linear(rgb.r);
    let g = srgb_to_linear(rgb.g);
    let b = srgb_to_linear(rgb.b);

    let l = 0.4122214708 * r + 0.5363325363 * g + 0.0514459929 * b;
    let m = 0.2119034982 * r + 0.6806995451 * g + 0.1073969566 * b;
    let s = 0.0883024619 * r + 0.2817188376 * g + 0.6299787005 * b;

    let (l_, m_, s_) = (l.cbrt(), m.cbrt(), s.cbrt());

    let lightness = 0.2104542553 * l_ + 0.7936177850 * m_ - 0.0040720468 * s_;
    let a = 1.9779984951 * l_ - 2.4285922050 * m_ + 0.4505937099 * s_;
    let bb = 0.0259040371 * l_ + 0.7827717662 * m_ - 0.8086757660 * s_;

    let mut hue = bb.atan2(a).to_degrees();
    if hue < 0.0 {
        hue += 360.0;
    }
    OkLch {
        l: lightness,
        c: a.hypot(bb),
        h: hue,
    }
}

pub fn hex_to_oklch(hex: &str) -> Option<OkLch> {
    parse_hex(hex).map(rgb_to_oklch)
}

/// Inverse of [`rgb_to_oklch`]. The result may fall outside `[0, 1]`.
pub fn oklch_to_rgb(l: f64, c: f64, h: f64) -> Srgb {
    let hr = h.to_radians();
    let a = c * hr.cos();
    let b = c * hr.sin();

    let l_ = l + 0.3963377774 * a + 0.2158037573 * b;
    let m_ = l - 0.1055613458 * a - 0.0638541728 * b;
    let s_ = l - 0.0894841775 * a - 1.2914855480 * b;

    let (l3, m3, s3) = (l_ * l_ * l_, m_ * m_ * m_, s_ * s_ * s_);

    let r = 4.0767416621 * l3 - 3.3077115913 * m3 + 0.2309699292 * s3;
    let g = -1.2684380046 * l3 + 2.6097574011 * m3 - 0.3413193965 * s3;
    let bl = -0.0041960863 * l3 - 0.7034186147 * m3 + 1.7076147010 * s3;

    Srgb {
        r: linear_to_srgb(r),
        g: linear_to_srgb(g),
        b: linear_to_srgb(bl),
    }
}

pub fn in_gamut(r: f64, g: f64, b: f64) -> bool {
    (0.0..=1.0).contains(&r) && (0.0..=1.0).contains(&g) && (0.0..=1.0).contains(&b)
}

// ============================================================================
// COLOR STATE: the picker's current OKLCH value
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorState {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

impl Default for ColorState {
    fn default() -> Self {
        Self { l: 0.6, c: 0.15, h: 200.0 }
    }
}

impl From<OkLch> for ColorState {
    fn from(v: OkLch) -> Self {
        Self { l: v.l, c: v.c, h: v.h }
    }
}

impl ColorState {
    pub fn from_hex(hex: &str) -> Option<Self> {
        hex_to_oklch(hex).map(Self::from)
    }

    /// Parse the `oklch(L% C H)` form written by [`ColorState::css`].
    pub fn parse_css(token: &str) -> Option<Self> {
        let inner = token.trim().strip_prefix("oklch(")?.strip_suffix(')')?;
        let mut parts = inner.split_whitespace();
        let l = parts.next()?.strip_suffix('%')?.parse::<f64>().ok()?;
        let c = parts.next()?.parse::<f64>().ok()?;
        let h = parts.next()?.parse::<f64>().ok()?;
        if parts.next().is_some() || !(l.is_finite() && c.is_finite() && h.is_finite()) {
            return None;
        }
        Some(Self { l: l / 100.0, c, h })
    }

    /// Any color token a cell can hold: hex or `oklch(...)`.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.starts_with('#') {
            Self::from_hex(token)
        } else {
            Self::parse_css(token)
        }
    }

    /// CSS form with lightness and hue rounded to whole units.
    pub fn css(&self) -> String {
        format!("oklch({}% {} {})", (self.l * 100.0).round(), self.c, self.h.round())
    }

    pub fn to_rgb(&self) -> Srgb {
        oklch_to_rgb(self.l, self.c, self.h)
    }

    pub fn to_hex(&self) -> String {
        self.to_rgb().to_hex()
    }

    pub fn in_gamut(&self) -> bool {
        self.to_rgb().in_gamut()
    }
}

impl fmt::Display for ColorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

/// Swatches shown before any palette is loaded.
pub const DEFAULT_PALETTE: [&str; 15] = [
    "#ff0000", "#ff8800", "#ffee00", "#00cc00", "#0099ff", "#0000ff", "#cc00ff", "#ffffff",
    "#888888", "#000000", "#550000", "#553300", "#555500", "#003300", "#003355",
];
