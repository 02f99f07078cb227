use std::fmt;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// D65 reference white.
const XN: f64 = 0.950470;
const YN: f64 = 1.0;
const ZN: f64 = 1.088830;

const T0: f64 = 4.0 / 29.0;
const T1: f64 = 6.0 / 29.0;
const T2: f64 = 3.0 * T1 * T1;

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts a CIE HCL color (hue in degrees) to sRGB, clamping out-of-gamut channels.
    pub fn from_hcl(hue: f64, chroma: f64, luminance: f64) -> Self {
        let h = hue.to_radians();
        let (a, b) = (h.cos() * chroma, h.sin() * chroma);

        let y = (luminance + 16.0) / 116.0;
        let x = y + a / 500.0;
        let z = y - b / 200.0;
        let x = XN * lab_to_xyz(x);
        let y = YN * lab_to_xyz(y);
        let z = ZN * lab_to_xyz(z);

        Self {
            r: xyz_to_rgb(3.2404542 * x - 1.5371385 * y - 0.4985314 * z),
            g: xyz_to_rgb(-0.9692660 * x + 1.8760108 * y + 0.0415560 * z),
            b: xyz_to_rgb(0.0556434 * x - 0.2040259 * y + 1.0572252 * z),
        }
    }
}

fn lab_to_xyz(t: f64) -> f64 {
    if t > T1 { t * t * t } else { T2 * (t - T0) }
}

fn xyz_to_rgb(v: f64) -> u8 {
    let linear = if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (255.0 * linear).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The rainbow color for a normalized position `t` in `[0, 1]`.
pub fn rainbow(t: f64) -> Rgb {
    Rgb::from_hcl(t * 360.0, 100.0, 55.0)
}

/// Maps sequence positions onto `[0, 1]` over the domain `[0, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionScale {
    end: f64,
}

impl PositionScale {
    pub fn new(end: usize) -> Self {
        Self { end: end as f64 }
    }

    /// Takes a fractional position so that means of several positions can be colored.
    pub fn normalize(&self, position: f64) -> f64 {
        if self.end <= 0.0 {
            return 0.0;
        }
        position / self.end
    }

    pub fn color(&self, position: f64) -> Rgb {
        rainbow(self.normalize(position))
    }
}
