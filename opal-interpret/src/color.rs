//! Device color spaces.

use log::warn;
use opal_raster::Rgba;
use smallvec::SmallVec;

/// The color components currently set in the graphics state.
pub type ColorComponents = SmallVec<[f32; 4]>;

/// The device color spaces the interpreter evaluates itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ColorSpace {
    /// Single-component gray.
    #[default]
    DeviceGray,
    /// Three-component additive RGB.
    DeviceRgb,
    /// Four-component subtractive CMYK.
    DeviceCmyk,
}

impl ColorSpace {
    /// Map a color-space name to a device color space. CIE-based spaces
    /// degrade to their device counterparts.
    pub fn from_name(name: &[u8]) -> Option<ColorSpace> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::DeviceGray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" | b"Lab" => Some(ColorSpace::DeviceRgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::DeviceCmyk),
            _ => {
                warn!(
                    "unsupported color space {}, using DeviceGray",
                    String::from_utf8_lossy(name)
                );

                None
            }
        }
    }

    /// The number of components of the space.
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRgb => 3,
            ColorSpace::DeviceCmyk => 4,
        }
    }

    /// The initial color of the space (black in every device space).
    pub fn initial_components(&self) -> ColorComponents {
        match self {
            ColorSpace::DeviceGray => SmallVec::from_slice(&[0.0]),
            ColorSpace::DeviceRgb => SmallVec::from_slice(&[0.0, 0.0, 0.0]),
            ColorSpace::DeviceCmyk => SmallVec::from_slice(&[0.0, 0.0, 0.0, 1.0]),
        }
    }

    /// Convert components in this space to RGB. Missing components read
    /// as zero.
    pub fn to_rgb(&self, comps: &[f32]) -> (f32, f32, f32) {
        let c = |i: usize| comps.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);

        match self {
            ColorSpace::DeviceGray => {
                let g = c(0);
                (g, g, g)
            }
            ColorSpace::DeviceRgb => (c(0), c(1), c(2)),
            ColorSpace::DeviceCmyk => {
                let k = c(3);
                (
                    (1.0 - c(0)) * (1.0 - k),
                    (1.0 - c(1)) * (1.0 - k),
                    (1.0 - c(2)) * (1.0 - k),
                )
            }
        }
    }

    /// Convert components plus an alpha to an [`Rgba`].
    pub fn to_rgba(&self, comps: &[f32], alpha: f32) -> Rgba {
        let (r, g, b) = self.to_rgb(comps);

        Rgba::new(r, g, b, alpha.clamp(0.0, 1.0))
    }
}
