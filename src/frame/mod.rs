pub mod expand;
pub mod surface;

use std::fmt;

use crate::error::ViewerError;

/// Bytes per pixel of the expanded, displayable buffer (R, G, B, A)
pub const RGBA_BYTES: usize = 4;

/// Byte layout of a raw preview payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Bgr,
    Rgb,
    Raw8,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 3] = [PixelFormat::Bgr, PixelFormat::Rgb, PixelFormat::Raw8];

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr | PixelFormat::Rgb => 3,
            PixelFormat::Raw8 => 1,
        }
    }

    /// Wire code carried in the `pix` field
    pub fn code(self) -> u8 {
        match self {
            PixelFormat::Bgr => 0,
            PixelFormat::Rgb => 1,
            PixelFormat::Raw8 => 2,
        }
    }

    /// Format that follows this one when the server switches output
    pub fn next(self) -> Self {
        match self {
            PixelFormat::Bgr => PixelFormat::Rgb,
            PixelFormat::Rgb => PixelFormat::Raw8,
            PixelFormat::Raw8 => PixelFormat::Bgr,
        }
    }

    /// Payload size for a `width` x `height` frame, `None` on overflow
    pub fn payload_len(self, width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }
}

impl TryFrom<u8> for PixelFormat {
    type Error = ViewerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PixelFormat::Bgr),
            1 => Ok(PixelFormat::Rgb),
            2 => Ok(PixelFormat::Raw8),
            other => Err(ViewerError::UnsupportedPixelFormat(other)),
        }
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bgr" => Ok(PixelFormat::Bgr),
            "rgb" => Ok(PixelFormat::Rgb),
            "raw8" | "mono" | "gray" => Ok(PixelFormat::Raw8),
            _ => Err(format!("unknown pixel format '{}' (bgr, rgb, raw8)", s)),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PixelFormat::Bgr => write!(f, "BGR"),
            PixelFormat::Rgb => write!(f, "RGB"),
            PixelFormat::Raw8 => write!(f, "RAW8"),
        }
    }
}
