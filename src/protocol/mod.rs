use serde::{Deserialize, Serialize};

/// Packets pushed by the camera server, one per binary WebSocket message.
///
/// Encoded as a MessagePack map with named fields; `type` carries the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerPacket {
    Preview(PreviewPacket),
    CaptureStatus(CaptureStatus),
}

/// A raw preview frame plus the device's current control values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewPacket {
    pub w: u32,
    pub h: u32,
    /// Pixel layout code, see `frame::PixelFormat`
    pub pix: u8,
    #[serde(with = "serde_bytes")]
    pub img: Vec<u8>,
    pub controls: ControlValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub captured_frames: u32,
    pub total_frames: u32,
}

/// Control values as reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlValues {
    pub gain: i64,
    /// Exposure in milliseconds
    pub exposure: f64,
    pub wb_r: i64,
    pub wb_b: i64,
}

impl ServerPacket {
    pub fn decode(data: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(data)
    }

    /// Named-map encoding; positional arrays would lose the `type` tag.
    pub fn encode(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }
}
