//! Synthetic frame source.
//!
//! Serves the same WebSocket protocol as the camera server with a generated
//! test pattern, so the viewer can be run and tested without hardware. Every
//! connection gets its own device state; text commands adjust it the way they
//! would adjust a camera.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

use crate::control::{Command, ControlKind, ControlValue};
use crate::frame::PixelFormat;
use crate::protocol::{CaptureStatus, ControlValues, PreviewPacket, ServerPacket};

#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fps: 10,
            format: PixelFormat::Bgr,
        }
    }
}

/// Per-connection stand-in for the camera
#[derive(Debug, Clone)]
struct DeviceState {
    controls: ControlValues,
    format: PixelFormat,
    frame_no: u64,
    capture: Option<CaptureStatus>,
}

impl DeviceState {
    fn new(format: PixelFormat) -> Self {
        Self {
            controls: ControlValues {
                gain: 100,
                exposure: 10.0,
                wb_r: 50,
                wb_b: 50,
            },
            format,
            frame_no: 0,
            capture: None,
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Set(kind, value) => {
                let int = match value {
                    ControlValue::Int(v) => v,
                    ControlValue::Float(v) => v.round() as i64,
                };
                match kind {
                    ControlKind::Gain => self.controls.gain = int.max(0),
                    ControlKind::Exposure => {
                        self.controls.exposure = match value {
                            ControlValue::Int(v) => v as f64,
                            ControlValue::Float(v) => v,
                        }
                        .max(0.0)
                    }
                    ControlKind::WbRed => self.controls.wb_r = int.max(0),
                    ControlKind::WbBlue => self.controls.wb_b = int.max(0),
                }
            }
            Command::SwitchOutput => {
                self.format = self.format.next();
                log::info!("Output switched to {}", self.format);
            }
            Command::StartCapture(total) => {
                self.capture = Some(CaptureStatus {
                    captured_frames: 0,
                    total_frames: total,
                });
            }
        }
    }

    /// Advance an active capture by one frame
    fn capture_tick(&mut self) -> Option<CaptureStatus> {
        let status = self.capture.as_mut()?;
        if status.captured_frames < status.total_frames {
            status.captured_frames += 1;
        }
        let snapshot = *status;
        if snapshot.captured_frames >= snapshot.total_frames {
            self.capture = None;
        }
        Some(snapshot)
    }

    fn preview(&mut self, config: &PatternConfig) -> PreviewPacket {
        let img = render_pattern(config.width, config.height, self.frame_no, &self.controls, self.format);
        self.frame_no += 1;
        PreviewPacket {
            w: config.width,
            h: config.height,
            pix: self.format.code(),
            img,
            controls: self.controls,
        }
    }
}

/// Moving diagonal bars over a gradient, shaped by the device controls.
pub fn render_pattern(
    width: u32,
    height: u32,
    frame_no: u64,
    controls: &ControlValues,
    format: PixelFormat,
) -> Vec<u8> {
    let gain = (controls.gain as f64 / 100.0) * (controls.exposure / 10.0);
    let red = controls.wb_r as f64 / 50.0;
    let blue = controls.wb_b as f64 / 50.0;
    let shift = frame_no.wrapping_mul(4) as u32;
    let mut rng = rand::thread_rng();

    let mut img = Vec::with_capacity(width as usize * height as usize * format.bytes_per_pixel());
    for y in 0..height {
        for x in 0..width {
            let bar = (x.wrapping_add(y).wrapping_add(shift) / 32) % 2 == 0;
            let base_r = (x * 255 / width.max(1)) as f64;
            let base_g = (y * 255 / height.max(1)) as f64;
            let base_b = if bar { 200.0 } else { 40.0 };
            let noise = rng.gen_range(-4.0..4.0);

            let scale = |v: f64, balance: f64| (v * gain * balance + noise).clamp(0.0, 255.0) as u8;
            let (r, g, b) = (scale(base_r, red), scale(base_g, 1.0), scale(base_b, blue));

            match format {
                PixelFormat::Bgr => img.extend_from_slice(&[b, g, r]),
                PixelFormat::Rgb => img.extend_from_slice(&[r, g, b]),
                PixelFormat::Raw8 => {
                    let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
                    img.push(luma.round() as u8);
                }
            }
        }
    }
    img
}

pub struct PatternServer {
    addr: String,
    config: PatternConfig,
}

impl PatternServer {
    pub fn new(addr: String, config: PatternConfig) -> Self {
        Self { addr, config }
    }

    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        log::info!(
            "Pattern source on ws://{}/ws ({}x{} {} @ {} fps)",
            listener.local_addr()?,
            self.config.width,
            self.config.height,
            self.config.format,
            self.config.fps
        );
        serve(listener, self.config.clone()).await
    }
}

/// Accept viewers on an already bound listener until it fails.
pub async fn serve(listener: TcpListener, config: PatternConfig) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let config = config.clone();
        tokio::spawn(async move {
            log::info!("Viewer connected from {}", peer);
            match handle_connection(stream, config).await {
                Ok(_) => log::info!("Viewer {} disconnected", peer),
                Err(e) => log::warn!("Connection error from {}: {}", peer, e),
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, config: PatternConfig) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let mut device = DeviceState::new(config.format);
    let period = Duration::from_millis(1000 / config.fps.clamp(1, 120) as u64);
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let preview = ServerPacket::Preview(device.preview(&config));
                ws_sender.send(WsMessage::Binary(preview.encode()?)).await?;

                if let Some(status) = device.capture_tick() {
                    let packet = ServerPacket::CaptureStatus(status);
                    ws_sender.send(WsMessage::Binary(packet.encode()?)).await?;
                }
            }
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => match Command::from_wire(&text) {
                        Some(command) => {
                            log::debug!("<- {}", text);
                            device.apply(command);
                        }
                        None => log::warn!("Unknown command '{}'", text),
                    },
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientEvent, ViewerClient};
    use crate::session::{Effect, ViewerSession};

    #[test]
    fn test_pattern_sizes() {
        let controls = DeviceState::new(PixelFormat::Bgr).controls;
        for format in PixelFormat::ALL {
            let img = render_pattern(16, 9, 0, &controls, format);
            assert_eq!(Some(img.len()), format.payload_len(16, 9));
        }
    }

    #[test]
    fn test_zero_gain_is_nearly_black() {
        let mut controls = DeviceState::new(PixelFormat::Rgb).controls;
        controls.gain = 0;
        let img = render_pattern(8, 8, 3, &controls, PixelFormat::Rgb);
        // Only sensor noise survives
        assert!(img.iter().all(|&v| v <= 4));
    }

    #[test]
    fn test_device_applies_commands() {
        let mut device = DeviceState::new(PixelFormat::Bgr);
        device.apply(Command::Set(ControlKind::Gain, ControlValue::Int(250)));
        device.apply(Command::Set(ControlKind::Exposure, ControlValue::Float(2.5)));
        device.apply(Command::SwitchOutput);
        assert_eq!(device.controls.gain, 250);
        assert_eq!(device.controls.exposure, 2.5);
        assert_eq!(device.format, PixelFormat::Rgb);
    }

    #[test]
    fn test_capture_runs_to_total() {
        let mut device = DeviceState::new(PixelFormat::Bgr);
        device.apply(Command::StartCapture(3));
        let progress: Vec<u32> = std::iter::from_fn(|| device.capture_tick())
            .map(|s| s.captured_frames)
            .collect();
        assert_eq!(progress, vec![1, 2, 3]);
        assert!(device.capture.is_none());
    }

    #[tokio::test]
    async fn test_viewer_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = PatternConfig {
            width: 32,
            height: 18,
            fps: 50,
            ..PatternConfig::default()
        };
        tokio::spawn(serve(listener, config));

        let client = ViewerClient::new(format!("ws://{}/ws", addr));
        let (cmd_tx, mut events) = client.connect().await.unwrap();
        let mut session = ViewerSession::new();

        // First frame arrives in BGR
        let data = match events.recv().await.unwrap() {
            ClientEvent::Message(data) => data,
            other => panic!("unexpected event {:?}", other),
        };
        let effects = session.handle_message(&data);
        assert!(effects.contains(&Effect::Redraw { reallocated: true }));
        assert_eq!(session.debug().last_format, Some(PixelFormat::Bgr));

        // Switching output changes the format of later frames, same dimensions
        cmd_tx.send(Command::SwitchOutput).unwrap();
        cmd_tx.send(Command::StartCapture(2)).unwrap();

        let mut saw_rgb = false;
        let mut saw_capture_done = false;
        for _ in 0..200 {
            let data = match events.recv().await.unwrap() {
                ClientEvent::Message(data) => data,
                other => panic!("unexpected event {:?}", other),
            };
            let effects = session.handle_message(&data);
            if session.debug().last_format == Some(PixelFormat::Rgb) {
                saw_rgb = true;
                assert!(!effects.contains(&Effect::Redraw { reallocated: true }));
            }
            if effects.contains(&Effect::Log("Captured 2 / 2 frames".to_string())) {
                saw_capture_done = true;
            }
            if saw_rgb && saw_capture_done {
                break;
            }
        }
        assert!(saw_rgb);
        assert!(saw_capture_done);
        assert_eq!(session.surface().reallocations(), 1);
    }
}
