//! Outbound text commands and the control fields that produce them.

use std::fmt;

use anyhow::{Context, Result};

use crate::protocol::ControlValues;

/// Port of the frontend dev server; pages served from it talk to the camera
/// server on [`CAMERA_SERVER_PORT`] instead of their own origin.
pub const DEV_SERVER_PORT: u16 = 5173;
pub const CAMERA_SERVER_PORT: u16 = 3000;
pub const WS_PATH: &str = "/ws";

/// The four device controls the viewer can adjust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Gain,
    Exposure,
    WbRed,
    WbBlue,
}

impl ControlKind {
    pub const ALL: [ControlKind; 4] = [
        ControlKind::Gain,
        ControlKind::Exposure,
        ControlKind::WbRed,
        ControlKind::WbBlue,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            ControlKind::Gain => "SET_GAIN",
            ControlKind::Exposure => "SET_EXPOSURE",
            ControlKind::WbRed => "SET_WB_R",
            ControlKind::WbBlue => "SET_WB_B",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlKind::Gain => "Gain",
            ControlKind::Exposure => "Exposure (ms)",
            ControlKind::WbRed => "WB red",
            ControlKind::WbBlue => "WB blue",
        }
    }

    /// Look up a control by its input-line command name
    pub fn from_command(name: &str) -> Option<Self> {
        match name {
            "gain" => Some(ControlKind::Gain),
            "exposure" | "exp" => Some(ControlKind::Exposure),
            "wbr" | "wb-r" => Some(ControlKind::WbRed),
            "wbb" | "wb-b" => Some(ControlKind::WbBlue),
            _ => None,
        }
    }

    /// Parse raw user input into a value for this control
    pub fn parse(self, raw: &str) -> Result<ControlValue> {
        let raw = raw.trim();
        match self {
            ControlKind::Exposure => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(ControlValue::Float)
                .with_context(|| format!("{} expects a number, got '{}'", self.label(), raw)),
            _ => raw
                .parse::<i64>()
                .map(ControlValue::Int)
                .with_context(|| format!("{} expects an integer, got '{}'", self.label(), raw)),
        }
    }

    fn reported(self, controls: &ControlValues) -> ControlValue {
        match self {
            ControlKind::Gain => ControlValue::Int(controls.gain),
            ControlKind::Exposure => ControlValue::Float(controls.exposure),
            ControlKind::WbRed => ControlValue::Int(controls.wb_r),
            ControlKind::WbBlue => ControlValue::Int(controls.wb_b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlValue::Int(v) => write!(f, "{}", v),
            ControlValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Text commands understood by the camera server
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(ControlKind, ControlValue),
    SwitchOutput,
    StartCapture(u32),
}

impl Command {
    /// Colon-delimited wire form, e.g. `SET_GAIN:120`
    pub fn to_wire(&self) -> String {
        match self {
            Command::Set(kind, value) => format!("{}:{}", kind.wire_name(), value),
            Command::SwitchOutput => "SWITCH_OUTPUT:".to_string(),
            Command::StartCapture(frames) => format!("START_CAPTURE:{}", frames),
        }
    }

    /// Inverse of [`Command::to_wire`]
    pub fn from_wire(text: &str) -> Option<Self> {
        let (name, value) = text.split_once(':')?;
        match name {
            "SWITCH_OUTPUT" => Some(Command::SwitchOutput),
            "START_CAPTURE" => value.trim().parse().ok().map(Command::StartCapture),
            _ => {
                let kind = ControlKind::ALL.into_iter().find(|k| k.wire_name() == name)?;
                kind.parse(value).ok().map(|v| Command::Set(kind, v))
            }
        }
    }
}

/// The user-editable control fields.
///
/// A field stays empty until the user types a value or a preview reports one.
#[derive(Debug, Clone, Default)]
pub struct ControlPanel {
    fields: [Option<ControlValue>; 4],
    /// Fields the user has set themselves
    edited: [bool; 4],
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(kind: ControlKind) -> usize {
        match kind {
            ControlKind::Gain => 0,
            ControlKind::Exposure => 1,
            ControlKind::WbRed => 2,
            ControlKind::WbBlue => 3,
        }
    }

    pub fn value(&self, kind: ControlKind) -> Option<ControlValue> {
        self.fields[Self::index(kind)]
    }

    /// An input event: store the value and produce the command to send now.
    pub fn input(&mut self, kind: ControlKind, raw: &str) -> Result<Command> {
        let value = kind.parse(raw)?;
        let idx = Self::index(kind);
        self.fields[idx] = Some(value);
        self.edited[idx] = true;
        Ok(Command::Set(kind, value))
    }

    /// Commands for every field the user filled in before the socket opened
    pub fn outstanding(&self) -> Vec<Command> {
        ControlKind::ALL
            .into_iter()
            .filter(|&k| self.edited[Self::index(k)])
            .filter_map(|k| self.value(k).map(|v| Command::Set(k, v)))
            .collect()
    }

    /// Fill fields the user hasn't touched with the device's reported values.
    pub fn sync_from(&mut self, controls: &ControlValues) {
        for kind in ControlKind::ALL {
            let idx = Self::index(kind);
            if !self.edited[idx] {
                self.fields[idx] = Some(kind.reported(controls));
            }
        }
    }
}

/// Resolve the WebSocket URL to connect to.
///
/// Full `ws://` / `wss://` URLs are used as given. Otherwise the input is an
/// origin (`host[:port]`, optionally with `http://`) and the socket lives at
/// `/ws` on it, except for the dev server port which redirects to the camera
/// server.
pub fn resolve_endpoint(server: &str) -> Result<String> {
    let server = server.trim();
    if server.starts_with("ws://") || server.starts_with("wss://") {
        return Ok(server.to_string());
    }

    let (scheme, origin) = if let Some(rest) = server.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = server.strip_prefix("http://") {
        ("ws", rest)
    } else {
        ("ws", server)
    };
    let origin = origin.trim_end_matches('/');
    anyhow::ensure!(!origin.is_empty(), "Empty server address");
    anyhow::ensure!(!origin.contains('/'), "Server address '{}' must not contain a path", server);

    // Bracketed IPv6 literals carry colons of their own
    let colon = if origin.starts_with('[') {
        origin.find("]:").map(|i| i + 1)
    } else {
        origin.rfind(':')
    };
    let (host, port) = match colon {
        Some(i) => {
            let port: u16 = origin[i + 1..]
                .parse()
                .with_context(|| format!("Invalid port in '{}'", server))?;
            (&origin[..i], Some(port))
        }
        None => (origin, None),
    };

    Ok(match port {
        Some(DEV_SERVER_PORT) => format!("ws://{}:{}{}", host, CAMERA_SERVER_PORT, WS_PATH),
        Some(port) => format!("{}://{}:{}{}", scheme, host, port, WS_PATH),
        None => format!("{}://{}{}", scheme, host, WS_PATH),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            Command::Set(ControlKind::Gain, ControlValue::Int(120)).to_wire(),
            "SET_GAIN:120"
        );
        assert_eq!(
            Command::Set(ControlKind::Exposure, ControlValue::Float(12.5)).to_wire(),
            "SET_EXPOSURE:12.5"
        );
        assert_eq!(
            Command::Set(ControlKind::WbRed, ControlValue::Int(52)).to_wire(),
            "SET_WB_R:52"
        );
        assert_eq!(
            Command::Set(ControlKind::WbBlue, ControlValue::Int(95)).to_wire(),
            "SET_WB_B:95"
        );
        assert_eq!(Command::SwitchOutput.to_wire(), "SWITCH_OUTPUT:");
        assert_eq!(Command::StartCapture(10).to_wire(), "START_CAPTURE:10");
    }

    #[test]
    fn test_from_wire() {
        assert_eq!(
            Command::from_wire("SET_WB_B:80"),
            Some(Command::Set(ControlKind::WbBlue, ControlValue::Int(80)))
        );
        assert_eq!(Command::from_wire("SWITCH_OUTPUT:"), Some(Command::SwitchOutput));
        assert_eq!(Command::from_wire("START_CAPTURE:4"), Some(Command::StartCapture(4)));
        assert_eq!(Command::from_wire("SET_GAIN:abc"), None);
        assert_eq!(Command::from_wire("REBOOT:now"), None);
        assert_eq!(Command::from_wire("no colon"), None);
    }

    #[test]
    fn test_parse_validates_type() {
        assert!(ControlKind::Gain.parse("12.5").is_err());
        assert!(ControlKind::Gain.parse("").is_err());
        assert_eq!(
            ControlKind::Exposure.parse(" 30 ").unwrap(),
            ControlValue::Float(30.0)
        );
        assert!(ControlKind::Exposure.parse("NaN").is_err());
    }

    #[test]
    fn test_every_input_produces_a_command() {
        let mut panel = ControlPanel::new();
        let first = panel.input(ControlKind::Gain, "100").unwrap();
        let second = panel.input(ControlKind::Gain, "100").unwrap();
        // No coalescing of identical consecutive values
        assert_eq!(first, second);
        assert_eq!(panel.value(ControlKind::Gain), Some(ControlValue::Int(100)));
    }

    #[test]
    fn test_outstanding_only_user_values() {
        let mut panel = ControlPanel::new();
        assert!(panel.outstanding().is_empty());

        panel.sync_from(&ControlValues {
            gain: 1,
            exposure: 2.0,
            wb_r: 3,
            wb_b: 4,
        });
        assert!(panel.outstanding().is_empty());

        panel.input(ControlKind::WbRed, "60").unwrap();
        assert_eq!(
            panel.outstanding(),
            vec![Command::Set(ControlKind::WbRed, ControlValue::Int(60))]
        );
    }

    #[test]
    fn test_sync_keeps_user_values() {
        let mut panel = ControlPanel::new();
        panel.input(ControlKind::Exposure, "5").unwrap();
        panel.sync_from(&ControlValues {
            gain: 7,
            exposure: 99.0,
            wb_r: 50,
            wb_b: 50,
        });
        assert_eq!(panel.value(ControlKind::Exposure), Some(ControlValue::Float(5.0)));
        assert_eq!(panel.value(ControlKind::Gain), Some(ControlValue::Int(7)));
    }

    #[test]
    fn test_resolve_endpoint() {
        assert_eq!(
            resolve_endpoint("ws://cam.local:3000/ws").unwrap(),
            "ws://cam.local:3000/ws"
        );
        assert_eq!(resolve_endpoint("localhost:3000").unwrap(), "ws://localhost:3000/ws");
        assert_eq!(resolve_endpoint("http://10.0.0.2:8080/").unwrap(), "ws://10.0.0.2:8080/ws");
        assert_eq!(resolve_endpoint("https://cam.example").unwrap(), "wss://cam.example/ws");
        assert_eq!(resolve_endpoint("localhost:5173").unwrap(), "ws://localhost:3000/ws");
        assert_eq!(resolve_endpoint("[::1]:8080").unwrap(), "ws://[::1]:8080/ws");
        assert!(resolve_endpoint("localhost:notaport").is_err());
        assert!(resolve_endpoint("").is_err());
        assert!(resolve_endpoint("host:1/path").is_err());
    }
}
