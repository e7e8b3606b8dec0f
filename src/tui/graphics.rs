//! Terminal graphics setup for the preview surface.
//!
//! The preview is drawn with whatever image protocol the terminal supports
//! (Sixel, Kitty, iTerm2) and falls back to halfblocks.

use ratatui_image::picker::{Picker, ProtocolType};

/// Pick the image protocol. Must run before raw mode / alternate screen,
/// since detection queries the terminal over stdio.
pub fn create_picker(force_protocol: Option<&str>) -> Picker {
    if let Some(name) = force_protocol {
        match parse_protocol(name) {
            Some(proto) => {
                let mut picker = Picker::halfblocks();
                picker.set_protocol_type(proto);
                log::info!("Graphics: forced {:?}", proto);
                return picker;
            }
            None => {
                eprintln!("Unknown graphics protocol '{}', using auto-detect", name);
            }
        }
    }

    match Picker::from_query_stdio() {
        Ok(picker) => {
            log::info!("Graphics: detected {:?}", picker.protocol_type());
            picker
        }
        Err(e) => {
            log::debug!("Terminal graphics query failed: {}", e);
            let mut picker = Picker::halfblocks();
            let proto = protocol_from_env();
            if proto != ProtocolType::Halfblocks {
                picker.set_protocol_type(proto);
            }
            log::info!("Graphics: {:?} (env heuristic)", proto);
            picker
        }
    }
}

fn parse_protocol(name: &str) -> Option<ProtocolType> {
    match name.to_lowercase().as_str() {
        "sixel" => Some(ProtocolType::Sixel),
        "kitty" => Some(ProtocolType::Kitty),
        "iterm2" | "iterm" => Some(ProtocolType::Iterm2),
        "halfblocks" | "half" | "text" => Some(ProtocolType::Halfblocks),
        _ => None,
    }
}

/// Guess the protocol from the variables terminals set about themselves
fn protocol_from_env() -> ProtocolType {
    let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default();
    let term = std::env::var("TERM").unwrap_or_default();

    if term_program.contains("WezTerm") || std::env::var_os("WT_SESSION").is_some() {
        ProtocolType::Sixel
    } else if term_program.contains("iTerm") {
        ProtocolType::Iterm2
    } else if term.contains("kitty")
        || term_program.contains("kitty")
        || term_program.to_lowercase().contains("ghostty")
    {
        ProtocolType::Kitty
    } else {
        ProtocolType::Halfblocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_protocol_names() {
        assert_eq!(parse_protocol("Kitty"), Some(ProtocolType::Kitty));
        assert_eq!(parse_protocol("iterm"), Some(ProtocolType::Iterm2));
        assert_eq!(parse_protocol("half"), Some(ProtocolType::Halfblocks));
        assert_eq!(parse_protocol("vt100"), None);
    }
}
