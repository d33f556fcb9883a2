//! Console transport: turns typed lines into inbound events.

use std::path::PathBuf;

use crate::direction::{Direction, UnknownDirection, UserId};
use crate::extract::{MediaSource, Modality, Payload};
use crate::session::{EventKind, InboundEvent};

#[derive(Debug)]
pub enum ConsoleInput {
    Event(InboundEvent),
    Quit,
    Empty,
}

/// Parse one line of console input.
///
/// `/start`, `/mode <direction>`, `/photo <path>`, `/voice <path>` and `/quit`
/// are commands; any other slash command is an attachment the bot cannot
/// read. Everything else is text to translate.
pub fn parse_line(user: UserId, line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }

    let Some(command_line) = line.strip_prefix('/') else {
        return ConsoleInput::Event(InboundEvent::text(user, line));
    };

    let (command, rest) = match command_line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (command_line, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_string());

    let kind = match command {
        "quit" | "exit" => return ConsoleInput::Quit,
        "start" | "help" => EventKind::Start,
        "mode" => EventKind::ModeChange { token: argument },
        "photo" | "image" => attachment(Modality::Image, argument),
        "voice" => attachment(Modality::Voice, argument),
        _ => EventKind::Message {
            modality: None,
            payload: Payload::Text(line.to_string()),
        },
    };

    ConsoleInput::Event(InboundEvent { user_id: user, kind })
}

/// Validate a direction token without starting a session
pub fn check_mode_token(token: Option<&str>) -> Result<Direction, String> {
    let usage = || format!("Accepted directions: {}", Direction::accepted_tokens().join(", "));
    match token.map(str::parse::<Direction>) {
        Some(Ok(direction)) => Ok(direction),
        Some(Err(UnknownDirection(token))) => Err(format!("Unknown direction '{}'. {}", token, usage())),
        None => Err(format!("No direction given. {}", usage())),
    }
}

fn attachment(modality: Modality, path: Option<String>) -> EventKind {
    match path {
        Some(path) => EventKind::Message {
            modality: Some(modality),
            payload: Payload::Media(MediaSource::File(PathBuf::from(path))),
        },
        // a photo/voice command without a file is an empty attachment
        None => EventKind::Message {
            modality: Some(modality),
            payload: Payload::Media(MediaSource::Bytes(Vec::new())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId(7);

    fn event(line: &str) -> EventKind {
        match parse_line(USER, line) {
            ConsoleInput::Event(event) => {
                assert_eq!(event.user_id, USER);
                event.kind
            }
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_line_is_text() {
        match event("  Good morning ") {
            EventKind::Message {
                modality: Some(Modality::Text),
                payload: Payload::Text(text),
            } => assert_eq!(text, "Good morning"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mode_command() {
        assert!(matches!(
            event("/mode ku_to_en"),
            EventKind::ModeChange { token: Some(token) } if token == "ku_to_en"
        ));
        assert!(matches!(event("/mode"), EventKind::ModeChange { token: None }));
    }

    #[test]
    fn test_photo_command_reads_file() {
        match event("/photo sign.jpg") {
            EventKind::Message {
                modality: Some(Modality::Image),
                payload: Payload::Media(MediaSource::File(path)),
            } => assert_eq!(path, PathBuf::from("sign.jpg")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_is_unsupported_payload() {
        assert!(matches!(
            event("/document report.pdf"),
            EventKind::Message { modality: None, .. }
        ));
    }

    #[test]
    fn test_check_mode_token() {
        assert_eq!(check_mode_token(Some("Kurdish")), Ok(Direction::KuToEn));
        assert_eq!(check_mode_token(Some("en-ku")), Ok(Direction::EnToKu));

        let err = check_mode_token(Some("fr_to_de")).unwrap_err();
        assert!(err.contains("fr_to_de"));
        assert!(err.contains("badini"));
        assert!(check_mode_token(None).is_err());
    }

    #[test]
    fn test_control_lines() {
        assert!(matches!(event("/start"), EventKind::Start));
        assert!(matches!(parse_line(USER, "/quit"), ConsoleInput::Quit));
        assert!(matches!(parse_line(USER, "   "), ConsoleInput::Empty));
    }
}
