//! Recognized command tokens and their raw parameter tails (spec §4.F).
//! Each handler in `dispatcher.rs` tokenizes its own params from here.

use crate::parsers::ParsedMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick { params: String },
    User { params: String },
    Join { params: String },
    Part { params: String },
    Who { params: String },
    Privmsg { params: String },
    Ping { params: String },
    Pong,
    Quit { params: String },
    Unknown { command: String },
}

/// Commands usable before registration completes (spec §4.F registration
/// gate, SPEC_FULL.md §D.2: enforced uniformly).
pub fn allowed_before_registration(command: &str) -> bool {
    matches!(command, "NICK" | "USER" | "PING" | "QUIT" | "PONG")
}

impl Command {
    pub fn from_parsed(parsed: &ParsedMessage) -> Command {
        match parsed.command.as_str() {
            "NICK" => Command::Nick {
                params: parsed.params.clone(),
            },
            "USER" => Command::User {
                params: parsed.params.clone(),
            },
            "JOIN" => Command::Join {
                params: parsed.params.clone(),
            },
            "PART" => Command::Part {
                params: parsed.params.clone(),
            },
            "WHO" => Command::Who {
                params: parsed.params.clone(),
            },
            "PRIVMSG" => Command::Privmsg {
                params: parsed.params.clone(),
            },
            "PING" => Command::Ping {
                params: parsed.params.clone(),
            },
            "PONG" => Command::Pong,
            "QUIT" => Command::Quit {
                params: parsed.params.clone(),
            },
            other => Command::Unknown {
                command: other.to_string(),
            },
        }
    }

    /// The bare command token, used for the registration gate and for the
    /// 421 reply on unknown commands.
    pub fn token(&self) -> &str {
        match self {
            Command::Nick { .. } => "NICK",
            Command::User { .. } => "USER",
            Command::Join { .. } => "JOIN",
            Command::Part { .. } => "PART",
            Command::Who { .. } => "WHO",
            Command::Privmsg { .. } => "PRIVMSG",
            Command::Ping { .. } => "PING",
            Command::Pong => "PONG",
            Command::Quit { .. } => "QUIT",
            Command::Unknown { command } => command.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_message;

    #[test]
    fn recognizes_known_commands() {
        let cmd = Command::from_parsed(&parse_message("JOIN #room"));
        assert_eq!(cmd, Command::Join { params: "#room".into() });
    }

    #[test]
    fn unknown_command_is_preserved_verbatim() {
        let cmd = Command::from_parsed(&parse_message("FROB xyz"));
        assert_eq!(
            cmd,
            Command::Unknown {
                command: "FROB".into()
            }
        );
    }

    #[test]
    fn registration_gate_whitelist() {
        assert!(allowed_before_registration("NICK"));
        assert!(allowed_before_registration("PING"));
        assert!(!allowed_before_registration("JOIN"));
    }
}
