//! Slash command system for the parley TUI.
//!
//! Commands are typed into the message input starting with `/`, for
//! example `/switch 64f1c2` or `/quit`. A leading `//` sends a literal
//! message starting with `/`.

mod parse;

pub use parse::{parse_command, Command, CommandInfo, COMMANDS};

/// Check if input starts with '/' (is a command).
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/') && !input.trim().starts_with("//")
}

/// Unescape a slash message (// -> /).
pub fn unescape_slash(input: &str) -> String {
    let trimmed = input.trim_start();
    if let Some(rest) = trimmed.strip_prefix("//") {
        format!("/{rest}")
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command() {
        assert!(is_command("/quit"));
        assert!(is_command("  /switch abc"));
        assert!(!is_command("//not a command"));
        assert!(!is_command("hello /quit"));
    }

    #[test]
    fn test_unescape_slash() {
        assert_eq!(unescape_slash("//shrug"), "/shrug");
        assert_eq!(unescape_slash("plain"), "plain");
    }
}
