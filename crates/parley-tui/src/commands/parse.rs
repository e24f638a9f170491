//! Command parser and registry for slash commands.

/// A parsed slash command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show help overlay
    Help,
    /// Exit the application
    Quit,
    /// Rebind the view to another conversation
    Switch(Option<String>),
    /// Unknown command
    Unknown(String),
}

/// Command metadata for help display.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    /// Primary command name (without the /)
    pub name: &'static str,
    /// Argument placeholder, if the command takes one
    pub argument: Option<&'static str>,
    /// Alternative names for the command
    pub aliases: &'static [&'static str],
    /// Brief description for help
    pub description: &'static str,
}

/// Static registry of all available commands.
pub static COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "switch",
        argument: Some("<conversation-id>"),
        aliases: &["join"],
        description: "Switch to another conversation",
    },
    CommandInfo {
        name: "help",
        argument: None,
        aliases: &["?"],
        description: "Toggle this help",
    },
    CommandInfo {
        name: "quit",
        argument: None,
        aliases: &["q", "exit"],
        description: "Exit parley",
    },
];

/// Parse a slash command from user input.
///
/// Returns `None` if the input is not a command.
/// Returns `Command::Unknown` if the command is not recognized.
///
/// # Examples
///
/// ```
/// use parley_tui::commands::{parse_command, Command};
///
/// assert!(matches!(parse_command("/help"), Some(Command::Help)));
/// assert_eq!(
///     parse_command("/switch abc"),
///     Some(Command::Switch(Some("abc".into())))
/// );
/// ```
pub fn parse_command(input: &str) -> Option<Command> {
    let content = input.trim().strip_prefix('/')?;

    let (cmd_str, args) = match content.find(char::is_whitespace) {
        Some(idx) => {
            let (c, a) = content.split_at(idx);
            let a = a.trim();
            (c.to_lowercase(), (!a.is_empty()).then(|| a.to_string()))
        }
        None => (content.to_lowercase(), None),
    };

    Some(match cmd_str.as_str() {
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        "switch" | "join" => Command::Switch(args),
        other => Command::Unknown(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help_and_quit() {
        assert_eq!(parse_command("/help"), Some(Command::Help));
        assert_eq!(parse_command("  /HELP  "), Some(Command::Help));
        assert_eq!(parse_command("/q"), Some(Command::Quit));
        assert_eq!(parse_command("/exit"), Some(Command::Quit));
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(
            parse_command("/switch 64f1c2e9"),
            Some(Command::Switch(Some("64f1c2e9".into())))
        );
        assert_eq!(
            parse_command("/join   abc  "),
            Some(Command::Switch(Some("abc".into())))
        );
        assert_eq!(parse_command("/switch"), Some(Command::Switch(None)));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_command("/foobar"),
            Some(Command::Unknown("foobar".into()))
        );
    }

    #[test]
    fn test_parse_non_command() {
        assert!(parse_command("hello").is_none());
        assert!(parse_command("").is_none());
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_commands_registry() {
        for name in ["switch", "help", "quit"] {
            assert!(COMMANDS.iter().any(|c| c.name == name));
        }
        let quit = COMMANDS.iter().find(|c| c.name == "quit").unwrap();
        assert!(quit.aliases.contains(&"q"));
    }
}
