//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the session without sending messages to the
//! server.

/// A parsed chat command.
///
/// These commands control the session and are not sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Establish the session (again).
    Connect,

    /// Close the session, keeping the transcript.
    Disconnect,

    /// Close the session and clear the transcript.
    Clear,

    /// Show the session status.
    Status,

    /// Print the transcript.
    History,

    /// Send text that begins with a slash, verbatim.
    Say(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use echarlar::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("Hello, server!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "connect" | "reconnect" => ChatCommand::Connect,
        "disconnect" => ChatCommand::Disconnect,
        "clear" | "reset" => ChatCommand::Clear,
        "status" => ChatCommand::Status,
        "history" | "transcript" => ChatCommand::History,
        "say" => match argument {
            Some(text) => ChatCommand::Say(text.to_string()),
            None => ChatCommand::Invalid("/say requires a message".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns the help text for chat commands.
pub fn help_text() -> &'static str {
    "\
Commands:
  /connect         Connect to the server (retries after a failure)
  /disconnect      Close the connection, keeping the transcript
  /clear           Close the connection and clear the transcript
  /status          Show the connection status
  /history         Show the transcript
  /say <text>      Send text that starts with a slash
  /help            Show this help
  /quit            Exit

Anything else is sent to the server."
}
