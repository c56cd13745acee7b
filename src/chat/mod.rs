//! Terminal front-end for a chat session.
//!
//! This module provides the presentation side of the `echarlar-chat` binary,
//! built on the session core:
//!
//! - [`config`]: CLI argument parsing, the YAML configuration file, and the
//!   resolved configuration
//! - [`commands`]: Slash command parsing
//! - [`render`]: Transcript and status rendering

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, FileConfig};
pub use render::{PlainTextRenderer, Renderer};
