//! Interactive chat client for an echarlar server.
//!
//! This binary connects once at start-up and then sends every line typed at
//! the prompt to the server, printing the reply.
//!
//! # Usage
//!
//! ```bash
//! # Connect to 127.0.0.1:8080
//! echarlar-chat
//!
//! # Choose a server and read its greeting
//! echarlar-chat --host chat.example.org --port 6379 --read-greeting
//!
//! # Load settings from a file (command-line flags still win)
//! echarlar-chat --config echarlar.yaml
//! ```
//!
//! Set `RUST_LOG=echarlar=debug` to see session transitions on stderr.
//!
//! # Commands
//!
//! - `/connect` - Connect, or retry after a failure
//! - `/disconnect` - Close the connection
//! - `/clear` - Close the connection and clear the transcript
//! - `/status` - Show the connection status
//! - `/history` - Show the transcript
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use echarlar::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
};
use echarlar::{MessageExchanger, SessionManager, SessionStatus, TcpTransport, set_up_logging};

/// What the REPL does after a command.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Main entry point for the echarlar-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("echarlar-chat [OPTIONS]");
    let config = ChatConfig::resolve(args)?;
    set_up_logging()?;

    let session = Arc::new(SessionManager::new(config.transport()));
    let mut exchanger = MessageExchanger::new(Arc::clone(&session));
    if let Some(timeout) = config.reply_timeout {
        exchanger = exchanger.with_timeout(timeout);
    }
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    println!("echarlar chat ({})", config.address());
    println!("Type /help for commands, /quit to exit\n");
    connect(&session, &mut renderer).await;

    // Text the server never received, offered again at the next prompt.
    let mut unsent: Option<String> = None;

    loop {
        let readline = match unsent.take() {
            Some(text) => rl.readline_with_initial("You: ", (text.as_str(), "")),
            None => rl.readline("You: "),
        };

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                let text = match parse_command(line) {
                    Some(ChatCommand::Say(text)) => text,
                    Some(cmd) => {
                        if handle_command(cmd, &exchanger, &mut renderer).await == Flow::Quit {
                            break;
                        }
                        continue;
                    }
                    None => line.to_string(),
                };

                match exchanger.send(&text).await {
                    Ok(_) => {
                        if let Some(entry) = exchanger.transcript().last() {
                            renderer.print_entry(entry);
                        }
                    }
                    Err(err) => {
                        renderer.print_error(&err.to_string());
                        if err.is_not_connected() {
                            renderer.print_status(session.status());
                        }
                        unsent = Some(err.unsent_text().unwrap_or(&text).to_string());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    if let Err(err) = session.disconnect().await {
        renderer.print_error(&err.to_string());
    }
    Ok(())
}

async fn handle_command(
    cmd: ChatCommand,
    exchanger: &MessageExchanger<TcpTransport>,
    renderer: &mut PlainTextRenderer,
) -> Flow {
    let session = exchanger.session();
    match cmd {
        ChatCommand::Quit => {
            println!("Goodbye!");
            return Flow::Quit;
        }
        ChatCommand::Connect => {
            connect(session, renderer).await;
        }
        ChatCommand::Disconnect => match session.disconnect().await {
            Ok(()) => renderer.print_status(session.status()),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Clear => match exchanger.reset().await {
            Ok(()) => renderer.print_info("Disconnected and transcript cleared."),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Status => {
            renderer.print_status(session.status());
            renderer.print_info(&format!("Messages: {}", exchanger.len()));
        }
        ChatCommand::History => {
            renderer.print_transcript(&exchanger.transcript());
        }
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Invalid(message) => {
            renderer.print_error(&message);
        }
        ChatCommand::Say(_) => {}
    }
    Flow::Continue
}

async fn connect(session: &SessionManager<TcpTransport>, renderer: &mut PlainTextRenderer) {
    let mut status = session.subscribe();
    let attempt = session.connect();
    tokio::pin!(attempt);
    let result = loop {
        tokio::select! {
            result = &mut attempt => break result,
            changed = status.changed() => {
                if changed.is_err() {
                    break (&mut attempt).await;
                }
                let current = *status.borrow_and_update();
                if current == SessionStatus::Connecting {
                    renderer.print_status(current);
                }
            }
        }
    };
    match result {
        Ok(()) => renderer.print_status(session.status()),
        Err(err) => renderer.print_error(&err.to_string()),
    }
}
