//! Configuration types for the chat application.
//!
//! Settings come from three layers.  Command-line arguments parsed via `arrrg`
//! win over an optional YAML file named with `--config`, which wins over the
//! built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::{
    DEFAULT_HOST, DEFAULT_MAX_LINE_LENGTH, DEFAULT_PORT, DEFAULT_TIMEOUT, TcpTransport,
};

/// Command-line arguments for the echarlar-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Server host to connect to.
    #[arrrg(optional, "Server host (default: 127.0.0.1)", "HOST")]
    pub host: Option<String>,

    /// Server port to connect to.
    #[arrrg(optional, "Server port (default: 8080)", "PORT")]
    pub port: Option<u16>,

    /// Path to a YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "PATH")]
    pub config: Option<String>,

    /// Bound on connecting and on each send and receive, in seconds.
    #[arrrg(optional, "Connection timeout in seconds (default: 30)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Bound on a whole exchange, in seconds.
    #[arrrg(optional, "Reply timeout in seconds (default: none)", "SECS")]
    pub reply_timeout_secs: Option<u64>,

    /// Consume the server's greeting line when connecting.
    #[arrrg(flag, "Read one greeting line from the server on connect")]
    pub read_greeting: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Settings read from a YAML configuration file.
///
/// Every field is optional; missing fields fall through to the defaults.
///
/// ```yaml
/// host: chat.example.org
/// port: 6379
/// timeout_secs: 10
/// read_greeting: true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Server host.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Connection timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Reply timeout in seconds.
    pub reply_timeout_secs: Option<u64>,
    /// Whether to read a greeting line on connect.
    pub read_greeting: Option<bool>,
    /// Maximum reply length in bytes.
    pub max_line_length: Option<usize>,
    /// Whether to use ANSI colors and styles.
    pub use_color: Option<bool>,
}

impl FileConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for
    /// this structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::io(format!("failed to read {}: {err}", path.display()), err)
        })?;
        Self::from_yaml(&content)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after merging
/// command-line arguments, the configuration file, and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Server host.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Bound on connecting and on each send and receive.
    pub timeout: Duration,

    /// Optional bound on a whole exchange.
    pub reply_timeout: Option<Duration>,

    /// Whether the handshake consumes one greeting line.
    pub read_greeting: bool,

    /// Maximum reply length in bytes.
    pub max_line_length: usize,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Server: 127.0.0.1:8080
    /// - Timeout: 30 seconds, no reply timeout
    /// - Greeting: not read
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            reply_timeout: None,
            read_greeting: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            use_color: true,
        }
    }

    /// Resolves command-line arguments, loading the file they name.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// merged settings are invalid.
    pub fn resolve(args: ChatArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => FileConfig::from_file(PathBuf::from(path))?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    /// Merges command-line arguments over file settings over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged settings are invalid.
    pub fn merge(args: ChatArgs, file: FileConfig) -> Result<Self> {
        let defaults = Self::new();
        let timeout_secs = args.timeout_secs.or(file.timeout_secs);
        let reply_timeout_secs = args.reply_timeout_secs.or(file.reply_timeout_secs);
        let config = ChatConfig {
            host: args.host.or(file.host).unwrap_or(defaults.host),
            port: args.port.or(file.port).unwrap_or(defaults.port),
            timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            reply_timeout: reply_timeout_secs.map(Duration::from_secs),
            read_greeting: args.read_greeting || file.read_greeting.unwrap_or(false),
            max_line_length: file.max_line_length.unwrap_or(defaults.max_line_length),
            use_color: !args.no_color && file.use_color.unwrap_or(defaults.use_color),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the settings can produce a working transport.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty", Some("host".into())));
        }
        if self.port == 0 {
            return Err(Error::config("port must be non-zero", Some("port".into())));
        }
        if self.timeout.is_zero() {
            return Err(Error::config(
                "timeout must be non-zero",
                Some("timeout_secs".into()),
            ));
        }
        if self.reply_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::config(
                "reply timeout must be non-zero",
                Some("reply_timeout_secs".into()),
            ));
        }
        if self.max_line_length == 0 {
            return Err(Error::config(
                "max line length must be non-zero",
                Some("max_line_length".into()),
            ));
        }
        Ok(())
    }

    /// Builds the TCP transport these settings describe.
    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(self.host.clone(), self.port)
            .with_timeout(self.timeout)
            .with_greeting(self.read_greeting)
            .with_max_line_length(self.max_line_length)
    }

    /// Returns the `host:port` of the server.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sets the server host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the reply timeout.
    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Sets whether a greeting line is read on connect.
    pub fn with_greeting(mut self, read_greeting: bool) -> Self {
        self.read_greeting = read_greeting;
        self
    }

    /// Sets the maximum reply length.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
