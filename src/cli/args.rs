use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for DevCmd
#[derive(Parser, Debug)]
#[command(
    name = "devcmd",
    version = env!("CARGO_PKG_VERSION"),
    about = "One-shot command client for TCP-attached embedded devices",
    long_about = "Sends a single text command to an embedded device over TCP and prints its one-line reply. Each invocation opens and closes exactly one connection."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Named device from the configuration
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    /// Device host name or IP address (overrides --device)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Device TCP port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Connect timeout in milliseconds
    #[arg(long, global = true)]
    pub connect_timeout: Option<u64>,

    /// Read timeout in milliseconds
    #[arg(long, global = true)]
    pub read_timeout: Option<u64>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a raw command and print the reply
    Send {
        /// Command text, sent verbatim followed by a newline
        command: String,
    },
    /// Read the pulse counter (sends "P")
    Pulses,
    /// Toggle the garage door (sends "D")
    Door,
    /// Run a local device emulator until Ctrl-C
    Emulate(EmulateArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Device emulator arguments
#[derive(ClapArgs, Debug)]
pub struct EmulateArgs {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Initial pulse count
    #[arg(long, default_value_t = 0)]
    pub pulses: u64,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Directory to create the project configuration in
        #[arg(long)]
        path: Option<String>,
        /// Write the global configuration instead
        #[arg(short, long)]
        global: bool,
    },
    /// List device configurations
    Devices,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_send_with_target() {
        let args = Args::parse_from(["devcmd", "--host", "10.0.0.5", "--port", "6438", "send", "P"]);
        assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.port, Some(6438));
        assert!(matches!(args.command, Command::Send { ref command } if command == "P"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["devcmd", "pulses", "-d", "garage", "-o", "json", "--read-timeout", "500"]);
        assert_eq!(args.device.as_deref(), Some("garage"));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.read_timeout, Some(500));
        assert!(matches!(args.command, Command::Pulses));
    }

    #[test]
    fn test_empty_command_is_accepted() {
        let args = Args::parse_from(["devcmd", "send", ""]);
        assert!(matches!(args.command, Command::Send { ref command } if command.is_empty()));
    }

    #[test]
    fn test_parse_emulate() {
        let args = Args::parse_from(["devcmd", "--port", "0", "emulate", "--pulses", "42"]);
        match args.command {
            Command::Emulate(emulate) => {
                assert_eq!(emulate.bind, "127.0.0.1");
                assert_eq!(emulate.pulses, 42);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
