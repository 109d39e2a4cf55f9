//! Command-line interface for echoaid.
//!
//! This module provides the CLI structure for the `echoaid` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AuthCommand, ChatCommand, ConfigCommand, EmergencyTypeArg, FeedCommand, OutputFormat,
    QueueCommand, RequestsCommand, RoleArg, StatusArg, SubmitCommand,
};

/// echoaid - Coordinate disaster response, online or off
///
/// Raise SOS requests, triage them with AI help, and keep working while
/// connectivity comes and goes.
#[derive(Debug, Parser)]
#[command(name = "echoaid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Act as if there is no network connection
    #[arg(long, global = true)]
    pub offline: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Raise an SOS request
    Submit(SubmitCommand),

    /// Inspect or replay the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// List and summarize requests
    #[command(subcommand)]
    Requests(RequestsCommand),

    /// Accept a mission as the signed-in volunteer
    Accept {
        /// Request id
        id: String,
    },

    /// Move a request forward in its lifecycle
    Status {
        /// Request id
        id: String,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Send an "I'm still here" pulse for a request
    Pulse {
        /// Request id
        id: String,
    },

    /// Look for corroborating reports about a request
    Investigate {
        /// Request id
        id: String,
    },

    /// Show the verification evidence behind a request
    Evidence {
        /// Request id
        id: String,
    },

    /// Ask for places near a position, such as shelters or hospitals
    Nearby {
        /// What to look for
        query: String,

        /// Latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },

    /// Account management
    #[command(flatten)]
    Auth(AuthCommand),

    /// Talk to the Echo assistant
    Chat(ChatCommand),

    /// Rumors and official alerts
    #[command(subcommand)]
    Feed(FeedCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            offline: false,
            command: Command::Auth(AuthCommand::Whoami),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "echoaid");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_submit() {
        let args = vec![
            "echoaid", "submit", "Water rising", "-t", "flood", "-a", "Test St",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Submit(cmd) => {
                assert_eq!(cmd.emergency_type, EmergencyTypeArg::Flood);
                assert_eq!(cmd.address.as_deref(), Some("Test St"));
                assert_eq!(cmd.description, "Water rising");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_submit_with_coordinates() {
        let args = vec![
            "echoaid", "submit", "Trapped", "--lat", "-33.86", "--lng", "151.2",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Submit(cmd) => {
                assert_eq!(cmd.lat, Some(-33.86));
                assert_eq!(cmd.lng, Some(151.2));
                assert_eq!(cmd.emergency_type, EmergencyTypeArg::Other);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_submit_lat_requires_lng() {
        let args = vec!["echoaid", "submit", "Trapped", "--lat", "12.0"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_status() {
        let args = vec!["echoaid", "status", "sos-1", "in-progress"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Status {
                status: StatusArg::InProgress,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_nearby() {
        let args = vec![
            "echoaid", "nearby", "shelters", "--lat", "28.61", "--lng", "77.20",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Command::Nearby { .. }));
    }

    #[test]
    fn test_parse_flattened_auth() {
        let args = vec!["echoaid", "signup", "Asha", "asha@example.com", "-r", "volunteer"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Auth(AuthCommand::Signup {
                role: RoleArg::Volunteer,
                ..
            })
        ));

        let cli = Cli::try_parse_from(vec!["echoaid", "login", "anjali@example.com"]).unwrap();
        assert!(matches!(cli.command, Command::Auth(AuthCommand::Login { .. })));
    }

    #[test]
    fn test_parse_queue_show_json() {
        let args = vec!["echoaid", "queue", "show", "--format", "json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Queue(QueueCommand::Show {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_parse_chat_clear_conflicts_with_message() {
        assert!(Cli::try_parse_from(vec!["echoaid", "chat", "--clear"]).is_ok());
        assert!(Cli::try_parse_from(vec!["echoaid", "chat", "hi", "--clear"]).is_err());
    }

    #[test]
    fn test_parse_global_flags() {
        let args = vec![
            "echoaid", "requests", "triage", "--offline", "-c", "/custom/config.toml", "-v",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.offline);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
