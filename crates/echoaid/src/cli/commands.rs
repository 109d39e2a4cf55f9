//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::auth::UserRole;
use crate::request::{EmergencyType, RequestStatus};

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// What happened
    pub description: String,

    /// Emergency category
    #[arg(short = 't', long = "type", value_enum, default_value = "other")]
    pub emergency_type: EmergencyTypeArg,

    /// Where you are. Leave out to use --lat/--lng
    #[arg(short, long)]
    pub address: Option<String>,

    /// Device latitude
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Device longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Name of the person in need, if not yourself
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Offline queue commands.
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// List requests waiting for connectivity
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Send queued requests now
    Replay,

    /// Drop every queued request
    Clear,
}

/// Request listing commands.
#[derive(Debug, Subcommand)]
pub enum RequestsCommand {
    /// Every request
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Active requests, most urgent first
    Triage {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Dashboard numbers
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Missions assigned to the signed-in volunteer
    Missions {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Requests raised by the signed-in user
    Mine {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Account commands.
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with an existing account
    Login {
        /// Account email
        email: String,

        /// Password (not checked)
        #[arg(short, long, default_value = "")]
        password: String,
    },

    /// Create an account and sign in
    Signup {
        /// Display name
        name: String,

        /// Account email
        email: String,

        /// Role on the platform
        #[arg(short, long, value_enum, default_value = "requester")]
        role: RoleArg,

        /// Password (not checked)
        #[arg(short, long, default_value = "")]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,
}

/// Chat command arguments.
#[derive(Debug, Args)]
pub struct ChatCommand {
    /// Message for the assistant. Without one, the transcript is shown
    pub message: Option<String>,

    /// Forget the conversation
    #[arg(long, conflicts_with = "message")]
    pub clear: bool,
}

/// Community feed commands.
#[derive(Debug, Subcommand)]
pub enum FeedCommand {
    /// Rumors under verification
    Rumors {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Official alerts
    Alerts {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Emergency category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmergencyTypeArg {
    /// Injury or illness
    Medical,
    /// Fire or smoke
    Fire,
    /// Rising water
    Flood,
    /// Seismic event
    Earthquake,
    /// Anything else
    Other,
}

impl From<EmergencyTypeArg> for EmergencyType {
    fn from(arg: EmergencyTypeArg) -> Self {
        match arg {
            EmergencyTypeArg::Medical => Self::Medical,
            EmergencyTypeArg::Fire => Self::Fire,
            EmergencyTypeArg::Flood => Self::Flood,
            EmergencyTypeArg::Earthquake => Self::Earthquake,
            EmergencyTypeArg::Other => Self::Other,
        }
    }
}

/// Target status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Dispatched and waiting
    Pending,
    /// Accepted by a volunteer
    InProgress,
    /// Dealt with
    Resolved,
}

impl From<StatusArg> for RequestStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => Self::Pending,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Resolved => Self::Resolved,
        }
    }
}

/// Role argument for signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Raises SOS requests
    Requester,
    /// Accepts missions
    Volunteer,
    /// Marked safe
    Safe,
}

impl From<RoleArg> for UserRole {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Requester => Self::Requester,
            RoleArg::Volunteer => Self::Volunteer,
            RoleArg::Safe => Self::Safe,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
