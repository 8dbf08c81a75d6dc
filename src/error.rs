use std::path::PathBuf;
use std::process::ExitCode;

use snafu::{Location, Report, Snafu};

use crate::youtube::YouTubeError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    #[snafu(display("could not read the runtime settings from the environment: {source}"))]
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not read the configuration file {}: {source}", path.display()))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not parse the configuration file {}: {source}", path.display()))]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not initialize the logger: {source}"))]
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not build the http client: {source}"))]
    HttpClient {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("could not poll the channel for livestreams: {source}"))]
    Poll {
        source: YouTubeError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ApplicationError {
    pub const SETUP_EXIT_CODE: u8 = 1;
    pub const CONFIG_EXIT_CODE: u8 = 2;
    pub const POLL_EXIT_CODE: u8 = 3;

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ReadConfig { .. } | Self::ParseConfig { .. } => Self::CONFIG_EXIT_CODE,
            Self::Poll { .. } => Self::POLL_EXIT_CODE,
            Self::ConfigLoad { .. } | Self::InitializeLogger { .. } | Self::HttpClient { .. } => {
                Self::SETUP_EXIT_CODE
            }
        }
    }

    /// The message together with every underlying cause, one per line.
    pub fn report(&self) -> String {
        Report::from_error(self).to_string()
    }
}

impl From<&ApplicationError> for ExitCode {
    fn from(error: &ApplicationError) -> Self {
        ExitCode::from(error.exit_code())
    }
}
