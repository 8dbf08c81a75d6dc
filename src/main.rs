use std::process::ExitCode;

use dotenvy::dotenv;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

use livewatch::config::{self, Settings};
use livewatch::error::{ApplicationError, PollSnafu};
use livewatch::watcher::Watcher;
use livewatch::{logger, shutdown, youtube};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(error) => return fail(&error),
    };

    let _guard = match logger::init(&settings) {
        Ok(guard) => guard,
        Err(error) => return fail(&error),
    };

    match watch(&settings).await {
        Ok(()) => {
            tracing::info!("clean shutdown");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(error = %error.report(), exit_code = error.exit_code(), "fatal error");
            ExitCode::from(&error)
        }
    }
}

async fn watch(settings: &Settings) -> Result<(), ApplicationError> {
    let config = config::load(&settings.config)?;
    tracing::info!(channel = %config.channel, "watching channel");

    let token = CancellationToken::new();
    let _signals = shutdown::arm(token.clone());

    let youtube = youtube::connect(settings)?;

    Watcher::new(youtube, config)
        .with_period(settings.poll_interval)
        .run(&token)
        .await
        .context(PollSnafu)
}

fn fail(error: &ApplicationError) -> ExitCode {
    eprintln!("{}", error.report());
    ExitCode::from(error)
}
