use std::future::Future;

use slackmoji_core::config::{AppConfig, LoadOptions};
use slackmoji_core::notifier::Janitor;
use slackmoji_slack::SocketError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bootstrap::{bootstrap_with_config, Application};
use crate::commands::{build_runtime, CommandResult};
use crate::logging;

const COMMAND: &str = "listen";

#[derive(Debug, Error)]
pub enum ListenError {
    #[error(transparent)]
    Transport(#[from] SocketError),
    #[error("socket mode runner stopped unexpectedly: {0}")]
    RunnerAborted(String),
}

pub fn run(verbose: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };
    logging::init(&config.logging, verbose);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure(COMMAND, "runtime", error.to_string(), 1),
    };

    runtime.block_on(async move {
        let app = match bootstrap_with_config(config) {
            Ok(app) => app,
            Err(error) => {
                error!(event_name = "system.bootstrap.failed", error = %error, "bootstrap failed");
                return CommandResult::failure(
                    COMMAND,
                    error.error_class(),
                    error.to_string(),
                    error.exit_code(),
                );
            }
        };

        match serve(app, shutdown_signal()).await {
            Ok(reason) => CommandResult::success(COMMAND, format!("stopped after {reason}")),
            Err(error) => CommandResult::failure(COMMAND, "transport", error.to_string(), 1),
        }
    })
}

/// Runs the notifier until `shutdown` resolves or the runner gives up.
///
/// Teardown order: stop intake, give the in-flight event the configured grace
/// period, disconnect the transport, stop the janitor.
pub async fn serve<F>(app: Application, shutdown: F) -> Result<String, ListenError>
where
    F: Future<Output = String>,
{
    let Application { config, pipeline, transport, runner } = app;

    let janitor = Janitor::spawn(pipeline.ledger(), config.notifier.freshness_threshold());
    let cancel = CancellationToken::new();
    let mut runner_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    info!(
        event_name = "system.listen.started",
        correlation_id = "listen",
        channel = %config.slack.channel,
        "starting event listener"
    );

    let outcome = tokio::select! {
        reason = shutdown => {
            info!(
                event_name = "system.listen.signal",
                correlation_id = "shutdown",
                signal = %reason,
                "received shutdown signal, shutting down gracefully"
            );
            Ok(reason)
        }
        joined = &mut runner_task => match joined {
            Ok(Ok(())) => Ok("runner stopped".to_owned()),
            Ok(Err(error)) => {
                error!(
                    event_name = "system.listen.transport_failed",
                    correlation_id = "shutdown",
                    error = %error,
                    "event listener stopped"
                );
                Err(ListenError::from(error))
            }
            Err(join_error) => Err(ListenError::RunnerAborted(join_error.to_string())),
        },
    };

    cancel.cancel();
    if !runner_task.is_finished() {
        let grace = config.notifier.shutdown_grace();
        match tokio::time::timeout(grace, &mut runner_task).await {
            Ok(_) => debug!("socket mode runner drained"),
            Err(_) => {
                warn!(
                    event_name = "system.listen.grace_elapsed",
                    grace_secs = grace.as_secs(),
                    "shutdown timed out; abandoning in-flight event"
                );
                runner_task.abort();
                let _ = runner_task.await;
            }
        }
    }

    if let Err(error) = transport.disconnect().await {
        warn!(error = %error, "socket mode disconnect failed during shutdown");
    }
    debug!("slack transport stopped");

    janitor.shutdown().await;

    info!(
        event_name = "system.listen.stopped",
        correlation_id = "shutdown",
        "shutdown completed"
    );
    outcome
}

async fn shutdown_signal() -> String {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => tokio::select! {
                reason = ctrl_c() => reason,
                _ = terminate.recv() => "SIGTERM".to_owned(),
            },
            Err(error) => {
                warn!(error = %error, "could not install SIGTERM handler; only SIGINT stops the listener");
                ctrl_c().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> String {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "could not install SIGINT handler");
        std::future::pending::<()>().await;
    }
    "SIGINT".to_owned()
}
