//! CLI command implementations

pub mod changelog;
pub mod clean;
pub mod init;
pub mod package;
pub mod validate;

use std::future::Future;
use std::path::Path;

use color_eyre::eyre::{eyre, Context, Result};
use debrel_config::Config;
use tokio::signal;
use tracing::{info, warn};

pub use changelog::ChangelogCommand;
pub use clean::CleanCommand;
pub use init::InitCommand;
pub use package::PackageCommand;
pub use validate::ValidateCommand;

/// Load `path`, falling back to the built-in defaults when it is absent
fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Resolves on Ctrl-C, or on SIGTERM for unix targets
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT (Ctrl-C)"),
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                warn!("Failed to create SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Drive `work` until it finishes or `interrupt` resolves
///
/// On interruption `work` is dropped before this returns, which removes any
/// staging directory it holds.
async fn until_interrupted<T, W, I>(work: W, interrupt: I) -> Result<T>
where
    W: Future<Output = Result<T>>,
    I: Future<Output = ()>,
{
    tokio::select! {
        result = work => result,
        () = interrupt => Err(eyre!("Interrupted, staging directory removed")),
    }
}
