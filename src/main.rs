//! keyspace-watcher - print every keyspace notification of the watched
//! configuration tables.

use keyspace_watcher::prelude::*;
use keyspace_watcher::settings::SourceKind;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type MainResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> MainResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyspace_watcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting keyspace watcher");

    let settings = SettingsBuilder::from_env().build()?;
    tracing::info!(
        source = ?settings.source,
        db_index = settings.db_index,
        tables = settings.tables.len(),
        strategy = ?settings.strategy,
        "settings loaded"
    );

    // Signal handlers must be installed before connecting.
    let (controller, mut shutdown) = shutdown_channel();
    let _listener = spawn_signal_listener(controller)?;

    let exit_code = match settings.source {
        SourceKind::Redis => {
            let connecting = RedisKeyspaceSource::connect(&settings.redis_url);
            match shutdown.until_requested(connecting).await {
                Ok(source) => watch(source?, &settings, shutdown).await?,
                Err(request) => request.exit_code,
            }
        }
        SourceKind::DryRun => {
            tracing::warn!("dry run, no notifications will arrive");
            watch(ScriptedSource::new(), &settings, shutdown).await?
        }
    };

    std::process::exit(exit_code);
}

/// Subscribe, print events until shutdown and return the exit code.
async fn watch<S: NotificationSource>(
    source: S,
    settings: &WatcherSettings,
    mut shutdown: ShutdownSignal,
) -> MainResult<i32> {
    let mut watcher = KeyspaceWatcher::from_settings(source, settings);

    let patterns = match shutdown.until_requested(watcher.subscribe_all()).await {
        Ok(patterns) => patterns?,
        Err(request) => return Ok(request.exit_code),
    };
    for pattern in patterns {
        println!("Subscribed to {}", pattern);
    }

    watcher.subscribe(|event| println!("{}", event));

    Ok(watcher.run(shutdown).await.exit_code)
}
