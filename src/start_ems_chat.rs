//! Startup helpers for the `ems-chat` binary.
//!
//! Opens the configured storage, loads the conversation store and logs what
//! it holds.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::chat::{
    ChatConfig, ChatResult, ConversationStore, LocalStorage, Participant, StorageBackend,
    open_storage,
};

/// Environment variable overriding the `SQLite` database path.
pub const SQLITE_PATH_ENV: &str = "EMS_CHAT_SQLITE_PATH";

/// Run the binary.
///
/// # Returns
/// `ExitCode::SUCCESS` once the store has been loaded, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let config = config_with_sqlite_path(std::env::var_os(SQLITE_PATH_ENV).map(PathBuf::from));
    init_tracing(&config.log_filter);

    tracing::info!("Starting EMS chat v{}", env!("CARGO_PKG_VERSION"));

    let store = match open(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open chat store: {e}");
            return ExitCode::from(1);
        }
    };

    log_overview(&store);
    ExitCode::SUCCESS
}

/// Initialize tracing; `RUST_LOG` wins over `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Default configuration, with the `SQLite` path replaced when one is given.
#[must_use]
pub fn config_with_sqlite_path(path: Option<PathBuf>) -> ChatConfig {
    let mut config = ChatConfig::default();
    if let Some(path) = path {
        config.storage.backend = StorageBackend::Sqlite { path };
    }
    config
}

/// Validate `config`, open its storage and load the store.
///
/// # Errors
/// Returns an error if the configuration is invalid or the storage cannot be opened.
pub fn open(config: &ChatConfig) -> ChatResult<ConversationStore<Box<dyn LocalStorage>>> {
    config.validate()?;
    let storage = open_storage(&config.storage)?;
    Ok(ConversationStore::load(storage, &config.storage))
}

fn log_overview<S: LocalStorage>(store: &ConversationStore<S>) {
    let admin = Participant::Admin;
    tracing::info!(
        "{} messages stored, {} addressed to {admin}",
        store.len(),
        store.unread_count(&admin)
    );
    for summary in store.conversation_summaries(&admin) {
        tracing::info!(
            "{}: {} messages, {} unread, last at {}",
            summary.peer,
            summary.message_count,
            summary.unread,
            summary.last_message.timestamp
        );
    }
}
