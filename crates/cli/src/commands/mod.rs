//! CLI subcommand implementations.

pub mod access;
pub mod session;
pub mod setup;

use stockroom_app::{AppConfig, FileSessionStore, SessionManager};

/// Session manager over the configured session directory, with the stored
/// session already restored.
async fn restored_manager(config: &AppConfig) -> SessionManager<FileSessionStore> {
    let mut manager = SessionManager::new(FileSessionStore::new(&config.session_dir));
    manager.restore_on_start().await;
    manager
}
