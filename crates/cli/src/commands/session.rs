//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! stockroom session login -e owner@example.com
//! stockroom session show
//! stockroom session logout
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKROOM_DATABASE_URL` - Needed by `login` to read the profile
//! - `STOCKROOM_SESSION_DIR` - Where the session is stored

use stockroom_app::db::create_pool;
use stockroom_app::error::{clear_sentry_user, set_sentry_user};
use stockroom_app::services::AuthService;
use stockroom_app::{AppConfig, AppError};
use stockroom_core::{ModuleGate, Session};

use super::restored_manager;

/// Sign in as the profile with `email` and persist the session.
///
/// # Errors
///
/// Returns `AppError` if no database is configured, the profile cannot sign
/// in or the session cannot be stored.
pub async fn login(config: &AppConfig, email: &str) -> Result<(), AppError> {
    let database_url = config.require_database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(database_url).await?;

    let mut manager = restored_manager(config).await;
    let access = AuthService::new(&pool, &config.db_schema)
        .sign_in(&mut manager, email)
        .await?;

    if let Some(session) = access.session() {
        set_sentry_user(session.identity().email_address.as_str());
        print_session(session);
    }
    Ok(())
}

/// Print the stored session, if any.
///
/// # Errors
///
/// Never fails today; an unreadable session prints as signed out.
pub async fn show(config: &AppConfig) -> Result<(), AppError> {
    let manager = restored_manager(config).await;

    match manager.current() {
        Some(session) => print_session(session),
        None => print_signed_out(),
    }
    Ok(())
}

/// Sign out and remove the stored session.
///
/// # Errors
///
/// Returns `AppError::Session` if the stored session cannot be removed.
pub async fn logout(config: &AppConfig) -> Result<(), AppError> {
    let mut manager = restored_manager(config).await;
    let was_signed_in = manager.current().is_some();

    manager.logout().await?;
    clear_sentry_user();

    if was_signed_in {
        tracing::info!("Signed out");
    } else {
        tracing::info!("No session was stored");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_signed_out() {
    println!("Not signed in");
}

#[allow(clippy::print_stdout)]
fn print_session(session: &Session) {
    let identity = session.identity();
    println!("{} <{}>", identity.display_name, identity.email_address);
    println!("Role:      {}", session.role());
    println!(
        "Signed in: {}",
        session.login_timestamp().format("%Y-%m-%d %H:%M:%S UTC")
    );

    if session.permissions().is_empty() {
        println!("Permissions: none");
        return;
    }

    println!("Permissions:");
    for (module, gate) in session.permissions().iter() {
        println!("  {module:<12} {}", describe_gate(gate));
    }
}

fn describe_gate(gate: &ModuleGate) -> String {
    match gate {
        ModuleGate::Flag(true) => "all".to_owned(),
        ModuleGate::Flag(false) => "none".to_owned(),
        ModuleGate::Actions(actions) => {
            let allowed: Vec<&str> = actions
                .iter()
                .filter(|(_, allowed)| **allowed == serde_json::Value::Bool(true))
                .map(|(action, _)| action.as_str())
                .collect();
            if allowed.is_empty() {
                "none".to_owned()
            } else {
                allowed.join(", ")
            }
        }
        ModuleGate::Unrecognized(_) => "unrecognized (denied)".to_owned(),
    }
}
