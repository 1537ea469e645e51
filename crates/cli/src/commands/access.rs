//! Permission checks against the stored session.
//!
//! Both commands print `allowed`/`denied` and exit successfully either way;
//! a missing session simply denies.

use stockroom_app::{AppConfig, AppError};
use stockroom_core::UserRole;
use stockroom_core::access::is_role_named;

use super::restored_manager;

/// Print whether the signed-in user may perform `action` on `module`.
///
/// # Errors
///
/// Never fails today; kept fallible like the other commands.
pub async fn check(config: &AppConfig, module: &str, action: &str) -> Result<(), AppError> {
    let access = restored_manager(config).await.access();
    let allowed = access.has_permission(module, action);

    tracing::debug!(module, action, allowed, "Permission check");
    print_verdict(&format!("{module}/{action}"), allowed);
    Ok(())
}

/// Print whether the signed-in user has `role`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if `role` is not a known role name.
pub async fn role(config: &AppConfig, role: &str) -> Result<(), AppError> {
    if role.parse::<UserRole>().is_err() {
        let known: Vec<&str> = UserRole::ALL.iter().map(|role| role.as_str()).collect();
        return Err(AppError::BadRequest(format!(
            "unknown role '{role}', expected one of: {}",
            known.join(", ")
        )));
    }

    let manager = restored_manager(config).await;
    let matches = is_role_named(manager.current(), role);
    print_verdict(&format!("role {role}"), matches);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_verdict(subject: &str, allowed: bool) {
    println!("{subject}: {}", verdict(allowed));
}

const fn verdict(allowed: bool) -> &'static str {
    if allowed { "allowed" } else { "denied" }
}
