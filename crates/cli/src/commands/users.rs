//! `madio users`: list users and grant the admin role.

use madio_core::{Email, UserRole};
use madio_storefront::backend::User;
use tracing::info;

use super::{CliError, Superuser};

/// One log line per user.
fn describe(index: usize, user: &User) -> String {
    let name = if user.name.trim().is_empty() {
        "No name"
    } else {
        user.name.as_str()
    };
    format!(
        "{}. {name} <{}> id={} role={}",
        index + 1,
        user.email,
        user.id,
        user.role
    )
}

/// List every user, newest first.
///
/// # Errors
///
/// Returns an error if the users cannot be fetched.
pub async fn list(superuser: &Superuser) -> Result<(), CliError> {
    let users = superuser.client.all_users(&superuser.token).await?;
    info!("Found {} users", users.len());
    for (index, user) in users.iter().enumerate() {
        info!("{}", describe(index, user));
    }
    Ok(())
}

/// Give the user with this email the admin role.
///
/// # Errors
///
/// Returns `CliError::UnknownUser` if nobody has that email.
pub async fn promote(superuser: &Superuser, email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;

    let user = match superuser
        .client
        .find_user_by_email(email.as_str(), &superuser.token)
        .await
    {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Err(CliError::UnknownUser(email.into_inner())),
        Err(e) => return Err(e.into()),
    };

    if user.role.is_admin() {
        info!(user_id = %user.id, "{} is already an admin", user.email);
        return Ok(());
    }

    let updated = superuser
        .client
        .set_user_role(&user.id, UserRole::Admin, &superuser.token)
        .await?;
    info!(user_id = %updated.id, role = %updated.role, "{} is now an admin", updated.email);
    info!("The user must log out and back in for the change to apply");
    Ok(())
}
