pub mod billing;
pub mod expenses;
pub mod health;
pub mod me;

use axum::http::HeaderMap;

use crate::error::Result;
use crate::models::user::User;
use crate::AppState;

/// Authenticate the request and load (or create) the user row.
///
/// The upsert only syncs profile fields; tier, quota and entitlement state
/// always come back from storage untouched.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let auth_user = state.jwks_client.authenticate(headers).await?;
    let user = state
        .store
        .find_or_create_user(&auth_user.sub, auth_user.email.as_deref())?;
    Ok(user)
}
