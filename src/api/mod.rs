mod csrf;
mod error;
mod session;
mod settings;

use std::sync::Arc;

use axum::Router;

use crate::authority::{CsrfAuthority, SessionAuthority};
use crate::db::Database;

pub use error::ApiError;

/// Create the account-service router: session routes at the root, the rest
/// under `/api/v1`.
pub fn create_api_router(
    db: Database,
    sessions: Arc<SessionAuthority>,
    csrf: Arc<CsrfAuthority>,
    secure_cookies: bool,
) -> Router {
    let session_state = session::SessionState {
        db: db.clone(),
        sessions: sessions.clone(),
        csrf: csrf.clone(),
        secure_cookies,
    };

    let settings_state = settings::SettingsState {
        db,
        sessions,
        csrf: csrf.clone(),
    };

    let csrf_state = csrf::CsrfState { csrf };

    let v1 = Router::new()
        .merge(csrf::router(csrf_state))
        .merge(settings::router(settings_state));

    Router::new()
        .merge(session::router(session_state))
        .nest("/api/v1", v1)
}
