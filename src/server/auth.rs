//! Admin authentication middleware, layered over `/ingest` and `/admin/*`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{Error, Result};
use crate::server::state::AppState;

const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response> {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        None => Err(Error::AuthMissing),
        Some(key) if key == state.config.admin_api_key => Ok(next.run(request).await),
        Some(_) => Err(Error::AuthInvalid),
    }
}
