use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use crate::error::ApiError;
use crate::jwt::TokenType;
use crate::state::AppState;

/// The requesting identity, attached to every request by
/// [`jwt_middleware`]. Handlers that need authentication call
/// [`AppUser::id`], which fails anonymous requests with 401.
#[derive(Debug, Clone)]
pub enum AppUser {
    Registered { id: i32 },
    Anonymous,
}

impl AppUser {
    pub fn id(&self) -> Result<i32, ApiError> {
        match self {
            AppUser::Registered { id } => Ok(*id),
            AppUser::Anonymous => Err(ApiError::unauthorized("authentication required")),
        }
    }
}

pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response<Body>, ApiError> {
    let user = match request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(header) => {
            let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
            // a present but invalid token is rejected outright,
            // only a missing header falls through to Anonymous
            let claims = state.validate_token(token, TokenType::Access)?;
            AppUser::Registered {
                id: claims.user_id()?,
            }
        }
        None => AppUser::Anonymous,
    };

    request.extensions_mut().insert::<AppUser>(user);
    Ok(next.run(request).await)
}
