use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use bingo_server_app::domain::user::User;

use crate::{AppState, error::ServiceError};

/// The user behind the request's bearer session token.
pub struct Auth {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for Auth {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let token = bearer.token().to_string();
        let user = state.app.authenticate_use_case.authenticate(&token).await?;
        Ok(Auth { user, token })
    }
}
