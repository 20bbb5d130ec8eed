use axum::{http::StatusCode, response::IntoResponse};
use bingo_server_app::workflow::{
    account::{
        authenticate::AuthenticateError, login::LoginError, logout::LogoutError,
        password_reset::PasswordResetError, profile::ProfileError, register::RegisterError,
        verify_email::VerifyEmailError,
    },
    friends::FriendshipError,
    gameplay::{
        call_number::CallNumberError, get::GetMatchError, list::ListMatchesError,
        resign::ResignError, submit_board::SubmitBoardError,
    },
    matchmaking::{accept::AcceptInviteError, cancel::CancelMatchError, invite::InviteError},
    stats::{get_stats::GetStatsError, leaderboard::LeaderboardError},
};

#[derive(Debug)]
pub enum ServiceError {
    NotFound(String),
    Unauthorized(String),
    BadRequest(String),
    Forbidden(String),
    Conflict(String),
    /// Details are logged, never sent to the client.
    Internal(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::http::Response<axum::body::Body> {
        let (status, msg) = match self {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServiceError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ServiceError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ServiceError::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        let body = serde_json::json!({ "error": msg });
        (status, axum::Json(body)).into_response()
    }
}

impl From<RegisterError> for ServiceError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::InvalidEmail
            | RegisterError::InvalidName(_)
            | RegisterError::WeakPassword(_) => ServiceError::BadRequest(e.to_string()),
            RegisterError::EmailTaken | RegisterError::NameTaken => {
                ServiceError::Conflict(e.to_string())
            }
            RegisterError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<LoginError> for ServiceError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::InvalidCredentials => ServiceError::Unauthorized(e.to_string()),
            LoginError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<AuthenticateError> for ServiceError {
    fn from(e: AuthenticateError) -> Self {
        match e {
            AuthenticateError::InvalidSession => ServiceError::Unauthorized(e.to_string()),
            AuthenticateError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<LogoutError> for ServiceError {
    fn from(e: LogoutError) -> Self {
        match e {
            LogoutError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<VerifyEmailError> for ServiceError {
    fn from(e: VerifyEmailError) -> Self {
        match e {
            VerifyEmailError::UserNotFound => ServiceError::NotFound(e.to_string()),
            VerifyEmailError::AlreadyVerified => ServiceError::Conflict(e.to_string()),
            VerifyEmailError::TooSoon | VerifyEmailError::InvalidCode => {
                ServiceError::BadRequest(e.to_string())
            }
            VerifyEmailError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<PasswordResetError> for ServiceError {
    fn from(e: PasswordResetError) -> Self {
        match e {
            PasswordResetError::InvalidCode | PasswordResetError::WeakPassword(_) => {
                ServiceError::BadRequest(e.to_string())
            }
            PasswordResetError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<ProfileError> for ServiceError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::NotFound => ServiceError::NotFound(e.to_string()),
            ProfileError::Invalid(_) => ServiceError::BadRequest(e.to_string()),
            ProfileError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<FriendshipError> for ServiceError {
    fn from(e: FriendshipError) -> Self {
        match e {
            FriendshipError::UserNotFound
            | FriendshipError::NoPendingRequest
            | FriendshipError::NotFound => ServiceError::NotFound(e.to_string()),
            FriendshipError::SelfTarget => ServiceError::BadRequest(e.to_string()),
            FriendshipError::Blocked => ServiceError::Forbidden(e.to_string()),
            FriendshipError::AlreadyFriends | FriendshipError::AlreadyRequested => {
                ServiceError::Conflict(e.to_string())
            }
            FriendshipError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<InviteError> for ServiceError {
    fn from(e: InviteError) -> Self {
        match e {
            InviteError::OpponentNotFound => ServiceError::NotFound(e.to_string()),
            InviteError::SelfInvite => ServiceError::BadRequest(e.to_string()),
            InviteError::Blocked => ServiceError::Forbidden(e.to_string()),
            InviteError::AlreadyActive(_) => ServiceError::Conflict(e.to_string()),
            InviteError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<AcceptInviteError> for ServiceError {
    fn from(e: AcceptInviteError) -> Self {
        match e {
            AcceptInviteError::NotFound => ServiceError::NotFound(e.to_string()),
            AcceptInviteError::NotInvitee => ServiceError::Forbidden(e.to_string()),
            AcceptInviteError::InvalidState => ServiceError::Conflict(e.to_string()),
            AcceptInviteError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<CancelMatchError> for ServiceError {
    fn from(e: CancelMatchError) -> Self {
        match e {
            CancelMatchError::NotFound => ServiceError::NotFound(e.to_string()),
            CancelMatchError::InvalidState => ServiceError::Conflict(e.to_string()),
            CancelMatchError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<SubmitBoardError> for ServiceError {
    fn from(e: SubmitBoardError) -> Self {
        match e {
            SubmitBoardError::NotFound => ServiceError::NotFound(e.to_string()),
            SubmitBoardError::InvalidBoard(_) => ServiceError::BadRequest(e.to_string()),
            SubmitBoardError::InvalidState | SubmitBoardError::AlreadySubmitted => {
                ServiceError::Conflict(e.to_string())
            }
            SubmitBoardError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<CallNumberError> for ServiceError {
    fn from(e: CallNumberError) -> Self {
        match e {
            CallNumberError::NotFound => ServiceError::NotFound(e.to_string()),
            CallNumberError::InvalidState => ServiceError::Conflict(e.to_string()),
            CallNumberError::NotYourTurn => ServiceError::Forbidden(e.to_string()),
            CallNumberError::InvalidNumber(_) => ServiceError::BadRequest(e.to_string()),
            CallNumberError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<ResignError> for ServiceError {
    fn from(e: ResignError) -> Self {
        match e {
            ResignError::NotFound => ServiceError::NotFound(e.to_string()),
            ResignError::InvalidState => ServiceError::Conflict(e.to_string()),
            ResignError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<GetMatchError> for ServiceError {
    fn from(e: GetMatchError) -> Self {
        match e {
            GetMatchError::NotFound => ServiceError::NotFound(e.to_string()),
            GetMatchError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<ListMatchesError> for ServiceError {
    fn from(e: ListMatchesError) -> Self {
        match e {
            ListMatchesError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<GetStatsError> for ServiceError {
    fn from(e: GetStatsError) -> Self {
        match e {
            GetStatsError::UserNotFound => ServiceError::NotFound(e.to_string()),
            GetStatsError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<LeaderboardError> for ServiceError {
    fn from(e: LeaderboardError) -> Self {
        match e {
            LeaderboardError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}
