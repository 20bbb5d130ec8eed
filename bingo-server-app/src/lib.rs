use std::sync::Arc;

use bingo_core::BingoSettings;
use tokio::task::JoinHandle;

use crate::{
    domain::{
        credentials::BcryptCredentialService, friendship::FriendshipRepository,
        r#match::MatchRepository, match_lock::MatchLockServiceImpl, otp::OtpRepository,
        session::SessionRepository, stats::StatsRepository, user::DefaultUsernamePolicy,
        user::UserRepository,
    },
    ports::email::EmailPort,
    processes::cleanup::CleanupJob,
    workflow::{
        account::{
            authenticate::{AuthenticateUseCase, AuthenticateUseCaseImpl},
            login::{LoginUseCase, LoginUseCaseImpl},
            logout::{LogoutUseCase, LogoutUseCaseImpl},
            otp::OtpWorkflowImpl,
            password_reset::{PasswordResetUseCase, PasswordResetUseCaseImpl},
            profile::{ProfileUseCase, ProfileUseCaseImpl},
            register::{RegisterUseCase, RegisterUseCaseImpl},
            verify_email::{VerifyEmailUseCase, VerifyEmailUseCaseImpl},
        },
        friends::{
            block::{BlockUserUseCase, BlockUserUseCaseImpl},
            list::{ListFriendsUseCase, ListFriendsUseCaseImpl},
            remove::{RemoveFriendUseCase, RemoveFriendUseCaseImpl},
            request::{FriendRequestUseCase, FriendRequestUseCaseImpl},
        },
        gameplay::{
            call_number::{CallNumberUseCase, CallNumberUseCaseImpl},
            get::{GetMatchUseCase, GetMatchUseCaseImpl},
            list::{ListMatchesUseCase, ListMatchesUseCaseImpl},
            resign::{ResignUseCase, ResignUseCaseImpl},
            submit_board::{SubmitBoardUseCase, SubmitBoardUseCaseImpl},
        },
        matchmaking::{
            accept::{AcceptInviteUseCase, AcceptInviteUseCaseImpl},
            cancel::{CancelMatchUseCase, CancelMatchUseCaseImpl},
            invite::{InviteUseCase, InviteUseCaseImpl},
        },
        stats::{
            get_stats::{GetStatsUseCase, GetStatsUseCaseImpl},
            leaderboard::{LeaderboardUseCase, LeaderboardUseCaseImpl},
        },
    },
};

pub mod domain;
pub mod ports;
pub mod processes;
pub mod workflow;

#[cfg(test)]
mod testing;

#[derive(Clone, Debug)]
pub struct ApplicationSettings {
    pub bcrypt_cost: u32,
    pub game: BingoSettings,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            game: BingoSettings::default(),
        }
    }
}

pub struct Application {
    pub jobs: JoinHandle<()>,

    pub account_register_use_case: Box<dyn RegisterUseCase + Send + Sync + 'static>,
    pub account_login_use_case: Box<dyn LoginUseCase + Send + Sync + 'static>,
    pub account_logout_use_case: Box<dyn LogoutUseCase + Send + Sync + 'static>,
    pub account_verify_email_use_case: Box<dyn VerifyEmailUseCase + Send + Sync + 'static>,
    pub account_password_reset_use_case: Box<dyn PasswordResetUseCase + Send + Sync + 'static>,
    pub account_profile_use_case: Box<dyn ProfileUseCase + Send + Sync + 'static>,
    pub authenticate_use_case: Arc<dyn AuthenticateUseCase + Send + Sync + 'static>,

    pub friend_request_use_case: Box<dyn FriendRequestUseCase + Send + Sync + 'static>,
    pub friend_block_use_case: Box<dyn BlockUserUseCase + Send + Sync + 'static>,
    pub friend_remove_use_case: Box<dyn RemoveFriendUseCase + Send + Sync + 'static>,
    pub friend_list_use_case: Box<dyn ListFriendsUseCase + Send + Sync + 'static>,

    pub match_invite_use_case: Box<dyn InviteUseCase + Send + Sync + 'static>,
    pub match_accept_use_case: Box<dyn AcceptInviteUseCase + Send + Sync + 'static>,
    pub match_cancel_use_case: Box<dyn CancelMatchUseCase + Send + Sync + 'static>,

    pub game_submit_board_use_case: Box<dyn SubmitBoardUseCase + Send + Sync + 'static>,
    pub game_call_number_use_case: Box<dyn CallNumberUseCase + Send + Sync + 'static>,
    pub game_resign_use_case: Box<dyn ResignUseCase + Send + Sync + 'static>,
    pub game_get_use_case: Box<dyn GetMatchUseCase + Send + Sync + 'static>,
    pub game_list_use_case: Box<dyn ListMatchesUseCase + Send + Sync + 'static>,

    pub stats_get_use_case: Box<dyn GetStatsUseCase + Send + Sync + 'static>,
    pub stats_leaderboard_use_case: Box<dyn LeaderboardUseCase + Send + Sync + 'static>,
}

pub fn build_application<
    U: UserRepository + Send + Sync + 'static,
    S: SessionRepository + Send + Sync + 'static,
    O: OtpRepository + Send + Sync + 'static,
    F: FriendshipRepository + Send + Sync + 'static,
    M: MatchRepository + Send + Sync + 'static,
    ST: StatsRepository + Send + Sync + 'static,
    E: EmailPort + Send + Sync + 'static,
>(
    user_repository: Arc<U>,
    session_repository: Arc<S>,
    otp_repository: Arc<O>,
    friendship_repository: Arc<F>,
    match_repository: Arc<M>,
    stats_repository: Arc<ST>,
    email_port: Arc<E>,
    settings: ApplicationSettings,
) -> Application {
    let credential_service = Arc::new(BcryptCredentialService::new(settings.bcrypt_cost));
    let username_policy = Arc::new(DefaultUsernamePolicy);
    let match_lock_service = Arc::new(MatchLockServiceImpl::new());

    let otp_workflow = Arc::new(OtpWorkflowImpl::new(
        otp_repository.clone(),
        credential_service.clone(),
        email_port.clone(),
    ));

    let cleanup_job = CleanupJob::new(
        session_repository.clone(),
        otp_repository.clone(),
        match_repository.clone(),
        match_lock_service.clone(),
    );
    let jobs = tokio::spawn(async move {
        cleanup_job.run().await;
    });

    Application {
        jobs,

        account_register_use_case: Box::new(RegisterUseCaseImpl::new(
            user_repository.clone(),
            stats_repository.clone(),
            credential_service.clone(),
            username_policy,
            otp_workflow.clone(),
        )),
        account_login_use_case: Box::new(LoginUseCaseImpl::new(
            user_repository.clone(),
            session_repository.clone(),
            credential_service.clone(),
        )),
        account_logout_use_case: Box::new(LogoutUseCaseImpl::new(session_repository.clone())),
        account_verify_email_use_case: Box::new(VerifyEmailUseCaseImpl::new(
            user_repository.clone(),
            otp_workflow.clone(),
        )),
        account_password_reset_use_case: Box::new(PasswordResetUseCaseImpl::new(
            user_repository.clone(),
            session_repository.clone(),
            credential_service.clone(),
            otp_workflow.clone(),
        )),
        account_profile_use_case: Box::new(ProfileUseCaseImpl::new(user_repository.clone())),
        authenticate_use_case: Arc::new(AuthenticateUseCaseImpl::new(
            user_repository.clone(),
            session_repository.clone(),
        )),

        friend_request_use_case: Box::new(FriendRequestUseCaseImpl::new(
            user_repository.clone(),
            friendship_repository.clone(),
        )),
        friend_block_use_case: Box::new(BlockUserUseCaseImpl::new(
            user_repository.clone(),
            friendship_repository.clone(),
        )),
        friend_remove_use_case: Box::new(RemoveFriendUseCaseImpl::new(
            user_repository.clone(),
            friendship_repository.clone(),
        )),
        friend_list_use_case: Box::new(ListFriendsUseCaseImpl::new(
            user_repository.clone(),
            friendship_repository.clone(),
        )),

        match_invite_use_case: Box::new(InviteUseCaseImpl::new(
            user_repository.clone(),
            friendship_repository.clone(),
            match_repository.clone(),
            match_lock_service.clone(),
        )),
        match_accept_use_case: Box::new(AcceptInviteUseCaseImpl::new(
            match_repository.clone(),
            match_lock_service.clone(),
        )),
        match_cancel_use_case: Box::new(CancelMatchUseCaseImpl::new(
            match_repository.clone(),
            match_lock_service.clone(),
        )),

        game_submit_board_use_case: Box::new(SubmitBoardUseCaseImpl::new(
            match_repository.clone(),
            match_lock_service.clone(),
            settings.game.clone(),
        )),
        game_call_number_use_case: Box::new(CallNumberUseCaseImpl::new(
            match_repository.clone(),
            match_lock_service.clone(),
            settings.game.clone(),
        )),
        game_resign_use_case: Box::new(ResignUseCaseImpl::new(
            match_repository.clone(),
            match_lock_service.clone(),
            settings.game.clone(),
        )),
        game_get_use_case: Box::new(GetMatchUseCaseImpl::new(
            user_repository.clone(),
            match_repository.clone(),
            settings.game.clone(),
        )),
        game_list_use_case: Box::new(ListMatchesUseCaseImpl::new(match_repository.clone())),

        stats_get_use_case: Box::new(GetStatsUseCaseImpl::new(
            user_repository.clone(),
            stats_repository.clone(),
        )),
        stats_leaderboard_use_case: Box::new(LeaderboardUseCaseImpl::new(
            user_repository.clone(),
            stats_repository.clone(),
        )),
    }
}
