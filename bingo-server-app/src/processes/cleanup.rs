use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::domain::{
    MatchId, RepoRetrieveError, RepoUpdateError,
    r#match::{Match, MatchRepository, MatchStatus, MatchUpdate},
    match_lock::MatchLockService,
    otp::OtpRepository,
    session::SessionRepository,
};

/// Matches stuck before the first call are cancelled after this long.
pub const STALE_SETUP_HOURS: i64 = 24;
/// In-progress matches are cancelled after this long without a call.
pub const STALE_PLAY_DAYS: i64 = 7;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired_sessions: u64,
    pub expired_otps: u64,
    pub cancelled_matches: usize,
    pub pruned_locks: usize,
}

pub struct CleanupJob<
    S: SessionRepository,
    O: OtpRepository,
    M: MatchRepository,
    L: MatchLockService,
> {
    session_repository: Arc<S>,
    otp_repository: Arc<O>,
    match_repository: Arc<M>,
    match_lock_service: Arc<L>,
}

impl<
    S: SessionRepository + Send + Sync + 'static,
    O: OtpRepository + Send + Sync + 'static,
    M: MatchRepository + Send + Sync + 'static,
    L: MatchLockService + Send + Sync + 'static,
> CleanupJob<S, O, M, L>
{
    pub fn new(
        session_repository: Arc<S>,
        otp_repository: Arc<O>,
        match_repository: Arc<M>,
        match_lock_service: Arc<L>,
    ) -> Self {
        Self {
            session_repository,
            otp_repository,
            match_repository,
            match_lock_service,
        }
    }

    pub async fn run(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            let report = self.run_once(Utc::now()).await;
            log::info!(
                "Cleanup removed {} sessions, {} codes, cancelled {} matches",
                report.expired_sessions,
                report.expired_otps,
                report.cancelled_matches
            );
        }
    }

    /// The current state of the match when it is still stale.
    async fn recheck_stale(
        &self,
        match_id: MatchId,
        setup_cutoff: DateTime<Utc>,
        play_cutoff: DateTime<Utc>,
    ) -> Result<Option<Match>, String> {
        let current = match self.match_repository.get_match(match_id).await {
            Ok(m) => m,
            Err(RepoRetrieveError::NotFound) => return Ok(None),
            Err(RepoRetrieveError::StorageError(e)) => return Err(e),
        };
        let last_move_at = self
            .match_repository
            .get_moves(match_id)
            .await
            .map_err(|e| e.to_string())?
            .iter()
            .map(|mv| mv.created_at)
            .max();
        Ok(current
            .is_stale(last_move_at, setup_cutoff, play_cutoff)
            .then_some(current))
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> CleanupReport {
        let mut report = CleanupReport::default();

        match self.session_repository.delete_expired_sessions(now).await {
            Ok(count) => report.expired_sessions = count,
            Err(e) => log::error!("Failed to delete expired sessions: {}", e),
        }
        match self.otp_repository.delete_expired_otps(now).await {
            Ok(count) => report.expired_otps = count,
            Err(e) => log::error!("Failed to delete expired codes: {}", e),
        }

        let setup_cutoff = now - chrono::Duration::hours(STALE_SETUP_HOURS);
        let play_cutoff = now - chrono::Duration::days(STALE_PLAY_DAYS);
        let stale = match self
            .match_repository
            .list_stale_matches(setup_cutoff, play_cutoff)
            .await
        {
            Ok(stale) => stale,
            Err(e) => {
                log::error!("Failed to list stale matches: {}", e);
                Vec::new()
            }
        };
        for listed in stale {
            let _guard = self.match_lock_service.lock(listed.id).await;
            let m = match self
                .recheck_stale(listed.id, setup_cutoff, play_cutoff)
                .await
            {
                Ok(Some(m)) => m,
                Ok(None) => {
                    log::debug!("Stale match {} changed before cleanup", listed.id);
                    continue;
                }
                Err(e) => {
                    log::error!("Failed to recheck stale match {}: {}", listed.id, e);
                    continue;
                }
            };
            let update = MatchUpdate {
                status: MatchStatus::Cancelled,
                current_turn_user_id: None,
                started_at: None,
                ended_at: Some(now),
            };
            match self
                .match_repository
                .update_match_status(m.id, m.status, update)
                .await
            {
                Ok(_) => {
                    log::info!("Cancelled stale match {} ({})", m.id, m.status.as_str());
                    report.cancelled_matches += 1;
                }
                // someone moved the match on in the meantime
                Err(RepoUpdateError::Conflict) | Err(RepoUpdateError::NotFound) => {
                    log::debug!("Stale match {} changed before cleanup", m.id);
                }
                Err(RepoUpdateError::StorageError(e)) => {
                    log::error!("Failed to cancel stale match {}: {}", m.id, e);
                }
            }
        }

        report.pruned_locks = self.match_lock_service.prune();
        report
    }
}
