use std::sync::Arc;

use rustrict::CensorStr;
use validator::Validate;

use crate::{
    domain::{
        RepoRetrieveError, RepoUpdateError, UserId,
        user::{ProfileUpdate, User, UserRepository},
    },
    workflow::account::PublicProfile,
};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("user not found")]
    NotFound,
    #[error("invalid profile: {0}")]
    Invalid(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Requested changes. `None` keeps a field, an empty string clears it.
#[derive(Clone, Debug, Default, Validate)]
pub struct ProfileChanges {
    #[validate(length(max = 32))]
    pub display_name: Option<String>,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    #[validate(url, length(max = 2048))]
    pub avatar_url: Option<String>,
}

impl ProfileChanges {
    fn into_update(self) -> ProfileUpdate {
        let normalize = |value: Option<String>| {
            value.map(|v| {
                let trimmed = v.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
        };
        ProfileUpdate {
            display_name: normalize(self.display_name),
            image: normalize(self.image),
            avatar_url: normalize(self.avatar_url),
        }
    }
}

#[async_trait::async_trait]
pub trait ProfileUseCase {
    async fn get_profile(&self, user_id: UserId) -> Result<User, ProfileError>;
    async fn get_public_profile(&self, name: &str) -> Result<PublicProfile, ProfileError>;
    async fn update_profile(
        &self,
        user_id: UserId,
        changes: ProfileChanges,
    ) -> Result<User, ProfileError>;
}

pub struct ProfileUseCaseImpl<U: UserRepository> {
    user_repository: Arc<U>,
}

impl<U: UserRepository> ProfileUseCaseImpl<U> {
    pub fn new(user_repository: Arc<U>) -> Self {
        Self { user_repository }
    }
}

fn map_retrieve(e: RepoRetrieveError) -> ProfileError {
    match e {
        RepoRetrieveError::NotFound => ProfileError::NotFound,
        RepoRetrieveError::StorageError(e) => ProfileError::Internal(e),
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static> ProfileUseCase for ProfileUseCaseImpl<U> {
    async fn get_profile(&self, user_id: UserId) -> Result<User, ProfileError> {
        self.user_repository
            .get_user(user_id)
            .await
            .map_err(map_retrieve)
    }

    async fn get_public_profile(&self, name: &str) -> Result<PublicProfile, ProfileError> {
        self.user_repository
            .get_user_by_name(name)
            .await
            .map(PublicProfile::from)
            .map_err(map_retrieve)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        changes: ProfileChanges,
    ) -> Result<User, ProfileError> {
        let update = changes.into_update();
        // only values being set are validated, clearing is always allowed
        let provided = ProfileChanges {
            display_name: update.display_name.clone().flatten(),
            image: update.image.clone().flatten(),
            avatar_url: update.avatar_url.clone().flatten(),
        };
        provided
            .validate()
            .map_err(|e| ProfileError::Invalid(e.to_string()))?;
        if provided
            .display_name
            .as_deref()
            .is_some_and(|name| name.is_inappropriate())
        {
            return Err(ProfileError::Invalid(
                "display name is inappropriate".to_string(),
            ));
        }

        if update.is_empty() {
            return self.get_profile(user_id).await;
        }
        self.user_repository
            .update_profile(user_id, update)
            .await
            .map_err(|e| match e {
                RepoUpdateError::NotFound => ProfileError::NotFound,
                RepoUpdateError::Conflict => {
                    ProfileError::Invalid("conflicting update".to_string())
                }
                RepoUpdateError::StorageError(e) => ProfileError::Internal(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::{domain::user::NewUser, testing::InMemoryStore};

    use super::*;

    async fn setup() -> (ProfileUseCaseImpl<InMemoryStore>, User) {
        let store = Arc::new(InMemoryStore::new());
        let user = store
            .create_user(NewUser {
                email: "alice@example.com".to_string(),
                name: "alice".to_string(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        (ProfileUseCaseImpl::new(store), user)
    }

    #[tokio::test]
    async fn test_update_and_clear_profile() {
        let (use_case, user) = setup().await;
        let updated = use_case
            .update_profile(
                user.id,
                ProfileChanges {
                    display_name: Some("  Alice  ".to_string()),
                    image: None,
                    avatar_url: Some("https://example.com/alice.png".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alice"));
        assert_eq!(
            updated.avatar_url.as_deref(),
            Some("https://example.com/alice.png")
        );

        let cleared = use_case
            .update_profile(
                user.id,
                ProfileChanges {
                    display_name: Some(String::new()),
                    avatar_url: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.display_name, None);
        assert_eq!(cleared.avatar_url, None);

        let public = use_case.get_public_profile("alice").await.unwrap();
        assert_eq!(public.id, user.id);
        assert!(matches!(
            use_case.get_public_profile("bob").await,
            Err(ProfileError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_invalid_profile_changes() {
        let (use_case, user) = setup().await;
        assert!(matches!(
            use_case
                .update_profile(
                    user.id,
                    ProfileChanges {
                        display_name: Some("x".repeat(33)),
                        ..Default::default()
                    },
                )
                .await,
            Err(ProfileError::Invalid(_))
        ));
        assert!(matches!(
            use_case
                .update_profile(
                    user.id,
                    ProfileChanges {
                        avatar_url: Some("not a url".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(ProfileError::Invalid(_))
        ));
    }
}
