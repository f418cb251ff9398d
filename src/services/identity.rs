use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::CollaboratorResult;

/// Account profile as held by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub subject_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub attributes: Value,
}

impl Profile {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: None,
            display_name: None,
            attributes: Value::Null,
        }
    }
}

/// External identity provider holding the subject's account.
///
/// Missing accounts are reported as [`super::CollaboratorError::NotFound`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn export_profile(&self, subject_id: &str) -> CollaboratorResult<Profile>;

    async fn delete_account(&self, subject_id: &str) -> CollaboratorResult<()>;

    async fn get_account(&self, subject_id: &str) -> CollaboratorResult<Profile>;
}
