use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::AccountConfig;
use crate::domain::OwnerId;

use super::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Account from an external sign-in
    Account,
    /// Generated once for this installation
    Device,
}

/// Who is acting. Every store operation is scoped to `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub owner_id: OwnerId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub source: IdentitySource,
}

impl Identity {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.owner_id.as_str())
    }
}

impl From<&AccountConfig> for Identity {
    fn from(account: &AccountConfig) -> Self {
        Identity {
            owner_id: OwnerId::new(account.owner_id.clone()),
            display_name: account.display_name.clone(),
            email: account.email.clone(),
            source: IdentitySource::Account,
        }
    }
}

pub trait IdentityProvider {
    /// The signed-in identity, or `None` if nobody is.
    fn current_identity(&self) -> impl Future<Output = Result<Option<Identity>>> + Send;
}

/// Account from configuration if one is set, otherwise the device identity
/// stored in the database.
pub struct LocalIdentity {
    repo: Repository,
    account: Option<AccountConfig>,
}

impl LocalIdentity {
    pub fn new(repo: Repository, account: Option<AccountConfig>) -> Self {
        Self { repo, account }
    }

    /// Make sure the device identity exists. Called when a database is
    /// initialized.
    pub async fn ensure_device(&self) -> Result<OwnerId> {
        let device_id = self.repo.get_or_create_device_id().await?;
        Ok(OwnerId::new(device_id))
    }
}

impl IdentityProvider for LocalIdentity {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        if let Some(account) = &self.account {
            return Ok(Some(Identity::from(account)));
        }

        let device_id = self.repo.get_device_id().await?;
        Ok(device_id.map(|id| Identity {
            owner_id: OwnerId::new(id),
            display_name: None,
            email: None,
            source: IdentitySource::Device,
        }))
    }
}
