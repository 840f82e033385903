use crate::{Config, Credential};
use amzreq_core::{Context, ProvideCredential, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// ConfigCredentialProvider hands out the keys carried by a [`Config`].
///
/// The config is not reloaded, call [`Config::from_env`] or
/// [`Config::from_profile`] before building the provider.
#[derive(Debug)]
pub struct ConfigCredentialProvider {
    config: Arc<Config>,
}

impl ConfigCredentialProvider {
    /// Create a new `ConfigCredentialProvider` instance.
    pub fn new(cfg: Arc<Config>) -> Self {
        Self { config: cfg }
    }
}

#[async_trait]
impl ProvideCredential for ConfigCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        let (Some(ak), Some(sk)) = (&self.config.access_key_id, &self.config.secret_access_key)
        else {
            return Ok(None);
        };

        let mut cred = Credential::new(ak, sk);
        if let Some(token) = &self.config.session_token {
            cred = cred.with_session_token(token);
        }
        Ok(Some(cred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_credential_provider() -> anyhow::Result<()> {
        let provider = ConfigCredentialProvider::new(Arc::new(Config {
            access_key_id: Some("access_key_id".to_string()),
            secret_access_key: Some("secret_access_key".to_string()),
            session_token: Some("session_token".to_string()),
            ..Default::default()
        }));
        let cred = provider.provide_credential(&Context::new()).await?.unwrap();
        assert_eq!(cred.access_key_id, "access_key_id");
        assert_eq!(cred.session_token.as_deref(), Some("session_token"));

        let provider = ConfigCredentialProvider::new(Arc::new(Config {
            access_key_id: Some("access_key_id".to_string()),
            ..Default::default()
        }));
        assert!(provider.provide_credential(&Context::new()).await?.is_none());

        Ok(())
    }
}
