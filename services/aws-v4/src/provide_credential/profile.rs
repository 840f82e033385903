use crate::config::load_profile_section;
use crate::constants::*;
use crate::Credential;
use amzreq_core::{Context, ProvideCredential, Result};
use async_trait::async_trait;
use ini::Properties;

/// ProfileCredentialProvider loads AWS credentials from configuration files.
///
/// This provider loads credentials from:
/// - `~/.aws/credentials` (or the path specified by `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path specified by `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. The `AWS_PROFILE` environment variable
/// 2. The profile specified via `with_profile()`
/// 3. Default to "default"
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    fn resolve_path(ctx: &Context, explicit: &Option<String>, env: &str, default: &str) -> String {
        explicit
            .clone()
            .or_else(|| ctx.env_var(env))
            .unwrap_or_else(|| default.to_string())
    }
}

fn credential_from_props(props: &Properties) -> Option<Credential> {
    let ak = props.get("aws_access_key_id")?;
    let sk = props.get("aws_secret_access_key")?;

    let mut cred = Credential::new(ak, sk);
    if let Some(token) = props.get("aws_session_token") {
        cred = cred.with_session_token(token);
    }
    Some(cred)
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        // Try credentials file first
        let path = Self::resolve_path(
            ctx,
            &self.credentials_file,
            AWS_SHARED_CREDENTIALS_FILE,
            "~/.aws/credentials",
        );
        if let Some(cred) = load_profile_section(ctx, &path, &profile)
            .await?
            .as_ref()
            .and_then(credential_from_props)
        {
            return Ok(Some(cred));
        }

        // Then try config file
        let path = Self::resolve_path(ctx, &self.config_file, AWS_CONFIG_FILE, "~/.aws/config");
        let section = match profile.as_str() {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };
        Ok(load_profile_section(ctx, &path, &section)
            .await?
            .as_ref()
            .and_then(credential_from_props))
    }
}
