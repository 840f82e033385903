use crate::constants::*;
use amzreq_core::utils::Redact;
use amzreq_core::{Context, Error, Result};
use ini::{Ini, Properties};
use log::debug;
use std::fmt::{Debug, Formatter};

/// Config for aws services.
#[derive(Clone)]
pub struct Config {
    /// `config_file` will be load from:
    ///
    /// - env value: [`AWS_CONFIG_FILE`]
    /// - default to: `~/.aws/config`
    pub config_file: String,
    /// `shared_credentials_file` will be loaded from:
    ///
    /// - env value: [`AWS_SHARED_CREDENTIALS_FILE`]
    /// - default to: `~/.aws/credentials`
    pub shared_credentials_file: String,
    /// `profile` will be loaded from:
    ///
    /// - env value: [`AWS_PROFILE`]
    /// - default to: `default`
    pub profile: String,

    /// `region` will be loaded from:
    ///
    /// - env value: [`AWS_REGION`], then [`AWS_DEFAULT_REGION`]
    /// - profile config: `region`
    pub region: Option<String>,
    /// `access_key_id` will be loaded from
    ///
    /// - env value: [`AWS_ACCESS_KEY_ID`]
    /// - profile config: `aws_access_key_id`
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - env value: [`AWS_SECRET_ACCESS_KEY`]
    /// - profile config: `aws_secret_access_key`
    pub secret_access_key: Option<String>,
    /// `session_token` will be loaded from
    ///
    /// - env value: [`AWS_SESSION_TOKEN`]
    /// - profile config: `aws_session_token`
    pub session_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_file: "~/.aws/config".to_string(),
            shared_credentials_file: "~/.aws/credentials".to_string(),
            profile: "default".to_string(),
            region: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("config_file", &self.config_file)
            .field("shared_credentials_file", &self.shared_credentials_file)
            .field("profile", &self.profile)
            .field("region", &self.region)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Values present in the environment replace the current ones.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();

        if let Some(v) = envs.get(AWS_CONFIG_FILE) {
            self.config_file = v.to_string();
        }
        if let Some(v) = envs.get(AWS_SHARED_CREDENTIALS_FILE) {
            self.shared_credentials_file = v.to_string();
        }
        if let Some(v) = envs.get(AWS_PROFILE) {
            self.profile = v.to_string();
        }
        if let Some(v) = envs.get(AWS_REGION).or_else(|| envs.get(AWS_DEFAULT_REGION)) {
            self.region = Some(v.to_string())
        }
        if let Some(v) = envs.get(AWS_ACCESS_KEY_ID) {
            self.access_key_id = Some(v.to_string())
        }
        if let Some(v) = envs.get(AWS_SECRET_ACCESS_KEY) {
            self.secret_access_key = Some(v.to_string())
        }
        if let Some(v) = envs.get(AWS_SESSION_TOKEN) {
            self.session_token = Some(v.to_string())
        }
        self
    }

    /// Load config from profile (and shared profile).
    ///
    /// Missing files or sections are skipped, only fields that are still
    /// unset get filled.
    pub async fn from_profile(mut self, ctx: &Context) -> Self {
        let section = match self.profile.as_str() {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };
        match load_profile_section(ctx, &self.config_file, &section).await {
            Ok(Some(props)) => {
                fill(&mut self.region, props.get("region"));
                self.fill_credential(&props);
            }
            Ok(None) => {}
            Err(err) => debug!("load profile from config file failed: {err:?}"),
        }

        let profile = self.profile.clone();
        match load_profile_section(ctx, &self.shared_credentials_file, &profile).await {
            Ok(Some(props)) => self.fill_credential(&props),
            Ok(None) => {}
            Err(err) => debug!("load profile from shared credentials file failed: {err:?}"),
        }

        self
    }

    fn fill_credential(&mut self, props: &Properties) {
        fill(&mut self.access_key_id, props.get("aws_access_key_id"));
        fill(&mut self.secret_access_key, props.get("aws_secret_access_key"));
        fill(&mut self.session_token, props.get("aws_session_token"));
    }
}

fn fill(field: &mut Option<String>, value: Option<&str>) {
    if field.is_none() {
        *field = value.map(|v| v.to_string());
    }
}

/// Read one section of an INI profile file.
///
/// Returns `Ok(None)` when the file or the section does not exist.
pub(crate) async fn load_profile_section(
    ctx: &Context,
    path: &str,
    section: &str,
) -> Result<Option<Properties>> {
    let Some(path) = ctx.expand_home_dir(path) else {
        debug!("failed to expand homedir for path: {path}");
        return Ok(None);
    };

    let content = match ctx.file_read_as_string(&path).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read profile file {path}: {err:?}");
            return Ok(None);
        }
    };

    let conf = Ini::load_from_str(&content).map_err(|e| {
        Error::config_invalid(format!("failed to parse profile file {path}"))
            .with_source(e)
    })?;

    match conf.section(Some(section)) {
        Some(props) => Ok(Some(props.clone())),
        None => {
            debug!("section {section} not found in {path}");
            Ok(None)
        }
    }
}
