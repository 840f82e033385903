//! Restoring archived objects.

use crate::constants::*;
use crate::{Bucket, Error, Result};
use amzreq_core::time::{parse_http_date, DateTime};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Retrieval speed of a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tier {
    #[default]
    Standard,
    Expedited,
    Bulk,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Standard => "Standard",
            Tier::Expedited => "Expedited",
            Tier::Bulk => "Bulk",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "RestoreRequest", rename_all = "PascalCase")]
struct RestoreRequest<'a> {
    days: u32,
    glacier_job_parameters: GlacierJobParameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GlacierJobParameters<'a> {
    tier: &'a str,
}

static RESTORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"ongoing-request="(true|false)"(, expiry-date="([^"]*)")?"#)
        .expect("restore header pattern must be valid")
});

/// Restore state of an object, read from its headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreStatus {
    pub ongoing_request: bool,
    /// When the restored copy goes away.
    pub expiry_date: Option<DateTime>,
    pub storage_class: String,
}

impl RestoreStatus {
    /// Parse a `x-amz-restore` header value such as
    /// `ongoing-request="false", expiry-date="Fri, 23 Dec 2012 00:00:00 GMT"`.
    pub fn parse_amz_restore(&mut self, value: &str) -> Result<()> {
        let caps = RESTORE_RE.captures(value).ok_or_else(|| {
            Error::Core(amzreq_core::Error::unexpected(format!(
                "Unable to parse X-AMZ-Restore header: {value:?}"
            )))
        })?;

        self.ongoing_request = &caps[1] == "true";
        self.expiry_date = match caps.get(3).map(|m| m.as_str()) {
            Some(date) if !date.is_empty() => Some(parse_http_date(date)?),
            _ => None,
        };
        Ok(())
    }

    /// Build the status from the headers of a HEAD or GET response.
    ///
    /// The storage class defaults to `STANDARD`, objects without a
    /// `x-amz-restore` header were never restored.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let mut status = RestoreStatus {
            storage_class: header(X_AMZ_STORAGE_CLASS)
                .unwrap_or("STANDARD")
                .to_string(),
            ..Default::default()
        };
        if let Some(v) = header(X_AMZ_RESTORE) {
            status.parse_amz_restore(v)?;
        }
        Ok(status)
    }

    pub fn is_being_restored(&self) -> bool {
        self.ongoing_request
    }

    /// A restore finished and the restored copy is available.
    pub fn has_been_restored(&self) -> bool {
        !self.ongoing_request && self.expiry_date.is_some()
    }
}

impl Bucket {
    /// Ask S3 to restore an archived object for `days`.
    ///
    /// Returns true when a new restore was started (202), false when the
    /// object is already restored (200).
    pub async fn restore_object(&self, key: &str, days: u32, tier: Tier) -> Result<bool> {
        let body = quick_xml::se::to_string(&RestoreRequest {
            days,
            glacier_job_parameters: GlacierJobParameters {
                tier: tier.as_str(),
            },
        })
        .map_err(|e| {
            amzreq_core::Error::unexpected("failed to serialize restore request").with_source(e)
        })?;

        let req = self
            .request(Method::POST, key)
            .with_query("restore", "")
            .with_payload(Bytes::from(body));
        let resp = self.s3().execute(req).await?;
        Ok(resp.status() == StatusCode::ACCEPTED)
    }

    /// Restore state of an object.
    pub async fn get_restore_status(&self, key: &str) -> Result<RestoreStatus> {
        let resp = self.head(key, HeaderMap::new()).await?;
        RestoreStatus::from_headers(resp.headers())
    }
}
