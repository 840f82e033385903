use crate::constants::*;
use amzreq_aws_v4::{AWS_DEFAULT_REGION, AWS_REGION};
use amzreq_core::{Context, Error, Result};

/// Where and how to reach S3 in one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Region name used in the signing scope, like `us-west-2`.
    pub name: String,
    /// Endpoint for path style requests: `https://s3.amazonaws.com`.
    pub s3_endpoint: String,
    /// Endpoint template for virtual hosted requests, `${bucket}` is
    /// replaced by the bucket name. Path style is used when unset.
    pub s3_bucket_endpoint: Option<String>,
    /// Whether bucket creation must carry a location constraint.
    pub s3_location_constraint: bool,
    /// Whether bucket names must be lowercased.
    pub s3_lowercase_bucket: bool,
}

const BUILTIN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
];

impl Region {
    /// Look up a region in the built-in table.
    pub fn from_name(name: &str) -> Option<Self> {
        if !BUILTIN_REGIONS.contains(&name) {
            return None;
        }

        // us-east-1 is the legacy global endpoint.
        if name == "us-east-1" {
            return Some(Self {
                name: name.to_string(),
                s3_endpoint: "https://s3.amazonaws.com".to_string(),
                s3_bucket_endpoint: None,
                s3_location_constraint: false,
                s3_lowercase_bucket: false,
            });
        }

        Some(Self {
            name: name.to_string(),
            s3_endpoint: format!("https://s3-{name}.amazonaws.com"),
            s3_bucket_endpoint: None,
            s3_location_constraint: true,
            s3_lowercase_bucket: true,
        })
    }

    /// Build a region for an S3 compatible service.
    pub fn custom(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            s3_endpoint: endpoint.into().trim_end_matches('/').to_string(),
            s3_bucket_endpoint: None,
            s3_location_constraint: false,
            s3_lowercase_bucket: false,
        }
    }

    /// Address buckets through a virtual hosted endpoint template such as
    /// `https://${bucket}.s3.example.com`.
    pub fn with_bucket_endpoint(mut self, template: impl Into<String>) -> Self {
        self.s3_bucket_endpoint = Some(template.into());
        self
    }

    /// Set whether bucket creation sends a location constraint.
    pub fn with_location_constraint(mut self, v: bool) -> Self {
        self.s3_location_constraint = v;
        self
    }

    /// Set whether bucket names are lowercased.
    pub fn with_lowercase_bucket(mut self, v: bool) -> Self {
        self.s3_lowercase_bucket = v;
        self
    }

    /// Resolve the region from env.
    ///
    /// - `AWS_ENDPOINT_URL_S3` selects a custom endpoint.
    /// - `AWS_REGION`, then `AWS_DEFAULT_REGION`, names the region, `us-east-1`
    ///   when neither is set.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let name = ctx
            .env_var(AWS_REGION)
            .or_else(|| ctx.env_var(AWS_DEFAULT_REGION))
            .unwrap_or_else(|| "us-east-1".to_string());

        if let Some(endpoint) = ctx.env_var(AWS_ENDPOINT_URL_S3) {
            return Ok(Self::custom(name, endpoint));
        }

        Self::from_name(&name).ok_or_else(|| {
            Error::config_invalid(format!("unknown S3 region {name}"))
                .with_context(format!("set {AWS_ENDPOINT_URL_S3} to use a custom endpoint"))
        })
    }

    /// Body for bucket creation, empty unless the region requires a
    /// location constraint.
    pub(crate) fn location_constraint(&self) -> Result<Option<String>> {
        if !self.s3_location_constraint {
            return Ok(None);
        }

        let doc = CreateBucketConfiguration {
            xmlns: S3_XMLNS,
            location_constraint: &self.name,
        };
        quick_xml::se::to_string(&doc).map(Some).map_err(|e| {
            Error::unexpected("failed to serialize location constraint").with_source(e)
        })
    }
}

#[derive(serde::Serialize)]
#[serde(rename = "CreateBucketConfiguration", rename_all = "PascalCase")]
struct CreateBucketConfiguration<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'a str,
    location_constraint: &'a str,
}
