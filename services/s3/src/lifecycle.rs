//! Bucket lifecycle configuration.

use crate::{Bucket, Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::{HeaderValue, Method};
use md5::{Digest, Md5};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Root of a lifecycle document.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename = "LifecycleConfiguration")]
pub struct Configuration {
    #[serde(rename = "Rule")]
    pub rules: Vec<Rule>,
    /// Paths of elements found in the decoded document that this model
    /// doesn't know, like `LifecycleConfiguration/Rule/NoncurrentVersionExpiration`.
    #[serde(skip)]
    pub unknown: Vec<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Rule {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    /// `Enabled` or `Disabled`.
    pub status: String,
    #[serde(rename = "Transition")]
    pub transitions: Vec<Transition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Filter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub and: Option<And>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct And {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Transition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// `STANDARD_IA` or `GLACIER`.
    pub storage_class: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Expiration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Configuration {
    /// Decode a lifecycle document, recording elements it doesn't model.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut config: Configuration = quick_xml::de::from_reader(xml)
            .map_err(|e| Error::decode("failed to decode lifecycle configuration", e))?;
        config.unknown = unknown_elements(xml)
            .map_err(|e| Error::decode("failed to decode lifecycle configuration", e))?;
        Ok(config)
    }

    /// Whether the decoded document held elements this model drops.
    ///
    /// Writing such a configuration back would silently lose them.
    pub fn is_unclean(&self) -> bool {
        !self.unknown.is_empty()
    }

    /// Problems S3 would reject the configuration for, empty when valid.
    pub fn check_values(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for rule in &self.rules {
            if rule.status != "Enabled" && rule.status != "Disabled" {
                problems.push(format!(
                    "Rule Status must be 'Enabled' or 'Disabled', got: {:?}",
                    rule.status
                ));
            }

            for t in &rule.transitions {
                if t.days.is_some() && t.date.is_some() {
                    problems.push("Transition cannot have both a Date and Days".to_string());
                }
                if let Some(days) = t.days.filter(|d| *d < 0) {
                    problems.push(format!("Days cannot be negative, got: {days}"));
                }
                if t.storage_class != "STANDARD_IA" && t.storage_class != "GLACIER" {
                    problems.push(format!(
                        "StorageClass must be one of ('STANDARD_IA', 'GLACIER'), got: {:?}",
                        t.storage_class
                    ));
                }
            }
        }
        problems
    }
}

impl Bucket {
    /// Lifecycle configuration of the bucket.
    pub async fn get_lifecycle(&self) -> Result<Configuration> {
        let req = self.request(Method::GET, "/").with_query("lifecycle", "");
        self.s3()
            .execute_and_then(req, &CancellationToken::new(), |resp| {
                Configuration::from_xml(resp.body())
            })
            .await
    }

    /// Replace the lifecycle configuration of the bucket.
    ///
    /// Configurations with problems reported by
    /// [`check_values`](Configuration::check_values) are refused without
    /// contacting S3.
    pub async fn put_lifecycle(&self, config: &Configuration) -> Result<()> {
        let problems = config.check_values();
        if !problems.is_empty() {
            let err = problems.into_iter().fold(
                amzreq_core::Error::request_invalid("lifecycle configuration is invalid"),
                |err, problem| err.with_context(problem),
            );
            return Err(err.into());
        }

        let body = quick_xml::se::to_string(config).map_err(|e| {
            amzreq_core::Error::unexpected("failed to serialize lifecycle configuration")
                .with_source(e)
        })?;
        let md5 = BASE64_STANDARD.encode(Md5::digest(body.as_bytes()));

        let req = self
            .request(Method::PUT, "/")
            .with_query("lifecycle", "")
            .with_header(
                http::header::HeaderName::from_static("content-md5"),
                HeaderValue::from_str(&md5).map_err(amzreq_core::Error::from)?,
            )
            .with_payload(Bytes::from(body));
        self.s3().execute(req).await?;
        Ok(())
    }
}

/// Elements each modeled element may contain, `None` for text leaves.
fn known_children(parent: &str) -> Option<&'static [&'static str]> {
    match parent {
        "LifecycleConfiguration" => Some(&["Rule"]),
        "Rule" => Some(&["ID", "Filter", "Status", "Transition", "Expiration"]),
        "Filter" => Some(&["Prefix", "Tag", "And"]),
        "And" => Some(&["Prefix", "Tag"]),
        "Tag" => Some(&["Key", "Value"]),
        "Transition" => Some(&["Days", "Date", "StorageClass"]),
        "Expiration" => Some(&["Days", "Date"]),
        _ => None,
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn unknown_elements(xml: &[u8]) -> quick_xml::Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut unknown = Vec::new();

    loop {
        let (name, empty) = match reader.read_event()? {
            Event::Start(e) => (local_name(&e), false),
            Event::Empty(e) => (local_name(&e), true),
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        // Children of unknown elements and of text leaves are not checked.
        if let Some(names) = stack.last().and_then(|p| known_children(p)) {
            if !names.contains(&name.as_str()) {
                unknown.push(format!("{}/{name}", stack.join("/")));
            }
        }
        if !empty {
            stack.push(name);
        }
    }
    Ok(unknown)
}
