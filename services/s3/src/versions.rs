use crate::{Bucket, CommonPrefix, Owner, Result};
use http::Method;
use serde::Deserialize;

/// One page of a listing of object versions.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct VersionsResp {
    pub name: String,
    pub prefix: String,
    pub key_marker: String,
    pub version_id_marker: String,
    /// Where the next page starts, set when `is_truncated`.
    pub next_key_marker: String,
    pub next_version_id_marker: String,
    pub max_keys: u32,
    pub delimiter: String,
    pub is_truncated: bool,
    #[serde(rename = "Version")]
    pub versions: Vec<Version>,
    #[serde(rename = "DeleteMarker")]
    pub delete_markers: Vec<DeleteMarker>,
    pub common_prefixes: Vec<CommonPrefix>,
}

/// A version of an object.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Version {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub last_modified: String,
    /// Hex encoded MD5 of the content, surrounded with double quotes.
    #[serde(rename = "ETag")]
    pub etag: String,
    pub size: u64,
    pub owner: Owner,
    pub storage_class: String,
}

/// A version recording the deletion of a key.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DeleteMarker {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub last_modified: String,
    pub owner: Owner,
}

impl Bucket {
    /// List object versions of a versioned bucket.
    ///
    /// Markers are only sent when not empty, `max` of 0 leaves the service
    /// default of 1000.
    pub async fn versions(
        &self,
        prefix: &str,
        delim: &str,
        key_marker: &str,
        version_id_marker: &str,
        max: usize,
    ) -> Result<VersionsResp> {
        let mut req = self
            .request(Method::GET, "/")
            .with_query("versions", "")
            .with_query("prefix", prefix)
            .with_query("delimiter", delim);
        if !version_id_marker.is_empty() {
            req = req.with_query("version-id-marker", version_id_marker);
        }
        if !key_marker.is_empty() {
            req = req.with_query("key-marker", key_marker);
        }
        if max != 0 {
            req = req.with_query("max-keys", max.to_string());
        }

        self.execute_xml("versions", req).await
    }
}
