use crate::constants::XML_HEADER;
use crate::{Bucket, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// S3 refuses to delete more keys than this in one request.
const MAX_DELETE_OBJECTS: usize = 1000;

/// Keys to remove with [`Bucket::del_multi`].
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "Delete", rename_all = "PascalCase")]
pub struct Delete {
    /// Only report keys that failed to delete.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub quiet: bool,
    #[serde(rename = "Object")]
    pub objects: Vec<ObjectId>,
}

/// A key, optionally pinned to one of its versions.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectId {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl ObjectId {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }
}

/// Outcome of a multi object delete.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeleteResult {
    /// Empty in quiet mode.
    #[serde(rename = "Deleted")]
    pub deleted: Vec<Deleted>,
    #[serde(rename = "Error")]
    pub errors: Vec<DeleteError>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Deleted {
    pub key: String,
    pub version_id: String,
    pub delete_marker: bool,
    pub delete_marker_version_id: String,
}

/// A key S3 failed to delete.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DeleteError {
    pub key: String,
    pub version_id: String,
    pub code: String,
    pub message: String,
}

impl Delete {
    fn to_xml(&self) -> Result<String> {
        let xml = quick_xml::se::to_string(self).map_err(|e| {
            amzreq_core::Error::unexpected("failed to serialize delete request").with_source(e)
        })?;
        Ok(format!("{XML_HEADER}{xml}"))
    }
}

impl Bucket {
    /// Remove up to 1000 objects in one request.
    ///
    /// Keys that fail to delete don't fail the call, they are listed in
    /// [`DeleteResult::errors`].
    pub async fn del_multi(&self, objects: &Delete) -> Result<DeleteResult> {
        if objects.objects.len() > MAX_DELETE_OBJECTS {
            return Err(amzreq_core::Error::request_invalid(format!(
                "can't delete {} objects at once, the limit is {MAX_DELETE_OBJECTS}",
                objects.objects.len()
            ))
            .into());
        }

        let body = objects.to_xml()?;
        let md5 = BASE64_STANDARD.encode(Md5::digest(body.as_bytes()));
        let req = self
            .request(Method::POST, "/")
            .with_query("delete", "")
            .with_header(CONTENT_LENGTH, body.len().into())
            .with_header(
                HeaderName::from_static("content-md5"),
                HeaderValue::from_str(&md5).map_err(amzreq_core::Error::from)?,
            )
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/xml"))
            .with_payload(Bytes::from(body));

        self.execute_xml("delete", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quick_xml::de;

    #[test]
    fn test_delete_xml() {
        let objects = Delete {
            quiet: false,
            objects: vec![
                ObjectId::new("a"),
                ObjectId {
                    key: "b".to_string(),
                    version_id: Some("v1".to_string()),
                },
            ],
        };
        assert_eq!(
            objects.to_xml().unwrap(),
            format!(
                "{XML_HEADER}<Delete>\
                 <Object><Key>a</Key></Object>\
                 <Object><Key>b</Key><VersionId>v1</VersionId></Object>\
                 </Delete>"
            )
        );

        let quiet = Delete {
            quiet: true,
            objects: vec![ObjectId::new("a & b")],
        };
        assert_eq!(
            quiet.to_xml().unwrap(),
            format!(
                "{XML_HEADER}<Delete><Quiet>true</Quiet>\
                 <Object><Key>a &amp; b</Key></Object></Delete>"
            )
        );
    }

    #[test]
    fn test_decode_delete_result() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Deleted>
    <Key>sample1.txt</Key>
  </Deleted>
  <Error>
    <Key>sample2.txt</Key>
    <Code>AccessDenied</Code>
    <Message>Access Denied</Message>
  </Error>
  <Deleted>
    <Key>sample3.txt</Key>
    <DeleteMarker>true</DeleteMarker>
    <DeleteMarkerVersionId>NeQt5xeFTfgPJD8B4CGWnkSLtluMr11s</DeleteMarkerVersionId>
  </Deleted>
</DeleteResult>"#;

        let result: DeleteResult = de::from_str(content).expect("xml deserialize must succeed");
        assert_eq!(result.deleted.len(), 2);
        assert_eq!(result.deleted[0].key, "sample1.txt");
        assert!(result.deleted[1].delete_marker);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "AccessDenied");

        let result: DeleteResult = de::from_str("<DeleteResult/>").unwrap();
        assert_eq!(result, DeleteResult::default());
    }
}
