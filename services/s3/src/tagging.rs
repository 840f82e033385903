use crate::{Bucket, Result};
use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename = "Tagging", rename_all = "PascalCase")]
struct Tagging {
    tag_set: TagSet,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct TagSet {
    #[serde(rename = "Tag")]
    tags: Vec<Tag>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Tag {
    key: String,
    value: String,
}

impl Tagging {
    fn from_map(tags: &HashMap<String, String>) -> Self {
        let mut tags: Vec<_> = tags
            .iter()
            .map(|(k, v)| Tag {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        tags.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            tag_set: TagSet { tags },
        }
    }

    fn into_map(self) -> HashMap<String, String> {
        self.tag_set
            .tags
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect()
    }
}

impl Bucket {
    /// Replace the tags of an object.
    pub async fn put_object_tagging(&self, key: &str, tags: &HashMap<String, String>) -> Result<()> {
        let body = quick_xml::se::to_string(&Tagging::from_map(tags)).map_err(|e| {
            amzreq_core::Error::unexpected("failed to serialize tagging").with_source(e)
        })?;

        let req = self
            .request(Method::PUT, key)
            .with_query("tagging", "")
            .with_payload(Bytes::from(body));
        self.s3().execute(req).await?;
        Ok(())
    }

    /// Tags of an object.
    pub async fn get_object_tagging(&self, key: &str) -> Result<HashMap<String, String>> {
        let req = self.request(Method::GET, key).with_query("tagging", "");
        let tagging: Tagging = self.execute_xml("tagging", req).await?;
        Ok(tagging.into_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quick_xml::de;

    #[test]
    fn test_tagging_sorted_by_key() {
        let tags = HashMap::from([
            ("zone".to_string(), "b".to_string()),
            ("app".to_string(), "web".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);

        let xml = quick_xml::se::to_string(&Tagging::from_map(&tags)).unwrap();
        assert_eq!(
            xml,
            "<Tagging><TagSet>\
             <Tag><Key>app</Key><Value>web</Value></Tag>\
             <Tag><Key>env</Key><Value>prod</Value></Tag>\
             <Tag><Key>zone</Key><Value>b</Value></Tag>\
             </TagSet></Tagging>"
        );
    }

    #[test]
    fn test_decode_tagging() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<Tagging xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <TagSet>
    <Tag><Key>tag1</Key><Value>val1</Value></Tag>
    <Tag><Key>tag2</Key><Value></Value></Tag>
  </TagSet>
</Tagging>"#;

        let tagging: Tagging = de::from_str(content).expect("xml deserialize must succeed");
        let map = tagging.into_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["tag1"], "val1");
        assert_eq!(map["tag2"], "");
    }

    #[test]
    fn test_decode_empty_tagging() {
        let tagging: Tagging = de::from_str("<Tagging><TagSet/></Tagging>").unwrap();
        assert!(tagging.into_map().is_empty());
    }
}
