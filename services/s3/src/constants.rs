// Headers
pub const X_AMZ_ACL: &str = "x-amz-acl";
pub const X_AMZ_COPY_SOURCE: &str = "x-amz-copy-source";
pub const X_AMZ_ID_2: &str = "x-amz-id-2";
pub const X_AMZ_META_PREFIX: &str = "x-amz-meta-";
pub const X_AMZ_METADATA_DIRECTIVE: &str = "x-amz-metadata-directive";
pub const X_AMZ_REQUEST_ID: &str = "x-amz-request-id";
pub const X_AMZ_RESTORE: &str = "x-amz-restore";
pub const X_AMZ_SERVER_SIDE_ENCRYPTION: &str = "x-amz-server-side-encryption";
pub const X_AMZ_STORAGE_CLASS: &str = "x-amz-storage-class";
pub const X_AMZ_WEBSITE_REDIRECT_LOCATION: &str = "x-amz-website-redirect-location";

// Env values
pub const AWS_ENDPOINT_URL_S3: &str = "AWS_ENDPOINT_URL_S3";

pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Placeholder replaced by the bucket name in bucket endpoint templates.
pub const BUCKET_PLACEHOLDER: &str = "${bucket}";
