//! S3 client built on the SigV4 signer.
//!
//! Every request goes through [`S3::execute`]: the descriptor is resolved
//! against the [`Region`] once, then each attempt is signed with a fresh
//! timestamp and sent through the [`Context`](amzreq_core::Context). Failed
//! attempts are retried following the client's
//! [`FixedAttemptStrategy`](amzreq_core::FixedAttemptStrategy) and
//! [`RetryPolicy`].
//!
//! ```no_run
//! use amzreq_aws_v4::DefaultCredentialProvider;
//! use amzreq_core::{Context, OsEnv};
//! use amzreq_s3::{Acl, Options, Region, S3};
//!
//! # async fn example(ctx: Context) -> amzreq_s3::Result<()> {
//! let ctx = ctx.with_env(OsEnv);
//! let region = Region::from_env(&ctx)?;
//! let s3 = S3::new(ctx, region, DefaultCredentialProvider::new());
//!
//! let bucket = s3.bucket("my-bucket");
//! bucket
//!     .put("hello.txt", "hello".into(), "text/plain", Acl::Private, Options::default())
//!     .await?;
//! let content = bucket.get("hello.txt").await?;
//! assert_eq!(content.as_ref(), b"hello");
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::*;

mod region;
pub use region::Region;

mod error;
pub use error::{Error, Result, ServiceError};

mod retry;
pub use retry::RetryPolicy;

mod request;
pub use request::{Payload, RequestDescriptor};

mod dispatch;
pub use dispatch::{default_attempt_strategy, S3};

mod bucket;
pub use bucket::{
    Acl, Bucket, CommonPrefix, CopyObjectResult, CopyOptions, Key, ListResp,
    Options, Owner, RoutingRule, RoutingRuleCondition, RoutingRuleRedirect, WebsiteConfiguration,
};

mod tagging;

mod delete;
pub use delete::{Delete, DeleteError, DeleteResult, Deleted, ObjectId};

mod versions;
pub use versions::{DeleteMarker, Version, VersionsResp};

pub mod lifecycle;

mod restore;
pub use restore::{RestoreStatus, Tier};
