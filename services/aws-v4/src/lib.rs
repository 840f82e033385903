//! AWS SigV4 signing.
//!
//! This crate turns a request into its canonical form, signs it with the
//! AWS Signature Version 4 scheme and loads the credentials to sign with.
//!
//! ```no_run
//! use amzreq_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use amzreq_core::{Context, OsEnv, Signer};
//!
//! # async fn example() -> amzreq_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(),
//!     RequestSigner::new("s3", "us-east-1"),
//! );
//!
//! let (mut parts, _) = http::Request::get("https://s3.amazonaws.com/bucket/key")
//!     .body(())
//!     .map_err(amzreq_core::Error::from)?
//!     .into_parts();
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::*;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod canonical;
pub use canonical::{CanonicalRequest, PayloadDigest, SigningScope};

mod sign_request;
pub use sign_request::{sign, RequestSigner};

mod provide_credential;
pub use provide_credential::*;
