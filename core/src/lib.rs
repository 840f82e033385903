//! Core components for signed, retrying requests.
//!
//! This crate provides the foundational types and traits shared by the
//! amzreq crates:
//!
//! - **Context**: A container that holds implementations for file reading, HTTP sending, and environment access
//! - **Traits**: Abstract interfaces for credential loading (`ProvideCredential`) and request signing (`SignRequest`)
//! - **Signer**: Coordinates credential loading and request signing
//! - **Attempt**: A reusable retry scheduler bounded by a minimum attempt count and a total duration
//!
//! ## Example
//!
//! ```no_run
//! use amzreq_core::{Context, FixedAttemptStrategy, Step};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let strategy = FixedAttemptStrategy::new(Duration::from_secs(5), Duration::from_millis(200))
//!     .with_min(5);
//!
//! let mut attempt = strategy.start();
//! while attempt.next().await {
//!     // issue the request here
//! #   break;
//! }
//! # }
//! ```
//!
//! ## Traits
//!
//! - [`FileRead`]: For asynchronous file reading
//! - [`HttpSend`]: For sending HTTP requests
//! - [`Env`]: For environment variable access
//! - [`ProvideCredential`]: For loading credentials from various sources
//! - [`SignRequest`]: For building service-specific signing requests
//! - [`SigningCredential`]: For validating credentials
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod context;
pub use context::{Context, Env, FileRead, HttpSend, OsEnv, StaticEnv};
mod body;
pub use body::{Body, RequestTimeout};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;

mod attempt;
pub use attempt::{Attempt, FixedAttemptStrategy, Step};
