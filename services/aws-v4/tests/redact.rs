//! Signing must never write the session token to the logs.
//!
//! Lives in its own binary since it installs a global logger.

use std::sync::Mutex;
use std::time::Duration;

use amzreq_aws_v4::{Credential, PayloadDigest, RequestSigner};
use http::Request;
use log::{LevelFilter, Log, Metadata, Record};

const TOKEN: &str = "TOPSECRETSESSIONTOKEN";

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        LINES.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

#[test]
fn test_session_token_not_logged() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let cred = Credential::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .with_session_token(TOKEN);
    let signer = RequestSigner::new("s3", "us-east-1");

    for expires_in in [None, Some(Duration::from_secs(300))] {
        let (mut parts, _) = Request::get("https://s3.amazonaws.com/bucket/key")
            .body(())
            .unwrap()
            .into_parts();
        signer
            .sign_with_payload(&mut parts, &cred, expires_in, &PayloadDigest::Unsigned)
            .unwrap();
    }

    let lines = LINES.lock().unwrap();
    let creqs: Vec<_> = lines
        .iter()
        .filter(|l| l.starts_with("calculated canonical request"))
        .collect();
    assert_eq!(creqs.len(), 2);
    assert!(creqs[0].contains("x-amz-security-token:TOP***KEN"));
    assert!(creqs[1].contains("X-Amz-Security-Token=TOP***KEN"));
    for line in lines.iter() {
        assert!(!line.contains(TOKEN), "token leaked: {line}");
    }
}
