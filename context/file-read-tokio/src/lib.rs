// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Tokio-based file reading for amzreq.
//!
//! `TokioFileRead` implements the `FileRead` seam of `amzreq_core` with
//! `tokio::fs`. Profile files are read through it when loading credentials,
//! and file backed upload payloads are re-read through it on every attempt.
//!
//! ```no_run
//! use amzreq_core::{Context, OsEnv};
//! use amzreq_file_read_tokio::TokioFileRead;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead)
//!         .with_env(OsEnv);
//!
//!     match ctx.file_read("/path/to/credentials").await {
//!         Ok(content) => println!("Read {} bytes", content.len()),
//!         Err(e) => eprintln!("Failed to read file: {}", e),
//!     }
//! }
//! ```

use amzreq_core::{Error, FileRead, Result};
use async_trait::async_trait;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| Error::unexpected(format!("failed to read file {path}")).with_source(e))
    }

    async fn file_read_range(&self, path: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut f = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::unexpected(format!("failed to open file {path}")).with_source(e))?;
        f.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| Error::unexpected(format!("failed to seek file {path}")).with_source(e))?;

        let size = usize::try_from(length).map_err(|e| {
            Error::request_invalid(format!("range length {length} is too large")).with_source(e)
        })?;
        let mut buf = vec![0; size];
        f.read_exact(&mut buf).await.map_err(|e| {
            Error::request_invalid(format!(
                "failed to read {length} bytes at {offset} from file {path}"
            ))
            .with_source(e)
        })?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_read_range() -> anyhow::Result<()> {
        let mut f = tempfile::NamedTempFile::new()?;
        f.write_all(b"hello, amzreq")?;
        let path = f.path().to_string_lossy().to_string();

        let fs = TokioFileRead;
        assert_eq!(fs.file_read(&path).await?, b"hello, amzreq");
        assert_eq!(fs.file_read_range(&path, 7, 6).await?, b"amzreq");
        assert_eq!(fs.file_read_range(&path, 0, 0).await?, b"");

        let err = fs.file_read_range(&path, 7, 100).await.unwrap_err();
        assert_eq!(err.kind(), amzreq_core::ErrorKind::RequestInvalid);

        assert!(fs.file_read("/non/existent/path").await.is_err());
        Ok(())
    }
}
