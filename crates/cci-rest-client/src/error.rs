// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Client error taxonomy
//!
//! Everything surfaces to the caller without local recovery; there is no
//! automatic retry anywhere in this crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connectivity, DNS, TLS or timeout failure in the transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A 2xx response whose body does not match the expected entity shape.
    #[error("response did not match the expected shape: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    /// Any non-2xx response, with the server's status and raw body.
    #[error("server returned {status}: {body}")]
    Server {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The caller tore the request down before it completed.
    #[error("request canceled")]
    Canceled,

    /// Local filesystem failure while persisting a download.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<futures::future::Aborted> for ClientError {
    fn from(_: futures::future::Aborted) -> Self {
        ClientError::Canceled
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
