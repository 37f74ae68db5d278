// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Streaming log downloads with progress reporting
//!
//! A download writes through a `.part` temporary next to the destination
//! and renames it into place only once the body is fully received, so a
//! torn transfer never leaves a partial file that looks complete. The
//! destination is deleted up front (as the log view has always done), which
//! means a cancelled transfer can leave no file at all; callers re-trigger
//! the download in that case.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::Abortable;
use futures::stream::Stream;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use url::Url;

use crate::cancel::CancelHandle;
use crate::client::{redacted, CircleClient};
use crate::error::{ClientError, ClientResult};

/// One progress report for an in-flight download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes in the chunk that triggered this report.
    pub bytes_read: u64,
    /// Bytes received so far.
    pub total_bytes_read: u64,
    /// `Content-Length` when the server sent one.
    pub total_bytes_expected: Option<u64>,
    pub completed: bool,
}

impl DownloadProgress {
    /// Fraction received, when the total is known.
    pub fn percentage(&self) -> Option<f32> {
        let expected = self.total_bytes_expected?;
        if expected == 0 {
            return None;
        }
        Some(self.total_bytes_read as f32 / expected as f32)
    }

    fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// An in-flight download: a stream of progress reports plus a cancel
/// handle. The final item is either a report with `completed == true` or an
/// error.
pub struct DownloadTask {
    receiver: mpsc::Receiver<ClientResult<DownloadProgress>>,
    cancel: CancelHandle,
    _handle: tokio::task::JoinHandle<()>,
}

impl DownloadTask {
    /// Abort the transfer. Idempotent; a no-op after completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Stream for DownloadTask {
    type Item = ClientResult<DownloadProgress>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Temporary artifact path used while a download is in flight.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

impl CircleClient {
    /// Stream `remote` to `dest`, reporting progress as chunks arrive. The
    /// remote URL goes through the same attach-auth step as every request.
    pub fn download_file(&self, remote: &Url, dest: &Path) -> DownloadTask {
        let url = self.authed_url(remote);
        let client = self.clone();
        let dest = dest.to_path_buf();
        let part = part_path(&dest);

        let (tx, rx) = mpsc::channel(16);
        let (cancel, registration) = CancelHandle::new_pair();

        let transfer = Abortable::new(
            run_transfer(client, url, dest, part.clone(), tx.clone()),
            registration,
        );
        let handle = tokio::spawn(async move {
            let result = match transfer.await {
                Ok(inner) => inner,
                Err(aborted) => Err(aborted.into()),
            };
            if let Err(err) = result {
                // Never leave the temporary artifact behind.
                let _ = tokio::fs::remove_file(&part).await;
                let _ = tx.send(Err(err)).await;
            }
        });

        DownloadTask {
            receiver: rx,
            cancel,
            _handle: handle,
        }
    }
}

async fn run_transfer(
    client: CircleClient,
    url: Url,
    dest: PathBuf,
    part: PathBuf,
    tx: mpsc::Sender<ClientResult<DownloadProgress>>,
) -> ClientResult<()> {
    tracing::debug!(url = %redacted(&url), dest = %dest.display(), "starting download");

    // The previous file must not shadow a failed refresh.
    if tokio::fs::try_exists(&dest).await? {
        tokio::fs::remove_file(&dest).await?;
    }

    let response = client.http().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Server { status, body });
    }

    let total_bytes_expected = response.content_length();
    let mut file = tokio::fs::File::create(&part).await?;
    let mut body = response.bytes_stream();

    let mut progress = DownloadProgress {
        bytes_read: 0,
        total_bytes_read: 0,
        total_bytes_expected,
        completed: false,
    };

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        progress.bytes_read = chunk.len() as u64;
        progress.total_bytes_read += chunk.len() as u64;
        // A gone receiver means nobody is watching anymore; keep writing,
        // the file is still wanted.
        let _ = tx.send(Ok(progress)).await;
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&part, &dest).await?;

    let _ = tx.send(Ok(progress.completed())).await;
    tracing::debug!(dest = %dest.display(), bytes = progress.total_bytes_read, "download finished");
    Ok(())
}
