// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Cancellation for in-flight requests

use std::future::Future;

use futures::future::{AbortHandle, Abortable};

use crate::error::{ClientError, ClientResult};

/// Handle to tear down an in-flight request or download. Cancelling aborts
/// the underlying transport future rather than just discarding its result.
/// Idempotent and safe to call after natural completion.
#[derive(Debug, Clone)]
pub struct CancelHandle(AbortHandle);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.abort();
    }

    pub fn new_pair() -> (CancelHandle, futures::future::AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        (CancelHandle(handle), registration)
    }
}

/// Wrap a request future so the caller can abort it. An aborted request
/// resolves to [`ClientError::Canceled`].
pub fn cancellable<T, F>(
    fut: F,
) -> (impl Future<Output = ClientResult<T>>, CancelHandle)
where
    F: Future<Output = ClientResult<T>>,
{
    let (handle, registration) = CancelHandle::new_pair();
    let wrapped = Abortable::new(fut, registration);
    let fut = async move {
        match wrapped.await {
            Ok(result) => result,
            Err(aborted) => Err(aborted.into()),
        }
    };
    (fut, handle)
}
