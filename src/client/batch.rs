use futures::StreamExt;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::client::core::ApiClient;
use crate::request::CallRequest;
use crate::response::RawOutcome;
use crate::{Error, ErrorContext, Result};

impl ApiClient {
    /// Issue every request concurrently; the gate bounds how many are in flight.
    ///
    /// Outcomes come back in input order, one per request.
    pub async fn execute_batch(&self, requests: Vec<CallRequest>) -> Result<Vec<RawOutcome>> {
        self.execute_batch_with_cancel(requests, CancellationToken::new())
            .await
    }

    /// Like [`execute_batch`](Self::execute_batch), but calls still running when `cancel`
    /// fires end as cancelled failures. Outcomes already completed are kept.
    pub async fn execute_batch_with_cancel(
        &self,
        requests: Vec<CallRequest>,
        cancel: CancellationToken,
    ) -> Result<Vec<RawOutcome>> {
        let requests = assign_correlation_ids(requests)?;
        let n = requests.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        info!(
            calls = n,
            concurrency = self.gate.snapshot().max,
            "Executing batch"
        );

        let results: Vec<(usize, Result<RawOutcome>)> =
            futures::stream::iter(requests.into_iter().enumerate())
                .map(|(idx, req)| {
                    let cancel = cancel.clone();
                    async move {
                        let id = req.correlation_id.clone().unwrap_or_default();
                        let outcome = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Ok(RawOutcome::cancelled(id)),
                            r = self.request(req) => r,
                        };
                        (idx, outcome)
                    }
                })
                .buffer_unordered(n)
                .collect()
                .await;

        let mut out: Vec<Option<RawOutcome>> = (0..n).map(|_| None).collect();
        for (idx, r) in results {
            out[idx] = Some(r?);
        }
        Ok(out.into_iter().flatten().collect())
    }
}

/// Give every request a correlation id, generating uuids where absent. Ids must be unique
/// within the batch; a duplicate is rejected before any network activity.
fn assign_correlation_ids(mut requests: Vec<CallRequest>) -> Result<Vec<CallRequest>> {
    let mut seen = HashSet::with_capacity(requests.len());
    for req in requests.iter_mut() {
        let id = req
            .correlation_id
            .get_or_insert_with(|| Uuid::new_v4().to_string());
        if !seen.insert(id.clone()) {
            return Err(Error::validation_with_context(
                format!("duplicate correlation id '{}' in batch", id),
                ErrorContext::new()
                    .with_field_path("correlation_id")
                    .with_source("batch"),
            ));
        }
    }
    Ok(requests)
}
