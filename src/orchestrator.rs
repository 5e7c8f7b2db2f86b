use futures_util::future::join_all;
use tracing::{error, info, warn};

use crate::{
    errors::{AppError, Result},
    events::{BroadcastSender, broadcast_json, outcome_summary},
    models::{GenerationMode, GenerationOutcome, GenerationRequest, ResultSet},
    providers::GenerationClient,
};

/// Fans a batch of requests out to the generation client and joins them back
/// into a `ResultSet` in submission order.
pub struct BatchOrchestrator<C> {
    client: C,
    broadcaster: Option<BroadcastSender>,
}

impl<C: GenerationClient> BatchOrchestrator<C> {
    pub fn new(client: C, broadcaster: Option<BroadcastSender>) -> Self {
        Self {
            client,
            broadcaster,
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Dispatches every request concurrently and waits for all of them.
    ///
    /// Individual failures become `Failure` outcomes at their own index. Only
    /// a failure to dispatch at all is returned as an error.
    pub async fn run(
        &self,
        mode: GenerationMode,
        requests: Vec<GenerationRequest>,
    ) -> Result<ResultSet> {
        if requests.is_empty() {
            return Err(AppError::Dispatch("no requests were built".to_string()));
        }

        if let Err(err) = self.client.preflight() {
            error!(target: "orchestrator", error = %err, %mode, "generation run could not be dispatched");
            return Err(err);
        }

        if requests.len() != mode.fan_out() {
            warn!(target: "orchestrator", %mode, expected = mode.fan_out(), actual = requests.len(), "unexpected batch size");
        }
        info!(target: "orchestrator", %mode, requests = requests.len(), "dispatching generation batch");

        // join_all yields in input order, whatever order the calls finish in.
        let outcomes = join_all(
            requests
                .iter()
                .enumerate()
                .map(|(index, request)| self.settle(index, request)),
        )
        .await;

        let result_set = ResultSet::new(mode, outcomes);
        info!(
            target: "orchestrator",
            %mode,
            succeeded = result_set.success_count(),
            total = result_set.len(),
            "generation batch settled"
        );
        Ok(result_set)
    }

    async fn settle(&self, index: usize, request: &GenerationRequest) -> GenerationOutcome {
        let title = request.title.clone();

        let outcome = match self.client.generate(request).await {
            Ok(response) => match response.first_image() {
                Some(image) => GenerationOutcome::Success {
                    title,
                    image_url: image.data_url(),
                },
                None => GenerationOutcome::Failure {
                    title,
                    reason: response.missing_image_reason(),
                },
            },
            Err(err) => GenerationOutcome::Failure {
                title,
                reason: err.to_string(),
            },
        };

        match &outcome {
            GenerationOutcome::Success { title, .. } => {
                info!(target: "orchestrator", index, %title, "generation succeeded");
            }
            GenerationOutcome::Failure { title, reason } => {
                warn!(target: "orchestrator", index, %title, %reason, "generation failed");
            }
        }

        if let Some(broadcaster) = &self.broadcaster {
            broadcast_json(broadcaster, "generation.item", outcome_summary(index, &outcome));
        }

        outcome
    }
}
