// fixtures/src/events.rs

use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    deploy::Fixture,
    error::{CollaboratorContext, Result},
    felt::{short_string_to_felt, Felt, TxHash},
    network::{EventRecord, Network},
};

impl<N: Network> Fixture<N> {
    /// Data payloads of every `event_name` event emitted by `tx_hash`, in emission order.
    /// An empty result means the event did not fire.
    #[instrument(skip(self))]
    pub async fn get_event_data(&self, tx_hash: TxHash, event_name: &str) -> Result<Vec<Vec<Felt>>> {
        let result = self.collect_event_data(tx_hash, event_name).await;
        self.observe(
            "get_event_data",
            json!({ "tx_hash": tx_hash, "event": event_name }),
            &result,
        );
        result
    }

    async fn collect_event_data(&self, tx_hash: TxHash, event_name: &str) -> Result<Vec<Vec<Felt>>> {
        let receipt = self
            .network()
            .get_transaction_receipt(tx_hash)
            .await
            .collaborator("get_transaction_receipt", || format!("tx {tx_hash}"))?;
        let digest = short_string_to_felt(event_name)?;
        let matched = filter_events(&receipt.events, digest);
        debug!(digest = %digest, total = receipt.events.len(), matched = matched.len(), "Receipt events filtered");
        Ok(matched)
    }
}

/// Keeps the payloads whose first word equals `digest`, preserving order.
pub fn filter_events(events: &[EventRecord], digest: Felt) -> Vec<Vec<Felt>> {
    events
        .iter()
        .filter(|event| event.name_digest() == Some(digest))
        .map(|event| event.data.clone())
        .collect()
}
