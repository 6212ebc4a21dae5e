use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy_primitives::Address;
use rap_common::{
    models::{
        transaction::{BlockTag, NonceLease},
        ChainId, Nonce,
    },
    traits::ChainRpc,
    ActionError,
};
use tracing::{debug, instrument, warn};

/// Hands out nonces for the accounts used by one Rap run.
///
/// The first lease for a `(signer, chain)` pair reads the pending transaction count, so
/// transactions still in the mempool (from this wallet or another run) are accounted for.
/// Every later lease is `last_issued + 1` without touching the network. A sequencer must not
/// outlive the run it was created for: a cached nonce goes stale as soon as the wallet sends
/// anything outside the run.
pub struct NonceSequencer {
    rpc: Arc<dyn ChainRpc>,
    read_timeout: Duration,
    last_issued: HashMap<(Address, ChainId), Nonce>,
    issued: Vec<NonceLease>,
}

impl NonceSequencer {
    pub fn new(rpc: Arc<dyn ChainRpc>, read_timeout: Duration) -> Self {
        Self { rpc, read_timeout, last_issued: HashMap::new(), issued: Vec::new() }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn lease(
        &mut self,
        address: Address,
        chain_id: ChainId,
    ) -> Result<NonceLease, ActionError> {
        let nonce = match self.last_issued.get(&(address, chain_id)) {
            Some(last) => last + 1,
            None => self.read_pending(address, chain_id).await?,
        };
        self.last_issued
            .insert((address, chain_id), nonce);
        let lease = NonceLease { address, chain_id, nonce };
        self.issued.push(lease);
        debug!(nonce, "Leased nonce");
        Ok(lease)
    }

    /// All leases issued so far, in order.
    pub fn issued(&self) -> &[NonceLease] {
        &self.issued
    }

    async fn read_pending(
        &self,
        address: Address,
        chain_id: ChainId,
    ) -> Result<Nonce, ActionError> {
        let read = self
            .rpc
            .get_transaction_count(address, chain_id, BlockTag::Pending);
        match tokio::time::timeout(self.read_timeout, read).await {
            Ok(Ok(nonce)) => Ok(nonce),
            Ok(Err(err)) => {
                warn!(%address, chain_id, error = %err, "Pending nonce read failed");
                Err(ActionError::NonceReadFailed(err.to_string()))
            }
            Err(_) => {
                warn!(%address, chain_id, "Pending nonce read timed out");
                Err(ActionError::NonceReadFailed(format!(
                    "no answer within {}ms",
                    self.read_timeout.as_millis()
                )))
            }
        }
    }
}
