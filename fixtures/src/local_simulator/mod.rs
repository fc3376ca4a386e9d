// fixtures/src/local_simulator/mod.rs
#![cfg(feature = "local_simulation")]
//! In-process contract network implementing [`Network`] and [`Account`].
//!
//! Every transaction runs against a copy of the chain state and is committed only
//! if it succeeds. Latency can be emulated per send and per read, and the factory
//! registry can be made to lag behind `create_pair` for a configurable number of
//! `get_pair` reads.

mod contracts;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use ethers::{types::U256, utils::keccak256};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tracing::{debug, info, instrument};

use crate::{
    error::NetworkError,
    felt::{ClassHash, ContractAddress, Felt, TxHash},
    network::{
        Account, ContractArtifact, ContractHandle, EventRecord, FeeEstimate, Network,
        TransactionReceipt,
    },
    PAIR_CREATED_EVENT,
};
use contracts::ChainState;

const BASE_GAS: u64 = 2_500;
const CALLDATA_WORD_GAS: u64 = 100;
const EVENT_GAS: u64 = 500;

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub emulated_send_latency_ms: u64,
    pub emulated_read_latency_ms: u64,
    /// `get_pair` reads that still answer zero after a pair is created.
    pub registry_settlement_reads: u32,
    pub gas_price: U256,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            emulated_send_latency_ms: 0,
            emulated_read_latency_ms: 0,
            registry_settlement_reads: 0,
            gas_price: U256::from(100_000_000_000u64), // 100 gwei
        }
    }
}

pub struct LocalNetwork {
    config: SimulatorConfig,
    state: Mutex<ChainState>,
    receipts: DashMap<TxHash, TransactionReceipt>,
    /// Pair address -> reads left before the registry reports it. Entries are always > 0.
    unsettled_pairs: DashMap<ContractAddress, u32>,
    nonce: AtomicU64,
}

impl LocalNetwork {
    pub fn new(config: SimulatorConfig) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        info!(?config, "Local network started");
        Self {
            config,
            state: Mutex::new(ChainState::new(now)),
            receipts: DashMap::new(),
            unsettled_pairs: DashMap::new(),
            nonce: AtomicU64::new(0),
        }
    }

    /// Deterministic account `index`. The same index always signs as the same address.
    pub fn account(self: &Arc<Self>, index: u64) -> LocalAccount {
        let seed = format!("starkd-local-account-{index}");
        LocalAccount {
            address: Felt::from_hash_bytes(keccak256(seed.as_bytes())),
            network: Arc::clone(self),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn block_number(&self) -> u64 {
        self.state().block_number()
    }

    pub fn block_timestamp(&self) -> u64 {
        self.state().block_timestamp()
    }

    /// Pairs whose registry entry is still hidden from `get_pair`.
    pub fn unsettled_pairs(&self) -> usize {
        self.unsettled_pairs.len()
    }

    // A panic inside a contract cannot leave partial state behind, so poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn apply_send_latency(&self) {
        let l = self.config.emulated_send_latency_ms;
        if l > 0 {
            debug!("Applying simulated SEND latency: {}ms", l);
            tokio::time::sleep(Duration::from_millis(l)).await;
        }
    }

    async fn apply_read_latency(&self) {
        let l = self.config.emulated_read_latency_ms;
        if l > 0 {
            debug!("Applying simulated READ latency: {}ms", l);
            tokio::time::sleep(Duration::from_millis(l)).await;
        }
    }

    fn next_tx_hash(&self, sender: ContractAddress, contract: ContractAddress, function: &str, calldata: &[Felt]) -> TxHash {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(&sender.to_be_bytes());
        preimage.extend_from_slice(&contract.to_be_bytes());
        preimage.extend_from_slice(function.as_bytes());
        for word in calldata {
            preimage.extend_from_slice(&word.to_be_bytes());
        }
        Felt::from_hash_bytes(keccak256(preimage))
    }

    fn declare_class(&self, artifact: &ContractArtifact) -> Result<ClassHash, NetworkError> {
        self.state().declare(artifact)
    }

    fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        calldata: &[Felt],
        salt: Felt,
    ) -> Result<ContractAddress, NetworkError> {
        self.state().deploy(artifact, calldata, salt)
    }

    /// Runs a transaction on a copy of the state in a new block; commits only on success.
    fn submit(
        &self,
        sender: ContractAddress,
        contract: ContractAddress,
        function: &str,
        calldata: &[Felt],
    ) -> Result<TxHash, NetworkError> {
        let mut events = Vec::new();
        {
            let mut state = self.state();
            let mut next = state.clone();
            next.begin_block(Utc::now().timestamp().max(0) as u64);
            next.execute(sender, contract, function, calldata, &mut events)?;
            *state = next;
        }

        let lag = self.config.registry_settlement_reads;
        if lag > 0 {
            for created in events.iter().filter(|e| e.name_digest() == Some(*PAIR_CREATED_EVENT)) {
                if let Some(&pair) = created.data.get(3) {
                    debug!(%pair, reads = lag, "Registry will lag behind pair creation");
                    self.unsettled_pairs.insert(pair, lag);
                }
            }
        }

        let tx_hash = self.next_tx_hash(sender, contract, function, calldata);
        debug!(%tx_hash, function, events = events.len(), "Transaction committed");
        self.receipts.insert(
            tx_hash,
            TransactionReceipt {
                transaction_hash: tx_hash,
                events,
            },
        );
        Ok(tx_hash)
    }

    /// Executes against a throwaway copy of the state.
    fn dry_run(
        &self,
        sender: ContractAddress,
        contract: ContractAddress,
        function: &str,
        calldata: &[Felt],
        next_block: bool,
    ) -> Result<(Vec<Felt>, Vec<EventRecord>), NetworkError> {
        let mut scratch = self.state().clone();
        if next_block {
            scratch.begin_block(Utc::now().timestamp().max(0) as u64);
        }
        let mut events = Vec::new();
        let output = scratch.execute(sender, contract, function, calldata, &mut events)?;
        Ok((output, events))
    }

    fn query(
        &self,
        sender: ContractAddress,
        contract: ContractAddress,
        function: &str,
        calldata: &[Felt],
    ) -> Result<Vec<Felt>, NetworkError> {
        let (output, _) = self.dry_run(sender, contract, function, calldata, false)?;
        if function == "get_pair" {
            if let Some(pair) = output.first().copied().filter(|pair| !pair.is_zero()) {
                let left = self.unsettled_pairs.get_mut(&pair).map(|mut remaining| {
                    *remaining -= 1;
                    *remaining
                });
                if let Some(left) = left {
                    if left == 0 {
                        self.unsettled_pairs.remove(&pair);
                    }
                    debug!(%pair, left, "Registry not settled; answering zero");
                    return Ok(vec![Felt::ZERO]);
                }
            }
        }
        Ok(output)
    }

    fn estimate(
        &self,
        sender: ContractAddress,
        contract: ContractAddress,
        function: &str,
        calldata: &[Felt],
    ) -> Result<FeeEstimate, NetworkError> {
        let (_, events) = self.dry_run(sender, contract, function, calldata, true)?;
        let gas_usage = BASE_GAS
            + CALLDATA_WORD_GAS * calldata.len() as u64
            + EVENT_GAS * events.len() as u64;
        Ok(FeeEstimate {
            overall_fee: self.config.gas_price * U256::from(gas_usage),
            gas_price: self.config.gas_price,
            gas_usage,
            unit: "WEI".to_string(),
        })
    }
}

#[async_trait]
impl Network for LocalNetwork {
    #[instrument(skip(self), fields(artifact = %artifact))]
    async fn declare(&self, artifact: &ContractArtifact) -> Result<ClassHash, NetworkError> {
        self.apply_send_latency().await;
        self.declare_class(artifact)
    }

    #[instrument(skip(self, constructor_calldata), fields(artifact = %artifact))]
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_calldata: Vec<Felt>,
        salt: Felt,
    ) -> Result<ContractHandle, NetworkError> {
        self.apply_send_latency().await;
        let address = self.deploy_contract(artifact, &constructor_calldata, salt)?;
        debug!(%address, "Contract deployed");
        Ok(ContractHandle::new(artifact.clone(), address))
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, NetworkError> {
        self.apply_read_latency().await;
        self.receipts
            .get(&tx_hash)
            .map(|receipt| receipt.clone())
            .ok_or(NetworkError::TransactionNotFound(tx_hash))
    }
}

/// An account on a [`LocalNetwork`].
#[derive(Clone)]
pub struct LocalAccount {
    address: ContractAddress,
    network: Arc<LocalNetwork>,
}

impl LocalAccount {
    pub fn network(&self) -> &Arc<LocalNetwork> {
        &self.network
    }
}

#[async_trait]
impl Account for LocalAccount {
    fn address(&self) -> ContractAddress {
        self.address
    }

    async fn call(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<Vec<Felt>, NetworkError> {
        self.network.apply_read_latency().await;
        self.network
            .query(self.address, contract.address, function, &calldata)
    }

    async fn invoke(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<TxHash, NetworkError> {
        self.network.apply_send_latency().await;
        self.network
            .submit(self.address, contract.address, function, &calldata)
    }

    async fn estimate_fee(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<FeeEstimate, NetworkError> {
        self.network.apply_read_latency().await;
        self.network
            .estimate(self.address, contract.address, function, &calldata)
    }
}
