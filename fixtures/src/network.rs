// fixtures/src/network.rs
//! Collaborator contract: what the fixtures need from a contract-execution network
//! and from the accounts that sign against it.
//!
//! Calldata and call results are flat sequences of felts. A `Uint256` argument
//! occupies two consecutive words, `[low, high]`.

use async_trait::async_trait;
use ethers::types::U256;
use serde::Serialize;
use std::{fmt, path::Path};

use crate::{
    error::NetworkError,
    felt::{ClassHash, ContractAddress, Felt, TxHash},
};

/// Source path of a contract, e.g. `contracts/dex/StarkDPair.cairo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContractArtifact {
    path: String,
}

impl ContractArtifact {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File stem, e.g. `StarkDPair`.
    pub fn name(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.path)
    }
}

impl fmt::Display for ContractArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A deployed contract: where it lives and which interface it speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractHandle {
    pub address: ContractAddress,
    pub artifact: ContractArtifact,
}

impl ContractHandle {
    pub fn new(artifact: ContractArtifact, address: ContractAddress) -> Self {
        Self { address, artifact }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub from_address: ContractAddress,
    /// `data[0]` is the event's short-string name digest.
    pub data: Vec<Felt>,
}

impl EventRecord {
    pub fn name_digest(&self) -> Option<Felt> {
        self.data.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    /// In emission order.
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
    pub overall_fee: U256,
    pub gas_price: U256,
    pub gas_usage: u64,
    pub unit: String,
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn declare(&self, artifact: &ContractArtifact) -> Result<ClassHash, NetworkError>;

    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        constructor_calldata: Vec<Felt>,
        salt: Felt,
    ) -> Result<ContractHandle, NetworkError>;

    async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<TransactionReceipt, NetworkError>;
}

#[async_trait]
pub trait Account: Send + Sync {
    fn address(&self) -> ContractAddress;

    /// Read-only call against current state.
    async fn call(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<Vec<Felt>, NetworkError>;

    /// State-changing transaction.
    async fn invoke(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<TxHash, NetworkError>;

    async fn estimate_fee(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<FeeEstimate, NetworkError>;
}

/// Artifact-bound view over a network: declare the class, deploy instances of it,
/// or bind a handle to an instance that already exists.
pub struct ContractFactory<'a, N: Network + ?Sized> {
    network: &'a N,
    artifact: ContractArtifact,
}

impl<'a, N: Network + ?Sized> ContractFactory<'a, N> {
    pub fn new(network: &'a N, artifact: ContractArtifact) -> Self {
        Self { network, artifact }
    }

    pub fn artifact(&self) -> &ContractArtifact {
        &self.artifact
    }

    pub async fn declare(&self) -> Result<ClassHash, NetworkError> {
        self.network.declare(&self.artifact).await
    }

    pub async fn deploy(
        &self,
        constructor_calldata: Vec<Felt>,
        salt: Felt,
    ) -> Result<ContractHandle, NetworkError> {
        self.network
            .deploy(&self.artifact, constructor_calldata, salt)
            .await
    }

    pub fn get_contract_at(&self, address: ContractAddress) -> ContractHandle {
        ContractHandle::new(self.artifact.clone(), address)
    }
}
