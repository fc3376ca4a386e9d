// fixtures/src/error.rs

use ethers::types::U256;
use thiserror::Error;

use crate::felt::{ContractAddress, TxHash};

pub type Result<T, E = FixtureError> = std::result::Result<T, E>;

/// Errors raised by the collaborators a fixture talks to: the contract-execution
/// network and the accounts submitting calls against it.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{function} on {contract} reverted: {reason}")]
    Reverted {
        contract: ContractAddress,
        function: String,
        reason: String,
    },
    #[error("no contract deployed at {0}")]
    ContractNotFound(ContractAddress),
    #[error("a contract is already deployed at {0}")]
    AlreadyDeployed(ContractAddress),
    #[error("class {0} has not been declared")]
    ClassNotDeclared(String),
    #[error("artifact {0} does not name a known contract")]
    UnknownArtifact(String),
    #[error("contract {contract} has no entry point {function}")]
    UnknownEntryPoint {
        contract: ContractAddress,
        function: String,
    },
    #[error("malformed calldata for {function}: {reason}")]
    Calldata { function: String, reason: String },
    #[error("transaction {0} not found")]
    TransactionNotFound(TxHash),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("invalid amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("pair for {token_a} / {token_b} is not ready: factory {factory} still reports a zero address")]
    PairNotReady {
        factory: ContractAddress,
        token_a: ContractAddress,
        token_b: ContractAddress,
    },

    #[error("value {value} does not fit in 128 bits")]
    PrecisionLoss { value: U256 },

    #[error("invalid field element {value:?}: {reason}")]
    InvalidFelt { value: String, reason: String },

    #[error("invalid short string {value:?}: {reason}")]
    InvalidShortString { value: String, reason: String },

    #[error("unexpected response from {operation}: {reason}")]
    UnexpectedResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation} failed ({context})")]
    Collaborator {
        operation: &'static str,
        context: String,
        #[source]
        source: NetworkError,
    },
}

impl FixtureError {
    /// The collaborator error underneath, if this failure came from the network.
    pub fn network_error(&self) -> Option<&NetworkError> {
        match self {
            FixtureError::Collaborator { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Attaches the operation name and key parameters to a collaborator failure.
pub(crate) trait CollaboratorContext<T> {
    fn collaborator<F>(self, operation: &'static str, context: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> CollaboratorContext<T> for std::result::Result<T, NetworkError> {
    fn collaborator<F>(self, operation: &'static str, context: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| FixtureError::Collaborator {
            operation,
            context: context(),
            source,
        })
    }
}
