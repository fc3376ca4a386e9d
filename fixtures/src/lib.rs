// fixtures/src/lib.rs
// Library interface for the StarkD AMM test fixtures

use lazy_static::lazy_static;
use std::time::Duration;

pub mod amount;
pub mod config;
pub mod deploy;
pub mod error;
pub mod events;
pub mod felt;
pub mod network;
pub mod trace;
pub mod transaction;
pub mod uint;

#[cfg(feature = "local_simulation")]
pub mod local_simulator;

// Public types/constants re-exported for convenience
pub use amount::{format_amount, normalize_amount};
pub use config::{load_config, FixtureConfig};
pub use deploy::{FactoryHandle, Fixture, PairHandle, RouterHandle, TokenHandle};
pub use error::{FixtureError, NetworkError};
pub use events::filter_events;
pub use felt::{
    bigint_to_hex, felt_to_address, felt_to_short_string, short_string_to_felt, ClassHash,
    ContractAddress, Felt, TxHash,
};
pub use network::{
    Account, ContractArtifact, ContractFactory, ContractHandle, EventRecord, FeeEstimate,
    Network, TransactionReceipt,
};
pub use trace::{LogSink, MemorySink, TraceRecord, TraceSink};
pub use transaction::deadline_after;
pub use uint::{decode_uint, encode_uint, Uint128Pair};

// --- Constants shared by tests and contracts ---

/// Default wall-clock budget for one test. Overridden by `FixtureConfig::timeout`.
pub const TIMEOUT: Duration = Duration::from_millis(900_000);
/// Liquidity-share floor the pair locks away on the first deposit.
pub const MINIMUM_LIQUIDITY: u64 = 1000;
/// Sentinel owner of permanently burned liquidity.
pub const BURN_ADDRESS: ContractAddress = Felt::from_u64(1);
/// Salt used for every fixture deployment.
pub const DEFAULT_DEPLOY_SALT: Felt = Felt::from_u64(0x42);
/// Decimals given to tokens deployed through `Fixture::deploy_token`.
pub const TOKEN_DECIMALS: u8 = 18;

// Event-name digests, as written into `data[0]` of every emitted event.
lazy_static! {
    pub static ref TRANSFER_EVENT: Felt = event_digest("Transfer");
    pub static ref APPROVAL_EVENT: Felt = event_digest("Approval");
    pub static ref PAIR_CREATED_EVENT: Felt = event_digest("PairCreated");
    pub static ref MINT_EVENT: Felt = event_digest("Mint");
    pub static ref SYNC_EVENT: Felt = event_digest("Sync");
}

fn event_digest(name: &'static str) -> Felt {
    short_string_to_felt(name).expect("event names are short ASCII strings")
}
