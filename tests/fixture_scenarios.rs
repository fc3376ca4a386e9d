// tests/fixture_scenarios.rs

// Runs the fixtures end to end against the in-process network.
// Requires the 'local_simulation' feature (enabled by default).

#![cfg(feature = "local_simulation")]

use async_trait::async_trait;
use ethers::types::U256;
use eyre::{eyre, Result};
use std::{
    process::Command,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use starkd_fixtures::{
    config::init_test_tracing,
    deadline_after, decode_uint, encode_uint,
    local_simulator::{LocalAccount, LocalNetwork, SimulatorConfig},
    Account, ContractHandle, FactoryHandle, FeeEstimate, Felt, Fixture, FixtureConfig,
    FixtureError, MemorySink, Network, NetworkError, RouterHandle, TokenHandle, TxHash,
    Uint128Pair, BURN_ADDRESS, MINIMUM_LIQUIDITY,
};

struct Dex {
    network: Arc<LocalNetwork>,
    deployer: LocalAccount,
    fixture: Fixture<LocalNetwork>,
    eth: TokenHandle,
    usdc: TokenHandle,
    factory: FactoryHandle,
    router: RouterHandle,
}

async fn deploy_dex(simulator: SimulatorConfig) -> Result<Dex> {
    init_test_tracing();
    let network = Arc::new(LocalNetwork::new(simulator));
    let deployer = network.account(0);
    let fixture = Fixture::new(Arc::clone(&network), FixtureConfig::default());

    let eth = fixture.deploy_token(&deployer, "Ether", "ETH").await?;
    let usdc = fixture
        .deploy_token_with_decimals(&deployer, "USD Coin", "USDC", 6)
        .await?;
    let factory = fixture.deploy_factory(deployer.address()).await?;
    let router = fixture.deploy_router(factory.address()).await?;

    Ok(Dex {
        network,
        deployer,
        fixture,
        eth,
        usdc,
        factory,
        router,
    })
}

fn word(value: u64) -> Felt {
    Felt::from(value)
}

fn uint_at(words: &[Felt], index: usize) -> Result<U256> {
    let low = *words.get(index).ok_or_else(|| eyre!("missing word {index}"))?;
    let high = *words.get(index + 1).ok_or_else(|| eyre!("missing word {}", index + 1))?;
    Ok(Uint128Pair::from_calldata(low, high)?.to_u256())
}

fn revert_reason(error: &FixtureError) -> Option<&str> {
    match error.network_error() {
        Some(NetworkError::Reverted { reason, .. }) => Some(reason.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn canonical_order_is_argument_order_independent() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let (eth, usdc) = (dex.eth.address(), dex.usdc.address());

    let forward = dex.fixture.sort_tokens(&dex.deployer, &dex.router, eth, usdc).await?;
    let backward = dex.fixture.sort_tokens(&dex.deployer, &dex.router, usdc, eth).await?;
    assert_eq!(forward, backward);
    assert!(forward.0 < forward.1);

    let pair = dex
        .fixture
        .deploy_pair(&dex.deployer, usdc, eth, &dex.router, &dex.factory)
        .await?;
    assert_eq!((pair.token0, pair.token1), forward);

    let resolved = dex
        .fixture
        .resolve_pair(&dex.deployer, &dex.router, &dex.factory, eth, usdc)
        .await?;
    assert_eq!(resolved, pair);

    let token0 = dex.deployer.call(&pair.contract, "token0", vec![]).await?;
    assert_eq!(token0, vec![pair.token0]);
    Ok(())
}

#[tokio::test]
async fn fresh_networks_deploy_to_the_same_addresses() -> Result<()> {
    let first = deploy_dex(SimulatorConfig::default()).await?;
    let second = deploy_dex(SimulatorConfig::default()).await?;

    assert_eq!(first.eth, second.eth);
    assert_eq!(first.usdc, second.usdc);
    assert_eq!(first.factory, second.factory);
    assert_eq!(first.router, second.router);
    assert_ne!(first.eth.address(), first.usdc.address());

    let pair_a = first
        .fixture
        .deploy_pair(&first.deployer, first.eth.address(), first.usdc.address(), &first.router, &first.factory)
        .await?;
    let pair_b = second
        .fixture
        .deploy_pair(&second.deployer, second.usdc.address(), second.eth.address(), &second.router, &second.factory)
        .await?;
    assert_eq!(pair_a.address(), pair_b.address());
    Ok(())
}

#[tokio::test]
async fn lagging_registry_reports_pair_not_ready_then_resolves() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig {
        registry_settlement_reads: 1,
        ..SimulatorConfig::default()
    })
    .await?;
    let (eth, usdc) = (dex.eth.address(), dex.usdc.address());

    let err = dex
        .fixture
        .deploy_pair(&dex.deployer, eth, usdc, &dex.router, &dex.factory)
        .await
        .expect_err("first read after create_pair should see an unsettled registry");
    match &err {
        FixtureError::PairNotReady { factory, token_a, token_b } => {
            assert_eq!(*factory, dex.factory.address());
            assert_eq!((*token_a).min(*token_b), eth.min(usdc));
        }
        other => panic!("expected PairNotReady, got {other:?}"),
    }

    let pair = dex
        .fixture
        .resolve_pair(&dex.deployer, &dex.router, &dex.factory, eth, usdc)
        .await?;
    assert!(!pair.address().is_zero());

    let registry = dex
        .deployer
        .call(&dex.factory.contract, "get_pair", vec![usdc, eth])
        .await?;
    assert_eq!(registry, vec![pair.address()]);
    Ok(())
}

#[tokio::test]
async fn add_liquidity_scales_each_side_by_its_own_decimals() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let me = dex.deployer.address();
    let pair = dex
        .fixture
        .deploy_pair(&dex.deployer, dex.eth.address(), dex.usdc.address(), &dex.router, &dex.factory)
        .await?;

    dex.fixture.mint_tokens(&dex.deployer, &dex.eth, "100", me).await?;
    dex.fixture.mint_tokens(&dex.deployer, &dex.usdc, "100000", me).await?;
    dex.fixture.approve(&dex.deployer, &dex.eth, "10", dex.router.address()).await?;
    dex.fixture.approve(&dex.deployer, &dex.usdc, "5000", dex.router.address()).await?;

    let tx_hash = dex
        .fixture
        .add_liquidity(&dex.deployer, &dex.router, &dex.eth, &dex.usdc, "10", "5000", deadline_after(600))
        .await?;

    let ten_eth = U256::from(10u64) * U256::exp10(18);
    let five_thousand_usdc = U256::from(5000u64) * U256::exp10(6);
    let (expected0, expected1) = if pair.token0 == dex.eth.address() {
        (ten_eth, five_thousand_usdc)
    } else {
        (five_thousand_usdc, ten_eth)
    };

    let mints = dex.fixture.get_event_data(tx_hash, "Mint").await?;
    assert_eq!(mints.len(), 1);
    let mint = &mints[0];
    assert_eq!(mint[1], dex.router.address());
    assert_eq!(uint_at(mint, 2)?, expected0);
    assert_eq!(uint_at(mint, 4)?, expected1);

    let reserves = dex.deployer.call(&pair.contract, "get_reserves", vec![]).await?;
    assert_eq!(uint_at(&reserves, 0)?, expected0);
    assert_eq!(uint_at(&reserves, 2)?, expected1);

    let shares = dex.fixture.balance_of(&dex.deployer, &pair.contract, me).await?;
    let locked = U256::from(MINIMUM_LIQUIDITY);
    assert_eq!(shares + locked, (ten_eth * five_thousand_usdc).integer_sqrt());
    assert_eq!(dex.fixture.balance_of(&dex.deployer, &pair.contract, BURN_ADDRESS).await?, locked);

    let remaining = dex.fixture.balance_of(&dex.deployer, &dex.eth.contract, me).await?;
    assert_eq!(remaining, U256::from(90u64) * U256::exp10(18));
    Ok(())
}

#[tokio::test]
async fn receipt_events_are_filtered_by_name_in_emission_order() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let me = dex.deployer.address();
    let pair = dex
        .fixture
        .deploy_pair(&dex.deployer, dex.eth.address(), dex.usdc.address(), &dex.router, &dex.factory)
        .await?;
    dex.fixture.mint_tokens(&dex.deployer, &dex.eth, "1", me).await?;
    dex.fixture.mint_tokens(&dex.deployer, &dex.usdc, "1", me).await?;
    dex.fixture.approve(&dex.deployer, &dex.eth, "1", dex.router.address()).await?;
    dex.fixture.approve(&dex.deployer, &dex.usdc, "1", dex.router.address()).await?;

    let tx_hash = dex
        .fixture
        .add_liquidity(&dex.deployer, &dex.router, &dex.eth, &dex.usdc, "1", "1", deadline_after(600))
        .await?;

    let transfers = dex.fixture.get_event_data(tx_hash, "Transfer").await?;
    assert_eq!(transfers.len(), 4);
    // Both deposits into the pair, then the locked minimum, then the depositor's shares.
    assert_eq!(&transfers[0][1..3], &[me, pair.address()]);
    assert_eq!(&transfers[1][1..3], &[me, pair.address()]);
    assert_eq!(&transfers[2][1..3], &[Felt::ZERO, BURN_ADDRESS]);
    assert_eq!(uint_at(&transfers[2], 3)?, U256::from(MINIMUM_LIQUIDITY));
    assert_eq!(&transfers[3][1..3], &[Felt::ZERO, me]);

    assert_eq!(dex.fixture.get_event_data(tx_hash, "Sync").await?.len(), 1);
    assert!(dex.fixture.get_event_data(tx_hash, "Swap").await?.is_empty());

    let receipt = dex.network.get_transaction_receipt(tx_hash).await?;
    assert_eq!(receipt.events.len(), 6);
    Ok(())
}

#[tokio::test]
async fn collaborator_failures_keep_operation_and_source() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let stranger = dex.network.account(1);

    let err = dex
        .fixture
        .mint_tokens(&stranger, &dex.eth, "1", stranger.address())
        .await
        .expect_err("only the owner may mint");
    match &err {
        FixtureError::Collaborator { operation, context, .. } => {
            assert_eq!(*operation, "mint");
            assert!(context.contains(&dex.eth.address().to_string()));
        }
        other => panic!("expected Collaborator, got {other:?}"),
    }
    assert_eq!(revert_reason(&err), Some("ERC20: caller is not the owner"));
    assert!(std::error::Error::source(&err).is_some());

    let late = dex
        .fixture
        .add_liquidity(&dex.deployer, &dex.router, &dex.eth, &dex.usdc, "1", "1", 0)
        .await
        .expect_err("deadline in the past");
    assert_eq!(revert_reason(&late), Some("StarkDRouter: EXPIRED"));

    let bad_amount = dex
        .fixture
        .approve(&dex.deployer, &dex.eth, "1.2.3", dex.router.address())
        .await
        .expect_err("malformed amount");
    assert!(matches!(bad_amount, FixtureError::InvalidAmount { .. }));
    Ok(())
}

#[tokio::test]
async fn creating_an_existing_pair_reverts() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let (eth, usdc) = (dex.eth.address(), dex.usdc.address());
    dex.fixture
        .deploy_pair(&dex.deployer, eth, usdc, &dex.router, &dex.factory)
        .await?;

    let err = dex
        .fixture
        .deploy_pair(&dex.deployer, usdc, eth, &dex.router, &dex.factory)
        .await
        .expect_err("pair already exists");
    assert!(matches!(err, FixtureError::Collaborator { operation: "create_pair", .. }));
    assert_eq!(revert_reason(&err), Some("StarkDFactory: PAIR_EXISTS"));

    let count = dex
        .deployer
        .call(&dex.factory.contract, "all_pairs_length", vec![])
        .await?;
    assert_eq!(count, vec![word(1)]);
    Ok(())
}

#[tokio::test]
async fn fee_estimates_do_not_change_state() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let me = dex.deployer.address();
    let block = dex.network.block_number();

    let amount = encode_uint(U256::exp10(18))?;
    let mut calldata = vec![me];
    calldata.extend(amount.to_calldata());
    let estimate = dex
        .fixture
        .estimate_fee(&dex.deployer, &dex.eth.contract, "mint", calldata)
        .await?;

    assert_eq!(estimate.gas_usage, 3_300);
    assert_eq!(estimate.overall_fee, estimate.gas_price * U256::from(estimate.gas_usage));
    assert_eq!(estimate.unit, "WEI");
    assert_eq!(dex.network.block_number(), block);
    assert!(dex.fixture.balance_of(&dex.deployer, &dex.eth.contract, me).await?.is_zero());

    let supply = dex.deployer.call(&dex.eth.contract, "total_supply", vec![]).await?;
    let pair = Uint128Pair::from_calldata(supply[0], supply[1])?;
    assert_eq!(decode_uint(pair)?, 0);
    Ok(())
}

#[tokio::test]
async fn memory_sink_captures_each_operation() -> Result<()> {
    init_test_tracing();
    let network = Arc::new(LocalNetwork::new(SimulatorConfig::default()));
    let deployer = network.account(0);
    let sink = Arc::new(MemorySink::new());
    let fixture = Fixture::new(Arc::clone(&network), FixtureConfig::default()).with_sink(sink.clone());

    let token = fixture.deploy_token(&deployer, "Ether", "ETH").await?;
    let _ = fixture
        .mint_tokens(&network.account(2), &token, "1", deployer.address())
        .await;

    assert_eq!(sink.operations(), vec!["deploy_token", "mint_tokens"]);
    let records = sink.records();
    assert!(records[0].is_ok());
    assert_eq!(records[0].params["symbol"], "ETH");
    assert_eq!(records[0].params["decimals"], 18);
    assert!(!records[1].is_ok());
    assert_eq!(records[1].params["amount"], "1");

    sink.clear();
    assert!(sink.records().is_empty());
    Ok(())
}

/// Delegates to a local account, counting `decimals` reads on the way.
struct CountingAccount {
    inner: LocalAccount,
    decimals_reads: AtomicUsize,
}

impl CountingAccount {
    fn new(inner: LocalAccount) -> Self {
        Self {
            inner,
            decimals_reads: AtomicUsize::new(0),
        }
    }

    fn decimals_reads(&self) -> usize {
        self.decimals_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Account for CountingAccount {
    fn address(&self) -> Felt {
        self.inner.address()
    }

    async fn call(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<Vec<Felt>, NetworkError> {
        if function == "decimals" {
            self.decimals_reads.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.call(contract, function, calldata).await
    }

    async fn invoke(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<TxHash, NetworkError> {
        self.inner.invoke(contract, function, calldata).await
    }

    async fn estimate_fee(
        &self,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<FeeEstimate, NetworkError> {
        self.inner.estimate_fee(contract, function, calldata).await
    }
}

#[tokio::test]
async fn decimals_are_read_before_every_conversion() -> Result<()> {
    let dex = deploy_dex(SimulatorConfig::default()).await?;
    let owner = CountingAccount::new(dex.deployer.clone());
    let me = owner.address();
    dex.fixture
        .deploy_pair(&owner, dex.eth.address(), dex.usdc.address(), &dex.router, &dex.factory)
        .await?;
    assert_eq!(owner.decimals_reads(), 0);

    dex.fixture.mint_tokens(&owner, &dex.eth, "10", me).await?;
    assert_eq!(owner.decimals_reads(), 1);
    dex.fixture.mint_tokens(&owner, &dex.eth, "10", me).await?;
    assert_eq!(owner.decimals_reads(), 2);
    dex.fixture.mint_tokens(&owner, &dex.usdc, "5000", me).await?;
    dex.fixture.approve(&owner, &dex.eth, "10", dex.router.address()).await?;
    dex.fixture.approve(&owner, &dex.usdc, "5000", dex.router.address()).await?;
    assert_eq!(owner.decimals_reads(), 5);

    dex.fixture
        .add_liquidity(&owner, &dex.router, &dex.eth, &dex.usdc, "10", "5000", deadline_after(600))
        .await?;
    assert_eq!(owner.decimals_reads(), 7);
    Ok(())
}

#[test]
fn demo_binary_seeds_a_pool() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_starkd_fixtures"))
        .env("RUST_LOG", "warn")
        .output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "demo failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // sqrt(10e18 * 5000e6) minus the locked minimum, at 18 decimals.
    assert!(stdout.contains("LP shares : 0.000223606797748978"), "{stdout}");
    Ok(())
}
