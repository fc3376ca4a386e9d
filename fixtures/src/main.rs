// fixtures/src/main.rs
// Brings up token, factory, router and pair on the local simulator and seeds the
// pool, printing what each step produced.

use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::info;

use starkd_fixtures::{
    config::{init_tracing, load_config, with_timeout},
    deadline_after, format_amount,
    local_simulator::{LocalNetwork, SimulatorConfig},
    Account, Fixture, FixtureConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = load_config().wrap_err("Failed to load fixture configuration")?;

    with_timeout(&config, run_scenario(config.clone()))
        .await
        .wrap_err("Fixture scenario failed")
}

async fn run_scenario(config: FixtureConfig) -> Result<()> {
    let network = Arc::new(LocalNetwork::new(SimulatorConfig::default()));
    let deployer = network.account(0);
    let fixture = Fixture::new(Arc::clone(&network), config);

    // --- Contracts ---
    let eth = fixture.deploy_token(&deployer, "Ether", "ETH").await?;
    let usdc = fixture
        .deploy_token_with_decimals(&deployer, "USD Coin", "USDC", 6)
        .await?;
    let factory = fixture.deploy_factory(deployer.address()).await?;
    let router = fixture.deploy_router(factory.address()).await?;
    let pair = fixture
        .deploy_pair(&deployer, eth.address(), usdc.address(), &router, &factory)
        .await?;
    info!(pair = %pair.address(), token0 = %pair.token0, token1 = %pair.token1, "Pair ready");

    // --- Liquidity ---
    fixture.mint_tokens(&deployer, &eth, "100", deployer.address()).await?;
    fixture.mint_tokens(&deployer, &usdc, "100000", deployer.address()).await?;
    fixture.approve(&deployer, &eth, "10", router.address()).await?;
    fixture.approve(&deployer, &usdc, "5000", router.address()).await?;
    let tx_hash = fixture
        .add_liquidity(&deployer, &router, &eth, &usdc, "10", "5000", deadline_after(600))
        .await?;

    let mints = fixture.get_event_data(tx_hash, "Mint").await?;
    info!(%tx_hash, mint_events = mints.len(), "Liquidity added");

    let shares = fixture
        .balance_of(&deployer, &pair.contract, deployer.address())
        .await?;
    println!("Pair      : {}", pair.address());
    println!("LP shares : {}", format_amount(shares, 18)?);
    println!("Block     : {}", network.block_number());
    Ok(())
}
