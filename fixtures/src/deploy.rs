// fixtures/src/deploy.rs
//! The `Fixture` entry point and contract deployment: tokens, factory, router and
//! canonically resolved pairs.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::FixtureConfig,
    error::{CollaboratorContext, FixtureError, Result},
    felt::{short_string_to_felt, ContractAddress, Felt},
    network::{Account, ContractArtifact, ContractFactory, ContractHandle, Network},
    trace::{LogSink, TraceRecord, TraceSink},
};

macro_rules! contract_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct $name {
            pub contract: ContractHandle,
        }

        impl $name {
            pub fn address(&self) -> ContractAddress {
                self.contract.address
            }
        }
    };
}

contract_handle!(
    /// A deployed ERC20. Decimals are read from the contract on every use, never cached.
    TokenHandle
);
contract_handle!(FactoryHandle);
contract_handle!(RouterHandle);

/// A pair bound to the address the factory registry reported, with its tokens in
/// canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairHandle {
    pub contract: ContractHandle,
    pub token0: ContractAddress,
    pub token1: ContractAddress,
}

impl PairHandle {
    pub fn address(&self) -> ContractAddress {
        self.contract.address
    }
}

/// Deploys and drives the AMM contracts for one test.
///
/// Holds no state between calls apart from where it reports trace records.
pub struct Fixture<N: Network> {
    network: Arc<N>,
    config: FixtureConfig,
    sink: Arc<dyn TraceSink>,
}

impl<N: Network> Fixture<N> {
    pub fn new(network: Arc<N>, config: FixtureConfig) -> Self {
        Self {
            network,
            config,
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    pub fn contract_factory(&self, artifact: &ContractArtifact) -> ContractFactory<'_, N> {
        ContractFactory::new(self.network.as_ref(), artifact.clone())
    }

    pub(crate) fn observe<T: Serialize>(
        &self,
        operation: &'static str,
        params: Value,
        result: &Result<T>,
    ) {
        self.sink.record(TraceRecord::new(operation, params, result));
    }

    // --- Tokens ---

    /// Deploys an ERC20 with the configured decimals (18 by default), owned by `deployer`.
    pub async fn deploy_token<A>(&self, deployer: &A, name: &str, symbol: &str) -> Result<TokenHandle>
    where
        A: Account + ?Sized,
    {
        self.deploy_token_with_decimals(deployer, name, symbol, self.config.token_decimals)
            .await
    }

    #[instrument(skip(self, deployer), fields(deployer = %deployer.address()))]
    pub async fn deploy_token_with_decimals<A>(
        &self,
        deployer: &A,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<TokenHandle>
    where
        A: Account + ?Sized,
    {
        let result = self
            .deploy_token_contract(deployer.address(), name, symbol, decimals)
            .await;
        self.observe(
            "deploy_token",
            json!({
                "name": name,
                "symbol": symbol,
                "decimals": decimals,
                "recipient": deployer.address(),
            }),
            &result,
        );
        result
    }

    async fn deploy_token_contract(
        &self,
        recipient: ContractAddress,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<TokenHandle> {
        let calldata = vec![
            short_string_to_felt(name)?,
            short_string_to_felt(symbol)?,
            Felt::from(decimals),
            recipient,
        ];
        let contract = self
            .contract_factory(&self.config.artifacts.token)
            .deploy(calldata, self.config.deploy_salt)
            .await
            .collaborator("deploy_token", || format!("{name} ({symbol}), {decimals} decimals"))?;
        info!(token = name, address = %contract.address, "Token deployed");
        Ok(TokenHandle { contract })
    }

    // --- Factory & Router ---

    /// Declares the pair class, then deploys a factory that instantiates it.
    #[instrument(skip(self))]
    pub async fn deploy_factory(&self, fee_to_setter: ContractAddress) -> Result<FactoryHandle> {
        let result = self.declare_pair_and_deploy_factory(fee_to_setter).await;
        self.observe(
            "deploy_factory",
            json!({ "fee_to_setter": fee_to_setter }),
            &result,
        );
        result
    }

    async fn declare_pair_and_deploy_factory(
        &self,
        fee_to_setter: ContractAddress,
    ) -> Result<FactoryHandle> {
        let pair_artifact = &self.config.artifacts.pair;
        let pair_class = self
            .contract_factory(pair_artifact)
            .declare()
            .await
            .collaborator("declare", || format!("pair class {pair_artifact}"))?;
        debug!(class_hash = %pair_class, "Pair class declared");

        let contract = self
            .contract_factory(&self.config.artifacts.factory)
            .deploy(vec![pair_class, fee_to_setter], self.config.deploy_salt)
            .await
            .collaborator("deploy_factory", || format!("fee_to_setter {fee_to_setter}"))?;
        info!(address = %contract.address, "Factory deployed");
        Ok(FactoryHandle { contract })
    }

    #[instrument(skip(self))]
    pub async fn deploy_router(&self, factory_address: ContractAddress) -> Result<RouterHandle> {
        let result = self
            .contract_factory(&self.config.artifacts.router)
            .deploy(vec![factory_address], self.config.deploy_salt)
            .await
            .collaborator("deploy_router", || format!("factory {factory_address}"))
            .map(|contract| RouterHandle { contract });
        if let Ok(router) = &result {
            info!(address = %router.address(), "Router deployed");
        }
        self.observe("deploy_router", json!({ "factory": factory_address }), &result);
        result
    }

    // --- Pairs ---

    /// Asks the router for its canonical ordering of two tokens.
    pub async fn sort_tokens<A>(
        &self,
        account: &A,
        router: &RouterHandle,
        token_a: ContractAddress,
        token_b: ContractAddress,
    ) -> Result<(ContractAddress, ContractAddress)>
    where
        A: Account + ?Sized,
    {
        let result = self.canonical_order(account, router, token_a, token_b).await;
        self.observe(
            "sort_tokens",
            json!({ "token_a": token_a, "token_b": token_b }),
            &result,
        );
        result
    }

    /// Creates the pair for two tokens and returns a handle to it.
    ///
    /// The tokens are ordered by the router first, since the factory keys its registry
    /// by that same order. Creating the pair is a write whose result may not be callable
    /// yet, so the handle is always rebuilt from a fresh `get_pair` read. A zero address
    /// from that read is reported as [`FixtureError::PairNotReady`].
    #[instrument(skip_all, fields(token0 = %token0, token1 = %token1, factory = %factory.address()))]
    pub async fn deploy_pair<A>(
        &self,
        deployer: &A,
        token0: ContractAddress,
        token1: ContractAddress,
        router: &RouterHandle,
        factory: &FactoryHandle,
    ) -> Result<PairHandle>
    where
        A: Account + ?Sized,
    {
        let result = self
            .create_and_resolve_pair(deployer, token0, token1, router, factory)
            .await;
        self.observe(
            "deploy_pair",
            json!({
                "token0": token0,
                "token1": token1,
                "router": router.address(),
                "factory": factory.address(),
            }),
            &result,
        );
        result
    }

    /// Resolves an existing pair without creating it. Use after a `PairNotReady` once
    /// the factory has settled.
    #[instrument(skip_all, fields(token0 = %token0, token1 = %token1, factory = %factory.address()))]
    pub async fn resolve_pair<A>(
        &self,
        account: &A,
        router: &RouterHandle,
        factory: &FactoryHandle,
        token0: ContractAddress,
        token1: ContractAddress,
    ) -> Result<PairHandle>
    where
        A: Account + ?Sized,
    {
        let result = async {
            let (token_a, token_b) = self.canonical_order(account, router, token0, token1).await?;
            self.lookup_pair(account, factory, token_a, token_b).await
        }
        .await;
        self.observe(
            "resolve_pair",
            json!({ "token0": token0, "token1": token1, "factory": factory.address() }),
            &result,
        );
        result
    }

    async fn create_and_resolve_pair<A>(
        &self,
        deployer: &A,
        token0: ContractAddress,
        token1: ContractAddress,
        router: &RouterHandle,
        factory: &FactoryHandle,
    ) -> Result<PairHandle>
    where
        A: Account + ?Sized,
    {
        let (token_a, token_b) = self.canonical_order(deployer, router, token0, token1).await?;

        let tx_hash = deployer
            .invoke(&factory.contract, "create_pair", vec![token_a, token_b])
            .await
            .collaborator("create_pair", || {
                format!("factory {} tokens {token_a} / {token_b}", factory.address())
            })?;
        debug!(%tx_hash, "create_pair submitted");

        self.lookup_pair(deployer, factory, token_a, token_b).await
    }

    async fn canonical_order<A>(
        &self,
        account: &A,
        router: &RouterHandle,
        token_a: ContractAddress,
        token_b: ContractAddress,
    ) -> Result<(ContractAddress, ContractAddress)>
    where
        A: Account + ?Sized,
    {
        let response = account
            .call(&router.contract, "sort_tokens", vec![token_a, token_b])
            .await
            .collaborator("sort_tokens", || format!("tokens {token_a} / {token_b}"))?;
        let [token0, token1] = expect_words::<2>("sort_tokens", &response)?;
        Ok((token0, token1))
    }

    async fn lookup_pair<A>(
        &self,
        account: &A,
        factory: &FactoryHandle,
        token_a: ContractAddress,
        token_b: ContractAddress,
    ) -> Result<PairHandle>
    where
        A: Account + ?Sized,
    {
        let response = account
            .call(&factory.contract, "get_pair", vec![token_a, token_b])
            .await
            .collaborator("get_pair", || {
                format!("factory {} tokens {token_a} / {token_b}", factory.address())
            })?;
        let [pair] = expect_words::<1>("get_pair", &response)?;

        if pair.is_zero() {
            warn!(%token_a, %token_b, "Factory registry does not list the pair yet");
            return Err(FixtureError::PairNotReady {
                factory: factory.address(),
                token_a,
                token_b,
            });
        }

        let contract = self
            .contract_factory(&self.config.artifacts.pair)
            .get_contract_at(pair);
        info!(pair = %pair, "Pair resolved from factory registry");
        Ok(PairHandle {
            contract,
            token0: token_a,
            token1: token_b,
        })
    }
}

/// Takes the first `W` words of a call result.
pub(crate) fn expect_words<const W: usize>(
    operation: &'static str,
    response: &[Felt],
) -> Result<[Felt; W]> {
    response
        .get(..W)
        .and_then(|words| <[Felt; W]>::try_from(words).ok())
        .ok_or_else(|| FixtureError::UnexpectedResponse {
            operation,
            reason: format!("expected {W} words, got {}", response.len()),
        })
}
