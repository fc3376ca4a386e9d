// fixtures/src/transaction.rs
//! State-changing helpers (mint, approve, add liquidity) and fee estimation.
//!
//! Every helper submits a fresh transaction; calling one twice with the same
//! arguments submits twice.

use chrono::Utc;
use ethers::types::U256;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::{
    amount::{decimals_from_felt, normalize_amount},
    deploy::{expect_words, Fixture, RouterHandle, TokenHandle},
    error::{CollaboratorContext, Result},
    felt::{ContractAddress, Felt, TxHash},
    network::{Account, ContractHandle, FeeEstimate, Network},
    uint::{encode_uint, Uint128Pair},
};

/// Unix timestamp `seconds` from now, for `add_liquidity` deadlines.
pub fn deadline_after(seconds: u64) -> u64 {
    let now = Utc::now().timestamp().max(0) as u64;
    now.saturating_add(seconds)
}

impl<N: Network> Fixture<N> {
    // --- Reads ---

    /// Queries the token's decimals. Not cached: each conversion asks again.
    pub async fn token_decimals<A>(&self, account: &A, token: &TokenHandle) -> Result<u32>
    where
        A: Account + ?Sized,
    {
        let response = account
            .call(&token.contract, "decimals", vec![])
            .await
            .collaborator("decimals", || format!("token {}", token.address()))?;
        let [decimals] = expect_words::<1>("decimals", &response)?;
        decimals_from_felt(decimals)
    }

    /// `balance_of(owner)` on any ERC20-shaped contract, pair shares included.
    pub async fn balance_of<A>(
        &self,
        account: &A,
        contract: &ContractHandle,
        owner: ContractAddress,
    ) -> Result<U256>
    where
        A: Account + ?Sized,
    {
        let response = account
            .call(contract, "balance_of", vec![owner])
            .await
            .collaborator("balance_of", || format!("contract {} owner {owner}", contract.address))?;
        let [low, high] = expect_words::<2>("balance_of", &response)?;
        Ok(Uint128Pair::from_calldata(low, high)?.to_u256())
    }

    async fn token_amount<A>(&self, account: &A, token: &TokenHandle, amount: &str) -> Result<Uint128Pair>
    where
        A: Account + ?Sized,
    {
        let decimals = self.token_decimals(account, token).await?;
        let value = normalize_amount(amount, decimals)?;
        debug!(token = %token.address(), amount, decimals, %value, "Amount normalized");
        encode_uint(value)
    }

    // --- Transactions ---

    #[instrument(skip(self, caller, token), fields(token = %token.address()))]
    pub async fn mint_tokens<A>(
        &self,
        caller: &A,
        token: &TokenHandle,
        amount: &str,
        recipient: ContractAddress,
    ) -> Result<TxHash>
    where
        A: Account + ?Sized,
    {
        let result = async {
            let value = self.token_amount(caller, token, amount).await?;
            let [low, high] = value.to_calldata();
            caller
                .invoke(&token.contract, "mint", vec![recipient, low, high])
                .await
                .collaborator("mint", || {
                    format!("token {} amount {amount} to {recipient}", token.address())
                })
        }
        .await;
        if let Ok(tx_hash) = &result {
            info!(%tx_hash, amount, %recipient, "Minted tokens");
        }
        self.observe(
            "mint_tokens",
            json!({ "token": token.address(), "amount": amount, "recipient": recipient }),
            &result,
        );
        result
    }

    #[instrument(skip(self, caller, token), fields(token = %token.address()))]
    pub async fn approve<A>(
        &self,
        caller: &A,
        token: &TokenHandle,
        amount: &str,
        spender: ContractAddress,
    ) -> Result<TxHash>
    where
        A: Account + ?Sized,
    {
        let result = async {
            let value = self.token_amount(caller, token, amount).await?;
            let [low, high] = value.to_calldata();
            caller
                .invoke(&token.contract, "approve", vec![spender, low, high])
                .await
                .collaborator("approve", || {
                    format!("token {} amount {amount} for {spender}", token.address())
                })
        }
        .await;
        if let Ok(tx_hash) = &result {
            info!(%tx_hash, amount, %spender, "Approved spender");
        }
        self.observe(
            "approve",
            json!({ "token": token.address(), "amount": amount, "spender": spender }),
            &result,
        );
        result
    }

    /// Deposits `amount0` of `token0` and `amount1` of `token1` through the router.
    ///
    /// Each amount is scaled by its own token's decimals. Minimum amounts are zero,
    /// which is only acceptable in tests. Liquidity goes to `caller`.
    #[instrument(skip(self, caller, router, token0, token1), fields(token0 = %token0.address(), token1 = %token1.address()))]
    pub async fn add_liquidity<A>(
        &self,
        caller: &A,
        router: &RouterHandle,
        token0: &TokenHandle,
        token1: &TokenHandle,
        amount0: &str,
        amount1: &str,
        deadline: u64,
    ) -> Result<TxHash>
    where
        A: Account + ?Sized,
    {
        let result = async {
            let desired0 = self.token_amount(caller, token0, amount0).await?;
            let desired1 = self.token_amount(caller, token1, amount1).await?;

            let mut calldata = vec![token0.address(), token1.address()];
            calldata.extend(desired0.to_calldata());
            calldata.extend(desired1.to_calldata());
            calldata.extend(Uint128Pair::ZERO.to_calldata());
            calldata.extend(Uint128Pair::ZERO.to_calldata());
            calldata.push(caller.address());
            calldata.push(Felt::from(deadline));

            caller
                .invoke(&router.contract, "add_liquidity", calldata)
                .await
                .collaborator("add_liquidity", || {
                    format!(
                        "router {} amounts {amount0} / {amount1} deadline {deadline}",
                        router.address()
                    )
                })
        }
        .await;
        if let Ok(tx_hash) = &result {
            info!(%tx_hash, amount0, amount1, "Liquidity added");
        }
        self.observe(
            "add_liquidity",
            json!({
                "router": router.address(),
                "token0": token0.address(),
                "token1": token1.address(),
                "amount0": amount0,
                "amount1": amount1,
                "deadline": deadline,
            }),
            &result,
        );
        result
    }

    // --- Fees ---

    /// Pure query: asks the account for a fee estimate and returns it untouched.
    #[instrument(skip(self, account, contract, calldata), fields(contract = %contract.address))]
    pub async fn estimate_fee<A>(
        &self,
        account: &A,
        contract: &ContractHandle,
        function: &str,
        calldata: Vec<Felt>,
    ) -> Result<FeeEstimate>
    where
        A: Account + ?Sized,
    {
        let result = account
            .estimate_fee(contract, function, calldata)
            .await
            .collaborator("estimate_fee", || {
                format!("{function} on {}", contract.address)
            });
        if let Ok(estimate) = &result {
            info!(function, overall_fee = %estimate.overall_fee, gas_usage = estimate.gas_usage, "Estimated fee");
        }
        self.observe(
            "estimate_fee",
            json!({ "contract": contract.address, "function": function }),
            &result,
        );
        result
    }
}
