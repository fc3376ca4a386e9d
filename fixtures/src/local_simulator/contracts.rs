// fixtures/src/local_simulator/contracts.rs
//! Contract behaviour run by the local simulator: an owner-mintable ERC20, the
//! pair factory, the router and a constant-product pair.

use ethers::{types::U256, utils::keccak256};
use std::collections::HashMap;

use crate::{
    error::NetworkError,
    felt::{ClassHash, ContractAddress, Felt},
    network::{ContractArtifact, EventRecord},
    uint::Uint128Pair,
    APPROVAL_EVENT, BURN_ADDRESS, MINIMUM_LIQUIDITY, MINT_EVENT, PAIR_CREATED_EVENT, SYNC_EVENT,
    TRANSFER_EVENT,
};

type ExecResult<T> = Result<T, NetworkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Token,
    Factory,
    Router,
    Pair,
}

impl ContractKind {
    /// Recognises a contract by its artifact's file stem (`ERC20`, `StarkDPair`, ...).
    pub fn from_artifact(artifact: &ContractArtifact) -> ExecResult<Self> {
        let name = artifact.name().to_ascii_lowercase();
        if name.ends_with("pair") {
            Ok(ContractKind::Pair)
        } else if name.ends_with("factory") {
            Ok(ContractKind::Factory)
        } else if name.ends_with("router") {
            Ok(ContractKind::Router)
        } else if name.contains("erc20") || name.ends_with("token") {
            Ok(ContractKind::Token)
        } else {
            Err(NetworkError::UnknownArtifact(artifact.path().to_string()))
        }
    }
}

pub fn class_hash(artifact: &ContractArtifact) -> ClassHash {
    Felt::from_hash_bytes(keccak256(artifact.path().as_bytes()))
}

/// Deterministic address: same deployer, salt, class and constructor calldata give
/// the same address.
pub fn contract_address(
    deployer: ContractAddress,
    salt: Felt,
    class_hash: ClassHash,
    calldata: &[Felt],
) -> ContractAddress {
    let mut preimage = Vec::with_capacity(32 * (3 + calldata.len()));
    for word in [deployer, salt, class_hash].iter().chain(calldata) {
        preimage.extend_from_slice(&word.to_be_bytes());
    }
    Felt::from_hash_bytes(keccak256(preimage))
}

/// Canonical token order shared by the router's `sort_tokens` and the factory's registry.
pub fn sort_tokens(
    contract: ContractAddress,
    function: &str,
    token_a: ContractAddress,
    token_b: ContractAddress,
) -> ExecResult<(ContractAddress, ContractAddress)> {
    if token_a == token_b {
        return Err(revert(contract, function, "IDENTICAL_ADDRESSES"));
    }
    let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    if token0.is_zero() {
        return Err(revert(contract, function, "ZERO_ADDRESS"));
    }
    Ok((token0, token1))
}

fn revert(contract: ContractAddress, function: &str, reason: &str) -> NetworkError {
    NetworkError::Reverted {
        contract,
        function: function.to_string(),
        reason: reason.to_string(),
    }
}

fn limbs(value: U256) -> [Felt; 2] {
    Uint128Pair::from_u256(value).to_calldata()
}

fn event(from_address: ContractAddress, name: Felt, words: Vec<Felt>) -> EventRecord {
    let mut data = Vec::with_capacity(words.len() + 1);
    data.push(name);
    data.extend(words);
    EventRecord { from_address, data }
}

fn transfer_event(
    contract: ContractAddress,
    from: ContractAddress,
    to: ContractAddress,
    amount: U256,
) -> EventRecord {
    let mut words = vec![from, to];
    words.extend(limbs(amount));
    event(contract, *TRANSFER_EVENT, words)
}

// --- Calldata ---

struct Args<'a> {
    function: &'a str,
    words: &'a [Felt],
    cursor: usize,
}

impl<'a> Args<'a> {
    fn new(function: &'a str, words: &'a [Felt]) -> Self {
        Self {
            function,
            words,
            cursor: 0,
        }
    }

    fn felt(&mut self) -> ExecResult<Felt> {
        let word = self
            .words
            .get(self.cursor)
            .copied()
            .ok_or_else(|| self.malformed(format!("missing argument #{}", self.cursor)))?;
        self.cursor += 1;
        Ok(word)
    }

    fn uint(&mut self) -> ExecResult<U256> {
        let low = self.felt()?;
        let high = self.felt()?;
        Uint128Pair::from_calldata(low, high)
            .map(|pair| pair.to_u256())
            .map_err(|_| self.malformed("Uint256 limb exceeds 128 bits".to_string()))
    }

    fn u64(&mut self) -> ExecResult<u64> {
        let word = self.felt()?;
        word.to_u64()
            .ok_or_else(|| self.malformed(format!("{word} does not fit in 64 bits")))
    }

    fn finish(&self) -> ExecResult<()> {
        if self.cursor != self.words.len() {
            return Err(self.malformed(format!(
                "expected {} words, got {}",
                self.cursor,
                self.words.len()
            )));
        }
        Ok(())
    }

    fn malformed(&self, reason: String) -> NetworkError {
        NetworkError::Calldata {
            function: self.function.to_string(),
            reason,
        }
    }
}

// --- Contract State ---

#[derive(Debug, Clone, Default)]
struct Ledger {
    total_supply: U256,
    balances: HashMap<ContractAddress, U256>,
}

impl Ledger {
    fn balance(&self, owner: ContractAddress) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn mint(&mut self, to: ContractAddress, amount: U256) -> Result<(), &'static str> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or("total supply overflow")?;
        let balance = self.balance(to).checked_add(amount).ok_or("balance overflow")?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: ContractAddress,
        to: ContractAddress,
        amount: U256,
    ) -> Result<(), &'static str> {
        if to.is_zero() {
            return Err("ERC20: transfer to the zero address");
        }
        let remaining = self
            .balance(from)
            .checked_sub(amount)
            .ok_or("ERC20: transfer amount exceeds balance")?;
        self.balances.insert(from, remaining);
        let credited = self.balance(to).checked_add(amount).ok_or("balance overflow")?;
        self.balances.insert(to, credited);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct TokenState {
    name: Felt,
    symbol: Felt,
    decimals: Felt,
    owner: ContractAddress,
    ledger: Ledger,
    allowances: HashMap<(ContractAddress, ContractAddress), U256>,
}

impl TokenState {
    fn allowance(&self, owner: ContractAddress, spender: ContractAddress) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct FactoryState {
    pair_class_hash: ClassHash,
    fee_to_setter: ContractAddress,
    fee_to: ContractAddress,
    pairs: HashMap<(ContractAddress, ContractAddress), ContractAddress>,
    all_pairs: Vec<ContractAddress>,
}

impl FactoryState {
    /// Registry lookup, insensitive to argument order.
    fn pair_for(&self, token_a: ContractAddress, token_b: ContractAddress) -> Option<ContractAddress> {
        let key = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        self.pairs.get(&key).copied()
    }
}

#[derive(Debug, Clone)]
struct RouterState {
    factory: ContractAddress,
}

#[derive(Debug, Clone)]
struct PairState {
    factory: ContractAddress,
    token0: ContractAddress,
    token1: ContractAddress,
    reserve0: U256,
    reserve1: U256,
    block_timestamp_last: u64,
    ledger: Ledger,
}

#[derive(Debug, Clone)]
enum Contract {
    Token(TokenState),
    Factory(FactoryState),
    Router(RouterState),
    Pair(PairState),
}

impl Contract {
    fn kind(&self) -> ContractKind {
        match self {
            Contract::Token(_) => ContractKind::Token,
            Contract::Factory(_) => ContractKind::Factory,
            Contract::Router(_) => ContractKind::Router,
            Contract::Pair(_) => ContractKind::Pair,
        }
    }

    fn construct(
        kind: ContractKind,
        address: ContractAddress,
        calldata: &[Felt],
    ) -> ExecResult<Self> {
        let mut args = Args::new("constructor", calldata);
        let contract = match kind {
            ContractKind::Token => Contract::Token(TokenState {
                name: args.felt()?,
                symbol: args.felt()?,
                decimals: args.felt()?,
                owner: args.felt()?,
                ledger: Ledger::default(),
                allowances: HashMap::new(),
            }),
            ContractKind::Factory => Contract::Factory(FactoryState {
                pair_class_hash: args.felt()?,
                fee_to_setter: args.felt()?,
                fee_to: Felt::ZERO,
                pairs: HashMap::new(),
                all_pairs: Vec::new(),
            }),
            ContractKind::Router => Contract::Router(RouterState {
                factory: args.felt()?,
            }),
            ContractKind::Pair => {
                return Err(revert(
                    address,
                    "constructor",
                    "StarkDPair: pairs are created by the factory",
                ))
            }
        };
        args.finish()?;
        Ok(contract)
    }
}

/// Everything deployed on the simulated chain. Cloned per transaction so a revert
/// leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    declared: HashMap<ClassHash, ContractKind>,
    contracts: HashMap<ContractAddress, Contract>,
    block_number: u64,
    block_timestamp: u64,
}

macro_rules! state_accessor {
    ($get:ident, $get_mut:ident, $variant:ident, $state:ty, $label:literal) => {
        fn $get(&self, address: ContractAddress) -> ExecResult<&$state> {
            match self.contracts.get(&address) {
                Some(Contract::$variant(state)) => Ok(state),
                Some(_) => Err(revert(address, $label, concat!("contract is not a ", $label))),
                None => Err(NetworkError::ContractNotFound(address)),
            }
        }

        fn $get_mut(&mut self, address: ContractAddress) -> ExecResult<&mut $state> {
            match self.contracts.get_mut(&address) {
                Some(Contract::$variant(state)) => Ok(state),
                Some(_) => Err(revert(address, $label, concat!("contract is not a ", $label))),
                None => Err(NetworkError::ContractNotFound(address)),
            }
        }
    };
}

impl ChainState {
    state_accessor!(token, token_mut, Token, TokenState, "token");
    state_accessor!(factory, factory_mut, Factory, FactoryState, "factory");
    state_accessor!(pair, pair_mut, Pair, PairState, "pair");

    pub fn new(block_timestamp: u64) -> Self {
        Self {
            block_timestamp,
            ..Self::default()
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    /// Opens the block a transaction executes in. Time never runs backwards.
    pub fn begin_block(&mut self, timestamp: u64) {
        self.block_number += 1;
        self.block_timestamp = self.block_timestamp.max(timestamp);
    }

    pub fn declare(&mut self, artifact: &ContractArtifact) -> ExecResult<ClassHash> {
        let kind = ContractKind::from_artifact(artifact)?;
        let hash = class_hash(artifact);
        self.declared.insert(hash, kind);
        Ok(hash)
    }

    pub fn deploy(
        &mut self,
        artifact: &ContractArtifact,
        calldata: &[Felt],
        salt: Felt,
    ) -> ExecResult<ContractAddress> {
        let kind = ContractKind::from_artifact(artifact)?;
        let class = class_hash(artifact);
        let address = contract_address(Felt::ZERO, salt, class, calldata);
        if self.contracts.contains_key(&address) {
            return Err(NetworkError::AlreadyDeployed(address));
        }
        // Nothing is recorded until the constructor has succeeded.
        let contract = Contract::construct(kind, address, calldata)?;
        self.declared.insert(class, kind);
        self.contracts.insert(address, contract);
        Ok(address)
    }

    pub fn execute(
        &mut self,
        caller: ContractAddress,
        contract: ContractAddress,
        function: &str,
        calldata: &[Felt],
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<Vec<Felt>> {
        let kind = self
            .contracts
            .get(&contract)
            .map(Contract::kind)
            .ok_or(NetworkError::ContractNotFound(contract))?;
        let mut args = Args::new(function, calldata);
        let output = match kind {
            ContractKind::Token => self.execute_token(caller, contract, &mut args, events),
            ContractKind::Factory => self.execute_factory(caller, contract, &mut args, events),
            ContractKind::Router => self.execute_router(caller, contract, &mut args, events),
            ContractKind::Pair => self.execute_pair(caller, contract, &mut args, events),
        }?;
        args.finish()?;
        Ok(output)
    }

    // --- ERC20 ---

    fn execute_token(
        &mut self,
        caller: ContractAddress,
        address: ContractAddress,
        args: &mut Args<'_>,
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<Vec<Felt>> {
        let function = args.function;
        let fail = |reason: &str| revert(address, function, reason);
        let token = self.token_mut(address)?;
        match function {
            "name" => Ok(vec![token.name]),
            "symbol" => Ok(vec![token.symbol]),
            "decimals" => Ok(vec![token.decimals]),
            "total_supply" => Ok(limbs(token.ledger.total_supply).to_vec()),
            "balance_of" => {
                let owner = args.felt()?;
                Ok(limbs(token.ledger.balance(owner)).to_vec())
            }
            "allowance" => {
                let owner = args.felt()?;
                let spender = args.felt()?;
                Ok(limbs(token.allowance(owner, spender)).to_vec())
            }
            "mint" => {
                let recipient = args.felt()?;
                let amount = args.uint()?;
                if caller != token.owner {
                    return Err(fail("ERC20: caller is not the owner"));
                }
                if recipient.is_zero() {
                    return Err(fail("ERC20: mint to the zero address"));
                }
                token.ledger.mint(recipient, amount).map_err(fail)?;
                events.push(transfer_event(address, Felt::ZERO, recipient, amount));
                Ok(vec![])
            }
            "approve" => {
                let spender = args.felt()?;
                let amount = args.uint()?;
                if spender.is_zero() {
                    return Err(fail("ERC20: approve to the zero address"));
                }
                token.allowances.insert((caller, spender), amount);
                let mut words = vec![caller, spender];
                words.extend(limbs(amount));
                events.push(event(address, *APPROVAL_EVENT, words));
                Ok(vec![Felt::ONE])
            }
            "transfer" => {
                let recipient = args.felt()?;
                let amount = args.uint()?;
                token.ledger.transfer(caller, recipient, amount).map_err(fail)?;
                events.push(transfer_event(address, caller, recipient, amount));
                Ok(vec![Felt::ONE])
            }
            "transfer_from" => {
                let sender = args.felt()?;
                let recipient = args.felt()?;
                let amount = args.uint()?;
                let allowed = token.allowance(sender, caller);
                if allowed < amount {
                    return Err(fail("ERC20: insufficient allowance"));
                }
                token.allowances.insert((sender, caller), allowed - amount);
                token.ledger.transfer(sender, recipient, amount).map_err(fail)?;
                events.push(transfer_event(address, sender, recipient, amount));
                Ok(vec![Felt::ONE])
            }
            _ => Err(unknown_entry_point(address, function)),
        }
    }

    // --- Factory ---

    fn execute_factory(
        &mut self,
        caller: ContractAddress,
        address: ContractAddress,
        args: &mut Args<'_>,
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<Vec<Felt>> {
        let function = args.function;
        match function {
            "create_pair" => {
                let token_a = args.felt()?;
                let token_b = args.felt()?;
                let pair = self.create_pair(address, token_a, token_b, events)?;
                Ok(vec![pair])
            }
            "get_pair" => {
                let token_a = args.felt()?;
                let token_b = args.felt()?;
                let pair = self.factory(address)?.pair_for(token_a, token_b);
                Ok(vec![pair.unwrap_or(Felt::ZERO)])
            }
            "all_pairs_length" => {
                let count = self.factory(address)?.all_pairs.len() as u64;
                Ok(vec![Felt::from(count)])
            }
            "get_fee_to" => Ok(vec![self.factory(address)?.fee_to]),
            "get_fee_to_setter" => Ok(vec![self.factory(address)?.fee_to_setter]),
            "set_fee_to" => {
                let fee_to = args.felt()?;
                let factory = self.factory_mut(address)?;
                if caller != factory.fee_to_setter {
                    return Err(revert(address, function, "StarkDFactory: FORBIDDEN"));
                }
                factory.fee_to = fee_to;
                Ok(vec![])
            }
            _ => Err(unknown_entry_point(address, function)),
        }
    }

    fn create_pair(
        &mut self,
        factory_address: ContractAddress,
        token_a: ContractAddress,
        token_b: ContractAddress,
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<ContractAddress> {
        let (token0, token1) = sort_tokens(factory_address, "create_pair", token_a, token_b)?;

        let factory = self.factory(factory_address)?;
        if factory.pairs.contains_key(&(token0, token1)) {
            return Err(revert(factory_address, "create_pair", "StarkDFactory: PAIR_EXISTS"));
        }
        let class = factory.pair_class_hash;
        if self.declared.get(&class) != Some(&ContractKind::Pair) {
            return Err(NetworkError::ClassNotDeclared(class.to_hex()));
        }

        let mut salt_preimage = token0.to_be_bytes().to_vec();
        salt_preimage.extend_from_slice(&token1.to_be_bytes());
        let salt = Felt::from_hash_bytes(keccak256(salt_preimage));
        let pair = contract_address(factory_address, salt, class, &[]);

        self.contracts.insert(
            pair,
            Contract::Pair(PairState {
                factory: factory_address,
                token0,
                token1,
                reserve0: U256::zero(),
                reserve1: U256::zero(),
                block_timestamp_last: 0,
                ledger: Ledger::default(),
            }),
        );
        let factory = self.factory_mut(factory_address)?;
        factory.pairs.insert((token0, token1), pair);
        factory.all_pairs.push(pair);
        let count = Felt::from(factory.all_pairs.len() as u64);

        events.push(event(
            factory_address,
            *PAIR_CREATED_EVENT,
            vec![token0, token1, pair, count],
        ));
        Ok(pair)
    }

    // --- Router ---

    fn execute_router(
        &mut self,
        caller: ContractAddress,
        address: ContractAddress,
        args: &mut Args<'_>,
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<Vec<Felt>> {
        let function = args.function;
        let factory = match self.contracts.get(&address) {
            Some(Contract::Router(router)) => router.factory,
            _ => return Err(NetworkError::ContractNotFound(address)),
        };
        match function {
            "factory" => Ok(vec![factory]),
            "sort_tokens" => {
                let token_a = args.felt()?;
                let token_b = args.felt()?;
                let (token0, token1) = sort_tokens(address, function, token_a, token_b)?;
                Ok(vec![token0, token1])
            }
            "add_liquidity" => {
                let token_a = args.felt()?;
                let token_b = args.felt()?;
                let desired_a = args.uint()?;
                let desired_b = args.uint()?;
                let min_a = args.uint()?;
                let min_b = args.uint()?;
                let to = args.felt()?;
                let deadline = args.u64()?;

                if deadline < self.block_timestamp {
                    return Err(revert(address, function, "StarkDRouter: EXPIRED"));
                }

                let pair = match self.factory(factory)?.pair_for(token_a, token_b) {
                    Some(pair) => pair,
                    None => self.create_pair(factory, token_a, token_b, events)?,
                };
                let (reserve_a, reserve_b) = self.reserves_for(pair, token_a)?;
                let (amount_a, amount_b) = optimal_amounts(
                    (desired_a, desired_b),
                    (min_a, min_b),
                    (reserve_a, reserve_b),
                )
                .map_err(|reason| revert(address, function, reason))?;

                let [a_low, a_high] = limbs(amount_a);
                let [b_low, b_high] = limbs(amount_b);
                self.execute(address, token_a, "transfer_from", &[caller, pair, a_low, a_high], events)?;
                self.execute(address, token_b, "transfer_from", &[caller, pair, b_low, b_high], events)?;
                let liquidity = self.execute(address, pair, "mint", &[to], events)?;

                let mut output = vec![a_low, a_high, b_low, b_high];
                output.extend(liquidity);
                Ok(output)
            }
            _ => Err(unknown_entry_point(address, function)),
        }
    }

    /// Reserves ordered as `(reserve of token_a, reserve of the other token)`.
    fn reserves_for(&self, pair: ContractAddress, token_a: ContractAddress) -> ExecResult<(U256, U256)> {
        let state = self.pair(pair)?;
        if token_a == state.token0 {
            Ok((state.reserve0, state.reserve1))
        } else {
            Ok((state.reserve1, state.reserve0))
        }
    }

    // --- Pair ---

    fn execute_pair(
        &mut self,
        caller: ContractAddress,
        address: ContractAddress,
        args: &mut Args<'_>,
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<Vec<Felt>> {
        let function = args.function;
        let pair = self.pair(address)?;
        match function {
            "token0" => Ok(vec![pair.token0]),
            "token1" => Ok(vec![pair.token1]),
            "factory" => Ok(vec![pair.factory]),
            "get_reserves" => {
                let mut words = limbs(pair.reserve0).to_vec();
                words.extend(limbs(pair.reserve1));
                words.push(Felt::from(pair.block_timestamp_last));
                Ok(words)
            }
            "total_supply" => Ok(limbs(pair.ledger.total_supply).to_vec()),
            "balance_of" => {
                let owner = args.felt()?;
                Ok(limbs(pair.ledger.balance(owner)).to_vec())
            }
            "mint" => {
                let to = args.felt()?;
                let liquidity = self.mint_liquidity(caller, address, to, events)?;
                Ok(limbs(liquidity).to_vec())
            }
            _ => Err(unknown_entry_point(address, function)),
        }
    }

    /// Mints pool shares for whatever token balance the pair holds above its reserves.
    fn mint_liquidity(
        &mut self,
        sender: ContractAddress,
        address: ContractAddress,
        to: ContractAddress,
        events: &mut Vec<EventRecord>,
    ) -> ExecResult<U256> {
        let fail = |reason: &str| revert(address, "mint", reason);

        let (token0, token1, reserve0, reserve1, total_supply) = {
            let pair = self.pair(address)?;
            (pair.token0, pair.token1, pair.reserve0, pair.reserve1, pair.ledger.total_supply)
        };
        let balance0 = self.token(token0)?.ledger.balance(address);
        let balance1 = self.token(token1)?.ledger.balance(address);
        let amount0 = balance0
            .checked_sub(reserve0)
            .ok_or_else(|| fail("StarkDPair: reserve exceeds balance"))?;
        let amount1 = balance1
            .checked_sub(reserve1)
            .ok_or_else(|| fail("StarkDPair: reserve exceeds balance"))?;

        let minimum = U256::from(MINIMUM_LIQUIDITY);
        let timestamp = self.block_timestamp;
        let pair = self.pair_mut(address)?;

        let liquidity = if total_supply.is_zero() {
            let root = amount0
                .checked_mul(amount1)
                .ok_or_else(|| fail("StarkDPair: overflow"))?
                .integer_sqrt();
            if root <= minimum {
                return Err(fail("StarkDPair: INSUFFICIENT_LIQUIDITY_MINTED"));
            }
            pair.ledger.mint(BURN_ADDRESS, minimum).map_err(fail)?;
            events.push(transfer_event(address, Felt::ZERO, BURN_ADDRESS, minimum));
            root - minimum
        } else {
            let share = |amount: U256, reserve: U256| {
                amount
                    .checked_mul(total_supply)
                    .and_then(|scaled| scaled.checked_div(reserve))
                    .ok_or_else(|| fail("StarkDPair: overflow"))
            };
            share(amount0, reserve0)?.min(share(amount1, reserve1)?)
        };
        if liquidity.is_zero() {
            return Err(fail("StarkDPair: INSUFFICIENT_LIQUIDITY_MINTED"));
        }

        pair.ledger.mint(to, liquidity).map_err(fail)?;
        pair.reserve0 = balance0;
        pair.reserve1 = balance1;
        pair.block_timestamp_last = timestamp;

        events.push(transfer_event(address, Felt::ZERO, to, liquidity));
        let mut sync = limbs(balance0).to_vec();
        sync.extend(limbs(balance1));
        events.push(event(address, *SYNC_EVENT, sync));
        let mut mint = vec![sender];
        mint.extend(limbs(amount0));
        mint.extend(limbs(amount1));
        events.push(event(address, *MINT_EVENT, mint));

        Ok(liquidity)
    }
}

fn unknown_entry_point(contract: ContractAddress, function: &str) -> NetworkError {
    NetworkError::UnknownEntryPoint {
        contract,
        function: function.to_string(),
    }
}

/// Deposit amounts that keep the pool ratio: all of one side, the matching share of the other.
fn optimal_amounts(
    (desired_a, desired_b): (U256, U256),
    (min_a, min_b): (U256, U256),
    (reserve_a, reserve_b): (U256, U256),
) -> Result<(U256, U256), &'static str> {
    if reserve_a.is_zero() && reserve_b.is_zero() {
        return Ok((desired_a, desired_b));
    }
    let quote = |amount: U256, reserve_in: U256, reserve_out: U256| {
        amount
            .checked_mul(reserve_out)
            .and_then(|scaled| scaled.checked_div(reserve_in))
            .ok_or("StarkDRouter: overflow")
    };
    let optimal_b = quote(desired_a, reserve_a, reserve_b)?;
    if optimal_b <= desired_b {
        if optimal_b < min_b {
            return Err("StarkDRouter: INSUFFICIENT_B_AMOUNT");
        }
        return Ok((desired_a, optimal_b));
    }
    let optimal_a = quote(desired_b, reserve_b, reserve_a)?;
    if optimal_a < min_a {
        return Err("StarkDRouter: INSUFFICIENT_A_AMOUNT");
    }
    Ok((optimal_a.min(desired_a), desired_b))
}
