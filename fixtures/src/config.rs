// fixtures/src/config.rs

use dotenv::dotenv;
use eyre::{eyre, Result, WrapErr};
use std::{env, future::Future, time::Duration};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

use crate::{felt::Felt, network::ContractArtifact, DEFAULT_DEPLOY_SALT, TIMEOUT, TOKEN_DECIMALS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub token: ContractArtifact,
    pub pair: ContractArtifact,
    pub factory: ContractArtifact,
    pub router: ContractArtifact,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            token: ContractArtifact::new("contracts/token/ERC20.cairo"),
            pair: ContractArtifact::new("contracts/dex/StarkDPair.cairo"),
            factory: ContractArtifact::new("contracts/dex/StarkDFactory.cairo"),
            router: ContractArtifact::new("contracts/dex/StarkDRouter.cairo"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    /// Budget for a whole test, applied by [`with_timeout`].
    pub timeout: Duration,
    pub deploy_salt: Felt,
    pub token_decimals: u8,
    pub artifacts: ArtifactPaths,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            timeout: TIMEOUT,
            deploy_salt: DEFAULT_DEPLOY_SALT,
            token_decimals: TOKEN_DECIMALS,
            artifacts: ArtifactPaths::default(),
        }
    }
}

/// Loads configuration from the process environment (and `.env`, if present).
/// Every variable is optional; unset ones keep their defaults.
pub fn load_config() -> Result<FixtureConfig> {
    dotenv().ok();
    let config = config_from_lookup(|name| env::var(name).ok())?;
    info!(timeout_ms = config.timeout.as_millis() as u64, salt = %config.deploy_salt, "Fixture configuration loaded");
    Ok(config)
}

/// Builds a configuration from an arbitrary variable source.
pub fn config_from_lookup<F>(lookup: F) -> Result<FixtureConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    let parse_u64 = |name: &str| -> Result<Option<u64>> {
        var(name)
            .map(|s| s.trim().parse::<u64>().wrap_err_with(|| format!("{name} must be an unsigned integer, got {s:?}")))
            .transpose()
    };
    let parse_u8 = |name: &str| -> Result<Option<u8>> {
        var(name)
            .map(|s| s.trim().parse::<u8>().wrap_err_with(|| format!("{name} must be in 0..=255, got {s:?}")))
            .transpose()
    };

    let mut config = FixtureConfig::default();

    if let Some(ms) = parse_u64("FIXTURE_TIMEOUT_MS")? {
        config.timeout = Duration::from_millis(ms);
    }
    if let Some(salt) = var("FIXTURE_DEPLOY_SALT") {
        config.deploy_salt = salt
            .parse::<Felt>()
            .map_err(|e| eyre!(e))
            .wrap_err("FIXTURE_DEPLOY_SALT must be a felt (hex or decimal)")?;
    }
    if let Some(decimals) = parse_u8("FIXTURE_TOKEN_DECIMALS")? {
        config.token_decimals = decimals;
    }
    if let Some(path) = var("TOKEN_ARTIFACT") {
        config.artifacts.token = ContractArtifact::new(path);
    }
    if let Some(path) = var("PAIR_ARTIFACT") {
        config.artifacts.pair = ContractArtifact::new(path);
    }
    if let Some(path) = var("FACTORY_ARTIFACT") {
        config.artifacts.factory = ContractArtifact::new(path);
    }
    if let Some(path) = var("ROUTER_ARTIFACT") {
        config.artifacts.router = ContractArtifact::new(path);
    }

    Ok(config)
}

/// Runs a whole test body under the configured budget.
pub async fn with_timeout<F, T>(config: &FixtureConfig, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(config.timeout, body)
        .await
        .map_err(|_| eyre!("test exceeded its {}ms budget", config.timeout.as_millis()))?
}

/// Installs a fmt subscriber filtered by `RUST_LOG` (INFO when unset).
pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Same as [`init_tracing`], but writes through the test harness's captured output.
pub fn init_test_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, FixtureConfig::default());
        assert_eq!(config.timeout, Duration::from_millis(900_000));
        assert_eq!(config.deploy_salt, Felt::from(0x42u64));
        assert_eq!(config.artifacts.pair.name(), "StarkDPair");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = config_from_lookup(lookup_from(&[
            ("FIXTURE_TIMEOUT_MS", "1500"),
            ("FIXTURE_DEPLOY_SALT", "0x99"),
            ("FIXTURE_TOKEN_DECIMALS", "6"),
            ("ROUTER_ARTIFACT", "build/Router.cairo"),
            ("PAIR_ARTIFACT", "  "),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.deploy_salt, Felt::from(0x99u64));
        assert_eq!(config.token_decimals, 6);
        assert_eq!(config.artifacts.router.path(), "build/Router.cairo");
        assert_eq!(config.artifacts.pair, ArtifactPaths::default().pair);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(config_from_lookup(lookup_from(&[("FIXTURE_TIMEOUT_MS", "soon")])).is_err());
        assert!(config_from_lookup(lookup_from(&[("FIXTURE_TOKEN_DECIMALS", "300")])).is_err());
        assert!(config_from_lookup(lookup_from(&[("FIXTURE_DEPLOY_SALT", "0xnope")])).is_err());
    }

    #[tokio::test]
    async fn timeout_budget_is_enforced() {
        let config = FixtureConfig {
            timeout: Duration::from_millis(10),
            ..FixtureConfig::default()
        };
        let slow = with_timeout(&config, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(slow.unwrap_err().to_string().contains("10ms budget"));

        let fast = with_timeout(&config, async { Ok(7) }).await.unwrap();
        assert_eq!(fast, 7);
    }
}
