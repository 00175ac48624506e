use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub port: u16,
    pub rust_log: String,
    pub client_url: String,
    pub ethereum_rpc_url: String,
    pub platform_wallet_address: String,
    /// Platform fee in wei. Defaults to 0.001 ETH.
    pub platform_fee_wei: u128,
    pub require_platform_fee: bool,
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval_ms: u64,
}

const DEFAULT_PLATFORM_WALLET: &str = "0x1234567890123456789012345678901234567890";
const DEFAULT_PLATFORM_FEE_WEI: u128 = 1_000_000_000_000_000;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_expiry_days: parse_env("JWT_EXPIRY_DAYS", 7)?,
            port: parse_env("PORT", 5000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ethereum_rpc_url: std::env::var("ETHEREUM_RPC_URL")
                .unwrap_or_else(|_| "http://localhost:8545".to_string()),
            platform_wallet_address: std::env::var("PLATFORM_WALLET_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_PLATFORM_WALLET.to_string())
                .to_lowercase(),
            platform_fee_wei: parse_env("PLATFORM_FEE_WEI", DEFAULT_PLATFORM_FEE_WEI)?,
            require_platform_fee: parse_env("REQUIRE_PLATFORM_FEE", false)?,
            receipt_poll_attempts: parse_env("RECEIPT_POLL_ATTEMPTS", 20)?,
            receipt_poll_interval_ms: parse_env("RECEIPT_POLL_INTERVAL_MS", 1500)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for router tests. The database URL is never dialed.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/web3job_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_days: 7,
            port: 0,
            rust_log: "debug".to_string(),
            client_url: "http://localhost:3000".to_string(),
            ethereum_rpc_url: "http://localhost:8545".to_string(),
            platform_wallet_address: DEFAULT_PLATFORM_WALLET.to_string(),
            platform_fee_wei: DEFAULT_PLATFORM_FEE_WEI,
            require_platform_fee: false,
            receipt_poll_attempts: 1,
            receipt_poll_interval_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u32 = parse_env("WEB3JOB_UNSET_TEST_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }
}
