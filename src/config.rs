use crate::domain::{Address, Decimal};
use std::collections::HashMap;
use thiserror::Error;

/// Maximum snapshot age before the store falls back to a REST refresh.
pub const BOOK_MAX_AGE_MS: i64 = 5_000;
/// Cooldown after an HTTP 429 from the trades feed.
pub const RATE_LIMIT_COOLDOWN_MS: u64 = 5_000;
/// How often the expiry sweep runs.
pub const SWEEP_INTERVAL_MS: u64 = 60_000;
/// How many recent target trades each polling cycle requests.
pub const POLL_TRADE_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub target_wallet: Address,
    pub target_bankroll: Decimal,
    pub my_bankroll: Decimal,
    pub sizing_mode: SizingMode,
    pub fixed_stake: Decimal,
    pub copy_sells: bool,
    pub max_slippage_pct: Decimal,
    pub max_price_cap: Decimal,
    pub min_price_cap: Decimal,
    pub poll_interval_ms: u64,
    pub book_expiry_ms: i64,
    pub test_on_startup: bool,
    pub data_api_url: String,
    pub clob_api_url: String,
    pub ws_url: String,
}

/// How a target trade's notional maps onto a simulated stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingMode {
    /// Scale notional by my_bankroll / target_bankroll.
    Ratio,
    /// Spend a fixed stake per copied trade.
    Fixed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let target_wallet = env_map
            .get("TARGET_WALLET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Address::new)
            .ok_or_else(|| ConfigError::MissingEnv("TARGET_WALLET".to_string()))?;

        let target_bankroll = parse_decimal(&env_map, "TARGET_BANKROLL", "30000")?;
        let my_bankroll = parse_decimal(&env_map, "MY_BANKROLL", "1000")?;
        let fixed_stake = parse_decimal(&env_map, "FIXED_STAKE", "10")?;
        let max_slippage_pct = parse_decimal(&env_map, "MAX_SLIPPAGE_PCT", "10")?;
        let max_price_cap = parse_decimal(&env_map, "MAX_PRICE_CAP", "0.99")?;
        let min_price_cap = parse_decimal(&env_map, "MIN_PRICE_CAP", "0.01")?;

        let sizing_mode = match env_map
            .get("SIZING_MODE")
            .map(|s| s.as_str())
            .unwrap_or("ratio")
        {
            "ratio" => SizingMode::Ratio,
            "fixed" => SizingMode::Fixed,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SIZING_MODE".to_string(),
                    format!("must be ratio or fixed, got {}", other),
                ))
            }
        };

        let copy_sells = parse_bool(&env_map, "COPY_SELLS", true)?;
        let test_on_startup = parse_bool(&env_map, "TEST_ON_STARTUP", true)?;

        let poll_interval_ms = env_map
            .get("POLL_INTERVAL_MS")
            .map(|s| s.as_str())
            .unwrap_or("500")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "POLL_INTERVAL_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let book_expiry_ms = env_map
            .get("BOOK_EXPIRY_SECS")
            .map(|s| s.as_str())
            .unwrap_or("900")
            .parse::<i64>()
            .map(|secs| secs * 1000)
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BOOK_EXPIRY_SECS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;

        let data_api_url = env_map
            .get("DATA_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://data-api.polymarket.com".to_string());
        let clob_api_url = env_map
            .get("CLOB_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://clob.polymarket.com".to_string());
        let ws_url = env_map
            .get("WS_URL")
            .cloned()
            .unwrap_or_else(|| "wss://ws-subscriptions-clob.polymarket.com/ws/market".to_string());

        Ok(Config {
            target_wallet,
            target_bankroll,
            my_bankroll,
            sizing_mode,
            fixed_stake,
            copy_sells,
            max_slippage_pct,
            max_price_cap,
            min_price_cap,
            poll_interval_ms,
            book_expiry_ms,
            test_on_startup,
            data_api_url,
            clob_api_url,
            ws_url,
        })
    }

    /// Bankroll ratio applied to copied notionals. Falls back to 1% when
    /// the target bankroll estimate is not positive.
    pub fn ratio(&self) -> Decimal {
        if self.target_bankroll.is_positive() {
            self.my_bankroll / self.target_bankroll
        } else {
            Decimal::from_parts(1, 2)
        }
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string())
    })
}

fn parse_bool(
    env_map: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match env_map.get(key).map(|s| s.as_str()) {
        None => Ok(default),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be true or false, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "TARGET_WALLET".to_string(),
            "0x63CE342161250d705DC0b16df89036c8e5f9ba9a".to_string(),
        );
        map
    }

    #[test]
    fn test_missing_target_wallet() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TARGET_WALLET"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_empty_target_wallet_is_fatal() {
        let mut env_map = HashMap::new();
        env_map.insert("TARGET_WALLET".to_string(), "   ".to_string());
        assert!(matches!(
            Config::from_env_map(env_map),
            Err(ConfigError::MissingEnv(_))
        ));
    }

    #[test]
    fn test_wallet_lowercased() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(
            config.target_wallet.as_str(),
            "0x63ce342161250d705dc0b16df89036c8e5f9ba9a"
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.sizing_mode, SizingMode::Ratio);
        assert!(config.copy_sells);
        assert!(config.test_on_startup);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.book_expiry_ms, 900_000);
        assert_eq!(
            config.max_price_cap,
            Decimal::from_str_canonical("0.99").unwrap()
        );
    }

    #[test]
    fn test_ratio_derivation() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        // 1000 / 30000
        assert_eq!(
            config.ratio(),
            Decimal::from_str_canonical("1000").unwrap()
                / Decimal::from_str_canonical("30000").unwrap()
        );
    }

    #[test]
    fn test_ratio_fallback_when_target_bankroll_zero() {
        let mut env_map = setup_required_env();
        env_map.insert("TARGET_BANKROLL".to_string(), "0".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.ratio(), Decimal::from_parts(1, 2));
    }

    #[test]
    fn test_invalid_sizing_mode() {
        let mut env_map = setup_required_env();
        env_map.insert("SIZING_MODE".to_string(), "martingale".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SIZING_MODE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_bool() {
        let mut env_map = setup_required_env();
        env_map.insert("COPY_SELLS".to_string(), "maybe".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "COPY_SELLS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_poll_interval() {
        let mut env_map = setup_required_env();
        env_map.insert("POLL_INTERVAL_MS".to_string(), "fast".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "POLL_INTERVAL_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
