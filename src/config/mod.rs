use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub reservation: ReservationConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_open: u32,
    pub pool_min_idle: u32,
    pub conn_max_lifetime: Duration,
    pub lock_timeout: Duration,
}

/// Retry budget for the Transactional Gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub retry_max: u32,
    pub retry_delay: Duration,
}

/// Reservation timings: hold TTL, booking TTL, reaper sweep interval.
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    pub hold_ttl: Duration,
    pub booking_ttl: Duration,
    pub sweep_interval: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_parse("PORT", 8000u16),
                rust_log: env_or("RUST_LOG", "venue_reserve=debug,tower_http=debug"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_max_open: env_parse("POOL_MAX_OPEN", 25u32),
                pool_min_idle: env_parse("POOL_MAX_IDLE", 5u32),
                conn_max_lifetime: Duration::from_secs(env_parse("CONN_MAX_LIFETIME_SECS", 300u64)),
                lock_timeout: Duration::from_secs(env_parse("LOCK_TIMEOUT_SECS", 10u64)),
            },
            gateway: GatewayConfig {
                retry_max: env_parse("RETRY_MAX", 3u32),
                retry_delay: Duration::from_millis(env_parse("RETRY_DELAY_MS", 100u64)),
            },
            reservation: ReservationConfig {
                hold_ttl: Duration::from_secs(env_parse("HOLD_TTL_SECS", 180u64)),
                booking_ttl: Duration::from_secs(env_parse("BOOKING_TTL_SECS", 900u64)),
                sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", 60u64)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_to_default_on_missing_or_bad_value() {
        assert_eq!(env_parse::<u32>("VENUE_RESERVE_DOES_NOT_EXIST", 7), 7);
    }
}
