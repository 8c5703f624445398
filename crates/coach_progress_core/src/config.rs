use std::path::PathBuf;

use chrono::Duration;
use secrecy::SecretString;

use crate::ProgressError;

pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 60;
pub const DEFAULT_REPORT_WINDOW_DAYS: u32 = 30;

#[derive(Clone, Debug)]
pub struct Config {
    pub jwt_secret: SecretString,
    pub reset_token_ttl: Duration,
    pub report_window_days: u32,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ProgressError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Reads configuration values through `get` so tests never touch the
    /// process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, ProgressError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let secret = get("COACH_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProgressError::Config("COACH_JWT_SECRET missing".into()))?;

        let ttl_minutes = match get("COACH_RESET_TOKEN_TTL_MINUTES") {
            Some(raw) => parse_positive::<i64>("COACH_RESET_TOKEN_TTL_MINUTES", &raw)?,
            None => DEFAULT_RESET_TOKEN_TTL_MINUTES,
        };
        let report_window_days = match get("COACH_REPORT_WINDOW_DAYS") {
            Some(raw) => parse_positive::<u32>("COACH_REPORT_WINDOW_DAYS", &raw)?,
            None => DEFAULT_REPORT_WINDOW_DAYS,
        };
        let seed_file = get("COACH_SEED_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            jwt_secret: SecretString::new(secret.into()),
            reset_token_ttl: Duration::minutes(ttl_minutes),
            report_window_days,
            seed_file,
        })
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T, ProgressError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ProgressError::Config(format!(
            "{name} must be a positive integer, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn from_env_missing_secret() {
        let get = |k: &str| match k {
            "COACH_REPORT_WINDOW_DAYS" => Some("14".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(ProgressError::Config(_))));
    }

    #[test]
    fn from_env_applies_defaults() {
        let get = |k: &str| match k {
            "COACH_JWT_SECRET" => Some("sekrit".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.jwt_secret.expose_secret(), "sekrit");
        assert_eq!(cfg.reset_token_ttl, Duration::minutes(60));
        assert_eq!(cfg.report_window_days, 30);
        assert!(cfg.seed_file.is_none());
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "COACH_JWT_SECRET" => Some("sekrit".into()),
            "COACH_RESET_TOKEN_TTL_MINUTES" => Some("15".into()),
            "COACH_REPORT_WINDOW_DAYS" => Some("7".into()),
            "COACH_SEED_FILE" => Some("/tmp/seed.json".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.reset_token_ttl, Duration::minutes(15));
        assert_eq!(cfg.report_window_days, 7);
        assert_eq!(cfg.seed_file, Some(PathBuf::from("/tmp/seed.json")));
    }

    #[test]
    fn from_env_rejects_zero_window() {
        let get = |k: &str| match k {
            "COACH_JWT_SECRET" => Some("sekrit".into()),
            "COACH_REPORT_WINDOW_DAYS" => Some("0".into()),
            _ => None,
        };
        assert!(Config::from_env_with(get).is_err());
    }
}
