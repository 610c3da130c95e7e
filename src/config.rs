use crate::constants::{
    DEFAULT_EXPIRATION_UTC_OFFSET, DEFAULT_STS_TIMEOUT_SECS, DEFAULT_STS_URL, env as vars,
};
use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use std::{env, time::Duration};

/// Process-wide settings, validated once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub sts_url: String,
    pub region: Option<String>,
    pub sts_timeout: Duration,
    pub expiration_offset: FixedOffset,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sts_url: DEFAULT_STS_URL.to_string(),
            region: None,
            sts_timeout: Duration::from_secs(DEFAULT_STS_TIMEOUT_SECS),
            expiration_offset: FixedOffset::east_opt(3 * 3600).expect("UTC+3 is in range"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let sts_url = get(vars::STS_URL).unwrap_or_else(|| DEFAULT_STS_URL.to_string());

        let sts_timeout = match get(vars::TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.parse().with_context(|| {
                    format!("{} must be a number of seconds", vars::TIMEOUT_SECS)
                })?;
                if secs == 0 {
                    bail!("{} must be greater than zero", vars::TIMEOUT_SECS);
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_STS_TIMEOUT_SECS),
        };

        let offset = get(vars::EXPIRATION_UTC_OFFSET)
            .unwrap_or_else(|| DEFAULT_EXPIRATION_UTC_OFFSET.to_string());
        let expiration_offset = parse_utc_offset(&offset)
            .with_context(|| format!("Invalid {}", vars::EXPIRATION_UTC_OFFSET))?;

        Ok(Self {
            sts_url,
            region: get(vars::REGION),
            sts_timeout,
            expiration_offset,
        })
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH` into a fixed offset
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("UTC offset must start with '+' or '-': {raw}"),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        bail!("UTC offset contains non-digit characters: {raw}");
    }
    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => bail!("UTC offset must be +HH, +HHMM or +HH:MM: {raw}"),
    };

    let hours: i32 = hours.parse()?;
    let minutes: i32 = minutes.parse()?;
    if minutes >= 60 {
        bail!("UTC offset minutes out of range: {raw}");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("UTC offset out of range: {raw}"))
}
