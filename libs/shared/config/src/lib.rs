use std::env;
use std::time::Duration;

use chrono::NaiveTime;
use tracing::warn;

pub const MAX_BOOKING_HORIZON_DAYS: i64 = 365;

pub const DEFAULT_TIME_SLOTS: [&str; 6] = ["09:00", "10:00", "11:00", "14:00", "15:00", "16:00"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub storage_backend: StorageBackend,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub admin_ids: Vec<i64>,
    pub broadcast_delay: Duration,
    pub booking_horizon_days: i64,
    pub offered_time_slots: Vec<String>,
    pub default_language: String,
    pub service_name: String,
    pub service_phone: String,
    pub support_contact: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            storage_backend: StorageBackend::Memory,
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            admin_ids: Vec::new(),
            broadcast_delay: Duration::from_millis(100),
            booking_horizon_days: 7,
            offered_time_slots: DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
            default_language: "en".to_string(),
            service_name: "Doctomed Call Service".to_string(),
            service_phone: "0900 0900 90".to_string(),
            support_contact: "support@doctomed.ch".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let supabase_url = env::var("SUPABASE_URL").unwrap_or_else(|_| {
            warn!("SUPABASE_URL not set, using empty value");
            String::new()
        });

        let storage_backend = match env::var("STORAGE_BACKEND").ok().as_deref() {
            Some("memory") => StorageBackend::Memory,
            Some("supabase") => StorageBackend::Supabase,
            Some(other) => {
                warn!("Unknown STORAGE_BACKEND '{}', falling back to supabase", other);
                StorageBackend::Supabase
            }
            None if supabase_url.is_empty() => {
                warn!("STORAGE_BACKEND not set and no SUPABASE_URL, using in-memory storage");
                StorageBackend::Memory
            }
            None => StorageBackend::Supabase,
        };

        let config = Self {
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_else(|_| {
                warn!("TELEGRAM_BOT_TOKEN not set, using empty value");
                String::new()
            }),
            storage_backend,
            supabase_url,
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY").unwrap_or_else(|_| {
                warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                String::new()
            }),
            admin_ids: env::var("ADMIN_IDS")
                .map(|raw| parse_admin_ids(&raw))
                .unwrap_or_default(),
            broadcast_delay: env::var("BROADCAST_DELAY_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.broadcast_delay),
            booking_horizon_days: env::var("BOOKING_HORIZON_DAYS")
                .ok()
                .and_then(|v| parse_horizon_days(&v))
                .unwrap_or(defaults.booking_horizon_days),
            offered_time_slots: env::var("OFFERED_TIME_SLOTS")
                .map(|raw| parse_time_slots(&raw))
                .ok()
                .filter(|slots| !slots.is_empty())
                .unwrap_or(defaults.offered_time_slots),
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or(defaults.default_language),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            service_phone: env::var("SERVICE_PHONE").unwrap_or(defaults.service_phone),
            support_contact: env::var("SUPPORT_CONTACT").unwrap_or(defaults.support_contact),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.telegram_bot_token.is_empty() && self.is_storage_configured()
    }

    pub fn is_storage_configured(&self) -> bool {
        match self.storage_backend {
            StorageBackend::Memory => true,
            StorageBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
            }
        }
    }

    pub fn is_offered_time(&self, time_slot: &str) -> bool {
        self.offered_time_slots.iter().any(|t| t == time_slot)
    }
}

/// Comma separated Telegram ids; entries that are not integers are skipped.
pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Invalid admin ID in ADMIN_IDS: {}", s);
                None
            }
        })
        .collect()
}

/// Non-negative day count, capped at `MAX_BOOKING_HORIZON_DAYS`.
pub fn parse_horizon_days(raw: &str) -> Option<i64> {
    let days = raw.trim().parse::<i64>().ok().filter(|days| *days >= 0)?;
    if days > MAX_BOOKING_HORIZON_DAYS {
        warn!(
            "BOOKING_HORIZON_DAYS={} exceeds {}, using the maximum",
            days, MAX_BOOKING_HORIZON_DAYS
        );
        return Some(MAX_BOOKING_HORIZON_DAYS);
    }
    Some(days)
}

/// Normalises entries to `HH:MM` and drops anything that is not a clock time.
pub fn parse_time_slots(raw: &str) -> Vec<String> {
    let mut slots: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match NaiveTime::parse_from_str(s, "%H:%M") {
            Ok(time) => Some(time.format("%H:%M").to_string()),
            Err(_) => {
                warn!("Invalid time slot in OFFERED_TIME_SLOTS: {}", s);
                None
            }
        })
        .collect();
    slots.sort();
    slots.dedup();
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_ids_skip_garbage() {
        assert_eq!(parse_admin_ids("12, abc,34,,"), vec![12, 34]);
    }

    #[test]
    fn time_slots_are_normalised_and_sorted() {
        assert_eq!(
            parse_time_slots("14:00,9:00,nope,14:00"),
            vec!["09:00".to_string(), "14:00".to_string()]
        );
    }

    #[test]
    fn horizon_days_are_capped() {
        assert_eq!(parse_horizon_days("14"), Some(14));
        assert_eq!(parse_horizon_days("-1"), None);
        assert_eq!(parse_horizon_days("9223372036854775807"), Some(MAX_BOOKING_HORIZON_DAYS));
    }

    #[test]
    fn default_catalog_matches_service_hours() {
        let config = AppConfig::default();
        assert!(config.is_offered_time("09:00"));
        assert!(config.is_offered_time("16:00"));
        assert!(!config.is_offered_time("12:00"));
        assert_eq!(config.booking_horizon_days, 7);
    }
}
