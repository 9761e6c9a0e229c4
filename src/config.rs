use std::{env, path::PathBuf, time::Duration};

use chrono::{NaiveTime, Weekday};

use crate::reminder::ReminderPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderMode {
    /// Every reminder fires after a short fixed delay (manual testing).
    Fast,
    /// Reminders land on wall-clock times.
    Scheduled,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub owner_id: String,
    pub reminder_mode: ReminderMode,
    pub fast_reminder_delay: Duration,
    pub reminder_hour: u32,
    pub coalesce_window: Duration,
    pub draft_storage_path: PathBuf,
    pub pickup_address: String,
    pub currency_symbol: String,
    pub phone_country_code: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            owner_id: "guest".to_string(),
            reminder_mode: ReminderMode::Scheduled,
            fast_reminder_delay: Duration::from_secs(10),
            reminder_hour: 19,
            coalesce_window: Duration::from_millis(200),
            draft_storage_path: PathBuf::from("checkout-drafts.json"),
            pickup_address: "Store pickup point".to_string(),
            currency_symbol: "$".to_string(),
            phone_country_code: "1".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let reminder_mode = match env::var("REMINDER_MODE") {
            Ok(mode) => match mode.to_ascii_lowercase().as_str() {
                "fast" => ReminderMode::Fast,
                "scheduled" => ReminderMode::Scheduled,
                other => anyhow::bail!("unknown REMINDER_MODE {other:?}"),
            },
            Err(_) => defaults.reminder_mode,
        };
        let fast_reminder_delay = env::var("REMINDER_FAST_DELAY_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.fast_reminder_delay);
        let reminder_hour = env::var("REMINDER_HOUR")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|h| *h < 24)
            .unwrap_or(defaults.reminder_hour);
        let coalesce_window = env::var("COALESCE_WINDOW_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.coalesce_window);

        Ok(Self {
            owner_id: env::var("OWNER_ID").unwrap_or(defaults.owner_id),
            reminder_mode,
            fast_reminder_delay,
            reminder_hour,
            coalesce_window,
            draft_storage_path: env::var("DRAFT_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.draft_storage_path),
            pickup_address: env::var("PICKUP_ADDRESS").unwrap_or(defaults.pickup_address),
            currency_symbol: env::var("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            phone_country_code: env::var("PHONE_COUNTRY_CODE")
                .unwrap_or(defaults.phone_country_code),
        })
    }

    fn reminder_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.reminder_hour, 0, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn cart_reminder_policy(&self) -> ReminderPolicy {
        match self.reminder_mode {
            ReminderMode::Fast => ReminderPolicy::After(self.fast_reminder_delay),
            ReminderMode::Scheduled => ReminderPolicy::DaysAheadAt {
                days: 1,
                time: self.reminder_time(),
            },
        }
    }

    pub fn favorites_reminder_policy(&self) -> ReminderPolicy {
        match self.reminder_mode {
            ReminderMode::Fast => ReminderPolicy::After(self.fast_reminder_delay),
            ReminderMode::Scheduled => ReminderPolicy::Weekly {
                weekday: Weekday::Sat,
                time: self.reminder_time(),
            },
        }
    }

    pub fn order_status_reminder_policy(&self) -> ReminderPolicy {
        match self.reminder_mode {
            ReminderMode::Fast => ReminderPolicy::After(self.fast_reminder_delay),
            ReminderMode::Scheduled => ReminderPolicy::After(Duration::from_secs(60 * 60)),
        }
    }
}
