//! Reminder port: id-keyed, cancellable local notifications.
//!
//! At most one reminder is pending per id; scheduling again under the same id
//! replaces the earlier one and cancelling an unknown id is a no-op.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Local, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ReminderResult;

pub mod local;

pub use local::{DeliveredReminder, LocalReminderScheduler};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderId(String);

impl ReminderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Pending-cart nudge for one owner.
    pub fn cart(owner_id: &str) -> Self {
        Self(format!("cart-reminder:{owner_id}"))
    }

    /// Favorites-not-in-cart nudge for one owner.
    pub fn favorites(owner_id: &str) -> Self {
        Self(format!("favorites-reminder:{owner_id}"))
    }

    pub fn order_status(order_id: &str) -> Self {
        Self(format!("order-status:{order_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn with_suffix(&self, suffix: impl fmt::Display) -> Self {
        Self(format!("{}:{suffix}", self.0))
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderTrigger {
    After(Duration),
    At(DateTime<Utc>),
    /// Repeats every week at the given local wall-clock time.
    Weekly { weekday: Weekday, time: NaiveTime },
}

impl ReminderTrigger {
    /// Time left until the next firing, measured from `now`.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            ReminderTrigger::After(delay) => *delay,
            ReminderTrigger::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
            ReminderTrigger::Weekly { weekday, time } => {
                let next = next_weekly(&now.with_timezone(&Local), *weekday, *time);
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    pub id: ReminderId,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub payload: Option<serde_json::Value>,
    /// When false the scheduler derives a fresh id so earlier reminders survive.
    pub unique: bool,
    pub trigger: ReminderTrigger,
}

impl ReminderRequest {
    pub fn new(
        id: ReminderId,
        title: impl Into<String>,
        body: impl Into<String>,
        trigger: ReminderTrigger,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            body: body.into(),
            category: None,
            payload: None,
            unique: true,
            trigger,
        }
    }

    pub fn after(
        id: ReminderId,
        delay: Duration,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::new(id, title, body, ReminderTrigger::After(delay))
    }

    pub fn at(
        id: ReminderId,
        at: DateTime<Utc>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::new(id, title, body, ReminderTrigger::At(at))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    /// Schedules the request and returns the id it was stored under.
    async fn schedule(&self, request: ReminderRequest) -> ReminderResult<ReminderId>;
    async fn cancel(&self, ids: &[ReminderId]) -> ReminderResult<()>;
}

/// When a reminder should fire, resolved at scheduling time.
///
/// Replaces the "short delay in debug builds, wall-clock date in release"
/// branching with one configurable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderPolicy {
    After(Duration),
    DaysAheadAt { days: u32, time: NaiveTime },
    Weekly { weekday: Weekday, time: NaiveTime },
}

impl ReminderPolicy {
    pub fn trigger<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> ReminderTrigger {
        match self {
            ReminderPolicy::After(delay) => ReminderTrigger::After(*delay),
            ReminderPolicy::DaysAheadAt { days, time } => {
                ReminderTrigger::At(wall_clock_after(now, *days, *time))
            }
            ReminderPolicy::Weekly { weekday, time } => ReminderTrigger::Weekly {
                weekday: *weekday,
                time: *time,
            },
        }
    }

    pub fn trigger_now(&self) -> ReminderTrigger {
        self.trigger(&Local::now())
    }
}

/// `time` on the date `days` after `now`, in `now`'s time zone.
pub fn wall_clock_after<Tz: TimeZone>(now: &DateTime<Tz>, days: u32, time: NaiveTime) -> DateTime<Utc> {
    let date = now.date_naive() + Days::new(u64::from(days));
    let naive = date.and_time(time);
    now.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // skipped by a DST jump
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Next occurrence of `weekday` at `time` strictly after `now`.
pub fn next_weekly<Tz: TimeZone>(now: &DateTime<Tz>, weekday: Weekday, time: NaiveTime) -> DateTime<Utc> {
    let today = now.weekday().num_days_from_monday();
    let target = weekday.num_days_from_monday();
    let mut days = (target + 7 - today) % 7;
    if days == 0 && now.time() >= time {
        days = 7;
    }
    wall_clock_after(now, days, time)
}
