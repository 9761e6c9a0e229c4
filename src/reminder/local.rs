use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use super::{ReminderId, ReminderRequest, ReminderScheduler, ReminderTrigger};
use crate::error::{ReminderError, ReminderResult};

#[derive(Debug, Clone)]
pub struct DeliveredReminder {
    pub request: ReminderRequest,
    pub delivered_at: DateTime<Utc>,
}

struct PendingReminder {
    generation: u64,
    request: ReminderRequest,
    task: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<ReminderId, PendingReminder>>>;

/// In-process scheduler: one tokio timer per pending id. Fired reminders are
/// published on the channel returned by [`LocalReminderScheduler::new`].
pub struct LocalReminderScheduler {
    pending: PendingMap,
    deliveries: mpsc::UnboundedSender<DeliveredReminder>,
    generation: AtomicU64,
}

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<ReminderId, PendingReminder>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LocalReminderScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveredReminder>) {
        let (deliveries, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            deliveries,
            generation: AtomicU64::new(0),
        };
        (scheduler, receiver)
    }

    pub fn pending_ids(&self) -> Vec<ReminderId> {
        let mut ids: Vec<ReminderId> = lock(&self.pending).keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn pending(&self, id: &ReminderId) -> Option<ReminderRequest> {
        lock(&self.pending).get(id).map(|p| p.request.clone())
    }
}

#[async_trait]
impl ReminderScheduler for LocalReminderScheduler {
    async fn schedule(&self, mut request: ReminderRequest) -> ReminderResult<ReminderId> {
        if let ReminderTrigger::At(at) = request.trigger {
            if at <= Utc::now() {
                return Err(ReminderError::TriggerInPast);
            }
        }
        if !request.unique {
            request.id = request.id.with_suffix(Uuid::new_v4());
        }

        let id = request.id.clone();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut pending = lock(&self.pending);
        let task = tokio::spawn(run_reminder(
            self.pending.clone(),
            self.deliveries.clone(),
            request.clone(),
            generation,
        ));
        let replaced = pending.insert(
            id.clone(),
            PendingReminder {
                generation,
                request,
                task,
            },
        );
        if let Some(previous) = replaced {
            previous.task.abort();
            tracing::debug!(reminder_id = %id, "pending reminder replaced");
        } else {
            tracing::debug!(reminder_id = %id, "reminder scheduled");
        }
        Ok(id)
    }

    async fn cancel(&self, ids: &[ReminderId]) -> ReminderResult<()> {
        let mut pending = lock(&self.pending);
        for id in ids {
            if let Some(reminder) = pending.remove(id) {
                reminder.task.abort();
                tracing::debug!(reminder_id = %id, "reminder cancelled");
            }
        }
        Ok(())
    }
}

impl Drop for LocalReminderScheduler {
    fn drop(&mut self) {
        for (_, reminder) in lock(&self.pending).drain() {
            reminder.task.abort();
        }
    }
}

async fn run_reminder(
    pending: PendingMap,
    deliveries: mpsc::UnboundedSender<DeliveredReminder>,
    request: ReminderRequest,
    generation: u64,
) {
    loop {
        tokio::time::sleep(request.trigger.delay_from(Utc::now())).await;

        tracing::info!(reminder_id = %request.id, title = %request.title, "reminder delivered");
        let delivered = DeliveredReminder {
            request: request.clone(),
            delivered_at: Utc::now(),
        };
        if deliveries.send(delivered).is_err() {
            tracing::debug!(reminder_id = %request.id, "no reminder listener");
        }

        if !matches!(request.trigger, ReminderTrigger::Weekly { .. }) {
            break;
        }
    }

    let mut pending = lock(&pending);
    if pending
        .get(&request.id)
        .is_some_and(|p| p.generation == generation)
    {
        pending.remove(&request.id);
    }
}
