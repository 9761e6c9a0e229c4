pub mod cart_service;
pub mod checkout_service;
pub mod favorite_service;
pub mod order_service;

pub use cart_service::CartCoordinator;
pub use checkout_service::{CheckoutCoordinator, PlacementState};
pub use favorite_service::FavoritesCoordinator;
pub use order_service::OrdersProjection;

use futures::{StreamExt, future::ready, stream::BoxStream};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::reminder::{ReminderId, ReminderRequest, ReminderScheduler};

/// Reminders are best-effort: failures are logged, never returned.
pub(crate) async fn schedule_reminder(reminders: &dyn ReminderScheduler, request: ReminderRequest) {
    let id = request.id.clone();
    match reminders.schedule(request).await {
        Ok(scheduled) => tracing::debug!(reminder_id = %scheduled, "reminder scheduled"),
        Err(err) => tracing::warn!(error = %err, reminder_id = %id, "reminder scheduling failed"),
    }
}

pub(crate) async fn cancel_reminder(reminders: &dyn ReminderScheduler, id: &ReminderId) {
    if let Err(err) = reminders.cancel(std::slice::from_ref(id)).await {
        tracing::warn!(error = %err, reminder_id = %id, "reminder cancel failed");
    }
}

/// Resolves once `ready` holds for the coordinator state. Intents that read
/// the repository view call this so they never act on the pre-emission
/// placeholder.
pub(crate) async fn first_emission<S, F>(state: &watch::Sender<S>, ready: F)
where
    F: FnMut(&S) -> bool,
{
    let mut receiver = state.subscribe();
    if receiver.wait_for(ready).await.is_err() {
        tracing::warn!("state channel closed before the first emission");
    }
}

/// Projects a watch channel into a stream of derived values, skipping
/// states for which `project` returns `None` and consecutive duplicates.
pub(crate) fn distinct_stream<S, T, F>(receiver: watch::Receiver<S>, mut project: F) -> BoxStream<'static, T>
where
    S: Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + 'static,
    F: FnMut(&S) -> Option<T> + Send + 'static,
{
    let mut last: Option<T> = None;
    WatchStream::new(receiver)
        .filter_map(move |state| {
            let next = project(&state).filter(|value| last.as_ref() != Some(value));
            if let Some(value) = &next {
                last = Some(value.clone());
            }
            ready(next)
        })
        .boxed()
}
