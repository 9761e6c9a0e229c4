use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Collapses a burst of updates into one settle point.
///
/// Every `touch` pushes the deadline out by `window`; `settled` resolves once
/// the deadline passes without another touch. Meant to be polled from a
/// `tokio::select!` loop owned by a single task.
#[derive(Debug)]
pub struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Waits for the armed deadline, then disarms. Pends forever when idle.
    /// Cancellation safe: dropping the future leaves the deadline armed.
    pub async fn settled(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
