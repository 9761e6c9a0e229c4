use tokio::task::JoinHandle;

/// Background task owned by a coordinator. Dropping the handle aborts the
/// task, so no callback can reach the coordinator's state afterwards.
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn spawn<F>(name: &'static str, future: F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::debug!(subscription = name, "subscription started");
        Self {
            name,
            handle: tokio::spawn(future),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::debug!(subscription = self.name, "subscription released");
    }
}
