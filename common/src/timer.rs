use std::time::Duration;

/// Async sleep, supplied by the host runtime (tokio, browser timers, tests).
#[allow(async_fn_in_trait)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}
