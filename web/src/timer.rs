use std::time::Duration;

use dbank_common::timer::Timer;
use gloo_timers::future::TimeoutFuture;

/// `setTimeout`-backed sleep.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlooTimer;

impl Timer for GlooTimer {
    async fn sleep(&self, duration: Duration) {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).await;
    }
}
