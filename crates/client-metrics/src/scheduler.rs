// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic flush timer.
//!
//! The timer is a tokio task ticking on the runtime's clock, so tests can pause time and advance
//! it deterministically. The first tick fires one full period after [`FlushScheduler::start`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::MAX_FLUSH_INTERVAL;

#[derive(Debug)]
pub struct FlushScheduler {
    cancel_token: CancellationToken,
    stopped: AtomicBool,
}

impl FlushScheduler {
    /// Spawns the timer task on `runtime`, calling `on_tick` every `period`.
    pub fn start<F>(runtime: &Handle, period: Duration, on_tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        // Longer periods would overflow the tick deadline.
        let period = if period > MAX_FLUSH_INTERVAL {
            warn!("Flush period {period:?} too long, using {MAX_FLUSH_INTERVAL:?}");
            MAX_FLUSH_INTERVAL
        } else {
            period
        };
        let cancel_token = CancellationToken::new();
        let task_token = cancel_token.clone();

        runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("Flush scheduler started, period={period:?}");
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        debug!("Flush scheduler stopped");
                        break;
                    }
                    _ = interval.tick() => on_tick(),
                }
            }
        });

        Self {
            cancel_token,
            stopped: AtomicBool::new(false),
        }
    }

    /// Cancels the timer. Returns `false` if it was already stopped.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel_token.cancel();
        true
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
