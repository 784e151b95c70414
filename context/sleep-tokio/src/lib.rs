//! Tokio based [`Sleep`] for azstore.
//!
//! The execution engine waits between two attempts through
//! [`Context::sleep`](azstore_core::Context::sleep). Without a timer the
//! context retries immediately, so applications running on tokio should
//! install [`TokioSleep`].
//!
//! ```no_run
//! use azstore_core::{Context, OsEnv};
//! use azstore_sleep_tokio::TokioSleep;
//!
//! let ctx = Context::new().with_sleep(TokioSleep).with_env(OsEnv);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use azstore_core::Sleep;

/// [`Sleep`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await
    }
}
