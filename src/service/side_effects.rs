// service/side_effects.rs
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::db::{addb::AdExt, db::DBClient, listingdb::ListingExt, notificationdb::NotificationExt};

/// Best-effort work that must not fail or slow down the request that caused it.
#[derive(Debug, Clone)]
pub enum SideEffect {
    Notify {
        user_id: Uuid,
        kind: String,
        message: String,
        metadata: Option<JsonValue>,
    },
    ListingViewed {
        listing_id: Uuid,
    },
    AdImpressions {
        campaign_ids: Vec<Uuid>,
    },
}

impl SideEffect {
    pub fn notify(user_id: Uuid, kind: &str, message: impl Into<String>, metadata: JsonValue) -> Self {
        SideEffect::Notify {
            user_id,
            kind: kind.to_string(),
            message: message.into(),
            metadata: Some(metadata),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SideEffect::Notify { .. } => "notify",
            SideEffect::ListingViewed { .. } => "listing_viewed",
            SideEffect::AdImpressions { .. } => "ad_impressions",
        }
    }
}

#[async_trait]
pub trait SideEffectHandler: Send + Sync {
    async fn handle(&self, effect: &SideEffect) -> anyhow::Result<()>;
}

#[async_trait]
impl SideEffectHandler for DBClient {
    async fn handle(&self, effect: &SideEffect) -> anyhow::Result<()> {
        match effect {
            SideEffect::Notify {
                user_id,
                kind,
                message,
                metadata,
            } => {
                self.store_notification(*user_id, kind, message, metadata.clone())
                    .await?;
            }
            SideEffect::ListingViewed { listing_id } => {
                self.increment_listing_views(*listing_id).await?;
            }
            SideEffect::AdImpressions { campaign_ids } => {
                if !campaign_ids.is_empty() {
                    self.record_impressions(campaign_ids).await?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SideEffectStats {
    enqueued: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SideEffectCounts {
    pub enqueued: u64,
    pub succeeded: u64,
    pub retried: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl SideEffectStats {
    fn snapshot(&self) -> SideEffectCounts {
        SideEffectCounts {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff capped at `max_delay`, plus up to half a base delay of jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay);
        let jitter_ms = (self.base_delay.as_millis() / 2) as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        backoff + Duration::from_millis(jitter)
    }
}

/// Producer side, cloned into the application state.
#[derive(Clone)]
pub struct SideEffectQueue {
    sender: mpsc::UnboundedSender<SideEffect>,
    stats: Arc<SideEffectStats>,
}

impl std::fmt::Debug for SideEffectQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffectQueue")
            .field("counts", &self.counts())
            .finish()
    }
}

impl SideEffectQueue {
    pub fn enqueue(&self, effect: SideEffect) {
        let label = effect.label();
        match self.sender.send(effect) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Side-effect worker is gone, dropping {} job", label);
            }
        }
    }

    pub fn counts(&self) -> SideEffectCounts {
        self.stats.snapshot()
    }
}

pub struct SideEffectWorker {
    receiver: mpsc::UnboundedReceiver<SideEffect>,
    handler: Arc<dyn SideEffectHandler>,
    stats: Arc<SideEffectStats>,
    policy: RetryPolicy,
}

pub fn side_effect_channel(
    handler: Arc<dyn SideEffectHandler>,
    policy: RetryPolicy,
) -> (SideEffectQueue, SideEffectWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let stats = Arc::new(SideEffectStats::default());

    (
        SideEffectQueue {
            sender,
            stats: stats.clone(),
        },
        SideEffectWorker {
            receiver,
            handler,
            stats,
            policy,
        },
    )
}

impl SideEffectWorker {
    /// Drains the queue until every producer has been dropped.
    pub async fn run(mut self) {
        tracing::info!("Side-effect worker started");

        while let Some(effect) = self.receiver.recv().await {
            self.process(effect).await;
        }

        tracing::info!("Side-effect worker stopped");
    }

    async fn process(&self, effect: SideEffect) {
        let mut retry = 0;

        loop {
            match self.handler.handle(&effect).await {
                Ok(()) => {
                    self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(e) if retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for(retry);
                    retry += 1;
                    self.stats.retried.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "Side-effect {} failed (attempt {}): {}; retrying in {:?}",
                        effect.label(),
                        retry,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        "Side-effect {} failed after {} retries: {}",
                        effect.label(),
                        retry,
                        e
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct FlakyHandler {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SideEffectHandler for FlakyHandler {
        async fn handle(&self, _effect: &SideEffect) -> anyhow::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                anyhow::bail!("transient failure {}", call);
            }
            Ok(())
        }
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn viewed() -> SideEffect {
        SideEffect::ListingViewed {
            listing_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn success_is_counted_once() {
        let handler = Arc::new(FlakyHandler {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
        });
        let (queue, worker) = side_effect_channel(handler.clone(), instant_policy());

        let stats = queue.stats.clone();

        queue.enqueue(viewed());
        drop(queue);
        worker.run().await;

        let counts = stats.snapshot();
        assert_eq!(counts.enqueued, 1);
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.retried, 0);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let handler = Arc::new(FlakyHandler {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        });
        let (queue, worker) = side_effect_channel(handler, instant_policy());
        let stats = queue.stats.clone();

        queue.enqueue(viewed());
        drop(queue);
        worker.run().await;

        let counts = stats.snapshot();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.retried, 2);
        assert_eq!(counts.failed, 0);
    }

    #[tokio::test]
    async fn gives_up_after_retry_limit() {
        let handler = Arc::new(FlakyHandler {
            failures_before_success: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let (queue, worker) = side_effect_channel(handler.clone(), instant_policy());
        let stats = queue.stats.clone();

        queue.enqueue(viewed());
        drop(queue);
        worker.run().await;

        let counts = stats.snapshot();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.retried, 3);
        assert_eq!(counts.succeeded, 0);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn enqueue_after_worker_exit_is_dropped() {
        let handler = Arc::new(FlakyHandler {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
        });
        let (queue, worker) = side_effect_channel(handler, instant_policy());
        drop(worker);

        queue.enqueue(viewed());
        let counts = queue.counts();
        assert_eq!(counts.dropped, 1);
        assert_eq!(counts.enqueued, 0);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        let first = policy.delay_for(0);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));
        let capped = policy.delay_for(5);
        assert!(capped >= Duration::from_millis(300) && capped <= Duration::from_millis(350));
    }
}
