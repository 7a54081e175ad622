//! Waiting for the foreground app to catch up with an action

use crate::errors::AutomationError;
use crate::Automation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How a workflow waits before each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Readiness {
    /// Sleep for the step's fixed heuristic delay
    #[default]
    FixedDelay,
    /// Re-capture until the screen hash repeats `samples` times in a row,
    /// giving up after `max_wait`. Changes step timing, so it is opt-in.
    Stable {
        samples: u32,
        #[serde(with = "millis")]
        interval: Duration,
        #[serde(with = "millis")]
        max_wait: Duration,
    },
}

impl Readiness {
    pub(crate) async fn settle(&self, automation: &Automation, delay: Duration) {
        match *self {
            Readiness::FixedDelay => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Readiness::Stable {
                samples,
                interval,
                max_wait,
            } => {
                if let Err(e) = wait_until_stable(automation, samples, interval, max_wait).await {
                    debug!("Screen did not settle: {}", e);
                }
            }
        }
    }
}

/// Polls [`Automation::capture`] until `samples` consecutive captures hash
/// the same, or `max_wait` elapses.
pub async fn wait_until_stable(
    automation: &Automation,
    samples: u32,
    interval: Duration,
    max_wait: Duration,
) -> Result<(), AutomationError> {
    let deadline = Instant::now() + max_wait;
    let needed = samples.max(2);
    let mut last: Option<blake3::Hash> = None;
    let mut streak = 0u32;

    loop {
        // An unavailable screen is treated like a changing one.
        match automation.capture() {
            Ok(snapshot) => {
                let hash = snapshot.content_hash();
                if last == Some(hash) {
                    streak += 1;
                } else {
                    streak = 1;
                    last = Some(hash);
                }
                if streak >= needed {
                    return Ok(());
                }
            }
            Err(_) => {
                streak = 0;
                last = None;
            }
        }

        if Instant::now() + interval > deadline {
            return Err(AutomationError::Timeout(format!(
                "screen still changing after {max_wait:?}"
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
