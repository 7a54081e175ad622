//! Pointer gestures and their completion signal

use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

/// A single pointer path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePath {
    /// Points visited in order, in screen pixels.
    pub points: Vec<(f32, f32)>,
    /// Offset from the start of the gesture.
    pub start: Duration,
    pub duration: Duration,
}

/// Pointer path handed to the backend for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDescription {
    pub strokes: Vec<StrokePath>,
}

impl GestureDescription {
    pub fn tap(x: f32, y: f32, duration: Duration) -> Self {
        Self {
            strokes: vec![StrokePath {
                points: vec![(x, y)],
                start: Duration::ZERO,
                duration,
            }],
        }
    }

    pub fn swipe(from: (f32, f32), to: (f32, f32), duration: Duration) -> Self {
        Self {
            strokes: vec![StrokePath {
                points: vec![from, to],
                start: Duration::ZERO,
                duration,
            }],
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.strokes
            .iter()
            .map(|s| s.start + s.duration)
            .max()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

/// Completion signal of an accepted gesture.
///
/// Dispatch returns as soon as the backend accepts the path; the on-screen
/// effect settles later. Call [`GestureHandle::wait`] to await the backend's
/// completion callback, or drop the handle to not wait at all.
#[derive(Debug)]
pub struct GestureHandle {
    rx: oneshot::Receiver<GestureOutcome>,
}

impl GestureHandle {
    /// Creates a handle and the sender the backend resolves it with.
    pub fn channel() -> (oneshot::Sender<GestureOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Handle for a backend that has no completion callback.
    pub fn completed() -> Self {
        let (tx, handle) = Self::channel();
        let _ = tx.send(GestureOutcome::Completed);
        handle
    }

    pub async fn wait(self) -> Result<(), AutomationError> {
        match self.rx.await {
            Ok(GestureOutcome::Completed) => Ok(()),
            Ok(GestureOutcome::Cancelled) => Err(AutomationError::GestureCancelled(
                "backend reported cancellation".to_string(),
            )),
            Err(_) => Err(AutomationError::GestureCancelled(
                "backend dropped the gesture callback".to_string(),
            )),
        }
    }
}
