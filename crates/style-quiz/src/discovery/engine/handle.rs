use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use tracing::debug;

use super::{Direction, IgnoreReason, SwipeEngine, SwipeOutcome};

/// Shared ownership of one engine. Swipes that arrive while another swipe is
/// still being applied are dropped instead of queued.
#[derive(Clone)]
pub struct SessionHandle {
    engine: Arc<Mutex<SwipeEngine>>,
}

impl SessionHandle {
    pub fn new(engine: SwipeEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn try_swipe(&self, direction: Direction) -> SwipeOutcome {
        self.try_apply(|engine| engine.swipe(direction))
    }

    pub fn try_reject(&self) -> SwipeOutcome {
        self.try_apply(SwipeEngine::reject_current_style)
    }

    /// Runs `f` with exclusive access, waiting for any in-flight swipe.
    pub fn with<T>(&self, f: impl FnOnce(&mut SwipeEngine) -> T) -> T {
        let mut engine = self.lock();
        f(&mut engine)
    }

    pub fn lock(&self) -> MutexGuard<'_, SwipeEngine> {
        self.engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_apply(&self, f: impl FnOnce(&mut SwipeEngine) -> SwipeOutcome) -> SwipeOutcome {
        match self.engine.try_lock() {
            Ok(mut engine) => f(&mut engine),
            Err(TryLockError::WouldBlock) => {
                debug!("swipe dropped, previous swipe still in flight");
                SwipeOutcome::Ignored {
                    reason: IgnoreReason::Busy,
                }
            }
            Err(TryLockError::Poisoned(poisoned)) => f(&mut poisoned.into_inner()),
        }
    }
}
