use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative abort flag shared between a caller and a running evaluation.
///
/// Evaluations check the flag between folds and between trials. Work that
/// observes the flag mid-way is discarded, never merged into an aggregate.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; visible to every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// `Err(Cancelled)` if the optional token has fired.
pub(crate) fn check(token: Option<&CancellationToken>) -> crate::error::Result<()> {
    match token {
        Some(t) if t.is_cancelled() => Err(crate::error::CosechaError::Cancelled),
        _ => Ok(()),
    }
}
