//! "K of N done" progress tracking shared by the batch runners

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Observer = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Monotonic completion counter for one batch
pub struct Progress {
    label: String,
    total: usize,
    completed: AtomicUsize,
    observer: Option<Observer>,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("label", &self.label)
            .field("total", &self.total)
            .field("completed", &self.completed())
            .finish()
    }
}

impl Progress {
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self {
            label: label.into(),
            total,
            completed: AtomicUsize::new(0),
            observer: None,
        }
    }

    /// Also call `observer(completed, total)` on every tick
    #[cfg(test)]
    pub fn with_observer(mut self, observer: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Record one settled invocation and report it. Returns the new count.
    pub fn tick(&self) -> usize {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("{} of {} {} done", done, self.total, self.label);
        if let Some(observer) = &self.observer {
            observer(done, self.total);
        }
        done
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}
