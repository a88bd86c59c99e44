//! Debounce for raw filesystem changes.
//!
//! A single quiet-period timer covers the whole watched root: every accepted
//! change pushes the deadline out, and the refresh fires once the root has
//! been quiet for the full period.

use std::time::Duration;

use log::{debug, trace};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::config::IgnoreSet;
use crate::util::paths::relative_to_root;
use crate::watch::event::FileChange;

#[derive(Debug)]
pub struct ChangeCoalescer {
    quiet_period: Duration,
    deadline: Option<Instant>,
    pending: usize,
}

impl ChangeCoalescer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            deadline: None,
            pending: 0,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Records a change observed at `now`, restarting the quiet period.
    pub fn record(&mut self, now: Instant) {
        self.pending += 1;
        self.deadline = Some(now + self.quiet_period);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per burst, when the quiet period has
    /// elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                debug!("quiet period elapsed after {} change(s)", self.pending);
                self.deadline = None;
                self.pending = 0;
                true
            }
            _ => false,
        }
    }

    /// Drops the pending timer without firing. Returns how many changes were
    /// discarded.
    pub fn cancel(&mut self) -> usize {
        let dropped = self.pending;
        self.deadline = None;
        self.pending = 0;
        dropped
    }
}

/// Filters changes against the ignore set before they reach the coalescer.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    root: std::path::PathBuf,
    ignore: IgnoreSet,
}

impl ChangeFilter {
    pub fn new(root: impl Into<std::path::PathBuf>, ignore: IgnoreSet) -> Self {
        Self {
            root: root.into(),
            ignore,
        }
    }

    pub fn accepts(&self, change: &FileChange) -> bool {
        if self.ignore.is_empty() {
            return true;
        }
        !self
            .ignore
            .is_ignored(&relative_to_root(&self.root, &change.path))
    }
}

/// Drives a [`ChangeCoalescer`] from a change channel until `shutdown` fires
/// or the channel closes, calling `on_due` once per quiet burst. A pending
/// timer is cancelled, not fired, on exit.
pub async fn run_coalescer<F>(
    mut coalescer: ChangeCoalescer,
    filter: ChangeFilter,
    mut changes: mpsc::Receiver<FileChange>,
    mut shutdown: oneshot::Receiver<()>,
    mut on_due: F,
) where
    F: FnMut() + Send,
{
    loop {
        let wake_at = coalescer
            .deadline()
            .unwrap_or_else(|| Instant::now() + coalescer.quiet_period());
        let armed = coalescer.is_pending();

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                let dropped = coalescer.cancel();
                debug!("coalescer stopped, {dropped} pending change(s) dropped");
                return;
            }
            change = changes.recv() => match change {
                Some(change) => {
                    if filter.accepts(&change) {
                        trace!("change {:?} {}", change.kind, change.path.display());
                        coalescer.record(Instant::now());
                    } else {
                        trace!("ignored change {}", change.path.display());
                    }
                }
                None => {
                    let dropped = coalescer.cancel();
                    debug!("change channel closed, {dropped} pending change(s) dropped");
                    return;
                }
            },
            _ = time::sleep_until(wake_at), if armed => {
                if coalescer.poll(Instant::now()) {
                    on_due();
                }
            }
        }
    }
}
