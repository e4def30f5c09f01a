use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use relative_path::{RelativePath, RelativePathBuf};

/// Remembers, per document, the earliest time it may be processed again.
///
/// Writing a document makes the file watcher report it as changed; the
/// cooldown keeps that echo from starting another pass. Owned by whoever
/// drives the passes, never by the pass itself.
#[derive(Debug, Clone)]
pub struct ReprocessGuard {
    cooldown: Duration,
    not_before: HashMap<RelativePathBuf, Instant>,
}

impl ReprocessGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            not_before: HashMap::new(),
        }
    }

    /// Records that `path` was just written.
    pub fn record_write(&mut self, path: &RelativePath, now: Instant) {
        self.not_before
            .insert(path.to_relative_path_buf(), now + self.cooldown);
    }

    pub fn may_process(&self, path: &RelativePath, now: Instant) -> bool {
        self.not_before
            .get(path)
            .is_none_or(|not_before| now >= *not_before)
    }

    /// Drops entries whose cooldown has passed.
    pub fn prune(&mut self, now: Instant) {
        self.not_before.retain(|_, not_before| now < *not_before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_path_may_be_processed() {
        let guard = ReprocessGuard::new(Duration::from_secs(2));
        assert!(guard.may_process(RelativePath::new("a.md"), Instant::now()));
    }

    #[test]
    fn write_blocks_until_cooldown_passes() {
        // Given a document written just now
        let mut guard = ReprocessGuard::new(Duration::from_secs(2));
        let now = Instant::now();
        let path = RelativePath::new("notes/a.md");
        guard.record_write(path, now);

        // Then it is blocked during the cooldown only
        assert!(!guard.may_process(path, now));
        assert!(!guard.may_process(path, now + Duration::from_millis(1999)));
        assert!(guard.may_process(path, now + Duration::from_secs(2)));
        assert!(guard.may_process(RelativePath::new("notes/b.md"), now));
    }

    #[test]
    fn prune_forgets_expired_entries() {
        let mut guard = ReprocessGuard::new(Duration::from_secs(1));
        let now = Instant::now();
        guard.record_write(RelativePath::new("a.md"), now);
        guard.record_write(RelativePath::new("b.md"), now + Duration::from_secs(5));

        guard.prune(now + Duration::from_secs(2));

        assert!(!guard.not_before.contains_key(RelativePath::new("a.md")));
        assert!(guard.not_before.contains_key(RelativePath::new("b.md")));
        assert!(guard.may_process(RelativePath::new("a.md"), now + Duration::from_secs(2)));
    }
}
