//! Caller-owned warning context.
//!
//! Batch workers never touch this directly: each task returns its own
//! [`Notice`]s and the batch merges them here after the parallel phase, so
//! "warn once" is scoped to one `Diagnostics` value rather than the process.

use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Deduplication key for once-per-context warnings; `None` always reports.
    pub key: Option<String>,
    pub texture: Option<String>,
    pub message: String,
}

impl Notice {
    pub fn once(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            texture: None,
            message: message.into(),
        }
    }

    pub fn for_texture(texture: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: None,
            texture: Some(texture.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    seen: HashSet<String>,
    warnings: Vec<Notice>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `notice` unless its key was already reported. Returns whether it was kept.
    pub fn report(&mut self, notice: Notice) -> bool {
        if let Some(key) = &notice.key {
            if !self.seen.insert(key.clone()) {
                return false;
            }
        }
        warn!(texture = notice.texture.as_deref(), "{}", notice.message);
        self.warnings.push(notice);
        true
    }

    pub fn warn_once(&mut self, key: &str, message: impl Into<String>) -> bool {
        self.report(Notice::once(key, message))
    }

    pub fn merge(&mut self, notices: impl IntoIterator<Item = Notice>) {
        for notice in notices {
            self.report(notice);
        }
    }

    pub fn warnings(&self) -> &[Notice] {
        &self.warnings
    }

    pub fn has_warned(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_per_context() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.warn_once("auto-platform", "resolved Auto to Desktop"));
        assert!(!diagnostics.warn_once("auto-platform", "resolved Auto to Desktop"));
        assert_eq!(diagnostics.warnings().len(), 1);
        assert!(diagnostics.has_warned("auto-platform"));

        let fresh = Diagnostics::new();
        assert!(!fresh.has_warned("auto-platform"));
    }

    #[test]
    fn test_texture_notices_always_kept() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.merge(vec![
            Notice::for_texture("a", "codec failed"),
            Notice::for_texture("a", "codec failed"),
            Notice::once("k", "first"),
            Notice::once("k", "second"),
        ]);
        assert_eq!(diagnostics.warnings().len(), 3);
        assert_eq!(diagnostics.warnings()[2].message, "first");
    }
}
