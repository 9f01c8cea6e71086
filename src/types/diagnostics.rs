use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for rule errors that evaluation swallowed.
///
/// Evaluation never fails; instead each fail-safe `false` bumps one of these.
#[derive(Debug, Default)]
pub struct Diagnostics {
    evaluations: AtomicU64,
    unknown_nodes: AtomicU64,
    missing_helpers: AtomicU64,
    type_mismatches: AtomicU64,
    bad_accessors: AtomicU64,
}

/// A point-in-time copy of [`Diagnostics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    pub evaluations: u64,
    pub unknown_nodes: u64,
    pub missing_helpers: u64,
    pub type_mismatches: u64,
    pub bad_accessors: u64,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            unknown_nodes: self.unknown_nodes.load(Ordering::Relaxed),
            missing_helpers: self.missing_helpers.load(Ordering::Relaxed),
            type_mismatches: self.type_mismatches.load(Ordering::Relaxed),
            bad_accessors: self.bad_accessors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.evaluations,
            &self.unknown_nodes,
            &self.missing_helpers,
            &self.type_mismatches,
            &self.bad_accessors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_node(&self) {
        self.unknown_nodes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_missing_helper(&self) {
        self.missing_helpers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_type_mismatch(&self) {
        self.type_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bad_accessor(&self) {
        self.bad_accessors.fetch_add(1, Ordering::Relaxed);
    }
}

impl DiagnosticCounts {
    /// Total swallowed rule errors.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.unknown_nodes + self.missing_helpers + self.type_mismatches + self.bad_accessors
    }
}

impl fmt::Display for DiagnosticCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} evaluations, {} unknown nodes, {} missing helpers, {} type mismatches, {} bad accessors",
            self.evaluations,
            self.unknown_nodes,
            self.missing_helpers,
            self.type_mismatches,
            self.bad_accessors,
        )
    }
}
