use crate::types::{BookStats, Decision};

/// Running retained/rejected counts, flushed whenever the book key changes.
#[derive(Debug, Default)]
pub enum BookTracker {
    #[default]
    NoBook,
    InBook(BookStats),
}

impl BookTracker {
    pub fn new() -> Self {
        Self::NoBook
    }

    /// Counts `decision` under `book`. Returns the previous book's totals when
    /// `book` starts a new run.
    pub fn record(&mut self, book: &str, decision: Decision) -> Option<BookStats> {
        let flushed = match std::mem::take(self) {
            Self::InBook(stats) if stats.book == book => {
                *self = Self::InBook(stats);
                None
            }
            Self::InBook(stats) => {
                *self = Self::InBook(BookStats::new(book));
                Some(stats)
            }
            Self::NoBook => {
                *self = Self::InBook(BookStats::new(book));
                None
            }
        };

        if let Self::InBook(stats) = self {
            match decision {
                Decision::Retained => stats.retained += 1,
                Decision::Rejected => stats.rejected += 1,
            }
        }
        flushed
    }

    pub fn current(&self) -> Option<&BookStats> {
        match self {
            Self::InBook(stats) => Some(stats),
            Self::NoBook => None,
        }
    }

    /// Totals of the book in progress, if any.
    pub fn finish(self) -> Option<BookStats> {
        match self {
            Self::InBook(stats) => Some(stats),
            Self::NoBook => None,
        }
    }
}
