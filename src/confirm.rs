use std::fmt;

/// A deletion that has been asked for but not yet sent. Only the matching
/// `confirm_delete*` method consumes it.
#[must_use = "nothing is deleted until the pending value is confirmed"]
#[derive(Debug, PartialEq, Eq)]
pub struct PendingDelete<T> {
    target: T,
}

impl<T> PendingDelete<T> {
    pub(crate) fn new(target: T) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Abandon the deletion.
    pub fn cancel(self) {
        tracing::debug!("Deletion cancelled");
    }

    pub(crate) fn into_target(self) -> T {
        self.target
    }
}

impl<T: fmt::Display> fmt::Display for PendingDelete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete {}?", self.target)
    }
}
