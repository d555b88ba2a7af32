//! Deferred initializer queue.
//!
//! # Invariants
//! - Registration order is execution order for every construction.
//! - Each construction runs a snapshot of the queue; initializers added
//!   afterwards only affect later constructions.

use crate::error::{BoxError, InvalidArgument};
use crate::host::instance::RootInstance;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Initializer body; runs once per construction with the new instance.
pub type InitializerFn =
    Arc<dyn Fn(&RootInstance) -> Result<(), BoxError> + Send + Sync + 'static>;

/// One named queue entry.
#[derive(Clone)]
pub struct Initializer {
    name: String,
    callback: InitializerFn,
}

impl Initializer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn run(&self, instance: &RootInstance) -> Result<(), BoxError> {
        (self.callback)(instance)
    }
}

impl Debug for Initializer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initializer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered initializer queue owned by a host.
#[derive(Debug, Clone, Default)]
pub struct InitializerQueue {
    entries: Vec<Initializer>,
}

impl InitializerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one initializer and returns its order index.
    pub fn push<F>(
        &mut self,
        name: impl Into<String>,
        callback: F,
    ) -> Result<usize, InvalidArgument>
    where
        F: Fn(&RootInstance) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvalidArgument::EmptyInitializerName);
        }
        self.entries.push(Initializer {
            name,
            callback: Arc::new(callback),
        });
        Ok(self.entries.len() - 1)
    }

    /// Copy of the queue as it stands now.
    pub fn snapshot(&self) -> Vec<Initializer> {
        self.entries.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An initializer failed during construction.
#[derive(Debug)]
pub struct InitializationError {
    /// Instance whose construction was aborted.
    pub instance_id: Uuid,
    /// Order index of the failing initializer.
    pub index: usize,
    pub name: String,
    pub source: BoxError,
}

impl Display for InitializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "initializer #{} `{}` failed: {}",
            self.index, self.name, self.source
        )
    }
}

impl Error for InitializationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::InitializerQueue;
    use crate::error::InvalidArgument;

    #[test]
    fn push_returns_order_index() {
        let mut queue = InitializerQueue::new();
        assert_eq!(queue.push("first", |_| Ok(())).expect("first"), 0);
        assert_eq!(queue.push("second", |_| Ok(())).expect("second"), 1);
        assert_eq!(queue.names(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn rejects_blank_name() {
        let mut queue = InitializerQueue::new();
        let err = queue
            .push(" ", |_| Ok(()))
            .expect_err("blank name must fail");
        assert_eq!(err, InvalidArgument::EmptyInitializerName);
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_pushes() {
        let mut queue = InitializerQueue::new();
        queue.push("early", |_| Ok(())).expect("early");
        let snapshot = queue.snapshot();
        queue.push("late", |_| Ok(())).expect("late");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name(), "early");
        assert_eq!(queue.len(), 2);
    }
}
