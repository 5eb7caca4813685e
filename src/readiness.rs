//! Lazily started, shared handle to the external module.

use std::cell::RefCell;
use std::fmt;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::error::CompressionFailure;

pub type Loader<M> = LocalBoxFuture<'static, Result<M, CompressionFailure>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Initializing => "initializing",
            Lifecycle::Ready => "ready",
            Lifecycle::Failed => "failed",
        })
    }
}

/// Runs its loader at most once and hands the result to every caller of
/// [`ModuleCell::get`], however many are waiting.
pub struct ModuleCell<M: Clone + 'static> {
    pending: RefCell<Option<Loader<M>>>,
    loading: RefCell<Option<Shared<Loader<M>>>>,
    settled: RefCell<Option<Result<M, CompressionFailure>>>,
}

impl<M: Clone + 'static> ModuleCell<M> {
    pub fn new(loader: Loader<M>) -> Self {
        Self {
            pending: RefCell::new(Some(loader)),
            loading: RefCell::new(None),
            settled: RefCell::new(None),
        }
    }

    /// A cell whose module is already available.
    pub fn ready(module: M) -> Self {
        Self {
            pending: RefCell::new(None),
            loading: RefCell::new(None),
            settled: RefCell::new(Some(Ok(module))),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.settled.borrow().as_ref() {
            Some(Ok(_)) => Lifecycle::Ready,
            Some(Err(_)) => Lifecycle::Failed,
            None if self.loading.borrow().is_some() => Lifecycle::Initializing,
            None => Lifecycle::Uninitialized,
        }
    }

    /// Moves the cell to `Initializing`. Does nothing once started.
    pub fn start(&self) {
        if let Some(loader) = self.pending.borrow_mut().take() {
            log::debug!("starting compression module load");
            *self.loading.borrow_mut() = Some(loader.shared());
        }
    }

    /// Waits for the module, starting the load if nobody has yet.
    ///
    /// A failed load is terminal: the loader is never re-run, and this and
    /// every later call returns the error the load settled with.
    pub async fn get(&self) -> Result<M, CompressionFailure> {
        if let Some(settled) = self.settled.borrow().as_ref() {
            return settled.clone();
        }
        self.start();
        let loading = self.loading.borrow().clone();
        let Some(loading) = loading else {
            return Err(CompressionFailure::ModuleUnavailable(
                "module loader was dropped".into(),
            ));
        };
        let result = loading.await;
        if self.settled.borrow().is_none() {
            match &result {
                Ok(_) => log::info!("compression module ready"),
                Err(err) => log::error!("compression module failed to load: {err}"),
            }
            *self.settled.borrow_mut() = Some(result.clone());
            self.loading.borrow_mut().take();
        }
        result
    }
}
