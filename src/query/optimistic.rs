//! Optimistic local state with rollback on a failed write.

use std::future::Future;
use tokio::sync::oneshot;
use tracing::debug;

use crate::api::ApiError;

/// How a pending optimistic write ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome<T> {
  /// The write succeeded; the new value stays
  Committed(T),
  /// The write failed; the value went back to what it was
  RolledBack { value: T, error: ApiError },
}

struct Pending<T> {
  prior: T,
  rx: oneshot::Receiver<Result<(), ApiError>>,
}

/// A displayed value that changes before its write completes.
pub struct Optimistic<T> {
  value: T,
  pending: Option<Pending<T>>,
}

impl<T: Clone + Send + 'static> Optimistic<T> {
  pub fn new(value: T) -> Self {
    Self {
      value,
      pending: None,
    }
  }

  /// The value to display right now.
  pub fn value(&self) -> &T {
    &self.value
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }

  /// Show `new_value` immediately and start `write(new_value)`.
  ///
  /// Returns `false` without doing anything while a previous write is still
  /// pending.
  pub fn set<F, Fut>(&mut self, new_value: T, write: F) -> bool
  where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
  {
    if self.pending.is_some() {
      return false;
    }

    let prior = std::mem::replace(&mut self.value, new_value.clone());
    let (tx, rx) = oneshot::channel();
    let future = write(new_value);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });

    self.pending = Some(Pending { prior, rx });
    true
  }

  /// Check the pending write without blocking.
  pub fn poll(&mut self) -> Option<ToggleOutcome<T>> {
    let pending = self.pending.as_mut()?;
    let result = match pending.rx.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => Err(cancelled()),
    };
    Some(self.resolve(result))
  }

  /// Wait for the pending write, if any.
  pub async fn settle(&mut self) -> Option<ToggleOutcome<T>> {
    let pending = self.pending.as_mut()?;
    let result = (&mut pending.rx).await.unwrap_or_else(|_| Err(cancelled()));
    Some(self.resolve(result))
  }

  fn resolve(&mut self, result: Result<(), ApiError>) -> ToggleOutcome<T> {
    let pending = self.pending.take();
    match (result, pending) {
      (Ok(()), _) => ToggleOutcome::Committed(self.value.clone()),
      (Err(error), Some(pending)) => {
        debug!("Optimistic write failed, rolling back: {}", error);
        self.value = pending.prior;
        ToggleOutcome::RolledBack {
          value: self.value.clone(),
          error,
        }
      }
      (Err(error), None) => ToggleOutcome::RolledBack {
        value: self.value.clone(),
        error,
      },
    }
  }
}

impl Optimistic<bool> {
  /// Flip a checkbox-style value.
  pub fn toggle<F, Fut>(&mut self, write: F) -> bool
  where
    F: FnOnce(bool) -> Fut,
    Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
  {
    let flipped = !self.value;
    self.set(flipped, write)
  }
}

fn cancelled() -> ApiError {
  ApiError::Network("Write was cancelled".to_string())
}
