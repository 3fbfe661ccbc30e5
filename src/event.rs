use tokio::sync::mpsc;

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
  Success,
  Error,
}

/// A transient toast message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: NotificationLevel,
  pub message: String,
}

/// Application events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// Show a toast
  Notification(Notification),
  /// The session was invalidated; the user has to sign in again
  SignInRequired,
}

/// Create a connected notifier / receiver pair
pub fn channel() -> (Notifier, EventReceiver) {
  let (tx, rx) = mpsc::unbounded_channel();
  (Notifier { tx }, EventReceiver { rx })
}

/// Sending half, cloned into every resource and the HTTP client
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Event>,
}

impl Notifier {
  pub fn success(&self, message: impl Into<String>) {
    self.send(Event::Notification(Notification {
      level: NotificationLevel::Success,
      message: message.into(),
    }));
  }

  pub fn error(&self, message: impl Into<String>) {
    self.send(Event::Notification(Notification {
      level: NotificationLevel::Error,
      message: message.into(),
    }));
  }

  pub fn sign_in_required(&self) {
    self.send(Event::SignInRequired);
  }

  fn send(&self, event: Event) {
    // Nobody listening is fine
    let _ = self.tx.send(event);
  }
}

/// Receiving half, drained by whoever displays notifications
pub struct EventReceiver {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventReceiver {
  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }

  /// Receive an event if one is already queued
  pub fn try_next(&mut self) -> Option<Event> {
    self.rx.try_recv().ok()
  }

  /// Drain everything currently queued
  pub fn drain(&mut self) -> Vec<Event> {
    std::iter::from_fn(|| self.try_next()).collect()
  }
}
