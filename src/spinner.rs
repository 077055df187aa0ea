//! A terminal loader shown while waiting on the backend.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Rune-ish frames, cycled in order.
const FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Frame interval.
const INTERVAL: Duration = Duration::from_millis(120);

/// A loader line on stderr, redrawn by a background task.
///
/// The message can be swapped while it spins, e.g. to show poll attempts.
/// `None` on the channel stops it.
pub struct Spinner {
    handle: JoinHandle<()>,
    message: watch::Sender<Option<String>>,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let (tx, mut rx) = watch::channel(Some(message.to_string()));

        let handle = tokio::spawn(async move {
            let mut current = message_of(&rx);
            let mut i = 0;
            while let Some(text) = &current {
                let frame = FRAMES[i % FRAMES.len()];
                eprint!("\x1b[2K\r{frame} {text}");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => i += 1,
                    changed = rx.changed() => {
                        current = match changed {
                            Ok(()) => message_of(&rx),
                            Err(_) => None,
                        };
                    }
                }
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            handle,
            message: tx,
        }
    }

    /// Replace the text next to the spinner.
    pub fn set_message(&self, message: &str) {
        self.message.send_replace(Some(message.to_string()));
    }

    /// Stop and clear the line.
    pub async fn stop(self) {
        self.message.send_replace(None);
        let _ = self.handle.await;
    }
}

fn message_of(rx: &watch::Receiver<Option<String>>) -> Option<String> {
    rx.borrow().clone()
}
