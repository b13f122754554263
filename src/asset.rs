use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Value produced off the render thread and handed over exactly once.
///
/// The render loop calls [`AssetHandle::poll`] each frame and skips whatever
/// depends on the asset until it reports [`AssetStatus::Ready`].
pub struct AssetHandle<T> {
    name: String,
    state: AssetState<T>,
}

enum AssetState<T> {
    Pending(Receiver<anyhow::Result<T>>),
    Ready(T),
    Failed,
}

#[derive(Debug, PartialEq)]
pub enum AssetStatus<'a, T> {
    Pending,
    Ready(&'a T),
    Failed,
}

impl<T: Send + 'static> AssetHandle<T> {
    /// Runs `load` on a worker thread, then `on_complete` once the result has
    /// been sent. `on_complete` is the hook used to wake the event loop.
    pub fn spawn<F, W>(name: impl Into<String>, load: F, on_complete: W) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        W: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = mpsc::sync_channel(1);
        let thread_name = format!("asset-{name}");
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            // The receiver may already be gone if the app shut down first.
            let _ = sender.send(load());
            on_complete();
        });

        let state = match spawned {
            Ok(_) => AssetState::Pending(receiver),
            Err(error) => {
                tracing::error!(asset = %name, "failed to spawn loader thread: {error}");
                AssetState::Failed
            }
        };
        Self { name, state }
    }
}

impl<T> AssetHandle<T> {
    pub fn ready(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            state: AssetState::Ready(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking ready check.
    pub fn poll(&mut self) -> AssetStatus<'_, T> {
        if let AssetState::Pending(receiver) = &self.state {
            match receiver.try_recv() {
                Ok(result) => self.resolve(result),
                Err(TryRecvError::Empty) => return AssetStatus::Pending,
                Err(TryRecvError::Disconnected) => {
                    tracing::error!(asset = %self.name, "loader exited without a result");
                    self.state = AssetState::Failed;
                }
            }
        }
        self.status()
    }

    /// Blocks until the loader has finished.
    pub fn wait(&mut self) -> AssetStatus<'_, T> {
        if let AssetState::Pending(receiver) = &self.state {
            match receiver.recv() {
                Ok(result) => self.resolve(result),
                Err(_) => {
                    tracing::error!(asset = %self.name, "loader exited without a result");
                    self.state = AssetState::Failed;
                }
            }
        }
        self.status()
    }

    fn resolve(&mut self, result: anyhow::Result<T>) {
        self.state = match result {
            Ok(value) => {
                tracing::debug!(asset = %self.name, "asset ready");
                AssetState::Ready(value)
            }
            Err(error) => {
                tracing::error!(asset = %self.name, "asset failed to load: {error:#}");
                AssetState::Failed
            }
        };
    }

    fn status(&self) -> AssetStatus<'_, T> {
        match &self.state {
            AssetState::Pending(_) => AssetStatus::Pending,
            AssetState::Ready(value) => AssetStatus::Ready(value),
            AssetState::Failed => AssetStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn resolves_once_and_stays_ready() {
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = woken.clone();
        let mut handle = AssetHandle::spawn(
            "answer",
            || Ok(42),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(handle.wait(), AssetStatus::Ready(&42));
        assert_eq!(handle.poll(), AssetStatus::Ready(&42));
        assert_eq!(handle.wait(), AssetStatus::Ready(&42));

        // The wake hook runs right after the send; give it a moment.
        for _ in 0..100 {
            if woken.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn loader_error_is_terminal() {
        let mut handle: AssetHandle<u32> =
            AssetHandle::spawn("broken", || Err(anyhow::anyhow!("missing file")), || {});
        assert_eq!(handle.wait(), AssetStatus::Failed);
        assert_eq!(handle.poll(), AssetStatus::Failed);
    }

    #[test]
    fn poll_reports_pending_until_loader_finishes() {
        let (release, gate) = mpsc::channel::<()>();
        let mut handle = AssetHandle::spawn(
            "gated",
            move || {
                gate.recv()?;
                Ok("done")
            },
            || {},
        );

        assert_eq!(handle.poll(), AssetStatus::Pending);
        release.send(()).unwrap();
        assert_eq!(handle.wait(), AssetStatus::Ready(&"done"));
    }

    #[test]
    fn ready_handle_needs_no_loader() {
        let mut handle = AssetHandle::ready("inline", vec![1, 2, 3]);
        assert_eq!(handle.name(), "inline");
        assert_eq!(handle.poll(), AssetStatus::Ready(&vec![1, 2, 3]));
    }
}
