//! OS clipboard access.
//!
//! The backend lives on a dedicated worker thread for the whole process
//! lifetime; the core loop talks to it through [`ClipboardHandle`].

mod image;
#[cfg(test)]
mod memory;
mod system;

pub use image::{ImageError, RgbaImage};
#[cfg(test)]
pub use memory::MemoryClipboard;
pub use system::SystemClipboard;

use tokio::sync::{mpsc, oneshot};

/// Clipboard errors. All of them are transient from the core's point of view.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard backend error: {0}")]
    Backend(#[from] arboard::Error),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("clipboard worker has stopped")]
    WorkerGone,
}

/// Read and write access to the OS clipboard, for plain text and RGBA images.
///
/// Implementations run on the clipboard worker thread and may block.
pub trait ClipboardPort {
    /// Current clipboard text, or `None` if the clipboard holds no text.
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError>;

    /// Current clipboard image, or `None` if the clipboard holds no image.
    fn read_image(&mut self) -> Result<Option<RgbaImage>, ClipboardError>;

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;

    fn write_image(&mut self, image: &RgbaImage) -> Result<(), ClipboardError>;
}

/// One observation of both clipboard kinds. Each read fails independently.
#[derive(Debug)]
pub struct ClipboardSample {
    pub text: Result<Option<String>, ClipboardError>,
    pub image: Result<Option<RgbaImage>, ClipboardError>,
}

enum Job {
    Sample(oneshot::Sender<ClipboardSample>),
    WriteText(String, oneshot::Sender<Result<(), ClipboardError>>),
    WriteImage(RgbaImage, oneshot::Sender<Result<(), ClipboardError>>),
}

/// Cloneable handle to the clipboard worker thread.
#[derive(Clone)]
pub struct ClipboardHandle {
    jobs: mpsc::UnboundedSender<Job>,
}

impl ClipboardHandle {
    /// Start the clipboard worker.
    ///
    /// `open` is called on the worker thread to create the backend. If it
    /// fails, the job that needed the backend fails and the next job tries
    /// again.
    pub fn spawn<F, P>(open: F) -> std::io::Result<Self>
    where
        F: Fn() -> Result<P, ClipboardError> + Send + 'static,
        P: ClipboardPort + 'static,
    {
        let (jobs, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("clipboard".to_string())
            .spawn(move || run_worker(open, rx))?;
        Ok(Self { jobs })
    }

    /// Read text and image from the clipboard.
    pub async fn sample(&self) -> ClipboardSample {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(Job::Sample(tx)).is_err() {
            return ClipboardSample::gone();
        }
        rx.await.unwrap_or_else(|_| ClipboardSample::gone())
    }

    pub async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(Job::WriteText(text.to_string(), tx))
            .map_err(|_| ClipboardError::WorkerGone)?;
        rx.await.map_err(|_| ClipboardError::WorkerGone)?
    }

    pub async fn write_image(&self, image: RgbaImage) -> Result<(), ClipboardError> {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(Job::WriteImage(image, tx))
            .map_err(|_| ClipboardError::WorkerGone)?;
        rx.await.map_err(|_| ClipboardError::WorkerGone)?
    }
}

impl ClipboardSample {
    fn gone() -> Self {
        Self {
            text: Err(ClipboardError::WorkerGone),
            image: Err(ClipboardError::WorkerGone),
        }
    }
}

fn run_worker<F, P>(open: F, mut jobs: mpsc::UnboundedReceiver<Job>)
where
    F: Fn() -> Result<P, ClipboardError>,
    P: ClipboardPort,
{
    let mut port: Option<P> = None;

    while let Some(job) = jobs.blocking_recv() {
        if port.is_none() {
            match open() {
                Ok(opened) => {
                    tracing::debug!("Clipboard backend opened");
                    port = Some(opened);
                }
                Err(e) => {
                    tracing::debug!("Failed to open clipboard: {}", e);
                    job.fail(e);
                    continue;
                }
            }
        }
        let Some(port) = port.as_mut() else {
            continue;
        };

        match job {
            Job::Sample(reply) => {
                let sample = ClipboardSample {
                    text: port.read_text(),
                    image: port.read_image(),
                };
                let _ = reply.send(sample);
            }
            Job::WriteText(text, reply) => {
                let _ = reply.send(port.write_text(&text));
            }
            Job::WriteImage(image, reply) => {
                let _ = reply.send(port.write_image(&image));
            }
        }
    }

    tracing::debug!("Clipboard worker stopped");
}

impl Job {
    fn fail(self, error: ClipboardError) {
        let message = error.to_string();
        match self {
            Job::Sample(reply) => {
                let _ = reply.send(ClipboardSample {
                    text: Err(error),
                    image: Err(ClipboardError::Unavailable(message)),
                });
            }
            Job::WriteText(_, reply) | Job::WriteImage(_, reply) => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_worker_serves_reads_and_writes() {
        let clipboard = MemoryClipboard::new();
        let handle = ClipboardHandle::spawn({
            let clipboard = clipboard.clone();
            move || Ok(clipboard.clone())
        })
        .unwrap();

        handle.write_text("from the daemon").await.unwrap();
        assert_eq!(clipboard.text().as_deref(), Some("from the daemon"));

        let sample = handle.sample().await;
        assert_eq!(sample.text.unwrap().as_deref(), Some("from the daemon"));
        assert!(sample.image.unwrap().is_none());

        clipboard.set_image(RgbaImage::new(1, 1, vec![1, 2, 3, 4]).unwrap());
        let sample = handle.sample().await;
        assert!(sample.text.unwrap().is_none());
        assert_eq!(sample.image.unwrap().map(|i| i.bytes), Some(vec![1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_worker_retries_opening_backend() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let handle = ClipboardHandle::spawn({
            let attempts = attempts.clone();
            move || {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ClipboardError::Unavailable("no display".to_string()))
                } else {
                    Ok(MemoryClipboard::new())
                }
            }
        })
        .unwrap();

        let first = handle.sample().await;
        assert!(first.text.is_err());
        assert!(first.image.is_err());

        let second = handle.sample().await;
        assert!(matches!(second.text, Ok(None)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
