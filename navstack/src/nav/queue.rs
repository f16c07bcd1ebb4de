use anyhow::Result;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::nav::{Dispatcher, NavError};

type Instruction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Serializes popup show/hide requests.
///
/// Any task may enqueue; a single consumer runs one instruction at a time on
/// the UI dispatcher and waits for its whole async body (animations included)
/// before starting the next.
pub struct InstructionQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<Instruction>>>,
}

impl InstructionQueue {
    /// Spawn the consumer on the current tokio runtime
    pub fn start(dispatcher: Arc<dyn Dispatcher>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Instruction>();

        tokio::spawn(async move {
            while let Some(instruction) = receiver.recv().await {
                let (done_tx, done_rx) = oneshot::channel::<()>();
                dispatcher.run_on_ui(Box::pin(async move {
                    instruction().await;
                    let _ = done_tx.send(());
                }));
                // A dropped UI task still frees the queue
                let _ = done_rx.await;
            }
            log::debug!("Popup instruction queue closed");
        });

        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Enqueue `operation` and wait for its result
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let instruction: Instruction = Box::new(move || {
            Box::pin(async move {
                let _ = result_tx.send(operation().await);
            })
        });

        {
            let sender = self.sender.lock();
            let sender = sender.as_ref().ok_or(NavError::ShutDown)?;
            sender.send(instruction).map_err(|_| NavError::ShutDown)?;
        }

        result_rx.await.map_err(|_| NavError::ShutDown)?
    }

    /// Stop accepting instructions; queued ones still run
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            log::debug!("Closing popup instruction queue");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}
