use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// A closed queue of work items shared by the workers of one stage.
///
/// Every item is enqueued up front and the sending side is dropped, so
/// workers see `None` once the queue has drained.
pub struct WorkQueue<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for item in items {
            if tx.send(item).is_err() {
                break;
            }
        }
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Takes the next item, or `None` when the queue is exhausted.
    pub async fn next(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}
