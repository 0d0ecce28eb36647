use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

const SNAPSHOT_BUFFER: usize = 16;

/// A live stream of snapshots from a store listener.
///
/// Dropping the subscription stops the listener. The stream ends when the listener
/// fails or the underlying store goes away.
pub struct Subscription<T> {
    receiver: mpsc::Receiver<T>,
    _guard: DropGuard,
}

impl<T: Send + 'static> Subscription<T> {
    /// Runs `listener` on the runtime, handing it the sending half of the stream.
    pub fn spawn<F, Fut>(listener: F) -> Self
    where
        F: FnOnce(mpsc::Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(SNAPSHOT_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = listener(sender);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task => {}
            }
        });

        Self {
            receiver,
            _guard: cancel.drop_guard(),
        }
    }

    /// A subscription that yields `value` once and then ends.
    pub fn once(value: T) -> Self {
        Self::spawn(move |sender| async move {
            let _ = sender.send(value).await;
        })
    }
}

impl<T> Subscription<T> {
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}
