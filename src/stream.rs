//! One observer's delivery path, as an async `Stream`.
//!
//! [`EventStream`] wraps the receiving half of a listener's channel
//! together with its registry token. The connection layer (an SSE handler,
//! a test, a CLI tail) simply polls it for [`ProgressEvent`]s; when the
//! observer disconnects the stream is dropped, and `Drop` unregisters the
//! token so the registry cannot grow without bound. An idle stream is not a
//! failure — it stays registered until dropped, however long the quiet
//! period (keep-alive frames are the server layer's job).

use crate::broadcast::{Broadcaster, ListenerToken};
use crate::progress::ProgressEvent;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// A long-lived, server-to-client stream of progress events for one
/// listener.
///
/// Created with [`EventStream::subscribe`]. Ends (yields `None`) only if
/// the broadcaster itself is dropped; otherwise it idles until events
/// arrive or the holder drops it.
pub struct EventStream {
    rx: mpsc::Receiver<ProgressEvent>,
    token: ListenerToken,
    broadcaster: Arc<Broadcaster>,
}

impl EventStream {
    /// Register a new listener on `broadcaster` and return its stream.
    pub fn subscribe(broadcaster: Arc<Broadcaster>) -> Self {
        let (token, rx) = broadcaster.register();
        Self {
            rx,
            token,
            broadcaster,
        }
    }

    /// The registry token backing this stream.
    pub fn token(&self) -> ListenerToken {
        self.token
    }
}

impl Stream for EventStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        // Whichever side notices the disconnect first wins; unregister is
        // idempotent so racing the publish-side pruning is fine.
        self.broadcaster.unregister(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{JobStatus, ProgressEvent};
    use futures::StreamExt;

    #[tokio::test]
    async fn receives_published_events_in_order() {
        let b = Arc::new(Broadcaster::new(8));
        let mut stream = EventStream::subscribe(Arc::clone(&b));

        b.publish(ProgressEvent::step(1, JobStatus::Downloading));
        b.publish(ProgressEvent::complete());

        assert_eq!(stream.next().await.unwrap().step, Some(1));
        assert_eq!(stream.next().await.unwrap().status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn drop_unregisters_the_listener() {
        let b = Arc::new(Broadcaster::new(8));
        let stream = EventStream::subscribe(Arc::clone(&b));
        assert_eq!(b.listener_count(), 1);

        drop(stream);
        assert_eq!(b.listener_count(), 0);
    }

    #[tokio::test]
    async fn independent_streams_do_not_interfere() {
        let b = Arc::new(Broadcaster::new(8));
        let mut keep = EventStream::subscribe(Arc::clone(&b));
        let gone = EventStream::subscribe(Arc::clone(&b));
        drop(gone);

        b.publish(ProgressEvent::step(2, JobStatus::Downloaded));
        assert_eq!(keep.next().await.unwrap().step, Some(2));
    }
}
