//! Frame-driven polling for the few asynchronous operations (model loads,
//! session handshake). Nothing here blocks: a future that is not ready simply
//! gets polled again on the next frame.

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use std::task::{Context, Poll};

/// Poll once with a no-op waker. The frame loop is the only wake source.
pub fn poll_once<T>(future: &mut LocalBoxFuture<'static, T>) -> Poll<T> {
    let mut cx = Context::from_waker(noop_waker_ref());
    future.poll_unpin(&mut cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;

    #[test]
    fn ready_future_resolves_on_first_poll() {
        let mut fut = async { 7 }.boxed_local();
        assert_eq!(poll_once(&mut fut), Poll::Ready(7));
    }

    #[test]
    fn pending_until_sender_fires() {
        let (tx, rx) = oneshot::channel::<u32>();
        let mut fut = rx.map(|r| r.unwrap_or(0)).boxed_local();
        assert!(poll_once(&mut fut).is_pending());
        tx.send(3).unwrap();
        assert_eq!(poll_once(&mut fut), Poll::Ready(3));
    }
}
