//! Duplex stream channel: one logical call, two independent directions.
//!
//! A [`DuplexChannel`] wraps the outbound queue that feeds a streaming call
//! and the inbound message stream it produces. The two directions are locked
//! separately, so one `send` and one `recv` can be in flight at the same time
//! while concurrent sends (and concurrent receives) are serialized against
//! each other.
//!
//! ## Lifecycle
//!
//! - `send` fails with [`Error::SendClosed`] once [`Duplex::close_send`] has
//!   been called or the transport has stopped accepting messages. A send
//!   waiting on a full queue is released by `close_send` with the same error.
//! - `recv` yields `Ok(None)` when the peer has finished sending. That is a
//!   normal end of stream, not an error. A failed call yields
//!   [`Error::Rpc`] carrying the decoded terminal status.
//! - `close_send` is idempotent and leaves the receive side untouched.
//!
//! The same type serves both ends of a call. On the server the outbound item
//! is `Result<T, tonic::Status>`, which additionally enables
//! [`DuplexChannel::terminate`].

use crate::error::{Error, Result};
use crate::status::Status;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// The operations a streaming call exposes to the loops driving it.
#[tonic::async_trait]
pub trait Duplex: Send + Sync {
    type Outbound: Send;
    type Inbound: Send;

    /// Queues one message on the outbound direction. Waits only until the
    /// transport accepts it or fails.
    async fn send(&self, msg: Self::Outbound) -> Result<()>;

    /// Waits for the next inbound message. `Ok(None)` is end of stream.
    async fn recv(&self) -> Result<Option<Self::Inbound>>;

    /// Finishes the local send side. Idempotent.
    async fn close_send(&self);

    fn is_send_closed(&self) -> bool;

    /// A token cancelled when the send side closes, for producers that need to
    /// stop generating messages.
    fn send_closed(&self) -> CancellationToken;
}

pub struct DuplexChannel<Out, In> {
    outbound: Mutex<Option<mpsc::Sender<Out>>>,
    inbound: Mutex<BoxStream<'static, core::result::Result<In, tonic::Status>>>,
    send_closed: CancellationToken,
}

impl<Out, In> DuplexChannel<Out, In>
where
    Out: Send + 'static,
    In: Send + 'static,
{
    /// Builds a channel from the sender feeding the call's request stream and
    /// the call's response stream.
    pub fn new<S>(outbound: mpsc::Sender<Out>, inbound: S) -> Self
    where
        S: Stream<Item = core::result::Result<In, tonic::Status>> + Send + 'static,
    {
        Self {
            outbound: Mutex::new(Some(outbound)),
            inbound: Mutex::new(inbound.boxed()),
            send_closed: CancellationToken::new(),
        }
    }
}

#[tonic::async_trait]
impl<Out, In> Duplex for DuplexChannel<Out, In>
where
    Out: Send + 'static,
    In: Send + 'static,
{
    type Outbound = Out;
    type Inbound = In;

    async fn send(&self, msg: Out) -> Result<()> {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            return Err(Error::SendClosed);
        };
        // A send parked on a full queue gives up as soon as the send side is
        // closed, which also releases the lock for `close_send`.
        tokio::select! {
            biased;
            () = self.send_closed.cancelled() => Err(Error::SendClosed),
            // A dropped receiver means the transport has torn the call down;
            // the reason, if any, surfaces on the receive side.
            sent = tx.send(msg) => sent.map_err(|_| Error::SendClosed),
        }
    }

    async fn recv(&self) -> Result<Option<In>> {
        let mut inbound = self.inbound.lock().await;
        match inbound.next().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(status)) => Err(Error::Rpc(Status::from(status))),
            None => Ok(None),
        }
    }

    async fn close_send(&self) {
        // Cancel before locking: a send blocked on back-pressure holds the
        // lock until it sees the token.
        self.send_closed.cancel();
        self.outbound.lock().await.take();
    }

    fn is_send_closed(&self) -> bool {
        self.send_closed.is_cancelled()
    }

    fn send_closed(&self) -> CancellationToken {
        self.send_closed.clone()
    }
}

impl<T, In> DuplexChannel<core::result::Result<T, tonic::Status>, In>
where
    T: Send + 'static,
    In: Send + 'static,
{
    /// Ends the call with `status` as the outcome the peer sees on its next
    /// receive, then closes the send side. An OK status just closes.
    pub async fn terminate(&self, status: Status) -> Result<()> {
        let result = if status.is_ok() {
            Ok(())
        } else {
            self.send(Err(status.into())).await
        };
        self.close_send().await;
        result
    }
}
