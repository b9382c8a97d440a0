//! Bidirectional stream driver.
//!
//! [`run`] drives one duplex call with two tasks: a send loop pulling from a
//! [`RequestSource`] and a receive loop delivering [`StreamingReply`] frames.
//! The tasks share nothing but the channel and are joined once at the end.
//! Neither loop's exit preempts the other: a send loop that finishes early
//! half-closes the call and the receive loop keeps draining until the peer
//! closes or fails; a failed receive loop does not stop the sender.

use crate::classify;
use crate::generator::RequestSource;
use greeter_core::proto::{HelloRequest, StreamingHelloResponse};
use greeter_core::{Code, Duplex, Error, StreamingReply};
use std::sync::Arc;

/// How one direction of the call stopped. Terminal once reached.
#[derive(Debug)]
pub enum LoopExit {
    /// The direction ended normally: the source ran dry on the send side, or
    /// the peer finished sending on the receive side.
    ///
    /// A send rejected because the peer already ended the call also lands
    /// here, as gRPC clients report `EOF` from send in that case. Why the call
    /// ended is reported by the receive side.
    Eof,
    /// The send side was closed from outside before the source ran dry.
    Cancelled,
    Failed(Error),
}

impl LoopExit {
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

/// Outcome of a bidirectional call once both loops have stopped.
#[derive(Debug)]
pub struct BidiReport {
    pub send: LoopExit,
    pub recv: LoopExit,
    /// Requests the transport accepted.
    pub sent: usize,
    /// Frames delivered, in arrival order.
    pub frames: Vec<StreamingReply>,
}

impl BidiReport {
    pub fn results(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().filter_map(StreamingReply::as_result)
    }

    pub fn statuses(&self) -> impl Iterator<Item = &greeter_core::Status> {
        self.frames.iter().filter_map(StreamingReply::as_status)
    }
}

/// Runs the send and receive loops over `channel` and waits for both.
pub async fn run<D, S>(channel: Arc<D>, source: S) -> BidiReport
where
    D: Duplex<Outbound = HelloRequest, Inbound = StreamingHelloResponse> + 'static,
    S: RequestSource + 'static,
{
    let send = tokio::spawn(send_loop(Arc::clone(&channel), source));
    let recv = tokio::spawn(recv_loop(channel));

    let (send, recv) = tokio::join!(send, recv);

    let (send, sent) = send.unwrap_or_else(|e| {
        (
            LoopExit::Failed(Error::ChannelError {
                context: format!("send loop aborted: {e}"),
            }),
            0,
        )
    });
    let (recv, frames) = recv.unwrap_or_else(|e| {
        (
            LoopExit::Failed(Error::ChannelError {
                context: format!("receive loop aborted: {e}"),
            }),
            Vec::new(),
        )
    });

    tracing::info!(
        "Bidirectional call finished: sent {}, received {} frame(s), send {:?}, recv {:?}",
        sent,
        frames.len(),
        send,
        recv
    );

    BidiReport {
        send,
        recv,
        sent,
        frames,
    }
}

async fn send_loop<D, S>(channel: Arc<D>, mut source: S) -> (LoopExit, usize)
where
    D: Duplex<Outbound = HelloRequest> + 'static,
    S: RequestSource,
{
    let mut sent = 0;

    let exit = loop {
        let Some(req) = source.next().await else {
            break if channel.is_send_closed() {
                LoopExit::Cancelled
            } else {
                LoopExit::Eof
            };
        };
        if channel.is_send_closed() {
            break LoopExit::Cancelled;
        }

        tracing::debug!("Sending {:?}", req);
        match channel.send(req).await {
            Ok(()) => sent += 1,
            Err(Error::SendClosed) => {
                tracing::info!("Client stream is closed");
                break if channel.is_send_closed() {
                    LoopExit::Cancelled
                } else {
                    LoopExit::Eof
                };
            }
            Err(e) => {
                classify::report(&e);
                break LoopExit::Failed(e);
            }
        }
    };

    channel.close_send().await;
    (exit, sent)
}

async fn recv_loop<D>(channel: Arc<D>) -> (LoopExit, Vec<StreamingReply>)
where
    D: Duplex<Inbound = StreamingHelloResponse> + 'static,
{
    let mut frames = Vec::new();

    let exit = loop {
        match channel.recv().await {
            Ok(Some(frame)) => match StreamingReply::try_from(frame) {
                Ok(reply) => {
                    log_reply(&reply);
                    frames.push(reply);
                }
                Err(e) => {
                    tracing::warn!("Protocol error: {}", e);
                    break LoopExit::Failed(e);
                }
            },
            Ok(None) => {
                tracing::info!("Server stream is closed");
                break LoopExit::Eof;
            }
            Err(e) => {
                classify::report(&e);
                break LoopExit::Failed(e);
            }
        }
    };

    (exit, frames)
}

fn log_reply(reply: &StreamingReply) {
    match reply {
        StreamingReply::Result(text) => tracing::info!("Result: {}", text),
        StreamingReply::Status(status) if status.code() == Code::Ok => {
            tracing::info!("Status: {}", status);
        }
        StreamingReply::Status(status) => {
            for line in classify::describe(status) {
                tracing::warn!("{}", line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ScriptedRequests;
    use greeter_core::proto::streaming_hello_response::Response;
    use greeter_core::{DuplexChannel, Status};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    type Inbound = Result<StreamingHelloResponse, tonic::Status>;

    struct Peer {
        requests: mpsc::Receiver<HelloRequest>,
        frames: mpsc::Sender<Inbound>,
    }

    fn call() -> (Arc<DuplexChannel<HelloRequest, StreamingHelloResponse>>, Peer) {
        let (req_tx, req_rx) = mpsc::channel(8);
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let channel = DuplexChannel::new(req_tx, ReceiverStream::new(frame_rx));
        (
            Arc::new(channel),
            Peer {
                requests: req_rx,
                frames: frame_tx,
            },
        )
    }

    fn result(text: &str) -> Inbound {
        Ok(StreamingReply::result(text).into())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waits_for_receive_after_immediate_close_send() {
        let (channel, mut peer) = call();

        let peer_task = tokio::spawn(async move {
            // Client half-closes straight away.
            assert!(peer.requests.recv().await.is_none());
            tokio::time::sleep(Duration::from_millis(50)).await;
            peer.frames.send(result("late")).await.unwrap();
        });

        let report = run(channel, ScriptedRequests::default()).await;
        peer_task.await.unwrap();

        assert!(report.send.is_eof());
        assert!(report.recv.is_eof());
        assert_eq!(report.sent, 0);
        assert_eq!(report.results().collect::<Vec<_>>(), ["late"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn status_frames_do_not_end_the_stream() {
        let (channel, mut peer) = call();

        let peer_task = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(req) = peer.requests.recv().await {
                let frame = match req.name.as_str() {
                    "" => Some(Ok(StreamingReply::from(Status::invalid_argument(
                        "Name is blank",
                    ))
                    .into())),
                    "john" => Some(result("I like john.")),
                    _ => None,
                };
                if let Some(frame) = frame {
                    peer.frames.send(frame).await.unwrap();
                }
                seen.push(req.name);
            }
            seen
        });

        let report = run(channel, ScriptedRequests::new(["", "x", "john", "y"])).await;
        let seen = peer_task.await.unwrap();

        assert_eq!(seen, ["", "x", "john", "y"]);
        assert_eq!(report.sent, 4);
        assert!(report.recv.is_eof());
        let statuses: Vec<_> = report.statuses().collect();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].code(), Code::InvalidArgument);
        assert_eq!(report.results().collect::<Vec<_>>(), ["I like john."]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn send_failure_does_not_abandon_receive() {
        let (channel, peer) = call();
        let Peer { requests, frames } = peer;
        // The peer stops reading requests but keeps talking.
        drop(requests);

        let peer_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            frames.send(result("still here")).await.unwrap();
        });

        let report = run(channel, ScriptedRequests::new(["a", "b"])).await;
        peer_task.await.unwrap();

        assert!(report.send.is_eof());
        assert_eq!(report.sent, 0);
        assert!(report.recv.is_eof());
        assert_eq!(report.results().collect::<Vec<_>>(), ["still here"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn receive_failure_is_recorded_with_status() {
        let (channel, mut peer) = call();

        let peer_task = tokio::spawn(async move {
            while peer.requests.recv().await.is_some() {}
            peer.frames
                .send(Err(tonic::Status::unavailable("going away")))
                .await
                .unwrap();
        });

        let report = run(channel, ScriptedRequests::new(["a"])).await;
        peer_task.await.unwrap();

        assert!(report.send.is_eof());
        assert_eq!(report.sent, 1);
        match &report.recv {
            LoopExit::Failed(err) => {
                assert_eq!(err.status().unwrap().code(), Code::Unavailable);
            }
            other => panic!("unexpected receive exit: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_frame_is_a_protocol_error() {
        let (channel, mut peer) = call();

        let peer_task = tokio::spawn(async move {
            while peer.requests.recv().await.is_some() {}
            peer.frames
                .send(Ok(StreamingHelloResponse { response: None }))
                .await
                .unwrap();
        });

        let report = run(channel, ScriptedRequests::default()).await;
        peer_task.await.unwrap();

        assert!(matches!(report.recv, LoopExit::Failed(Error::EmptyFrame)));
        assert!(report.frames.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn external_close_cancels_sending() {
        let (channel, mut peer) = call();
        let source = crate::generator::PacedRequests::new("loop", Duration::from_millis(10))
            .with_cancel(channel.send_closed());

        let closer = Arc::clone(&channel);
        let peer_task = tokio::spawn(async move {
            let mut count = 0;
            while peer.requests.recv().await.is_some() {
                count += 1;
                if count == 3 {
                    closer.close_send().await;
                }
            }
            peer.frames
                .send(Ok(StreamingHelloResponse {
                    response: Some(Response::Result("bye".to_string())),
                }))
                .await
                .unwrap();
            count
        });

        let report = run(channel, source).await;
        let count = peer_task.await.unwrap();

        assert!(matches!(report.send, LoopExit::Cancelled));
        assert_eq!(report.sent, count);
        assert!(count >= 3);
        assert_eq!(report.results().collect::<Vec<_>>(), ["bye"]);
    }
}
