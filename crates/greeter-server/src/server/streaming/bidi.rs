use crate::server::router::ResponsePolicy;
use crate::server::telemetry::{increment_stream_errors, increment_stream_frames};
use greeter_core::proto::{HelloRequest, StreamingHelloResponse};
use greeter_core::{Duplex, DuplexChannel, Error};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Server half of a `SayHelloBI` call.
pub type ServerDuplex = DuplexChannel<Result<StreamingHelloResponse, Status>, HelloRequest>;

/// Answers each inbound request on a bidirectional stream.
///
/// Every request is handed to the policy, and whatever frames it returns are
/// sent back in order. Status frames are informational; the stream stays
/// open. The loop ends when:
///
/// - the client half-closes: the server closes its side cleanly,
/// - the inbound direction fails: the failure is propagated as the call's
///   status,
/// - the client stops reading: the send fails and the loop exits,
/// - the service shuts down: the call ends with `UNAVAILABLE`.
pub async fn serve_bidi<P: ResponsePolicy>(
    channel: ServerDuplex,
    policy: Arc<P>,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => {
                tracing::debug!("SayHelloBI: Terminating for shutdown");
                let _ = channel.terminate(Error::ServiceShutdown.into()).await;
                return;
            }
            next = channel.recv() => next,
        };

        let req = match next {
            Ok(Some(req)) => req,
            Ok(None) => {
                tracing::info!("SayHelloBI: Client stream is closed");
                channel.close_send().await;
                return;
            }
            Err(e) => {
                tracing::warn!("SayHelloBI: Recv() error : {}", e);
                increment_stream_errors();
                let _ = channel.terminate(e.into()).await;
                return;
            }
        };

        tracing::info!("SayHelloBI: Received: {:?}", req);

        for reply in policy.bidi(&req) {
            if let Err(e) = channel.send(Ok(reply.into())).await {
                tracing::debug!("SayHelloBI: Send error : {}", e);
                increment_stream_errors();
                return;
            }
            increment_stream_frames();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::test_config;
    use crate::server::router::GreeterPolicy;
    use greeter_core::{Code, StreamingReply};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    struct Client {
        requests: mpsc::Sender<Result<HelloRequest, Status>>,
        frames: mpsc::Receiver<Result<StreamingHelloResponse, Status>>,
    }

    fn start(shutdown: CancellationToken) -> (Client, tokio::task::JoinHandle<()>) {
        let (req_tx, req_rx) = mpsc::channel(8);
        let (frame_tx, frame_rx) = mpsc::channel(8);
        let channel = DuplexChannel::new(frame_tx, ReceiverStream::new(req_rx));
        let policy = Arc::new(GreeterPolicy::new(&test_config(&[])));
        let task = tokio::spawn(serve_bidi(channel, policy, shutdown));
        (
            Client {
                requests: req_tx,
                frames: frame_rx,
            },
            task,
        )
    }

    fn hello(name: &str) -> Result<HelloRequest, Status> {
        Ok(HelloRequest {
            name: name.to_string(),
        })
    }

    #[tokio::test]
    async fn replies_per_request_and_closes_after_client() {
        let (mut client, task) = start(CancellationToken::new());
        for name in ["nobody", "", "john"] {
            client.requests.send(hello(name)).await.unwrap();
        }
        drop(client.requests);

        let mut replies = Vec::new();
        while let Some(frame) = client.frames.recv().await {
            replies.push(StreamingReply::try_from(frame.unwrap()).unwrap());
        }
        task.await.unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[0].as_status().unwrap().code(),
            Code::InvalidArgument
        );
        assert_eq!(replies[1].as_result(), Some("I like john."));
    }

    #[tokio::test]
    async fn inbound_failure_becomes_call_status() {
        let (mut client, task) = start(CancellationToken::new());
        client
            .requests
            .send(Err(Status::cancelled("client went away")))
            .await
            .unwrap();

        let status = client.frames.recv().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::Cancelled);
        assert!(client.frames.recv().await.is_none());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_terminates_open_stream() {
        let shutdown = CancellationToken::new();
        let (mut client, task) = start(shutdown.clone());

        client.requests.send(hello("john")).await.unwrap();
        let first = client.frames.recv().await.unwrap().unwrap();
        assert!(StreamingReply::try_from(first).unwrap().as_result().is_some());

        shutdown.cancel();
        let status = tokio::time::timeout(Duration::from_secs(1), client.frames.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
        task.await.unwrap();
    }
}
