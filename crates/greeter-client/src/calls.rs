//! One helper per call shape of the `Greeter` service.
//!
//! Helpers return [`Error::Rpc`](greeter_core::Error::Rpc) for failed calls so
//! callers can classify them through the rich status model. Server streams
//! are the exception: a terminal status after partial delivery is reported
//! alongside the results already received rather than replacing them.

use crate::generator::RequestSource;
use greeter_core::proto::greeter_client::GreeterClient;
use greeter_core::proto::{HelloRequest, StreamingHelloResponse};
use greeter_core::{DuplexChannel, Result, Status};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;

/// Client half of a bidirectional `SayHelloBI` call.
pub type BidiChannel = DuplexChannel<HelloRequest, StreamingHelloResponse>;

/// Everything a server stream delivered before it ended.
#[derive(Debug)]
pub struct StreamOutcome {
    /// Results in the order they were sent.
    pub results: Vec<String>,
    /// `None` when the stream ended cleanly, otherwise the terminal status.
    /// A non-OK status here does not invalidate `results`.
    pub terminal: Option<Status>,
}

pub async fn say_hello_un(client: &mut GreeterClient<Channel>, name: &str) -> Result<String> {
    let request = HelloRequest {
        name: name.to_string(),
    };
    let response = client.say_hello_un(request).await?;
    Ok(response.into_inner().result)
}

pub async fn say_hello_ss(
    client: &mut GreeterClient<Channel>,
    name: &str,
) -> Result<StreamOutcome> {
    let request = HelloRequest {
        name: name.to_string(),
    };
    let mut stream = client.say_hello_ss(request).await?.into_inner();

    let mut results = Vec::new();
    let terminal = loop {
        match stream.message().await {
            Ok(Some(resp)) => {
                tracing::info!("Result : {}", resp.result);
                results.push(resp.result);
            }
            Ok(None) => break None,
            Err(status) => break Some(Status::from(status)),
        }
    };

    Ok(StreamOutcome { results, terminal })
}

/// Streams every request from `source`, half-closes, and returns the single
/// response.
pub async fn say_hello_cs<S>(
    client: &mut GreeterClient<Channel>,
    mut source: S,
    buffer: usize,
) -> Result<String>
where
    S: RequestSource,
{
    let (tx, rx) = mpsc::channel(buffer);

    let feed = async move {
        while let Some(req) = source.next().await {
            tracing::info!("SayHelloCS: Sending {:?}", req);
            if tx.send(req).await.is_err() {
                tracing::info!("SayHelloCS: Client stream is closed");
                break;
            }
        }
        // Dropping `tx` here is the half-close.
    };

    let (response, ()) = tokio::join!(client.say_hello_cs(ReceiverStream::new(rx)), feed);
    Ok(response?.into_inner().result)
}

/// Opens a `SayHelloBI` call and wraps it in a [`BidiChannel`].
pub async fn open_bidi(
    client: &mut GreeterClient<Channel>,
    buffer: usize,
) -> Result<Arc<BidiChannel>> {
    let (tx, rx) = mpsc::channel(buffer);
    let inbound = client
        .say_hello_bi(ReceiverStream::new(rx))
        .await?
        .into_inner();
    Ok(Arc::new(DuplexChannel::new(tx, inbound)))
}
