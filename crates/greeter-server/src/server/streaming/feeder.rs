use crate::server::router::ServerStreamPlan;
use crate::server::telemetry::{increment_stream_errors, increment_stream_frames};
use core::time::Duration;
use greeter_core::Error;
use greeter_core::proto::HelloResponse;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Delivers a server-streaming plan to the response channel.
///
/// Results are sent in order with `interval` between them. After the last
/// result the plan's terminal status is sent when it is not OK; an OK plan
/// just drops the sender, which ends the stream cleanly.
///
/// # Behavior
///
/// - Exits early if the client disconnects (the response channel closes).
/// - On service shutdown, ends the stream with `UNAVAILABLE` instead of the
///   remaining results.
pub async fn feed_results(
    plan: ServerStreamPlan,
    resp_tx: mpsc::Sender<Result<HelloResponse, Status>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let total = plan.results.len();

    for (i, result) in plan.results.into_iter().enumerate() {
        if shutdown.is_cancelled() {
            let _ = resp_tx.send(Err(Error::ServiceShutdown.into())).await;
            return;
        }

        if let Err(e) = resp_tx.send(Ok(HelloResponse { result })).await {
            tracing::debug!("SayHelloSS: Send error : {}", e);
            increment_stream_errors();
            return;
        }
        increment_stream_frames();
        tracing::info!("SayHelloSS: Sent result {} of {}", i + 1, total);

        if i + 1 < total && !interval.is_zero() {
            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(interval) => {}
            }
        }
    }

    if !plan.terminal.is_ok() {
        tracing::info!("SayHelloSS: End with {}", plan.terminal);
        if let Err(e) = resp_tx.send(Err(plan.terminal.into())).await {
            tracing::debug!("SayHelloSS: Failed to forward terminal status: {}", e);
        }
    } else {
        tracing::info!("SayHelloSS: End");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greeter_core::Code;

    fn plan(n: usize, terminal: greeter_core::Status) -> ServerStreamPlan {
        ServerStreamPlan {
            results: (0..n).map(|i| format!("r{i}")).collect(),
            terminal,
        }
    }

    async fn collect(
        mut rx: mpsc::Receiver<Result<HelloResponse, Status>>,
    ) -> (Vec<String>, Option<Status>) {
        let mut results = Vec::new();
        while let Some(item) = rx.recv().await {
            match item {
                Ok(resp) => results.push(resp.result),
                Err(status) => return (results, Some(status)),
            }
        }
        (results, None)
    }

    #[tokio::test]
    async fn results_then_terminal_status() {
        let (tx, rx) = mpsc::channel(8);
        let terminal = greeter_core::Status::invalid_argument("Disconnect Server Streaming");
        feed_results(plan(3, terminal), tx, Duration::ZERO, CancellationToken::new()).await;

        let (results, status) = collect(rx).await;
        assert_eq!(results, ["r0", "r1", "r2"]);
        assert_eq!(status.unwrap().code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn ok_plan_ends_cleanly() {
        let (tx, rx) = mpsc::channel(8);
        feed_results(
            plan(2, greeter_core::Status::ok()),
            tx,
            Duration::ZERO,
            CancellationToken::new(),
        )
        .await;

        let (results, status) = collect(rx).await;
        assert_eq!(results.len(), 2);
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn shutdown_ends_with_unavailable() {
        let (tx, rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        feed_results(plan(3, greeter_core::Status::ok()), tx, Duration::ZERO, shutdown).await;

        let (results, status) = collect(rx).await;
        assert!(results.is_empty());
        assert_eq!(status.unwrap().code(), Code::Unavailable);
    }

    #[tokio::test]
    async fn stops_when_client_goes_away() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // Must return rather than block on a closed channel.
        tokio::time::timeout(
            Duration::from_secs(1),
            feed_results(
                plan(3, greeter_core::Status::ok()),
                tx,
                Duration::from_millis(10),
                CancellationToken::new(),
            ),
        )
        .await
        .unwrap();
    }
}
