use anyhow::Context;
use clap::Parser;
use greeter_client::calls::{self, StreamOutcome};
use greeter_client::config::{CliArgs, ClientConfig, Mode};
use greeter_client::coordinator;
use greeter_client::generator::PacedRequests;
use greeter_client::{classify, logging};
use greeter_core::Duplex;
use greeter_core::proto::greeter_client::GreeterClient;
use std::sync::Arc;
use tokio::signal;
use tonic::codec::CompressionEncoding;
use tonic::transport::{Channel, Endpoint};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let config = ClientConfig::try_from(CliArgs::parse())?;
    logging::init_logging();

    let channel = Endpoint::from_shared(config.addr.clone())
        .with_context(|| format!("invalid address `{}`", config.addr))?
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", config.addr))?;

    let mut client = GreeterClient::new(channel)
        .send_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Gzip);

    // Per-call failures are reported, never turned into a non-zero exit.
    match config.mode {
        Mode::Un => unary(&mut client, &config).await,
        Mode::Ss => server_stream(&mut client, &config).await,
        Mode::Cs => client_stream(&mut client, &config).await,
        Mode::Bi => bidi(&mut client, &config).await,
    }

    Ok(())
}

async fn unary(client: &mut GreeterClient<Channel>, config: &ClientConfig) {
    match calls::say_hello_un(client, &config.name).await {
        Ok(result) => println!("Result : {result}"),
        Err(e) => classify::report(&e),
    }
}

async fn server_stream(client: &mut GreeterClient<Channel>, config: &ClientConfig) {
    match calls::say_hello_ss(client, &config.name).await {
        Ok(StreamOutcome { results, terminal }) => {
            for result in &results {
                println!("Result : {result}");
            }
            match terminal {
                Some(status) if !status.is_ok() => {
                    for line in classify::describe(&status) {
                        tracing::warn!("{}", line);
                    }
                }
                _ => tracing::info!("SayHelloSS: Server stream is closed"),
            }
        }
        Err(e) => classify::report(&e),
    }
}

async fn client_stream(client: &mut GreeterClient<Channel>, config: &ClientConfig) {
    let source = PacedRequests::new(config.name.clone(), config.interval)
        .numbered()
        .with_limit(Some(config.count));

    match calls::say_hello_cs(client, source, config.buffer).await {
        Ok(result) => println!("Result : {result}"),
        Err(e) => classify::report(&e),
    }
}

async fn bidi(client: &mut GreeterClient<Channel>, config: &ClientConfig) {
    tracing::info!("SayHelloBI: Start");

    let channel = match calls::open_bidi(client, config.buffer).await {
        Ok(channel) => channel,
        Err(e) => {
            classify::report(&e);
            return;
        }
    };

    let source = PacedRequests::new(config.name.clone(), config.interval)
        .with_sentinel(config.sentinel.clone(), config.sentinel_every_secs)
        .with_limit(config.limit)
        .with_cancel(channel.send_closed());

    let closer = Arc::clone(&channel);
    let ctrl_c = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C signal, closing send side");
            closer.close_send().await;
        }
    });

    let report = coordinator::run(channel, source).await;
    ctrl_c.abort();

    tracing::info!(
        "SayHelloBI: End ({} sent, {} result(s), {} status frame(s))",
        report.sent,
        report.results().count(),
        report.statuses().count()
    );
}
