//! Request sources for the streaming call shapes.
//!
//! A [`RequestSource`] lazily yields the requests a send loop should push.
//! Returning `None` ends the sequence. Sources never yield after their
//! cancellation token fires, so closing the send side (or a process-level
//! cancel) stops production without racing one last request out.

use greeter_core::proto::HelloRequest;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

#[tonic::async_trait]
pub trait RequestSource: Send {
    async fn next(&mut self) -> Option<HelloRequest>;
}

/// Substitutes a fixed name whenever the wall-clock second is a multiple of
/// `every_secs`.
#[derive(Debug, Clone)]
struct Sentinel {
    name: String,
    every_secs: u64,
}

/// Time-paced requests carrying a configured name.
///
/// The first request is produced immediately; each later one waits
/// `interval`. Optionally numbers the names (`"{name} ({i})"`), substitutes a
/// sentinel name on a wall-clock cadence, and stops after `limit` requests.
#[derive(Debug)]
pub struct PacedRequests {
    name: String,
    interval: Duration,
    limit: Option<usize>,
    numbered: bool,
    sentinel: Option<Sentinel>,
    cancel: CancellationToken,
    produced: usize,
}

impl PacedRequests {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            limit: None,
            numbered: false,
            sentinel: None,
            cancel: CancellationToken::new(),
            produced: 0,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn numbered(mut self) -> Self {
        self.numbered = true;
        self
    }

    /// `every_secs` of zero disables the substitution.
    #[must_use]
    pub fn with_sentinel(mut self, name: impl Into<String>, every_secs: u64) -> Self {
        self.sentinel = (every_secs > 0).then(|| Sentinel {
            name: name.into(),
            every_secs,
        });
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    fn current_name(&self) -> String {
        if let Some(sentinel) = &self.sentinel {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            if now % sentinel.every_secs == 0 {
                return sentinel.name.clone();
            }
        }

        if self.numbered {
            format!("{} ({})", self.name, self.produced)
        } else {
            self.name.clone()
        }
    }
}

#[tonic::async_trait]
impl RequestSource for PacedRequests {
    async fn next(&mut self) -> Option<HelloRequest> {
        if self.cancel.is_cancelled() || self.limit.is_some_and(|limit| self.produced >= limit) {
            return None;
        }

        if self.produced > 0 && !self.interval.is_zero() {
            tokio::select! {
                () = self.cancel.cancelled() => return None,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        let name = self.current_name();
        self.produced += 1;
        Some(HelloRequest { name })
    }
}

/// A fixed script of names, yielded without delay.
#[derive(Debug, Default)]
pub struct ScriptedRequests {
    names: VecDeque<String>,
}

impl ScriptedRequests {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[tonic::async_trait]
impl RequestSource for ScriptedRequests {
    async fn next(&mut self) -> Option<HelloRequest> {
        self.names.pop_front().map(|name| HelloRequest { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    async fn drain(source: &mut impl RequestSource) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(req) = source.next().await {
            names.push(req.name);
        }
        names
    }

    #[tokio::test]
    async fn limit_bounds_the_sequence() {
        let mut source = PacedRequests::new("alice", Duration::ZERO).with_limit(Some(3));
        assert_eq!(drain(&mut source).await, ["alice", "alice", "alice"]);
        assert_eq!(source.produced(), 3);
        assert!(source.next().await.is_none());
    }

    #[tokio::test]
    async fn numbered_names() {
        let mut source = PacedRequests::new("bob", Duration::ZERO)
            .numbered()
            .with_limit(Some(3));
        assert_eq!(drain(&mut source).await, ["bob (0)", "bob (1)", "bob (2)"]);
    }

    #[tokio::test]
    async fn sentinel_every_second_always_substitutes() {
        let mut source = PacedRequests::new("carol", Duration::ZERO)
            .with_sentinel("john", 1)
            .with_limit(Some(2));
        assert_eq!(drain(&mut source).await, ["john", "john"]);
    }

    #[tokio::test]
    async fn zero_cadence_disables_sentinel() {
        let mut source = PacedRequests::new("dave", Duration::ZERO)
            .with_sentinel("john", 0)
            .with_limit(Some(1));
        assert_eq!(drain(&mut source).await, ["dave"]);
    }

    #[tokio::test]
    async fn paces_after_first_request() {
        let mut source = PacedRequests::new("erin", Duration::from_millis(30)).with_limit(Some(3));
        let start = Instant::now();
        assert_eq!(drain(&mut source).await.len(), 3);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn cancellation_interrupts_pacing() {
        let cancel = CancellationToken::new();
        let mut source =
            PacedRequests::new("frank", Duration::from_secs(60)).with_cancel(cancel.clone());

        assert!(source.next().await.is_some());

        let waiter = tokio::spawn(async move { source.next().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let next = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("source ignored cancellation")
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn cancelled_source_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut source = PacedRequests::new("gina", Duration::ZERO).with_cancel(cancel);
        assert!(source.next().await.is_none());
        assert_eq!(source.produced(), 0);
    }

    #[tokio::test]
    async fn script_plays_in_order() {
        let mut source = ScriptedRequests::new(["", "john", "x"]);
        assert_eq!(drain(&mut source).await, ["", "john", "x"]);
    }
}
