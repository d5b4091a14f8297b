//! Listener fan-in: merges the heterogeneous set of event sources (transaction
//! log subscriptions, block-confirmation sweeps, the PumpPortal sidecar index,
//! and DexScreener's third-party listing feed) into one deduped `TokenEvent`
//! channel.
//!
//! Mirrors [`crate::stream::backpressure::BackpressureChannel`]'s
//! newest-preferred drop policy: a stale opportunity is worthless, so once
//! the channel is full the oldest unread event is evicted rather than the
//! new one.

pub mod adapters;
pub mod dedup;

use std::time::Instant;

use crate::stream::backpressure::{BackpressureChannel, DropPolicy};

pub use dedup::DedupLru;

/// Which launch surface a token was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// pump.fun bonding curve
    PumpFun,
    /// another bonding-curve launchpad (LetsBonk, Believe, etc.)
    OtherLaunchpad,
    /// already graduated to a standalone AMM pool
    GraduatedAmm,
}

/// Which adapter produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// Parsed from a pump.fun `create` instruction seen in a transaction-log
    /// subscription (ShredStream today; a raw `logsSubscribe` tomorrow).
    TransactionLogs,
    /// Parsed from a confirmed block swept for pump.fun instructions.
    BlockConfirmations,
    /// PumpPortal's `subscribeNewToken` sidecar index.
    PumpPortal,
    /// DexScreener's token-profiles/boosts listing, polled.
    DexScreenerPoll,
}

/// One newly observed token, normalized from whichever adapter saw it first.
#[derive(Debug, Clone)]
pub struct TokenEvent {
    pub mint_address: String,
    pub creator_address: String,
    /// Monotonic, not wall-clock: only used for ordering/age within a run.
    pub discovered_at: Instant,
    pub source: EventSource,
    /// Native-asset amount in the smallest unit (lamports).
    pub initial_liquidity_base: u64,
    pub platform: Platform,
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// A raw payload an adapter could not parse into a [`TokenEvent`], kept for
/// observability rather than silently dropped.
#[derive(Debug, Clone)]
pub struct UnparseableEvent {
    pub source: EventSource,
    pub raw_payload: Vec<u8>,
    pub reason: String,
    pub received_at: Instant,
}

/// Fan-in coordinator: owns the dedup window and the merged output channel.
pub struct FanIn {
    channel: BackpressureChannel<TokenEvent>,
    dedup: DedupLru,
    unparseable: std::sync::Mutex<Vec<UnparseableEvent>>,
}

impl FanIn {
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy, dedup_capacity: usize, dedup_window: std::time::Duration) -> Self {
        Self {
            channel: BackpressureChannel::new(channel_capacity, drop_policy),
            dedup: DedupLru::new(dedup_capacity, dedup_window),
            unparseable: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Apply the dedup window and, if this is the first observation of the
    /// mint within the window, forward the event into the merged channel.
    /// Returns `true` if the event propagated, `false` if it was a duplicate.
    pub async fn ingest(&self, event: TokenEvent) -> bool {
        let is_priority = matches!(event.source, EventSource::TransactionLogs);
        if !self.dedup.observe(&event.mint_address) {
            return false;
        }
        if let Err(e) = self.channel.send(event, is_priority).await {
            tracing::warn!(error = %e, "fan-in channel send failed");
        }
        true
    }

    /// Record a payload an adapter couldn't parse. Kept for observability;
    /// never blocks the merged stream.
    pub fn ingest_unparseable(&self, event: UnparseableEvent) {
        tracing::debug!(source = ?event.source, reason = %event.reason, "unparseable event");
        if let Ok(mut log) = self.unparseable.lock() {
            if log.len() >= 1024 {
                log.remove(0);
            }
            log.push(event);
        }
    }

    pub async fn recv(&self) -> Option<TokenEvent> {
        self.channel.recv().await.map(|p| p.event)
    }

    pub fn dropped_count(&self) -> u64 {
        self.channel.dropped_count()
    }

    /// How many times a mint has been observed across all adapters,
    /// including the first (propagated) observation. Used for
    /// cross-source confirmation scoring.
    pub fn confirmation_count(&self, mint: &str) -> u32 {
        self.dedup.observation_count(mint)
    }

    pub fn unparseable_snapshot(&self) -> Vec<UnparseableEvent> {
        self.unparseable.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(mint: &str, source: EventSource) -> TokenEvent {
        TokenEvent {
            mint_address: mint.to_string(),
            creator_address: "creator".to_string(),
            discovered_at: Instant::now(),
            source,
            initial_liquidity_base: 1_000_000_000,
            platform: Platform::PumpFun,
            name: "Test".to_string(),
            symbol: "TST".to_string(),
            uri: "uri".to_string(),
        }
    }

    #[tokio::test]
    async fn first_observation_propagates() {
        let fanin = FanIn::new(16, DropPolicy::OldestNonPriority, 64, std::time::Duration::from_secs(60));
        assert!(fanin.ingest(event("M1", EventSource::PumpPortal)).await);
        let received = fanin.recv().await.unwrap();
        assert_eq!(received.mint_address, "M1");
    }

    #[tokio::test]
    async fn duplicate_within_window_does_not_propagate() {
        let fanin = FanIn::new(16, DropPolicy::OldestNonPriority, 64, std::time::Duration::from_secs(60));
        assert!(fanin.ingest(event("M1", EventSource::PumpPortal)).await);
        let _ = fanin.recv().await;
        assert!(!fanin.ingest(event("M1", EventSource::DexScreenerPoll)).await);
        assert_eq!(fanin.confirmation_count("M1"), 2);
    }

    #[tokio::test]
    async fn unparseable_events_are_retained_for_observability() {
        let fanin = FanIn::new(16, DropPolicy::OldestNonPriority, 64, std::time::Duration::from_secs(60));
        fanin.ingest_unparseable(UnparseableEvent {
            source: EventSource::TransactionLogs,
            raw_payload: vec![1, 2, 3],
            reason: "short instruction data".to_string(),
            received_at: Instant::now(),
        });
        assert_eq!(fanin.unparseable_snapshot().len(), 1);
    }
}
