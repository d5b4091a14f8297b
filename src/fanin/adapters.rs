//! Per-source adapters: each owns (or is handed) its subscription/poll
//! source, parses raw payloads into [`TokenEvent`] or [`UnparseableEvent`],
//! and tags the result with the [`EventSource`] that produced it.
//!
//! Four source types per §4.2: a push subscription over transaction logs
//! (ShredStream), a push subscription over block confirmations (same
//! transport, different granularity — both land on
//! [`crate::stream::shredstream::StreamEvent::Transaction`] here), a push
//! subscription over the PumpPortal sidecar index, and a pull-based poll of
//! DexScreener's third-party listing feed.

use std::time::Instant;

use solana_sdk::pubkey::Pubkey;
use tokio::sync::mpsc;
use tracing::warn;

use crate::fanin::{EventSource, FanIn, Platform, TokenEvent, UnparseableEvent};
use crate::pump::instruction::{CreateAccounts, PumpInstruction};
use crate::stream::pumpportal::PumpPortalEvent;
use crate::stream::shredstream::StreamEvent as ShredEvent;

/// Parses a raw ShredStream transaction event into a [`TokenEvent`] if (and
/// only if) it's a pump.fun `create` instruction. Anything else — buys,
/// sells, non-pump.fun programs — is simply not a token event and is
/// dropped without counting as unparseable (it parsed fine; it just isn't
/// what this adapter is looking for).
fn parse_transaction_event(
    event: &crate::stream::shredstream::TransactionEvent,
    source: EventSource,
) -> Result<Option<TokenEvent>, String> {
    if !event.is_pump_fun {
        return Ok(None);
    }

    let instruction = PumpInstruction::parse(&event.data).map_err(|e| e.to_string())?;
    let create = match instruction {
        PumpInstruction::Create(create) => create,
        _ => return Ok(None),
    };

    let pubkeys: Vec<Pubkey> = event
        .accounts
        .iter()
        .map(|s| {
            Pubkey::try_from(s.as_str()).map_err(|_| format!("unparseable account pubkey: {}", s))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let accounts = CreateAccounts::parse(&pubkeys).map_err(|e| e.to_string())?;

    Ok(Some(TokenEvent {
        mint_address: accounts.mint.to_string(),
        creator_address: accounts.user.to_string(),
        discovered_at: Instant::now(),
        source,
        // Transaction-log/block adapters observe the create instruction
        // itself, before any buy has landed; initial liquidity is reported
        // by the bonding-curve account state, which this adapter does not
        // fetch (that's a enrichment concern downstream of fan-in).
        initial_liquidity_base: 0,
        platform: Platform::PumpFun,
        name: create.name,
        symbol: create.symbol,
        uri: create.uri,
    }))
}

/// Drains a ShredStream channel of raw transaction events, forwarding
/// pump.fun `create`s into the fan-in and recording anything that fails to
/// parse as [`UnparseableEvent`]. Runs until the channel closes (the
/// failover client's reconnect policy keeps it open across transient
/// disconnects; a [`ShredEvent::Disconnected`] here is surfaced as a gap,
/// not treated as a fatal adapter error).
pub async fn run_transaction_log_adapter(
    fanin: std::sync::Arc<FanIn>,
    mut rx: mpsc::Receiver<ShredEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            ShredEvent::Transaction(tx) => {
                match parse_transaction_event(&tx, EventSource::TransactionLogs) {
                    Ok(Some(token_event)) => {
                        fanin.ingest(token_event).await;
                    }
                    Ok(None) => {}
                    Err(reason) => fanin.ingest_unparseable(UnparseableEvent {
                        source: EventSource::TransactionLogs,
                        raw_payload: tx.data.clone(),
                        reason,
                        received_at: Instant::now(),
                    }),
                }
            }
            ShredEvent::Disconnected => {
                warn!("transaction-log adapter: stream gap, awaiting reconnect");
            }
            ShredEvent::Connected | ShredEvent::Error(_) => {}
        }
    }
}

/// Block-confirmation adapter: identical payload shape to the
/// transaction-log adapter (both ultimately observe confirmed pump.fun
/// instructions), distinguished only by [`EventSource::BlockConfirmations`]
/// so the threat engine's cross-source confirmation count can tell "two
/// different views of chain state agreed" apart from "the same view twice".
pub async fn run_block_confirmation_adapter(
    fanin: std::sync::Arc<FanIn>,
    mut rx: mpsc::Receiver<ShredEvent>,
) {
    while let Some(event) = rx.recv().await {
        if let ShredEvent::Transaction(tx) = event {
            match parse_transaction_event(&tx, EventSource::BlockConfirmations) {
                Ok(Some(token_event)) => {
                    fanin.ingest(token_event).await;
                }
                Ok(None) => {}
                Err(reason) => fanin.ingest_unparseable(UnparseableEvent {
                    source: EventSource::BlockConfirmations,
                    raw_payload: tx.data.clone(),
                    reason,
                    received_at: Instant::now(),
                }),
            }
        }
    }
}

/// PumpPortal sidecar-index adapter: the feed already hands over parsed
/// JSON rather than raw instruction bytes, so "unparseable" here means a
/// field PumpPortal's client already rejected at JSON-decode time (handled
/// upstream in [`crate::stream::pumpportal`]) — this adapter only has to
/// map the well-typed [`PumpPortalEvent::NewToken`] shape into [`TokenEvent`].
pub async fn run_pumpportal_adapter(
    fanin: std::sync::Arc<FanIn>,
    mut rx: mpsc::Receiver<PumpPortalEvent>,
) {
    while let Some(event) = rx.recv().await {
        if let PumpPortalEvent::NewToken(new_token) = event {
            let token_event = TokenEvent {
                mint_address: new_token.mint,
                creator_address: new_token.trader_public_key,
                discovered_at: Instant::now(),
                source: EventSource::PumpPortal,
                initial_liquidity_base: new_token.v_sol_in_bonding_curve,
                platform: Platform::PumpFun,
                name: new_token.name,
                symbol: new_token.symbol,
                uri: new_token.uri,
            };
            fanin.ingest(token_event).await;
        }
    }
}

/// DexScreener poll adapter: the only pull-based source. Runs a fixed
/// interval scan and ingests anything new rather than subscribing — there
/// is no persistent connection for a `StreamGap` to apply to, so the
/// "reconnect on gap" policy the other three adapters share doesn't apply
/// here; a failed poll is simply retried on the next tick.
pub async fn run_dexscreener_poll_adapter(
    fanin: std::sync::Arc<FanIn>,
    client: crate::dexscreener::DexScreenerClient,
    scan_config: crate::dexscreener::HotScanConfig,
    poll_interval: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        ticker.tick().await;
        match client.scan_hot_tokens(&scan_config).await {
            Ok(tokens) => {
                for token in tokens {
                    if !token.is_pumpfun() {
                        continue;
                    }
                    let token_event = TokenEvent {
                        mint_address: token.mint,
                        // DexScreener's listing feed does not carry the
                        // creator wallet; downstream creator-reputation
                        // lookups treat an empty creator as "unknown", not
                        // as a parse failure.
                        creator_address: String::new(),
                        discovered_at: Instant::now(),
                        source: EventSource::DexScreenerPoll,
                        initial_liquidity_base: (token.liquidity_usd * 1_000_000_000.0) as u64,
                        platform: Platform::GraduatedAmm,
                        name: token.name,
                        symbol: token.symbol,
                        uri: String::new(),
                    };
                    fanin.ingest(token_event).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "dexscreener poll failed, retrying next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::backpressure::DropPolicy;
    use crate::stream::shredstream::TransactionEvent;

    fn fanin() -> std::sync::Arc<FanIn> {
        std::sync::Arc::new(FanIn::new(16, DropPolicy::OldestNonPriority, 64, std::time::Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn non_pump_fun_transactions_are_silently_ignored() {
        let fanin = fanin();
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_transaction_log_adapter(fanin.clone(), rx));
        tx.send(ShredEvent::Transaction(TransactionEvent {
            signature: "sig1".to_string(),
            slot: 1,
            data: vec![0; 8],
            accounts: vec![],
            is_pump_fun: false,
            received_at: chrono::Utc::now(),
        }))
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
        assert!(fanin.unparseable_snapshot().is_empty());
    }

    #[tokio::test]
    async fn malformed_pump_fun_transaction_is_recorded_unparseable() {
        let fanin = fanin();
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_transaction_log_adapter(fanin.clone(), rx));
        tx.send(ShredEvent::Transaction(TransactionEvent {
            signature: "sig1".to_string(),
            slot: 1,
            data: vec![1, 2], // too short to carry a discriminator
            accounts: vec![],
            is_pump_fun: true,
            received_at: chrono::Utc::now(),
        }))
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
        assert_eq!(fanin.unparseable_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn pumpportal_new_token_propagates_as_token_event() {
        let fanin = fanin();
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_pumpportal_adapter(fanin.clone(), rx));
        tx.send(PumpPortalEvent::NewToken(crate::stream::pumpportal::NewTokenEvent {
            signature: "sig1".to_string(),
            mint: "Mint1111111111111111111111111111111111111".to_string(),
            trader_public_key: "Creator1111111111111111111111111111111111".to_string(),
            tx_type: "create".to_string(),
            initial_buy: 0,
            bonding_curve_key: "Curve111111111111111111111111111111111111".to_string(),
            v_tokens_in_bonding_curve: 0,
            v_sol_in_bonding_curve: 1_000_000_000,
            market_cap_sol: 30.0,
            name: "Test Token".to_string(),
            symbol: "TEST".to_string(),
            uri: "ipfs://test".to_string(),
        }))
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
        let event = fanin.recv().await.unwrap();
        assert_eq!(event.source, EventSource::PumpPortal);
        assert_eq!(event.initial_liquidity_base, 1_000_000_000);
    }
}
