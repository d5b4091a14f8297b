//! Strategy Combinator
//!
//! Runs every enabled strategy concurrently over one [`DecisionContext`] and
//! resolves their [`StrategySignal`]s into at most one [`TradeIntent`] per
//! mint per decision cycle. This is the composition-over-inheritance
//! registry called for in §9: a new strategy is a value implementing
//! [`Strategy`], added to [`StrategyCombinator::with_strategy`] — never a
//! subclass.
//!
//! Aggregation, in order: gate by per-strategy confidence threshold, veto
//! all BUYs on HIGH/CRITICAL risk, resolve BUY/SELL conflicts (SELL always
//! wins), size (sum of confidence-weighted BUYs, Kelly-damped by the risk
//! composite, capped by per-mint/portfolio ceilings and available capital).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::capital::CapitalPool;
use crate::config::CombinatorConfig;
use crate::filter::threat::{RiskLevel, ThreatReport};
use crate::override_console::OverrideHandle;
use crate::strategy::signal::{SignalMetadata, StrategyAction, StrategySignal};
use crate::strategy::types::Position;

/// Everything a strategy needs to render an opinion on one mint for one
/// decision cycle. Borrowed, not owned: strategies must not need to clone
/// the world to answer `analyze`/`should_exit`.
pub struct DecisionContext<'a> {
    pub mint: &'a str,
    pub age: Duration,
    pub initial_liquidity_sol: f64,
    pub threat: &'a ThreatReport,
    pub price_action: Option<&'a crate::strategy::price_action::PriceAction>,
    pub whale_activity: &'a [WhaleTrade],
    pub social: Option<&'a SocialFeedSample>,
    pub open_position: Option<&'a Position>,
}

/// One observed trade from a curated wallet, used by the whale-copy
/// strategy. The wallet curation and the transaction-log watch that
/// produces these live outside this module (stream/fanin layer); this is
/// just the shape a strategy consumes.
#[derive(Debug, Clone)]
pub struct WhaleTrade {
    pub leader_wallet: String,
    pub is_buy: bool,
    pub observed_at: std::time::Instant,
}

/// A sample from the social-signal scraper feed — an opaque external
/// collaborator per spec §1; only the shape a strategy consumes is
/// specified here.
#[derive(Debug, Clone, Copy)]
pub struct SocialFeedSample {
    pub virality: f64,
    pub sentiment: f64,
    pub bot_ratio: f64,
}

/// Capability set a strategy implements: analyze (entry opinion) and
/// should_exit (exit opinion for a position it may or may not own).
/// Deliberately not a class hierarchy — see module docs.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn tag(&self) -> &'static str;

    /// Per-strategy gate before a signal is allowed to participate in
    /// aggregation. Spec default is 0.7; individual strategies may differ.
    fn min_confidence(&self) -> f64 {
        0.7
    }

    async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal>;

    fn should_exit(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal>;
}

#[derive(Debug, Clone, Default)]
pub struct StrategyStats {
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_pnl_sol: f64,
    pub total_hold_secs: u64,
    pub confidence_sum: f64,
}

impl StrategyStats {
    pub fn average_hold_secs(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.total_hold_secs as f64 / self.trades as f64
        }
    }

    pub fn average_confidence(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.confidence_sum / self.trades as f64
        }
    }
}

/// The single trade intent a decision cycle may emit for a mint, forwarded
/// to the Position Manager.
#[derive(Debug, Clone)]
pub struct TradeIntent {
    pub mint: String,
    pub action: StrategyAction,
    pub size_sol: f64,
    pub reason_aggregate: String,
    pub strategy_tag: &'static str,
}

/// Why a cycle produced no [`TradeIntent`] — surfaced so callers can tell
/// "nothing happened" apart from "a signal was deliberately rejected".
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyReject {
    NoSignals,
    AllBelowConfidenceThreshold,
    RiskVetoed { risk_level: RiskLevel },
    EmergencyStop,
    BelowMinimumTradeSize { scaled_sol: f64 },
}

pub struct StrategyCombinator {
    strategies: Vec<Box<dyn Strategy>>,
    capital: Arc<CapitalPool>,
    override_handle: Option<OverrideHandle>,
    config: CombinatorConfig,
    stats: RwLock<HashMap<&'static str, StrategyStats>>,
    min_trade_sol: f64,
    per_mint_ceiling_sol: f64,
}

const DEFAULT_MIN_TRADE_SOL: f64 = 0.005;

impl StrategyCombinator {
    pub fn new(capital: Arc<CapitalPool>, config: CombinatorConfig) -> Self {
        Self {
            strategies: Vec::new(),
            capital,
            override_handle: None,
            config,
            stats: RwLock::new(HashMap::new()),
            min_trade_sol: DEFAULT_MIN_TRADE_SOL,
            per_mint_ceiling_sol: f64::MAX,
        }
    }

    pub fn with_override_handle(mut self, handle: OverrideHandle) -> Self {
        self.override_handle = Some(handle);
        self
    }

    pub fn with_per_mint_ceiling(mut self, ceiling_sol: f64) -> Self {
        self.per_mint_ceiling_sol = ceiling_sol;
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Run every registered strategy concurrently (bounded by the
    /// combinator's decision deadline), then fold their signals into at
    /// most one [`TradeIntent`].
    pub async fn decide(
        &self,
        ctx: &DecisionContext<'_>,
    ) -> Result<TradeIntent, PolicyReject> {
        let deadline = Duration::from_millis(self.config.decision_deadline_ms);
        let pending = self.strategies.iter().map(|s| async move {
            match timeout(deadline, s.analyze(ctx)).await {
                Ok(signal) => signal,
                Err(_) => {
                    debug!(strategy = s.tag(), mint = ctx.mint, "strategy analysis missed deadline");
                    None
                }
            }
        });
        let mut signals: Vec<StrategySignal> = futures::future::join_all(pending)
            .await
            .into_iter()
            .flatten()
            .collect();

        // Exit opinions are synchronous (cheap, local state) and never gated
        // by the confidence threshold's BUY-only rationale, but they go
        // through the same gate/veto/conflict pipeline.
        for strategy in &self.strategies {
            if let Some(exit) = strategy.should_exit(ctx) {
                signals.push(exit);
            }
        }

        self.aggregate(ctx, signals).await
    }

    async fn aggregate(
        &self,
        ctx: &DecisionContext<'_>,
        signals: Vec<StrategySignal>,
    ) -> Result<TradeIntent, PolicyReject> {
        if signals.is_empty() {
            return Err(PolicyReject::NoSignals);
        }

        // 1. Gate: per-strategy confidence threshold.
        let gated: Vec<StrategySignal> = signals
            .into_iter()
            .filter(|s| s.action != StrategyAction::Hold)
            .filter(|s| s.confidence >= self.min_confidence_for(s.strategy_tag))
            .collect();
        if gated.is_empty() {
            return Err(PolicyReject::AllBelowConfidenceThreshold);
        }

        // 2. Veto by risk: HIGH/CRITICAL drops every BUY; SELL is never vetoed.
        let vetoed = matches!(ctx.threat.risk_level, RiskLevel::High | RiskLevel::Critical);
        let surviving: Vec<StrategySignal> = gated
            .into_iter()
            .filter(|s| s.action != StrategyAction::Buy || !vetoed)
            .collect();
        if surviving.is_empty() {
            return Err(PolicyReject::RiskVetoed { risk_level: ctx.threat.risk_level });
        }

        let has_sell = surviving.iter().any(|s| s.action == StrategyAction::Sell);
        let has_buy = surviving.iter().any(|s| s.action == StrategyAction::Buy);

        // 3. Conflict resolution: SELL wins over BUY, unconditionally.
        if has_sell {
            let (tag, reason) = Self::dominant_sell(&surviving);
            return Ok(TradeIntent {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Sell,
                size_sol: 0.0, // exits size against the open position, not a suggested amount
                reason_aggregate: reason,
                strategy_tag: tag,
            });
        }

        if !has_buy {
            return Err(PolicyReject::NoSignals);
        }

        // EMERGENCY_STOP blocks every new BUY, unconditionally (P3).
        if self.override_handle.as_ref().map(|h| h.is_emergency_stopped()).unwrap_or(false) {
            return Err(PolicyReject::EmergencyStop);
        }

        // 4. Sizing: confidence-weighted sum, Kelly-damped by composite risk,
        //    then capped and scaled against available capital.
        let raw_size: f64 = surviving
            .iter()
            .filter(|s| s.action == StrategyAction::Buy)
            .map(|s| s.suggested_size_base * s.confidence)
            .sum();
        let damped = raw_size * (1.0 - ctx.threat.composite).max(0.0);
        let capped = damped
            .min(self.per_mint_ceiling_sol)
            .min(self.capital.total() * self.config.max_capital_fraction);

        let available = self.capital.available();
        let scaled = if capped > available { available.max(0.0) } else { capped };
        if scaled < self.min_trade_sol {
            return Err(PolicyReject::BelowMinimumTradeSize { scaled_sol: scaled });
        }

        let tag = surviving
            .iter()
            .filter(|s| s.action == StrategyAction::Buy)
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
            .map(|s| s.strategy_tag)
            .unwrap_or("combinator");
        let reasons: Vec<String> = surviving
            .iter()
            .filter(|s| s.action == StrategyAction::Buy)
            .map(|s| format!("{}: {}", s.strategy_tag, s.reason))
            .collect();

        Ok(TradeIntent {
            mint: ctx.mint.to_string(),
            action: StrategyAction::Buy,
            size_sol: scaled,
            reason_aggregate: reasons.join("; "),
            strategy_tag: tag,
        })
    }

    fn dominant_sell(signals: &[StrategySignal]) -> (&'static str, String) {
        signals
            .iter()
            .filter(|s| s.action == StrategyAction::Sell)
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
            .map(|s| (s.strategy_tag, s.reason.clone()))
            .unwrap_or(("combinator", "sell signal dominated aggregation".to_string()))
    }

    fn min_confidence_for(&self, tag: &'static str) -> f64 {
        self.strategies
            .iter()
            .find(|s| s.tag() == tag)
            .map(|s| s.min_confidence())
            .unwrap_or(self.config.min_confidence)
    }

    pub async fn record_outcome(&self, tag: &'static str, pnl_sol: f64, hold_secs: u64, confidence: f64) {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(tag).or_default();
        entry.trades += 1;
        if pnl_sol >= 0.0 {
            entry.wins += 1;
        } else {
            entry.losses += 1;
        }
        entry.total_pnl_sol += pnl_sol;
        entry.total_hold_secs += hold_secs;
        entry.confidence_sum += confidence;
    }

    pub async fn stats_snapshot(&self) -> HashMap<&'static str, StrategyStats> {
        self.stats.read().await.clone()
    }
}

// `SignalMetadata::None` is the degenerate case used by `StrategySignal::hold`;
// keep it referenced so the tagged-variant design stays documented at the
// single call site that matters (aggregation never inspects the metadata,
// only the individual strategies that produced it do).
#[allow(dead_code)]
fn _metadata_is_strategy_specific(meta: &SignalMetadata) -> bool {
    !matches!(meta, SignalMetadata::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::scoring::Recommendation;
    use crate::filter::threat::{Bucket, ConfidenceInterval, RiskLevel, UncertaintyClass};

    fn report(composite: f64, risk_level: RiskLevel) -> ThreatReport {
        ThreatReport {
            mint: "M1".to_string(),
            composite,
            risk_level,
            uncertainty: UncertaintyClass::Low,
            confidence_interval: ConfidenceInterval {
                lower: composite,
                upper: composite,
                uncertainty_class: UncertaintyClass::Low,
            },
            bucket_scores: vec![(Bucket::Risk, composite)],
            top_factors: vec![],
            missing_fraction: 0.0,
            trend: 0.0,
            acceleration: 0.0,
            recommendation: Recommendation::Opportunity,
            computed_at: chrono::Utc::now(),
        }
    }

    struct AlwaysBuy;
    #[async_trait]
    impl Strategy for AlwaysBuy {
        fn tag(&self) -> &'static str {
            "snipe"
        }
        async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
            Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Buy,
                confidence: 0.9,
                suggested_size_base: 1.0,
                strategy_tag: "snipe",
                reason: "new mint".to_string(),
                metadata: SignalMetadata::Snipe { age_secs: 10, liquidity_sol: 10.0 },
            })
        }
        fn should_exit(&self, _ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
            None
        }
    }

    fn ctx<'a>(mint: &'a str, threat: &'a ThreatReport) -> DecisionContext<'a> {
        DecisionContext {
            mint,
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat,
            price_action: None,
            whale_activity: &[],
            social: None,
            open_position: None,
        }
    }

    #[tokio::test]
    async fn happy_path_snipe_sizes_down_by_risk_composite() {
        let capital = Arc::new(CapitalPool::new(10.0));
        let combinator = StrategyCombinator::new(capital, CombinatorConfig::default())
            .with_strategy(Box::new(AlwaysBuy));
        let report = report(0.25, RiskLevel::Safe);
        let intent = combinator.decide(&ctx("M1", &report)).await.unwrap();
        assert_eq!(intent.action, StrategyAction::Buy);
        // raw = 1.0 * 0.9 = 0.9, damped by (1 - 0.25) = 0.675
        assert!((intent.size_sol - 0.675).abs() < 1e-9);
    }

    #[tokio::test]
    async fn high_risk_vetoes_every_buy() {
        let capital = Arc::new(CapitalPool::new(10.0));
        let combinator = StrategyCombinator::new(capital, CombinatorConfig::default())
            .with_strategy(Box::new(AlwaysBuy));
        let report = report(0.80, RiskLevel::High);
        let err = combinator.decide(&ctx("M1", &report)).await.unwrap_err();
        assert_eq!(err, PolicyReject::RiskVetoed { risk_level: RiskLevel::High });
    }

    struct AlwaysSell;
    #[async_trait]
    impl Strategy for AlwaysSell {
        fn tag(&self) -> &'static str {
            "reversal"
        }
        async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
            Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Sell,
                confidence: 0.75,
                suggested_size_base: 0.0,
                strategy_tag: "reversal",
                reason: "peak detected".to_string(),
                metadata: SignalMetadata::Reversal { deviation_pct: 5.0, band_width_pct: 2.0 },
            })
        }
        fn should_exit(&self, _ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
            None
        }
    }

    #[tokio::test]
    async fn sell_wins_over_conflicting_buy() {
        let capital = Arc::new(CapitalPool::new(10.0));
        let combinator = StrategyCombinator::new(capital, CombinatorConfig::default())
            .with_strategy(Box::new(AlwaysBuy))
            .with_strategy(Box::new(AlwaysSell));
        let report = report(0.2, RiskLevel::Safe);
        let intent = combinator.decide(&ctx("M2", &report)).await.unwrap();
        assert_eq!(intent.action, StrategyAction::Sell);
    }

    #[tokio::test]
    async fn emergency_stop_blocks_new_buys() {
        let capital = Arc::new(CapitalPool::new(10.0));
        let (console, _rx) = crate::override_console::OverrideConsole::new(
            &crate::config::OverrideConsoleConfig::default(),
        );
        let handle = console.handle();
        handle
            .submit(crate::override_console::OverrideCommand::EmergencyStop)
            .await
            .unwrap();
        let _task = console.spawn();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let combinator = StrategyCombinator::new(capital, CombinatorConfig::default())
            .with_override_handle(handle)
            .with_strategy(Box::new(AlwaysBuy));
        let report = report(0.2, RiskLevel::Safe);
        let err = combinator.decide(&ctx("M1", &report)).await.unwrap_err();
        assert_eq!(err, PolicyReject::EmergencyStop);
    }
}
