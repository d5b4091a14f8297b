//! Whale-copy strategy: mirror trades from a curated wallet set, after a
//! configurable delay and at a fractional size of the observed trade.
//! Wallet curation itself (win-rate, trade-count gating) is
//! [`crate::strategy::tactics::piggyback::SniperPiggyback`]'s job; this
//! strategy only decides whether a *specific* already-curated wallet's
//! recent trade should be copied right now.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::strategy::combinator::{DecisionContext, Strategy};
use crate::strategy::signal::{SignalMetadata, StrategyAction, StrategySignal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhaleCopyConfig {
    pub enabled: bool,
    pub min_confidence: f64,
    pub base_size_sol: f64,
    /// Copy ratio applied against the whale's own size (unknown here, so
    /// this scales `base_size_sol` instead of a per-trade observed amount).
    pub copy_size_ratio: f64,
    /// Minimum delay since the leader's trade before copying is allowed —
    /// mirrors `copy_delay_ms` in the curated-wallet tracker so this
    /// strategy never fires on a trade that hasn't "settled" yet.
    pub copy_delay_ms: u64,
    /// Curated wallet set this strategy is willing to copy.
    pub tracked_wallets: Vec<String>,
}

impl Default for WhaleCopyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            base_size_sol: 0.4,
            copy_size_ratio: 0.5,
            copy_delay_ms: 100,
            tracked_wallets: Vec::new(),
        }
    }
}

pub struct WhaleCopyStrategy {
    config: WhaleCopyConfig,
}

impl WhaleCopyStrategy {
    pub fn new(config: WhaleCopyConfig) -> Self {
        Self { config }
    }

    fn is_tracked(&self, wallet: &str) -> bool {
        self.config.tracked_wallets.iter().any(|w| w == wallet)
    }
}

#[async_trait]
impl Strategy for WhaleCopyStrategy {
    fn tag(&self) -> &'static str {
        "whale_copy"
    }

    fn min_confidence(&self) -> f64 {
        self.config.min_confidence
    }

    async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if !self.config.enabled || ctx.open_position.is_some() {
            return None;
        }
        let delay = std::time::Duration::from_millis(self.config.copy_delay_ms);
        let leader = ctx.whale_activity.iter().find(|t| {
            t.is_buy && self.is_tracked(&t.leader_wallet) && t.observed_at.elapsed() >= delay
        })?;

        // Confidence decays the longer we've sat waiting past the minimum
        // delay: a copy trade loses its edge the staler it gets.
        let staleness_ms = leader.observed_at.elapsed().as_millis() as f64;
        let decay = (staleness_ms / (self.config.copy_delay_ms.max(1) as f64 * 10.0)).min(0.3);
        let confidence = (0.85 - decay).max(0.0);

        Some(StrategySignal {
            mint: ctx.mint.to_string(),
            action: StrategyAction::Buy,
            confidence,
            suggested_size_base: self.config.base_size_sol * self.config.copy_size_ratio,
            strategy_tag: self.tag(),
            reason: format!("copying {} after {}ms", leader.leader_wallet, self.config.copy_delay_ms),
            metadata: SignalMetadata::WhaleCopy {
                leader_wallet: leader.leader_wallet.clone(),
                delay_ms: self.config.copy_delay_ms,
                copy_ratio: self.config.copy_size_ratio,
            },
        })
    }

    fn should_exit(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if ctx.open_position.is_none() {
            return None;
        }
        let sell = ctx
            .whale_activity
            .iter()
            .find(|t| !t.is_buy && self.is_tracked(&t.leader_wallet))?;
        Some(StrategySignal {
            mint: ctx.mint.to_string(),
            action: StrategyAction::Sell,
            confidence: 0.8,
            suggested_size_base: 0.0,
            strategy_tag: self.tag(),
            reason: format!("{} exited, mirroring", sell.leader_wallet),
            metadata: SignalMetadata::WhaleCopy {
                leader_wallet: sell.leader_wallet.clone(),
                delay_ms: self.config.copy_delay_ms,
                copy_ratio: self.config.copy_size_ratio,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::scoring::Recommendation;
    use crate::filter::threat::{Bucket, ConfidenceInterval, RiskLevel, ThreatReport, UncertaintyClass};
    use crate::strategy::combinator::WhaleTrade;
    use std::time::{Duration, Instant};

    fn report() -> ThreatReport {
        ThreatReport {
            mint: "M1".to_string(),
            composite: 0.2,
            risk_level: RiskLevel::Safe,
            uncertainty: UncertaintyClass::Low,
            confidence_interval: ConfidenceInterval {
                lower: 0.2,
                upper: 0.2,
                uncertainty_class: UncertaintyClass::Low,
            },
            bucket_scores: vec![(Bucket::Risk, 0.2)],
            top_factors: vec![],
            missing_fraction: 0.0,
            trend: 0.0,
            acceleration: 0.0,
            recommendation: Recommendation::Opportunity,
            computed_at: chrono::Utc::now(),
        }
    }

    fn config() -> WhaleCopyConfig {
        WhaleCopyConfig {
            tracked_wallets: vec!["leader1".to_string()],
            copy_delay_ms: 50,
            ..WhaleCopyConfig::default()
        }
    }

    #[tokio::test]
    async fn copies_a_tracked_wallet_after_the_delay_elapses() {
        let strategy = WhaleCopyStrategy::new(config());
        let report = report();
        let trade = WhaleTrade {
            leader_wallet: "leader1".to_string(),
            is_buy: true,
            observed_at: Instant::now() - Duration::from_millis(100),
        };
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[trade],
            social: None,
            open_position: None,
        };
        let signal = strategy.analyze(&ctx).await.unwrap();
        assert_eq!(signal.action, StrategyAction::Buy);
    }

    #[tokio::test]
    async fn ignores_an_untracked_wallet() {
        let strategy = WhaleCopyStrategy::new(config());
        let report = report();
        let trade = WhaleTrade {
            leader_wallet: "stranger".to_string(),
            is_buy: true,
            observed_at: Instant::now() - Duration::from_millis(100),
        };
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[trade],
            social: None,
            open_position: None,
        };
        assert!(strategy.analyze(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn ignores_a_trade_still_inside_the_copy_delay() {
        let strategy = WhaleCopyStrategy::new(config());
        let report = report();
        let trade = WhaleTrade {
            leader_wallet: "leader1".to_string(),
            is_buy: true,
            observed_at: Instant::now(),
        };
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[trade],
            social: None,
            open_position: None,
        };
        assert!(strategy.analyze(&ctx).await.is_none());
    }
}
