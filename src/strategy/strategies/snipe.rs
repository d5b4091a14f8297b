//! Snipe strategy: enter very new mints, gated on a minimum liquidity floor
//! and a maximum age. No exit logic of its own — it defers entirely to the
//! Position Manager's exit triggers (stop/take-profit/trailing/max-hold).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::strategy::combinator::{DecisionContext, Strategy};
use crate::strategy::signal::{SignalMetadata, StrategyAction, StrategySignal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnipeConfig {
    pub enabled: bool,
    pub min_confidence: f64,
    pub min_liquidity_sol: f64,
    pub max_age_secs: u64,
    pub base_size_sol: f64,
}

impl Default for SnipeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            min_liquidity_sol: 1.0,
            max_age_secs: 120,
            base_size_sol: 0.5,
        }
    }
}

pub struct SnipeStrategy {
    config: SnipeConfig,
}

impl SnipeStrategy {
    pub fn new(config: SnipeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Strategy for SnipeStrategy {
    fn tag(&self) -> &'static str {
        "snipe"
    }

    fn min_confidence(&self) -> f64 {
        self.config.min_confidence
    }

    async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if !self.config.enabled {
            return None;
        }
        if ctx.open_position.is_some() {
            return None;
        }
        let age_secs = ctx.age.as_secs();
        if age_secs > self.config.max_age_secs {
            return None;
        }
        if ctx.initial_liquidity_sol < self.config.min_liquidity_sol {
            return None;
        }

        // Confidence scales with how comfortably liquidity clears the floor
        // and how fresh the mint still is; both capped so a single huge
        // outlier can't alone clear the gate at max confidence.
        let liquidity_margin = (ctx.initial_liquidity_sol / self.config.min_liquidity_sol - 1.0)
            .clamp(0.0, 1.0);
        let freshness = 1.0 - (age_secs as f64 / self.config.max_age_secs as f64);
        let confidence = (0.6 + 0.2 * liquidity_margin + 0.2 * freshness).min(0.99);

        Some(StrategySignal {
            mint: ctx.mint.to_string(),
            action: StrategyAction::Buy,
            confidence,
            suggested_size_base: self.config.base_size_sol,
            strategy_tag: self.tag(),
            reason: format!(
                "new mint, age={}s, liquidity={:.2} SOL",
                age_secs, ctx.initial_liquidity_sol
            ),
            metadata: SignalMetadata::Snipe { age_secs, liquidity_sol: ctx.initial_liquidity_sol },
        })
    }

    fn should_exit(&self, _ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::scoring::Recommendation;
    use crate::filter::threat::{Bucket, ConfidenceInterval, RiskLevel, ThreatReport, UncertaintyClass};
    use std::time::Duration;

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

    #[tokio::test]
    async fn rejects_mints_past_max_age() {
        let strategy = SnipeStrategy::new(SnipeConfig::default());
        let report = report();
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(999),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[],
            social: None,
            open_position: None,
        };
        assert!(strategy.analyze(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn buys_fresh_liquid_mint() {
        let strategy = SnipeStrategy::new(SnipeConfig::default());
        let report = report();
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(10),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[],
            social: None,
            open_position: None,
        };
        let signal = strategy.analyze(&ctx).await.unwrap();
        assert_eq!(signal.action, StrategyAction::Buy);
    }
}
