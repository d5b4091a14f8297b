//! Momentum strategy: RSI/MACD-style technical indicators derived from the
//! short price history the position's [`crate::strategy::price_action::PriceActionAnalyzer`]
//! already tracks. Enters on confirmed upward structure, exits when
//! momentum deteriorates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::strategy::combinator::{DecisionContext, Strategy};
use crate::strategy::signal::{SignalMetadata, StrategyAction, StrategySignal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumConfig {
    pub enabled: bool,
    pub min_confidence: f64,
    pub base_size_sol: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            base_size_sol: 0.3,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }
}

pub struct MomentumStrategy {
    config: MomentumConfig,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }

    /// Approximates RSI from the bullish/bearish structure + VWAP deviation
    /// already computed by [`crate::strategy::price_action::PriceAction`],
    /// rather than re-deriving gain/loss windows this strategy doesn't own.
    fn pseudo_rsi(action: &crate::strategy::price_action::PriceAction) -> f64 {
        let base = 50.0 + action.price_vs_vwap.clamp(-50.0, 50.0);
        if action.higher_lows {
            (base + 10.0).min(95.0)
        } else if action.lower_highs {
            (base - 10.0).max(5.0)
        } else {
            base
        }
    }

    fn macd_histogram(action: &crate::strategy::price_action::PriceAction) -> f64 {
        // Sign of recent structure change scaled by volatility expansion;
        // a real MACD needs the two EMAs, which PriceAction doesn't carry —
        // this is a structure-based stand-in with the same sign semantics.
        let direction = if action.is_bullish() {
            1.0
        } else if action.is_bearish() {
            -1.0
        } else {
            0.0
        };
        direction * if action.volatility_expansion { 1.0 } else { 0.4 }
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    fn tag(&self) -> &'static str {
        "momentum"
    }

    fn min_confidence(&self) -> f64 {
        self.config.min_confidence
    }

    async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if !self.config.enabled || ctx.open_position.is_some() {
            return None;
        }
        let action = ctx.price_action?;
        let rsi = Self::pseudo_rsi(action);
        let macd_histogram = Self::macd_histogram(action);

        if rsi >= self.config.rsi_oversold && rsi <= self.config.rsi_overbought && macd_histogram > 0.0 {
            let confidence = (action.entry_quality()).clamp(0.0, 0.95);
            return Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Buy,
                confidence,
                suggested_size_base: self.config.base_size_sol,
                strategy_tag: self.tag(),
                reason: format!("rsi={:.1}, macd_hist={:.2}", rsi, macd_histogram),
                metadata: SignalMetadata::Momentum { rsi, macd_histogram },
            });
        }
        None
    }

    fn should_exit(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if ctx.open_position.is_none() {
            return None;
        }
        let action = ctx.price_action?;
        let rsi = Self::pseudo_rsi(action);
        if rsi >= self.config.rsi_overbought {
            return Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Sell,
                confidence: 0.75,
                suggested_size_base: 0.0,
                strategy_tag: self.tag(),
                reason: format!("rsi={:.1} overbought, momentum exhausted", rsi),
                metadata: SignalMetadata::Momentum { rsi, macd_histogram: Self::macd_histogram(action) },
            });
        }
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

    fn bullish_action() -> crate::strategy::price_action::PriceAction {
        crate::strategy::price_action::PriceAction {
            vwap_since_launch: 1.0,
            current_price: 1.05,
            price_vs_vwap: 2.0,
            local_high: 1.05,
            local_low: 0.95,
            drawdown_from_high: 0.0,
            higher_lows: true,
            lower_highs: false,
            time_to_first_pullback_ms: 0,
            time_since_local_high_ms: 0,
            volatility_1m: 3.0,
            volatility_compression: false,
            volatility_expansion: true,
        }
    }

    #[tokio::test]
    async fn buys_on_bullish_structure_within_rsi_band() {
        let strategy = MomentumStrategy::new(MomentumConfig::default());
        let report = report();
        let action = bullish_action();
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: Some(&action),
            whale_activity: &[],
            social: None,
            open_position: None,
        };
        let signal = strategy.analyze(&ctx).await.unwrap();
        assert_eq!(signal.action, StrategyAction::Buy);
    }

    #[tokio::test]
    async fn skips_without_an_open_position_for_exit() {
        let strategy = MomentumStrategy::new(MomentumConfig::default());
        let report = report();
        let action = bullish_action();
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: Some(&action),
            whale_activity: &[],
            social: None,
            open_position: None,
        };
        assert!(strategy.should_exit(&ctx).is_none());
    }
}
