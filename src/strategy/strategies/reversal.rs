//! Reversal strategy: dip/peak detection with a volatility band. Buys a
//! deviation below VWAP that's still inside the observed volatility band
//! (a deeper drop is more likely a real breakdown than a dip); exits a
//! deviation above VWAP that exceeds it (a likely local peak).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::strategy::combinator::{DecisionContext, Strategy};
use crate::strategy::signal::{SignalMetadata, StrategyAction, StrategySignal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalConfig {
    pub enabled: bool,
    pub min_confidence: f64,
    pub base_size_sol: f64,
    /// How many volatility-band-widths below VWAP counts as a dip worth buying.
    pub dip_band_multiple: f64,
    /// How many volatility-band-widths above VWAP counts as a peak worth selling.
    pub peak_band_multiple: f64,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            base_size_sol: 0.3,
            dip_band_multiple: 1.5,
            peak_band_multiple: 1.5,
        }
    }
}

pub struct ReversalStrategy {
    config: ReversalConfig,
}

impl ReversalStrategy {
    pub fn new(config: ReversalConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Strategy for ReversalStrategy {
    fn tag(&self) -> &'static str {
        "reversal"
    }

    fn min_confidence(&self) -> f64 {
        self.config.min_confidence
    }

    async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if !self.config.enabled || ctx.open_position.is_some() {
            return None;
        }
        let action = ctx.price_action?;
        if action.volatility_1m <= 0.0 {
            return None;
        }
        let band_width_pct = action.volatility_1m;
        let dip_threshold = -self.config.dip_band_multiple * band_width_pct;
        let deviation_pct = action.price_vs_vwap;

        if deviation_pct <= dip_threshold && !action.lower_highs {
            let depth = (deviation_pct / dip_threshold).min(2.0);
            let confidence = (0.55 + 0.15 * depth).min(0.95);
            return Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Buy,
                confidence,
                suggested_size_base: self.config.base_size_sol,
                strategy_tag: self.tag(),
                reason: format!("dip {:.1}% vs VWAP, band {:.1}%", deviation_pct, band_width_pct),
                metadata: SignalMetadata::Reversal { deviation_pct, band_width_pct },
            });
        }
        None
    }

    fn should_exit(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if ctx.open_position.is_none() {
            return None;
        }
        let action = ctx.price_action?;
        let band_width_pct = action.volatility_1m;
        if band_width_pct <= 0.0 {
            return None;
        }
        let peak_threshold = self.config.peak_band_multiple * band_width_pct;
        let deviation_pct = action.price_vs_vwap;
        if deviation_pct >= peak_threshold {
            return Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Sell,
                confidence: 0.75,
                suggested_size_base: 0.0,
                strategy_tag: self.tag(),
                reason: format!("peak {:.1}% vs VWAP, band {:.1}%", deviation_pct, band_width_pct),
                metadata: SignalMetadata::Reversal { deviation_pct, band_width_pct },
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
    use crate::strategy::price_action::PriceAction;
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

    fn action(price_vs_vwap: f64, volatility_1m: f64, lower_highs: bool) -> PriceAction {
        PriceAction {
            vwap_since_launch: 1.0,
            current_price: 1.0,
            price_vs_vwap,
            local_high: 1.0,
            local_low: 1.0,
            drawdown_from_high: 0.0,
            higher_lows: false,
            lower_highs,
            time_to_first_pullback_ms: 0,
            time_since_local_high_ms: 0,
            volatility_1m,
            volatility_compression: false,
            volatility_expansion: false,
        }
    }

    #[tokio::test]
    async fn buys_a_dip_inside_the_volatility_band() {
        let strategy = ReversalStrategy::new(ReversalConfig::default());
        let report = report();
        let action = action(-10.0, 5.0, false); // -10% vs VWAP, band 5% => -2x band, past -1.5x threshold
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
    async fn ignores_a_dip_that_is_actually_breaking_down() {
        let strategy = ReversalStrategy::new(ReversalConfig::default());
        let report = report();
        let action = action(-10.0, 5.0, true); // lower_highs disqualifies it as a dip
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
        assert!(strategy.analyze(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn exits_on_a_peak_above_the_band() {
        let strategy = ReversalStrategy::new(ReversalConfig::default());
        let report = report();
        let action = action(12.0, 5.0, false);
        let position = crate::strategy::types::Position {
            mint: "M1".to_string(),
            entry_price: 1.0,
            entry_time: chrono::Utc::now(),
            size_sol: 1.0,
            tokens_held: 1,
            strategy: crate::strategy::types::TradingStrategy::Adaptive,
            exit_style: crate::strategy::types::ExitStyle::QuickScalp { target_pct: 20.0 },
            highest_price: 1.0,
            lowest_price: 1.0,
            exit_levels_hit: Vec::new(),
        };
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: Some(&action),
            whale_activity: &[],
            social: None,
            open_position: Some(&position),
        };
        let signal = strategy.should_exit(&ctx).unwrap();
        assert_eq!(signal.action, StrategyAction::Sell);
    }
}
