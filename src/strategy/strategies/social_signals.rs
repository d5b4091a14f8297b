//! Social-signals strategy: gated on the (external, opaque) social scraper
//! feed — virality, sentiment, and bot-ratio thresholds. The scraper itself
//! is out of scope (§1); this strategy only consumes the sample shape it
//! publishes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::strategy::combinator::{DecisionContext, Strategy};
use crate::strategy::signal::{SignalMetadata, StrategyAction, StrategySignal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSignalsConfig {
    pub enabled: bool,
    pub min_confidence: f64,
    pub base_size_sol: f64,
    pub min_virality: f64,
    pub min_sentiment: f64,
    pub max_bot_ratio: f64,
}

impl Default for SocialSignalsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            base_size_sol: 0.2,
            min_virality: 0.6,
            min_sentiment: 0.55,
            max_bot_ratio: 0.35,
        }
    }
}

pub struct SocialSignalsStrategy {
    config: SocialSignalsConfig,
}

impl SocialSignalsStrategy {
    pub fn new(config: SocialSignalsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Strategy for SocialSignalsStrategy {
    fn tag(&self) -> &'static str {
        "social_signals"
    }

    fn min_confidence(&self) -> f64 {
        self.config.min_confidence
    }

    async fn analyze(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if !self.config.enabled || ctx.open_position.is_some() {
            return None;
        }
        let sample = ctx.social?;
        if sample.virality < self.config.min_virality
            || sample.sentiment < self.config.min_sentiment
            || sample.bot_ratio > self.config.max_bot_ratio
        {
            return None;
        }

        let organic_fraction = 1.0 - sample.bot_ratio;
        let confidence =
            (0.4 * sample.virality + 0.3 * sample.sentiment + 0.3 * organic_fraction).min(0.95);

        Some(StrategySignal {
            mint: ctx.mint.to_string(),
            action: StrategyAction::Buy,
            confidence,
            suggested_size_base: self.config.base_size_sol,
            strategy_tag: self.tag(),
            reason: format!(
                "virality={:.2} sentiment={:.2} bot_ratio={:.2}",
                sample.virality, sample.sentiment, sample.bot_ratio
            ),
            metadata: SignalMetadata::SocialSignals {
                virality: sample.virality,
                sentiment: sample.sentiment,
                bot_ratio: sample.bot_ratio,
            },
        })
    }

    fn should_exit(&self, ctx: &DecisionContext<'_>) -> Option<StrategySignal> {
        if ctx.open_position.is_none() {
            return None;
        }
        let sample = ctx.social?;
        // A late bot-ratio spike or sentiment collapse is this strategy's
        // own signal that the organic narrative it entered on has died.
        if sample.bot_ratio > self.config.max_bot_ratio * 1.5 || sample.sentiment < 0.2 {
            return Some(StrategySignal {
                mint: ctx.mint.to_string(),
                action: StrategyAction::Sell,
                confidence: 0.72,
                suggested_size_base: 0.0,
                strategy_tag: self.tag(),
                reason: format!(
                    "narrative collapsed: sentiment={:.2} bot_ratio={:.2}",
                    sample.sentiment, sample.bot_ratio
                ),
                metadata: SignalMetadata::SocialSignals {
                    virality: sample.virality,
                    sentiment: sample.sentiment,
                    bot_ratio: sample.bot_ratio,
                },
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
    use crate::strategy::combinator::SocialFeedSample;
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
    async fn buys_on_organic_virality() {
        let strategy = SocialSignalsStrategy::new(SocialSignalsConfig::default());
        let report = report();
        let sample = SocialFeedSample { virality: 0.8, sentiment: 0.7, bot_ratio: 0.1 };
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[],
            social: Some(&sample),
            open_position: None,
        };
        let signal = strategy.analyze(&ctx).await.unwrap();
        assert_eq!(signal.action, StrategyAction::Buy);
    }

    #[tokio::test]
    async fn rejects_bot_heavy_virality() {
        let strategy = SocialSignalsStrategy::new(SocialSignalsConfig::default());
        let report = report();
        let sample = SocialFeedSample { virality: 0.9, sentiment: 0.8, bot_ratio: 0.8 };
        let ctx = DecisionContext {
            mint: "M1",
            age: Duration::from_secs(60),
            initial_liquidity_sol: 10.0,
            threat: &report,
            price_action: None,
            whale_activity: &[],
            social: Some(&sample),
            open_position: None,
        };
        assert!(strategy.analyze(&ctx).await.is_none());
    }
}
