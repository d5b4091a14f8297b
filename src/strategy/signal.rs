//! Strategy signal types
//!
//! The wire format every strategy speaks to the [`super::combinator::StrategyCombinator`].
//! `metadata` is a tagged variant per strategy rather than a free-form map —
//! §9's "dynamic typing (source) -> tagged variants" applies here directly:
//! enumerate what each strategy actually produces instead of reintroducing
//! `Dict[str, Any]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyAction {
    Buy,
    Sell,
    Hold,
}

/// What each strategy reports back about *why* it fired, typed per
/// strategy rather than a free-form bag of values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SignalMetadata {
    Snipe { age_secs: u64, liquidity_sol: f64 },
    Momentum { rsi: f64, macd_histogram: f64 },
    Reversal { deviation_pct: f64, band_width_pct: f64 },
    WhaleCopy { leader_wallet: String, delay_ms: u64, copy_ratio: f64 },
    SocialSignals { virality: f64, sentiment: f64, bot_ratio: f64 },
    /// The risk/exit-manager family of callers that don't carry strategy-specific fields.
    None,
}

/// One strategy's opinion on one mint, for one decision cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySignal {
    pub mint: String,
    pub action: StrategyAction,
    /// In [0, 1]; gated against the strategy's own threshold (default 0.7)
    /// before it's allowed to participate in aggregation.
    pub confidence: f64,
    /// Native-asset amount (SOL), pre-Kelly-damping, pre-capital-scaling.
    pub suggested_size_base: f64,
    pub strategy_tag: &'static str,
    pub reason: String,
    pub metadata: SignalMetadata,
}

impl StrategySignal {
    pub fn hold(mint: &str, strategy_tag: &'static str) -> Self {
        Self {
            mint: mint.to_string(),
            action: StrategyAction::Hold,
            confidence: 0.0,
            suggested_size_base: 0.0,
            strategy_tag,
            reason: String::new(),
            metadata: SignalMetadata::None,
        }
    }
}
