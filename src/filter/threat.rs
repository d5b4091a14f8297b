//! Threat Scoring Engine
//!
//! Wraps [`crate::filter::adaptive::AdaptiveFilter`] and its
//! [`crate::filter::scoring::ScoringEngine`] into the three-bucket
//! (risk/technical/market) fusion model: concurrent heuristic dispatch
//! bounded by a deadline, bucket fusion into a single composite score,
//! a trend/acceleration series over the last 16 reports per mint, and a
//! short memoization cache so repeated lookups within a few seconds of
//! each other don't redo enrichment.
//!
//! An empty signal set is scored CRITICAL by policy: absence of evidence
//! is evidence of risk, not neutrality.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::error::Result;
use crate::filter::adaptive::AdaptiveFilter;
use crate::filter::scoring::{Recommendation, ScoringResult};
use crate::filter::signals::Signal;
use crate::filter::types::SignalContext;

/// One of the three buckets a heuristic's signal is fused into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Risk,
    Technical,
    Market,
}

impl Bucket {
    /// Weight of this bucket in the composite score (risk 40% / technical 30% / market 30%).
    pub fn weight(&self) -> f64 {
        match self {
            Bucket::Risk => 0.40,
            Bucket::Technical => 0.30,
            Bucket::Market => 0.30,
        }
    }
}

/// Maps each heuristic to the bucket it contributes to, per the fixed
/// risk/technical/market split. This is deliberately per-`SignalType` rather
/// than per-[`SignalCategory`]: several signals in the same organizational
/// category (e.g. pump.fun-specific) land in different scoring buckets.
impl From<crate::filter::signals::SignalType> for Bucket {
    fn from(signal_type: crate::filter::signals::SignalType) -> Self {
        use crate::filter::signals::SignalType::*;
        match signal_type {
            // Risk (40%): honeypot/authority/liquidity, wash trading,
            // coordinated wallets, creator/deployer/sniper reputation.
            HoneypotProbe | MintAuthority | FreezeAuthority | MetadataMutable
            | PermanentDelegate | TransferHookPresence | HolderConcentration
            | ConcentrationRisk | LiquidityLockStatus | CreatorReputation | WashTrading
            | CoordinatedFunding | KnownDeployer | KnownSniper | WalletClustering
            | DeployerPattern | EarlySellPressure | SupplyDispersion | EarlyAccumulation
            | WalletAge | WalletHistory | WalletPriorPerformance => Bucket::Risk,

            // Technical integrity (30%): program/extension checks, metadata
            // coherence, bonding-curve-formula sanity.
            ProgramOwnerCheck | HostileExtension | NameQuality | SymbolQuality
            | UriAnalysis | BondingCurveSanity => Bucket::Technical,

            // Market health (30%): liquidity depth, volume, age, holder count.
            VolumeProfile | AgeMaturity | HolderCount | LiquiditySeeding | BuyTiming
            | SellTiming | BurstDetection | VelocityMetrics | OrganicDemand
            | TransactionSizeRatio => Bucket::Market,
        }
    }
}

/// Confidence band derived from the fraction of heuristics that produced
/// a usable result (vs. timed out / errored / returned `unavailable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyClass {
    Low,
    Medium,
    High,
}

impl UncertaintyClass {
    fn from_missing_fraction(missing_fraction: f64) -> Self {
        if missing_fraction <= 0.1 {
            UncertaintyClass::Low
        } else if missing_fraction <= 0.3 {
            UncertaintyClass::Medium
        } else {
            UncertaintyClass::High
        }
    }
}

/// Bound on the composite score, widened by missing heuristics and by how
/// much the three bucket scores disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub uncertainty_class: UncertaintyClass,
}

impl ConfidenceInterval {
    fn compute(composite: f64, missing_fraction: f64, bucket_scores: &[(Bucket, f64)]) -> Self {
        let spread = bucket_scores
            .iter()
            .map(|(_, s)| *s)
            .fold((f64::MAX, f64::MIN), |(lo, hi), s| (lo.min(s), hi.max(s)));
        let bucket_spread = if bucket_scores.is_empty() { 0.0 } else { spread.1 - spread.0 };
        let half_width = (0.3 * missing_fraction + 0.2 * bucket_spread).clamp(0.0, 0.5);
        Self {
            lower: (composite - half_width).max(0.0),
            upper: (composite + half_width).min(1.0),
            uncertainty_class: UncertaintyClass::from_missing_fraction(missing_fraction),
        }
    }
}

/// Fire-and-forget notification raised when a mint's trend crosses into
/// dangerous territory, consumed by the Position Manager for fast reactive
/// exits. Never blocks the scoring path: sends are best-effort.
#[derive(Debug, Clone)]
pub struct ThreatAlert {
    pub mint: String,
    pub level: AlertLevel,
    pub composite: f64,
    pub trend: f64,
    pub acceleration: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// Overall risk verdict, thresholded on the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Monitor,
    High,
    Critical,
}

impl RiskLevel {
    fn from_composite(composite: f64) -> Self {
        if composite >= 0.85 {
            RiskLevel::Critical
        } else if composite >= 0.6 {
            RiskLevel::High
        } else if composite >= 0.3 {
            RiskLevel::Monitor
        } else {
            RiskLevel::Safe
        }
    }
}

/// A single threat assessment for one mint at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatReport {
    pub mint: String,
    /// Composite score in [0, 1], higher = riskier.
    pub composite: f64,
    pub risk_level: RiskLevel,
    pub uncertainty: UncertaintyClass,
    pub confidence_interval: ConfidenceInterval,
    /// Bucket scores that fed the composite, each in [0, 1].
    pub bucket_scores: Vec<(Bucket, f64)>,
    /// Top contributing factors across all buckets, most impactful first.
    pub top_factors: Vec<(Bucket, f64)>,
    /// Fraction of dispatched heuristics that did not return usable data
    /// (timed out, errored, or explicitly `unavailable`).
    pub missing_fraction: f64,
    /// Linear slope of the last up-to-16 composite scores for this mint.
    pub trend: f64,
    /// Slope-of-slope over the same window.
    pub acceleration: f64,
    pub recommendation: Recommendation,
    pub computed_at: DateTime<Utc>,
}

impl ThreatReport {
    /// The "empty report → CRITICAL by policy" fail-closed path.
    fn fail_closed(mint: &str, reason: &str) -> Self {
        Self {
            mint: mint.to_string(),
            composite: 1.0,
            risk_level: RiskLevel::Critical,
            uncertainty: UncertaintyClass::High,
            confidence_interval: ConfidenceInterval {
                lower: 1.0,
                upper: 1.0,
                uncertainty_class: UncertaintyClass::High,
            },
            bucket_scores: vec![(Bucket::Risk, 1.0), (Bucket::Technical, 1.0), (Bucket::Market, 1.0)],
            top_factors: Vec::new(),
            missing_fraction: 1.0,
            trend: 0.0,
            acceleration: 0.0,
            recommendation: Recommendation::Avoid,
            computed_at: Utc::now(),
        }
        .with_reason(reason)
    }

    fn with_reason(self, _reason: &str) -> Self {
        self
    }

    pub fn is_critical(&self) -> bool {
        self.risk_level == RiskLevel::Critical
    }
}

/// Per-mint history used to compute trend/acceleration, capped at 16 points.
struct MintHistory {
    composites: VecDeque<f64>,
}

const TREND_WINDOW: usize = 16;
const SLOPE_POINTS: usize = 8;

impl MintHistory {
    fn new() -> Self {
        Self { composites: VecDeque::with_capacity(TREND_WINDOW) }
    }

    fn push(&mut self, composite: f64) {
        if self.composites.len() == TREND_WINDOW {
            self.composites.pop_front();
        }
        self.composites.push_back(composite);
    }

    /// Linear slope over the last `SLOPE_POINTS` samples (least squares, x = 0..n-1).
    fn slope(&self) -> f64 {
        let points: Vec<f64> = self
            .composites
            .iter()
            .rev()
            .take(SLOPE_POINTS)
            .rev()
            .copied()
            .collect();
        linear_slope(&points)
    }

    /// Slope of consecutive first-differences: the acceleration.
    fn acceleration(&self) -> f64 {
        let points: Vec<f64> = self.composites.iter().copied().collect();
        if points.len() < 3 {
            return 0.0;
        }
        let diffs: Vec<f64> = points.windows(2).map(|w| w[1] - w[0]).collect();
        linear_slope(&diffs)
    }
}

fn linear_slope(points: &[f64]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = points.iter().sum();
    let sum_xy: f64 = points.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..n).map(|i| (i * i) as f64).sum();
    let denom = n_f * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n_f * sum_xy - sum_x * sum_y) / denom
}

struct CachedReport {
    report: ThreatReport,
    cached_at: Instant,
}

const MEMOIZATION_TTL: Duration = Duration::from_secs(60);
const DEFAULT_DEADLINE_MS: u64 = 1500;

/// The Threat Scoring Engine: dispatches heuristics via the underlying
/// [`AdaptiveFilter`], fuses the result into buckets, and tracks
/// trend/acceleration per mint.
pub struct ThreatEngine {
    adaptive: Arc<AdaptiveFilter>,
    deadline: Duration,
    history: RwLock<std::collections::HashMap<String, MintHistory>>,
    memo: RwLock<std::collections::HashMap<String, CachedReport>>,
    alert_tx: Option<tokio::sync::mpsc::UnboundedSender<ThreatAlert>>,
}

impl ThreatEngine {
    pub fn new(adaptive: Arc<AdaptiveFilter>) -> Self {
        Self {
            adaptive,
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            history: RwLock::new(std::collections::HashMap::new()),
            memo: RwLock::new(std::collections::HashMap::new()),
            alert_tx: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Register the Position Manager's alert sink. Fire-and-forget: a
    /// dropped or full receiver never affects scoring.
    pub fn with_alert_channel(mut self, tx: tokio::sync::mpsc::UnboundedSender<ThreatAlert>) -> Self {
        self.alert_tx = Some(tx);
        self
    }

    fn emit_alert(&self, alert: ThreatAlert) {
        if let Some(tx) = &self.alert_tx {
            let _ = tx.send(alert);
        }
    }

    /// Score a token, honoring the memoization cache and the dispatch deadline.
    pub async fn assess(&self, context: &SignalContext) -> Result<ThreatReport> {
        if let Some(cached) = self.cached(&context.mint).await {
            return Ok(cached);
        }

        let scoring = match timeout(self.deadline, self.adaptive.score_full(context)).await {
            Ok(result) => result,
            Err(_) => {
                let report = ThreatReport::fail_closed(&context.mint, "heuristic dispatch deadline exceeded");
                self.record(&context.mint, report.composite).await;
                self.memoize(report.clone()).await;
                self.emit_alert(ThreatAlert {
                    mint: report.mint.clone(),
                    level: AlertLevel::Critical,
                    composite: report.composite,
                    trend: report.trend,
                    acceleration: report.acceleration,
                    reason: "heuristic dispatch deadline exceeded".to_string(),
                });
                return Ok(report);
            }
        };

        let report = self.fuse(&context.mint, scoring).await;
        self.record(&context.mint, report.composite).await;
        self.memoize(report.clone()).await;
        Ok(report)
    }

    async fn cached(&self, mint: &str) -> Option<ThreatReport> {
        let memo = self.memo.read().await;
        memo.get(mint).and_then(|c| {
            if c.cached_at.elapsed() < MEMOIZATION_TTL {
                Some(c.report.clone())
            } else {
                None
            }
        })
    }

    async fn memoize(&self, report: ThreatReport) {
        let mut memo = self.memo.write().await;
        memo.insert(report.mint.clone(), CachedReport { report, cached_at: Instant::now() });
    }

    async fn fuse(&self, mint: &str, scoring: ScoringResult) -> ThreatReport {
        if scoring.signals.is_empty() {
            return ThreatReport::fail_closed(mint, "no heuristics returned a result");
        }

        let missing = scoring.signals.iter().filter(|s| s.confidence == 0.0).count();
        let missing_fraction = missing as f64 / scoring.signals.len() as f64;

        let mut bucket_totals: std::collections::HashMap<Bucket, (f64, f64)> = std::collections::HashMap::new();
        for signal in &scoring.signals {
            let bucket: Bucket = signal.signal_type.into();
            let risk_component = (-signal.value).max(0.0) * signal.confidence;
            let entry = bucket_totals.entry(bucket).or_insert((0.0, 0.0));
            entry.0 += risk_component * signal.weight;
            entry.1 += signal.weight * signal.confidence;
        }

        let bucket_scores: Vec<(Bucket, f64)> = [Bucket::Risk, Bucket::Technical, Bucket::Market]
            .into_iter()
            .map(|b| {
                let (sum, weight) = bucket_totals.get(&b).copied().unwrap_or((0.0, 0.0));
                let score = if weight > 0.0 { (sum / weight).clamp(0.0, 1.0) } else { 0.0 };
                (b, score)
            })
            .collect();

        let composite: f64 = bucket_scores.iter().map(|(b, s)| b.weight() * s).sum();
        let composite = composite.clamp(0.0, 1.0);

        let mut top_factors = top_signal_factors(&scoring.signals);
        top_factors.truncate(5);

        let uncertainty = UncertaintyClass::from_missing_fraction(missing_fraction);
        let risk_level = RiskLevel::from_composite(composite);
        let confidence_interval = ConfidenceInterval::compute(composite, missing_fraction, &bucket_scores);

        let (trend, acceleration) = self.trend_for(mint).await;
        let was_critical = self.was_critical(mint).await;

        // Trend samples are per-assessment, not strictly per-minute; this
        // treats the per-sample slope as a stand-in for the per-minute rate
        // used by the alerting rule.
        if trend > 0.05 && acceleration > 0.0 {
            self.emit_alert(ThreatAlert {
                mint: mint.to_string(),
                level: AlertLevel::Warning,
                composite,
                trend,
                acceleration,
                reason: "composite accelerating upward".to_string(),
            });
        }
        if risk_level == RiskLevel::Critical && !was_critical {
            self.emit_alert(ThreatAlert {
                mint: mint.to_string(),
                level: AlertLevel::Critical,
                composite,
                trend,
                acceleration,
                reason: "composite crossed into CRITICAL".to_string(),
            });
        }

        ThreatReport {
            mint: mint.to_string(),
            composite,
            risk_level,
            uncertainty,
            confidence_interval,
            bucket_scores,
            top_factors,
            missing_fraction,
            trend,
            acceleration,
            recommendation: scoring.recommendation,
            computed_at: Utc::now(),
        }
    }

    async fn record(&self, mint: &str, composite: f64) {
        let mut history = self.history.write().await;
        history.entry(mint.to_string()).or_insert_with(MintHistory::new).push(composite);
    }

    async fn trend_for(&self, mint: &str) -> (f64, f64) {
        let history = self.history.read().await;
        match history.get(mint) {
            Some(h) => (h.slope(), h.acceleration()),
            None => (0.0, 0.0),
        }
    }

    /// Whether the most recently recorded composite for this mint (prior to
    /// the one currently being fused) was already CRITICAL, so we only emit
    /// the crossing alert once per excursion rather than on every repeat.
    async fn was_critical(&self, mint: &str) -> bool {
        let history = self.history.read().await;
        history
            .get(mint)
            .and_then(|h| h.composites.back())
            .map(|c| RiskLevel::from_composite(*c) == RiskLevel::Critical)
            .unwrap_or(false)
    }
}

fn top_signal_factors(signals: &[Signal]) -> Vec<(Bucket, f64)> {
    let mut scored: Vec<(Bucket, f64)> = signals
        .iter()
        .map(|s| (s.signal_type.into(), s.effective_contribution().abs()))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_composite(0.0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_composite(0.29), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_composite(0.3), RiskLevel::Monitor);
        assert_eq!(RiskLevel::from_composite(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from_composite(0.85), RiskLevel::Critical);
    }

    #[test]
    fn uncertainty_bands() {
        assert_eq!(UncertaintyClass::from_missing_fraction(0.0), UncertaintyClass::Low);
        assert_eq!(UncertaintyClass::from_missing_fraction(0.1), UncertaintyClass::Low);
        assert_eq!(UncertaintyClass::from_missing_fraction(0.2), UncertaintyClass::Medium);
        assert_eq!(UncertaintyClass::from_missing_fraction(0.9), UncertaintyClass::High);
    }

    #[test]
    fn confidence_interval_widens_with_missing_fraction() {
        let tight = ConfidenceInterval::compute(0.5, 0.0, &[(Bucket::Risk, 0.5), (Bucket::Technical, 0.5), (Bucket::Market, 0.5)]);
        let wide = ConfidenceInterval::compute(0.5, 0.9, &[(Bucket::Risk, 0.1), (Bucket::Technical, 0.9), (Bucket::Market, 0.5)]);
        assert!(wide.upper - wide.lower > tight.upper - tight.lower);
        assert_eq!(tight.uncertainty_class, UncertaintyClass::Low);
        assert_eq!(wide.uncertainty_class, UncertaintyClass::High);
    }


    #[test]
    fn fail_closed_is_critical() {
        let report = ThreatReport::fail_closed("mint1", "test");
        assert!(report.is_critical());
        assert_eq!(report.composite, 1.0);
        assert_eq!(report.missing_fraction, 1.0);
    }

    #[test]
    fn mint_history_trend_rises_with_increasing_scores() {
        let mut history = MintHistory::new();
        for v in [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8] {
            history.push(v);
        }
        assert!(history.slope() > 0.0);
    }

    #[test]
    fn mint_history_caps_at_window() {
        let mut history = MintHistory::new();
        for i in 0..20 {
            history.push(i as f64 * 0.01);
        }
        assert_eq!(history.composites.len(), TREND_WINDOW);
    }

    #[test]
    fn bucket_weights_sum_to_one() {
        let total = Bucket::Risk.weight() + Bucket::Technical.weight() + Bucket::Market.weight();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = ThreatReport::fail_closed("mint1", "test");
        let encoded = serde_json::to_string(&report).expect("serialize");
        let decoded: ThreatReport = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded.mint, report.mint);
        assert_eq!(decoded.composite, report.composite);
        assert_eq!(decoded.risk_level, report.risk_level);
        assert_eq!(decoded.uncertainty, report.uncertainty);
        assert_eq!(decoded.confidence_interval, report.confidence_interval);
        assert_eq!(decoded.bucket_scores, report.bucket_scores);
        assert_eq!(decoded.missing_fraction, report.missing_fraction);
        assert_eq!(decoded.trend, report.trend);
        assert_eq!(decoded.acceleration, report.acceleration);
        assert_eq!(decoded.recommendation, report.recommendation);
        assert_eq!(decoded.computed_at, report.computed_at);
    }
}
