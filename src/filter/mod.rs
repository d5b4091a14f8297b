//! Token filtering and threat scoring module
//!
//! Heuristic signal providers feed a [`scoring::ScoringEngine`], which the
//! [`threat`] module wraps into the three-bucket (risk/technical/market)
//! fusion engine that produces [`threat::ThreatReport`]s for the rest of the
//! system.

pub mod adaptive;
pub mod bundled_detection;
pub mod cache;
pub mod enrichment;
pub mod helius;
pub mod holder_watcher;
pub mod kill_switch;
pub mod momentum;
pub mod scoring;
pub mod signals;
pub mod smart_money;
pub mod threat;
pub mod token_filter;
pub mod types;
pub mod wallet_tracker;

pub use adaptive::AdaptiveFilter;
pub use cache::FilterCache;
pub use holder_watcher::{HolderWatcher, HolderWatcherConfig};
pub use kill_switch::{KillSwitchAlert, KillSwitchDecision, KillSwitchEvaluator};
pub use scoring::{Recommendation, ScoringEngine, ScoringResult};
pub use signals::{MetadataSignalProvider, RiskTechnicalMarketProvider, WalletBehaviorSignalProvider};
pub use threat::{Bucket, ThreatEngine, ThreatReport, UncertaintyClass};
pub use token_filter::TokenFilter;
pub use types::SignalContext;
pub use wallet_tracker::WalletTracker;
