//! Background signal provider for honeypot/authority/liquidity risk,
//! program/extension technical integrity, and market-health heuristics.
//!
//! Unlike [`super::metadata::MetadataSignalProvider`], these signals depend
//! on enrichment that isn't available from the raw PumpPortal event alone
//! (mint/freeze authority, Token-2022 extensions, a simulated sell-back
//! probe, volume/age). When [`crate::filter::types::AccountRiskProfile`] is
//! absent from the context - the hot path, or enrichment hasn't completed
//! yet - each signal degrades to `unavailable` rather than guessing.

use async_trait::async_trait;

use crate::filter::signals::{Signal, SignalProvider, SignalType};
use crate::filter::types::{AccountRiskProfile, SignalContext};

/// Known-hostile Token-2022 extensions: these let the mint authority act
/// after the fact in ways a holder can't see coming.
const HOSTILE_EXTENSIONS: &[&str] = &[
    "transfer_hook",
    "permanent_delegate",
    "confidential_transfer_fee_config",
    "pausable",
];

const MIN_HEALTHY_HOLDER_COUNT: u32 = 25;
const YOUNG_TOKEN_SECS: u64 = 300;

pub struct RiskTechnicalMarketProvider;

impl RiskTechnicalMarketProvider {
    pub fn new() -> Self {
        Self
    }

    fn honeypot_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match profile.honeypot_probe_passed {
            Some(true) => Signal::neutral(SignalType::HoneypotProbe, "simulated sell succeeded"),
            Some(false) => Signal::extreme_risk(SignalType::HoneypotProbe, "simulated sell failed or returned dust"),
            None => Signal::unavailable(SignalType::HoneypotProbe, "sell simulation not run"),
        }
    }

    fn authority_signals(&self, profile: &AccountRiskProfile) -> Vec<Signal> {
        let mut out = Vec::with_capacity(4);
        out.push(match profile.mint_authority_present {
            Some(true) => Signal::new(SignalType::MintAuthority, -0.9, 0.95, "mint authority not revoked"),
            Some(false) => Signal::neutral(SignalType::MintAuthority, "mint authority revoked"),
            None => Signal::unavailable(SignalType::MintAuthority, "authority state unknown"),
        });
        out.push(match profile.freeze_authority_present {
            Some(true) => Signal::new(SignalType::FreezeAuthority, -0.7, 0.9, "freeze authority not revoked"),
            Some(false) => Signal::neutral(SignalType::FreezeAuthority, "freeze authority revoked"),
            None => Signal::unavailable(SignalType::FreezeAuthority, "authority state unknown"),
        });
        out.push(match profile.metadata_mutable {
            Some(true) => Signal::new(SignalType::MetadataMutable, -0.3, 0.8, "metadata can be rewritten post-launch"),
            Some(false) => Signal::neutral(SignalType::MetadataMutable, "metadata is immutable"),
            None => Signal::unavailable(SignalType::MetadataMutable, "metadata mutability unknown"),
        });
        out.push(match profile.permanent_delegate_present {
            Some(true) => Signal::extreme_risk(SignalType::PermanentDelegate, "permanent delegate can move holder balances"),
            Some(false) => Signal::neutral(SignalType::PermanentDelegate, "no permanent delegate"),
            None => Signal::unavailable(SignalType::PermanentDelegate, "permanent delegate state unknown"),
        });
        out.push(match profile.transfer_hook_present {
            Some(true) => Signal::new(SignalType::TransferHookPresence, -0.6, 0.85, "transfer hook can block or redirect transfers"),
            Some(false) => Signal::neutral(SignalType::TransferHookPresence, "no transfer hook"),
            None => Signal::unavailable(SignalType::TransferHookPresence, "transfer hook state unknown"),
        });
        out
    }

    fn liquidity_lock_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match profile.liquidity_locked {
            Some(true) => Signal::new(SignalType::LiquidityLockStatus, 0.4, 0.8, "liquidity locked or burned"),
            Some(false) => Signal::new(SignalType::LiquidityLockStatus, -0.5, 0.8, "liquidity withdrawable by creator"),
            None => Signal::unavailable(SignalType::LiquidityLockStatus, "liquidity lock status unknown"),
        }
    }

    fn creator_reputation_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match profile.creator_reputation_score {
            Some(score) => Signal::new(
                SignalType::CreatorReputation,
                score,
                0.7,
                format!("creator reputation store score {:.2}", score),
            ),
            None => Signal::unavailable(SignalType::CreatorReputation, "creator not in reputation store"),
        }
    }

    fn program_owner_signal(&self, profile: &AccountRiskProfile) -> Signal {
        if profile.program_owner_expected {
            Signal::neutral(SignalType::ProgramOwnerCheck, "mint owned by the expected token program")
        } else {
            Signal::extreme_risk(SignalType::ProgramOwnerCheck, "mint owned by an unexpected program")
        }
    }

    fn hostile_extension_signal(&self, profile: &AccountRiskProfile) -> Signal {
        let hits: Vec<&str> = profile
            .extensions
            .iter()
            .map(String::as_str)
            .filter(|e| HOSTILE_EXTENSIONS.contains(e))
            .collect();
        if hits.is_empty() {
            Signal::neutral(SignalType::HostileExtension, "no hostile extensions present")
        } else {
            Signal::new(
                SignalType::HostileExtension,
                -0.8,
                0.9,
                format!("hostile extensions present: {}", hits.join(", ")),
            )
        }
    }

    fn bonding_curve_sanity_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match profile.price_vs_curve_ratio {
            Some(ratio) => {
                let deviation = (ratio - 1.0).abs();
                if deviation > 0.2 {
                    Signal::new(
                        SignalType::BondingCurveSanity,
                        -0.5,
                        0.75,
                        format!("observed price deviates {:.0}% from curve formula", deviation * 100.0),
                    )
                } else {
                    Signal::neutral(SignalType::BondingCurveSanity, "observed price matches curve formula")
                }
            }
            None => Signal::unavailable(SignalType::BondingCurveSanity, "curve-implied price unavailable"),
        }
    }

    fn volume_profile_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match (profile.volume_24h_base, profile.token_age_secs) {
            (Some(volume), Some(age)) if age > 0 => {
                let hours = (age as f64 / 3600.0).max(1.0 / 60.0);
                let baseline = hours.min(24.0) * 0.1;
                if volume < baseline {
                    Signal::new(SignalType::VolumeProfile, -0.3, 0.6, "volume below age-normalized baseline")
                } else {
                    Signal::new(SignalType::VolumeProfile, 0.2, 0.6, "volume meets age-normalized baseline")
                }
            }
            _ => Signal::unavailable(SignalType::VolumeProfile, "volume/age data unavailable"),
        }
    }

    fn age_maturity_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match profile.token_age_secs {
            Some(age) if age < YOUNG_TOKEN_SECS => Signal::new(
                SignalType::AgeMaturity,
                -0.3,
                0.7,
                format!("token is {}s old, below the maturity floor", age),
            ),
            Some(_) => Signal::neutral(SignalType::AgeMaturity, "token has cleared the early-age window"),
            None => Signal::unavailable(SignalType::AgeMaturity, "token age unknown"),
        }
    }

    fn holder_count_signal(&self, profile: &AccountRiskProfile) -> Signal {
        match profile.holder_count {
            Some(count) if count < MIN_HEALTHY_HOLDER_COUNT => Signal::new(
                SignalType::HolderCount,
                -0.2,
                0.6,
                format!("only {} holders", count),
            ),
            Some(count) => Signal::new(SignalType::HolderCount, 0.1, 0.5, format!("{} holders", count)),
            None => Signal::unavailable(SignalType::HolderCount, "holder count unknown"),
        }
    }
}

impl Default for RiskTechnicalMarketProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalProvider for RiskTechnicalMarketProvider {
    fn name(&self) -> &'static str {
        "risk_technical_market"
    }

    fn signal_types(&self) -> &[SignalType] {
        &[
            SignalType::HoneypotProbe,
            SignalType::MintAuthority,
            SignalType::FreezeAuthority,
            SignalType::MetadataMutable,
            SignalType::PermanentDelegate,
            SignalType::TransferHookPresence,
            SignalType::LiquidityLockStatus,
            SignalType::CreatorReputation,
            SignalType::ProgramOwnerCheck,
            SignalType::HostileExtension,
            SignalType::BondingCurveSanity,
            SignalType::VolumeProfile,
            SignalType::AgeMaturity,
            SignalType::HolderCount,
        ]
    }

    fn is_hot_path(&self) -> bool {
        false
    }

    async fn compute_token_signals(&self, context: &SignalContext) -> Vec<Signal> {
        let start = std::time::Instant::now();
        let Some(profile) = context.account_risk.as_ref() else {
            return self
                .signal_types()
                .iter()
                .map(|t| Signal::unavailable(*t, "account risk profile not enriched").with_latency(start.elapsed()))
                .collect();
        };

        let mut signals = Vec::with_capacity(14);
        signals.push(self.honeypot_signal(profile));
        signals.extend(self.authority_signals(profile));
        signals.push(self.liquidity_lock_signal(profile));
        signals.push(self.creator_reputation_signal(profile));
        signals.push(self.program_owner_signal(profile));
        signals.push(self.hostile_extension_signal(profile));
        signals.push(self.bonding_curve_sanity_signal(profile));
        signals.push(self.volume_profile_signal(profile));
        signals.push(self.age_maturity_signal(profile));
        signals.push(self.holder_count_signal(profile));

        for s in &mut signals {
            s.latency = start.elapsed();
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(profile: AccountRiskProfile) -> SignalContext {
        let mut ctx = SignalContext::from_new_token(
            "mint".into(),
            "Name".into(),
            "SYM".into(),
            "uri".into(),
            "creator".into(),
            "curve".into(),
            0,
            1_000_000_000,
            100_000_000,
            1.0,
        );
        ctx.account_risk = Some(profile);
        ctx
    }

    #[tokio::test]
    async fn missing_profile_yields_all_unavailable() {
        let provider = RiskTechnicalMarketProvider::new();
        let ctx = SignalContext::from_new_token(
            "mint".into(), "Name".into(), "SYM".into(), "uri".into(),
            "creator".into(), "curve".into(), 0, 1, 1, 1.0,
        );
        let signals = provider.compute_token_signals(&ctx).await;
        assert_eq!(signals.len(), provider.signal_types().len());
        assert!(signals.iter().all(|s| s.confidence == 0.0));
    }

    #[tokio::test]
    async fn active_mint_authority_is_extreme_risk() {
        let provider = RiskTechnicalMarketProvider::new();
        let ctx = context_with(AccountRiskProfile {
            mint_authority_present: Some(true),
            ..Default::default()
        });
        let signals = provider.compute_token_signals(&ctx).await;
        let mint_auth = signals.iter().find(|s| s.signal_type == SignalType::MintAuthority).unwrap();
        assert!(mint_auth.value < -0.5);
    }

    #[tokio::test]
    async fn hostile_extension_detected() {
        let provider = RiskTechnicalMarketProvider::new();
        let ctx = context_with(AccountRiskProfile {
            extensions: vec!["transfer_hook".to_string()],
            ..Default::default()
        });
        let signals = provider.compute_token_signals(&ctx).await;
        let ext = signals.iter().find(|s| s.signal_type == SignalType::HostileExtension).unwrap();
        assert!(ext.value < 0.0);
    }

    #[tokio::test]
    async fn honeypot_probe_failure_is_extreme_risk() {
        let provider = RiskTechnicalMarketProvider::new();
        let ctx = context_with(AccountRiskProfile {
            honeypot_probe_passed: Some(false),
            ..Default::default()
        });
        let signals = provider.compute_token_signals(&ctx).await;
        let honeypot = signals.iter().find(|s| s.signal_type == SignalType::HoneypotProbe).unwrap();
        assert_eq!(honeypot.value, -1.0);
    }
}
