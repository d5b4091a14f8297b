//! Strategy registry: one value per trading style, each implementing the
//! [`super::combinator::Strategy`] capability set. A new strategy is added
//! here and registered with [`super::combinator::StrategyCombinator::with_strategy`] —
//! never by growing an inheritance hierarchy (see §9).

pub mod momentum;
pub mod reversal;
pub mod snipe;
pub mod social_signals;
pub mod whale_copy;

pub use momentum::{MomentumConfig, MomentumStrategy};
pub use reversal::{ReversalConfig, ReversalStrategy};
pub use snipe::{SnipeConfig, SnipeStrategy};
pub use social_signals::{SocialSignalsConfig, SocialSignalsStrategy};
pub use whale_copy::{WhaleCopyConfig, WhaleCopyStrategy};
