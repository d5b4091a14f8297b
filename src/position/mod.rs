//! Position management module

pub mod auto_sell;
pub mod lifecycle;
pub mod manager;
pub mod price_feed;

pub use auto_sell::AutoSeller;
pub use lifecycle::{
    Executor, ExitPlan, ExitTrigger, LifecycleManager, PositionState, SessionBlacklist,
    TrackedPosition,
};
pub use manager::PositionManager;
pub use price_feed::PriceFeed;
