//! Position lifecycle state machine
//!
//! Turns a [`crate::strategy::TradeIntent`] into a tracked position and
//! drives it through `OPENING -> OPEN -> CLOSING -> CLOSED` (or `FAILED`),
//! evaluating exit triggers in the fixed priority order from §4.5 and
//! escalating slippage across exit retries. Per-mint transitions are
//! serialized on a task spawned per mint; there is no cross-mint lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::capital::CapitalPool;
use crate::config::PositionLifecycleConfig;
use crate::error::{Error, Result};
use crate::strategy::types::Position as StrategyPosition;

/// A position's place in the state machine. `Failed` and `Closed` are
/// terminal; `Failed` additionally session-blacklists the mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Opening,
    Open,
    Closing,
    Closed,
    Failed,
}

/// Which rule fired, in the fixed priority order (first match wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    EmergencyExit,
    StopLoss,
    TrailingStop,
    TakeProfit,
    MaxHold,
    StrategyExit,
}

/// Exit-trigger thresholds for one position; sized and set at entry.
#[derive(Debug, Clone)]
pub struct ExitPlan {
    pub stop_loss_pct: f64,
    pub trailing_pct: f64,
    pub take_profit_pct: f64,
    pub max_hold: Duration,
}

/// A tracked position plus its lifecycle state, layered over the plain P&L
/// bookkeeping struct in [`crate::strategy::types::Position`].
pub struct TrackedPosition {
    pub inner: StrategyPosition,
    pub state: PositionState,
    pub plan: ExitPlan,
    pub opened_at: Instant,
    pub trailing_high: f64,
    pub exit_retries: u32,
    /// Set by the Threat Scoring Engine's CRITICAL alert or by the
    /// Override Console; checked first, ahead of every price-based trigger.
    pub emergency_requested: bool,
    /// Strategy-owned `should_exit` result for this decision cycle, if any.
    pub strategy_exit_requested: bool,
}

impl TrackedPosition {
    fn new(inner: StrategyPosition, plan: ExitPlan) -> Self {
        let trailing_high = inner.entry_price;
        Self {
            inner,
            state: PositionState::Opening,
            plan,
            opened_at: Instant::now(),
            trailing_high,
            exit_retries: 0,
            emergency_requested: false,
            strategy_exit_requested: false,
        }
    }

    /// Evaluate exit triggers in the mandated priority order; first match wins.
    pub fn evaluate_exit(&mut self, current_price: f64) -> Option<ExitTrigger> {
        if current_price > self.trailing_high {
            self.trailing_high = current_price;
        }

        if self.emergency_requested {
            return Some(ExitTrigger::EmergencyExit);
        }
        let entry = self.inner.entry_price;
        if entry > 0.0 && current_price <= entry * (1.0 - self.plan.stop_loss_pct) {
            return Some(ExitTrigger::StopLoss);
        }
        if self.trailing_high > 0.0
            && current_price <= self.trailing_high * (1.0 - self.plan.trailing_pct)
        {
            return Some(ExitTrigger::TrailingStop);
        }
        if entry > 0.0 && current_price >= entry * (1.0 + self.plan.take_profit_pct) {
            return Some(ExitTrigger::TakeProfit);
        }
        if self.opened_at.elapsed() >= self.plan.max_hold {
            return Some(ExitTrigger::MaxHold);
        }
        if self.strategy_exit_requested {
            return Some(ExitTrigger::StrategyExit);
        }
        None
    }
}

/// Executes the actual buy/sell transactions. Kept as a trait so the
/// lifecycle's state-transition logic is testable without Jito/RPC, and so
/// simulation mode can substitute a no-op implementation.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn submit_buy(&self, mint: &str, size_sol: f64, slippage_bps: u32) -> Result<String>;
    async fn submit_sell(
        &self,
        mint: &str,
        quantity: u64,
        slippage_bps: u32,
        priority_fee_multiplier: f64,
    ) -> Result<String>;
    /// Poll a submitted signature for confirmation.
    async fn confirm(&self, signature: &str) -> Result<bool>;
    /// Used when a buy/sell's confirmation deadline expires without an
    /// answer: probe on-chain state directly rather than guessing.
    async fn probe_position_exists(&self, mint: &str) -> Result<bool>;
    /// Read the current on-chain price for `mint`, used both to record the
    /// real fill price once a buy confirms and to drive `on_price_update`
    /// at the monitoring cadence §4.5 calls for.
    async fn current_price(&self, mint: &str) -> Result<f64>;
}

/// Single-writer, many-reader blacklist: mints that FAILED stay off-limits
/// for `session_blacklist_secs`. Mutated only by the lifecycle manager on
/// FAILED transitions.
pub struct SessionBlacklist {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl SessionBlacklist {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn insert(&self, mint: &str) {
        self.entries.insert(mint.to_string(), Instant::now());
    }

    pub fn is_blacklisted(&self, mint: &str) -> bool {
        match self.entries.get(mint) {
            Some(entry) => entry.elapsed() < self.ttl,
            None => false,
        }
    }
}

/// Owns every tracked position and drives each through the state machine.
/// One task per mint; the capital pool is the only thing crossing task
/// boundaries under a lock. Cheaply cloneable (every field is an `Arc`) so
/// a per-mint close task can hold its own handle back into the manager.
pub struct LifecycleManager<E: Executor> {
    executor: Arc<E>,
    capital: Arc<CapitalPool>,
    blacklist: Arc<SessionBlacklist>,
    config: PositionLifecycleConfig,
    positions: Arc<RwLock<HashMap<String, Arc<RwLock<TrackedPosition>>>>>,
}

impl<E: Executor> Clone for LifecycleManager<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            capital: self.capital.clone(),
            blacklist: self.blacklist.clone(),
            config: self.config.clone(),
            positions: self.positions.clone(),
        }
    }
}

const CONFIRMATION_DEADLINE: Duration = Duration::from_secs(5);

impl<E: Executor + 'static> LifecycleManager<E> {
    pub fn new(
        executor: Arc<E>,
        capital: Arc<CapitalPool>,
        blacklist: Arc<SessionBlacklist>,
        config: PositionLifecycleConfig,
    ) -> Self {
        Self { executor, capital, blacklist, config, positions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn has_open_position(&self, mint: &str) -> bool {
        self.positions.read().await.contains_key(mint)
    }

    /// The OPEN-position monitoring cadence a caller should poll at.
    pub fn price_poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.price_poll_interval_ms)
    }

    /// Read the current on-chain price through the configured executor, for
    /// callers driving their own `on_price_update` polling loop.
    pub async fn executor_current_price(&self, mint: &str) -> Result<f64> {
        self.executor.current_price(mint).await
    }

    /// Open a position: submits the buy, waits for confirmation (or probes
    /// on-chain state if the deadline expires), and transitions
    /// `OPENING -> OPEN` or `OPENING -> FAILED`. Enforces P1 (at most one
    /// non-CLOSED position per mint) by refusing a second open.
    pub async fn open(
        &self,
        mint: &str,
        size_sol: f64,
        entry_price: f64,
        plan: ExitPlan,
        strategy: crate::strategy::types::TradingStrategy,
        slippage_bps: u32,
    ) -> Result<()> {
        if self.has_open_position(mint).await {
            return Err(Error::SafetyLimitExceeded(format!(
                "position already open for {}, refusing duplicate entry",
                mint
            )));
        }
        if self.blacklist.is_blacklisted(mint) {
            return Err(Error::SafetyLimitExceeded(format!("{} is session-blacklisted", mint)));
        }

        let committed = self.capital.try_debit(size_sol)?;
        if committed <= 0.0 {
            return Err(Error::InsufficientBalance { available: self.capital.available(), required: size_sol });
        }

        let inner = StrategyPosition {
            mint: mint.to_string(),
            entry_price,
            entry_time: chrono::Utc::now(),
            size_sol: committed,
            tokens_held: 0,
            strategy,
            exit_style: crate::strategy::types::ExitStyle::QuickScalp { target_pct: plan.take_profit_pct * 100.0 },
            highest_price: entry_price,
            lowest_price: entry_price,
            exit_levels_hit: Vec::new(),
        };
        let tracked = Arc::new(RwLock::new(TrackedPosition::new(inner, plan)));
        self.positions.write().await.insert(mint.to_string(), tracked.clone());

        let result = self.executor.submit_buy(mint, committed, slippage_bps).await;
        match result {
            Ok(signature) => {
                let confirmed = match tokio::time::timeout(
                    CONFIRMATION_DEADLINE,
                    self.executor.confirm(&signature),
                )
                .await
                {
                    Ok(Ok(confirmed)) => confirmed,
                    Ok(Err(_)) | Err(_) => {
                        // Deadline exceeded without a definitive answer: probe
                        // on-chain state rather than guessing.
                        self.executor.probe_position_exists(mint).await.unwrap_or(false)
                    }
                };
                if confirmed {
                    self.mark_open(mint, &tracked).await;
                    info!(%mint, size_sol = committed, "position OPENING -> OPEN");
                    Ok(())
                } else {
                    self.fail(mint, committed).await;
                    Err(Error::PositionPersistence(format!("{} entry did not confirm", mint)))
                }
            }
            Err(e) if e.is_retryable() => {
                // Definitive answer unavailable yet; probe before declaring FAILED.
                if self.executor.probe_position_exists(mint).await.unwrap_or(false) {
                    self.mark_open(mint, &tracked).await;
                    Ok(())
                } else {
                    self.fail(mint, committed).await;
                    Err(e)
                }
            }
            Err(e) => {
                self.fail(mint, committed).await;
                Err(e)
            }
        }
    }

    /// Transition `OPENING -> OPEN` and, best-effort, replace the
    /// placeholder entry price with the actual on-chain fill price so
    /// stop-loss/take-profit/trailing-stop have a real baseline. A failed
    /// price read leaves the placeholder in place rather than blocking the
    /// transition — the position is still OPEN either way.
    async fn mark_open(&self, mint: &str, tracked: &Arc<RwLock<TrackedPosition>>) {
        let fetched = self.executor.current_price(mint).await.ok().filter(|p| *p > 0.0);
        let mut guard = tracked.write().await;
        guard.state = PositionState::Open;
        if let Some(price) = fetched {
            guard.inner.entry_price = price;
            guard.inner.highest_price = price;
            guard.inner.lowest_price = price;
            guard.trailing_high = price;
        } else {
            warn!(%mint, "could not read on-chain fill price, keeping placeholder entry price");
        }
    }

    async fn fail(&self, mint: &str, committed_sol: f64) {
        if let Some(tracked) = self.positions.write().await.remove(mint) {
            tracked.write().await.state = PositionState::Failed;
        }
        if let Err(e) = self.capital.credit(committed_sol, 0.0) {
            error!(%mint, error = %e, "capital pool invariant violated releasing failed position");
        }
        self.blacklist.insert(mint);
        warn!(%mint, "position FAILED, session-blacklisted for {}s", self.config.session_blacklist_secs);
    }

    /// Called on every price tick (or an emergency/strategy-exit flag)
    /// for an OPEN position. Moves it to CLOSING if any exit trigger fires.
    pub async fn on_price_update(&self, mint: &str, current_price: f64) -> Option<ExitTrigger> {
        let positions = self.positions.read().await;
        let tracked = positions.get(mint)?.clone();
        drop(positions);

        let mut guard = tracked.write().await;
        if guard.state != PositionState::Open {
            return None;
        }
        guard.inner.update_price(current_price);
        let trigger = guard.evaluate_exit(current_price);
        if trigger.is_some() {
            guard.state = PositionState::Closing;
        }
        drop(guard);

        if let Some(trigger) = trigger {
            let manager = self.clone();
            let mint = mint.to_string();
            tokio::spawn(async move { manager.close(&mint, trigger).await });
        }
        trigger
    }

    pub async fn request_emergency_exit(&self, mint: &str) {
        if let Some(tracked) = self.positions.read().await.get(mint) {
            tracked.write().await.emergency_requested = true;
        }
    }

    /// Force every currently tracked position into CLOSING immediately,
    /// for Override Console EMERGENCY_STOP (§4.6: "existing positions are
    /// forced into CLOSING with maximum priority fee"). `OPEN` positions
    /// transition and spawn their close task right away rather than waiting
    /// for the next price tick, so scenario §8.5 ("both positions transition
    /// to CLOSING within one cycle") holds. `OPENING` positions are flagged
    /// so `mark_open` hands them straight to `evaluate_exit`, which checks
    /// `emergency_requested` first.
    pub async fn emergency_exit_all(&self) {
        let snapshot: Vec<(String, Arc<RwLock<TrackedPosition>>)> =
            self.positions.read().await.iter().map(|(mint, tracked)| (mint.clone(), tracked.clone())).collect();

        for (mint, tracked) in snapshot {
            let should_close = {
                let mut guard = tracked.write().await;
                guard.emergency_requested = true;
                if guard.state == PositionState::Open {
                    guard.state = PositionState::Closing;
                    true
                } else {
                    false
                }
            };
            if should_close {
                warn!(%mint, "EMERGENCY_STOP: forcing OPEN position to CLOSING");
                let manager = self.clone();
                let mint_owned = mint.clone();
                tokio::spawn(async move { manager.close(&mint_owned, ExitTrigger::EmergencyExit).await });
            }
        }
    }

    /// Drive CLOSING -> CLOSED. Retries up to `max_exit_retries` with
    /// doubling slippage; beyond that it keeps retrying with exponential
    /// backoff forever rather than abandoning the position (B4), raising a
    /// CRITICAL-equivalent warning each time.
    async fn close(&self, mint: &str, trigger: ExitTrigger) {
        let tracked = match self.positions.read().await.get(mint).cloned() {
            Some(t) => t,
            None => return,
        };

        loop {
            let (quantity, current_retries, size_sol) = {
                let guard = tracked.read().await;
                (guard.inner.tokens_held, guard.exit_retries, guard.inner.size_sol)
            };

            let slippage_bps = self.escalated_slippage(current_retries);
            let priority_fee_multiplier = 1.0 + current_retries as f64 * 0.5;

            match self.executor.submit_sell(mint, quantity, slippage_bps, priority_fee_multiplier).await {
                Ok(signature) => {
                    let confirmed = match tokio::time::timeout(
                        CONFIRMATION_DEADLINE,
                        self.executor.confirm(&signature),
                    )
                    .await
                    {
                        Ok(Ok(confirmed)) => confirmed,
                        _ => false,
                    };
                    if confirmed {
                        self.positions.write().await.remove(mint);
                        {
                            let mut guard = tracked.write().await;
                            guard.state = PositionState::Closed;
                        }
                        if let Err(e) = self.capital.credit(size_sol, 0.0) {
                            error!(%mint, error = %e, "capital pool invariant violated on close");
                        }
                        info!(%mint, ?trigger, "position CLOSING -> CLOSED");
                        return;
                    }
                }
                Err(e) if !e.is_retryable() => {
                    // Definitive rejection is still not grounds to abandon an
                    // open position; escalate slippage/priority and retry.
                    warn!(%mint, error = %e, "exit submit failed definitively, retrying with escalation");
                }
                Err(_) => {}
            }

            let mut guard = tracked.write().await;
            guard.exit_retries += 1;
            let retries = guard.exit_retries;
            drop(guard);

            if retries > self.config.max_exit_retries {
                error!(
                    %mint, retries, ?trigger,
                    "exit retries exhausted past max_exit_retries; still CLOSING, never abandoning the position"
                );
            }
            let backoff = Duration::from_millis(250 * 2u64.pow(retries.min(6)));
            sleep(backoff).await;
        }
    }

    fn escalated_slippage(&self, retries: u32) -> u32 {
        let escalated = self.config.exit_retry_base_slippage_bps.saturating_mul(2u32.saturating_pow(retries));
        escalated.min(self.config.exit_retry_max_slippage_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeExecutor;

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn submit_buy(&self, _mint: &str, _size_sol: f64, _slippage_bps: u32) -> Result<String> {
            Ok("sig".to_string())
        }
        async fn submit_sell(
            &self,
            _mint: &str,
            _quantity: u64,
            _slippage_bps: u32,
            _priority_fee_multiplier: f64,
        ) -> Result<String> {
            Ok("sig".to_string())
        }
        async fn confirm(&self, _signature: &str) -> Result<bool> {
            Ok(true)
        }
        async fn probe_position_exists(&self, _mint: &str) -> Result<bool> {
            Ok(true)
        }
        async fn current_price(&self, _mint: &str) -> Result<f64> {
            Ok(1.0)
        }
    }

    fn plan() -> ExitPlan {
        ExitPlan {
            stop_loss_pct: 0.2,
            trailing_pct: 0.15,
            take_profit_pct: 0.5,
            max_hold: Duration::from_secs(3600),
        }
    }

    #[test]
    fn stop_loss_fires_before_trailing_stop() {
        let inner = StrategyPosition {
            mint: "M1".to_string(),
            entry_price: 1.0,
            entry_time: chrono::Utc::now(),
            size_sol: 1.0,
            tokens_held: 100,
            strategy: crate::strategy::types::TradingStrategy::SnipeAndScalp,
            exit_style: crate::strategy::types::ExitStyle::QuickScalp { target_pct: 50.0 },
            highest_price: 1.0,
            lowest_price: 1.0,
            exit_levels_hit: vec![],
        };
        let mut tracked = TrackedPosition::new(inner, plan());
        tracked.state = PositionState::Open;
        assert_eq!(tracked.evaluate_exit(0.79), Some(ExitTrigger::StopLoss));
    }

    #[test]
    fn emergency_always_wins() {
        let inner = StrategyPosition {
            mint: "M1".to_string(),
            entry_price: 1.0,
            entry_time: chrono::Utc::now(),
            size_sol: 1.0,
            tokens_held: 100,
            strategy: crate::strategy::types::TradingStrategy::SnipeAndScalp,
            exit_style: crate::strategy::types::ExitStyle::QuickScalp { target_pct: 50.0 },
            highest_price: 1.0,
            lowest_price: 1.0,
            exit_levels_hit: vec![],
        };
        let mut tracked = TrackedPosition::new(inner, plan());
        tracked.emergency_requested = true;
        assert_eq!(tracked.evaluate_exit(2.0), Some(ExitTrigger::EmergencyExit));
    }

    #[test]
    fn blacklist_expires_after_ttl() {
        let blacklist = SessionBlacklist::new(Duration::from_millis(10));
        blacklist.insert("M1");
        assert!(blacklist.is_blacklisted("M1"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!blacklist.is_blacklisted("M1"));
    }

    #[tokio::test]
    async fn emergency_exit_all_flags_and_closes_every_open_position() {
        let executor = Arc::new(FakeExecutor);
        let capital = Arc::new(CapitalPool::new(10.0));
        let blacklist = Arc::new(SessionBlacklist::new(Duration::from_secs(3600)));
        let manager =
            LifecycleManager::new(executor, capital, blacklist, PositionLifecycleConfig::default());

        for mint in ["M1", "M2"] {
            manager
                .open(mint, 1.0, 1.0, plan(), crate::strategy::types::TradingStrategy::SnipeAndScalp, 500)
                .await
                .unwrap();
        }

        let m1 = manager.positions.read().await.get("M1").unwrap().clone();
        let m2 = manager.positions.read().await.get("M2").unwrap().clone();
        assert_eq!(m1.read().await.state, PositionState::Open);
        assert_eq!(m2.read().await.state, PositionState::Open);

        manager.emergency_exit_all().await;

        // Both the emergency flag and the state transition happen
        // synchronously inside `emergency_exit_all`, before the close task
        // is even spawned, so both positions are already off `Open` the
        // moment it returns, not on the next price tick.
        assert!(m1.read().await.emergency_requested);
        assert!(m2.read().await.emergency_requested);
        assert_ne!(m1.read().await.state, PositionState::Open);
        assert_ne!(m2.read().await.state, PositionState::Open);
    }
}
