//! Override Console
//!
//! Out-of-band command surface that can pre-empt automated behavior at any
//! point: emergency stop, pause/resume, manual trades that bypass strategy
//! aggregation and the risk veto, and strategy-parameter hot-swaps.
//!
//! Commands arrive on one bounded channel and are applied in arrival order
//! on a single control task — the total-order guarantee §5 calls out for
//! administrative state changes. `EMERGENCY_STOP` and `PAUSE` are plain
//! `AtomicBool` flags so the Strategy Combinator and Position Manager can
//! check them on every decision without going through the channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{info, warn};

use crate::config::OverrideConsoleConfig;

/// A command injected by an operator (dashboard, CLI, or any other
/// out-of-band caller), bypassing the normal strategy pipeline.
///
/// Serializable so the CLI can enqueue commands for a running instance via
/// the same JSON-file handoff the wallet commands use for `emergency.lock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OverrideCommand {
    EmergencyStop,
    Pause,
    Resume,
    Reset,
    ManualBuy { mint: String, size_sol: Option<f64>, slippage_bps: Option<u32> },
    ManualSell { mint: String, slippage_bps: Option<u32> },
    ClosePosition { mint: String },
    StrategyOverride { params: HashMap<String, f64> },
    StrategyReset,
}

/// A synthesized trade that bypasses strategy aggregation and the risk
/// veto (per spec: manual commands are not subject to them) but never
/// bypasses `EMERGENCY_STOP`.
#[derive(Debug, Clone)]
pub enum ManualIntent {
    Buy { mint: String, size_sol: Option<f64>, slippage_bps: Option<u32> },
    Sell { mint: String, slippage_bps: Option<u32> },
    Close { mint: String },
}

/// Fire-and-forget notifications for registered observers (dashboard push
/// stream). A send with no subscribers, or a lagging subscriber, is not an
/// error — `broadcast` drops it silently, matching "failures in observers
/// are logged, never propagated".
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    StateChanged { emergency_stop: bool, paused: bool },
    EmergencyStop,
    TradeExecuted { mint: String, action: String },
}

/// Non-blocking snapshot for `GET /status`-style reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleStatus {
    pub emergency_stop: bool,
    pub paused: bool,
    pub strategy_overridden: bool,
}

#[derive(Debug)]
pub enum OverrideError {
    /// The command channel is full; equivalent to a 429 to the caller.
    ChannelFull,
}

/// Snapshot of a strategy's parameters before `STRATEGY_OVERRIDE` swapped
/// them in, so `STRATEGY_RESET` can restore exactly what was there.
#[derive(Debug, Clone, Default)]
struct StrategyParamState {
    active: HashMap<String, f64>,
    /// `None` until the first override; restored verbatim on reset.
    original: Option<HashMap<String, f64>>,
}

/// Shared, cheaply-cloned handle: the flags any task can read without
/// going through the channel, plus a sender for commands that must be
/// totally ordered against each other.
#[derive(Clone)]
pub struct OverrideHandle {
    emergency_stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    strategy_params: Arc<RwLock<StrategyParamState>>,
    command_tx: mpsc::Sender<OverrideCommand>,
    manual_intent_tx: mpsc::UnboundedSender<ManualIntent>,
    events: broadcast::Sender<ConsoleEvent>,
}

impl OverrideHandle {
    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stop.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// `true` if new entries should be blocked: emergency stop or pause.
    pub fn entries_blocked(&self) -> bool {
        self.is_emergency_stopped() || self.is_paused()
    }

    pub async fn strategy_param(&self, key: &str) -> Option<f64> {
        self.strategy_params.read().await.active.get(key).copied()
    }

    pub async fn submit(&self, command: OverrideCommand) -> Result<(), OverrideError> {
        self.command_tx.try_send(command).map_err(|_| OverrideError::ChannelFull)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> ConsoleStatus {
        ConsoleStatus {
            emergency_stop: self.is_emergency_stopped(),
            paused: self.is_paused(),
            strategy_overridden: self.strategy_params.read().await.original.is_some(),
        }
    }

    fn notify(&self, event: ConsoleEvent) {
        // `send` errors only when there are zero subscribers; that's a
        // normal, expected state (no dashboard attached) and not logged as
        // a failure.
        let _ = self.events.send(event);
    }
}

/// Owns the command channel and the control task. Constructed once at
/// startup and handed an [`OverrideHandle`] plus the receiving end of the
/// manual-intent channel to wire into the Position Manager.
pub struct OverrideConsole {
    handle: OverrideHandle,
    command_rx: Option<mpsc::Receiver<OverrideCommand>>,
}

impl OverrideConsole {
    pub fn new(config: &OverrideConsoleConfig) -> (Self, mpsc::UnboundedReceiver<ManualIntent>) {
        let (command_tx, command_rx) = mpsc::channel(config.channel_capacity);
        let (manual_intent_tx, manual_intent_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(256);
        let handle = OverrideHandle {
            emergency_stop: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            strategy_params: Arc::new(RwLock::new(StrategyParamState::default())),
            command_tx,
            manual_intent_tx,
            events,
        };
        (Self { handle, command_rx: Some(command_rx) }, manual_intent_rx)
    }

    pub fn handle(&self) -> OverrideHandle {
        self.handle.clone()
    }

    /// Spawn the control task: applies commands strictly in arrival order,
    /// giving a total order for administrative state changes across
    /// however many callers submit them.
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        let handle = self.handle.clone();
        let mut rx = self.command_rx.take().expect("spawn called twice");
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                apply(&handle, command).await;
            }
        })
    }
}

async fn apply(handle: &OverrideHandle, command: OverrideCommand) {
    match command {
        OverrideCommand::EmergencyStop => {
            // R1: idempotent. Setting an already-true flag is a no-op aside
            // from re-emitting the notification, which observers can dedupe.
            handle.emergency_stop.store(true, Ordering::SeqCst);
            warn!("EMERGENCY_STOP engaged: all new entries blocked, open positions forced to CLOSING");
            handle.notify(ConsoleEvent::EmergencyStop);
            handle.notify(ConsoleEvent::StateChanged {
                emergency_stop: true,
                paused: handle.is_paused(),
            });
        }
        OverrideCommand::Pause => {
            handle.paused.store(true, Ordering::SeqCst);
            info!("trading paused: new entries blocked, open positions continue to be managed");
            handle.notify(ConsoleEvent::StateChanged {
                emergency_stop: handle.is_emergency_stopped(),
                paused: true,
            });
        }
        OverrideCommand::Resume => {
            handle.paused.store(false, Ordering::SeqCst);
            info!("trading resumed");
            handle.notify(ConsoleEvent::StateChanged {
                emergency_stop: handle.is_emergency_stopped(),
                paused: false,
            });
        }
        OverrideCommand::Reset => {
            // Explicit RESET required to clear EMERGENCY_STOP; PAUSE/RESUME
            // don't touch it.
            handle.emergency_stop.store(false, Ordering::SeqCst);
            handle.paused.store(false, Ordering::SeqCst);
            info!("override console reset: emergency stop and pause cleared");
            handle.notify(ConsoleEvent::StateChanged { emergency_stop: false, paused: false });
        }
        OverrideCommand::ManualBuy { mint, size_sol, slippage_bps } => {
            if handle.is_emergency_stopped() {
                warn!(%mint, "manual buy rejected: EMERGENCY_STOP is set");
                return;
            }
            let _ = handle
                .manual_intent_tx
                .send(ManualIntent::Buy { mint: mint.clone(), size_sol, slippage_bps });
            handle.notify(ConsoleEvent::TradeExecuted { mint, action: "manual_buy".to_string() });
        }
        OverrideCommand::ManualSell { mint, slippage_bps } => {
            let _ = handle.manual_intent_tx.send(ManualIntent::Sell { mint: mint.clone(), slippage_bps });
            handle.notify(ConsoleEvent::TradeExecuted { mint, action: "manual_sell".to_string() });
        }
        OverrideCommand::ClosePosition { mint } => {
            let _ = handle.manual_intent_tx.send(ManualIntent::Close { mint: mint.clone() });
            handle.notify(ConsoleEvent::TradeExecuted { mint, action: "close_position".to_string() });
        }
        OverrideCommand::StrategyOverride { params } => {
            let mut state = handle.strategy_params.write().await;
            if state.original.is_none() {
                state.original = Some(state.active.clone());
            }
            for (k, v) in params {
                state.active.insert(k, v);
            }
            info!(count = state.active.len(), "strategy parameters overridden");
        }
        OverrideCommand::StrategyReset => {
            let mut state = handle.strategy_params.write().await;
            if let Some(original) = state.original.take() {
                state.active = original;
                info!("strategy parameters restored to pre-override snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OverrideConsoleConfig {
        OverrideConsoleConfig { enabled: true, channel_capacity: 16 }
    }

    #[tokio::test]
    async fn emergency_stop_is_idempotent() {
        let (console, _rx) = OverrideConsole::new(&test_config());
        let handle = console.handle();
        let _task = console.spawn();
        handle.submit(OverrideCommand::EmergencyStop).await.unwrap();
        handle.submit(OverrideCommand::EmergencyStop).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(handle.is_emergency_stopped());
    }

    #[tokio::test]
    async fn reset_clears_emergency_stop() {
        let (console, _rx) = OverrideConsole::new(&test_config());
        let handle = console.handle();
        let _task = console.spawn();
        handle.submit(OverrideCommand::EmergencyStop).await.unwrap();
        handle.submit(OverrideCommand::Reset).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_emergency_stopped());
    }

    #[tokio::test]
    async fn strategy_override_then_reset_restores_snapshot() {
        let (console, _rx) = OverrideConsole::new(&test_config());
        let handle = console.handle();
        let _task = console.spawn();

        let mut params = HashMap::new();
        params.insert("buy_slippage_bps".to_string(), 200.0);
        handle.submit(OverrideCommand::StrategyOverride { params }).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(handle.strategy_param("buy_slippage_bps").await, Some(200.0));

        handle.submit(OverrideCommand::StrategyReset).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(handle.strategy_param("buy_slippage_bps").await, None);
    }

    #[tokio::test]
    async fn manual_buy_is_rejected_under_emergency_stop() {
        let (console, mut manual_rx) = OverrideConsole::new(&test_config());
        let handle = console.handle();
        let _task = console.spawn();
        handle.submit(OverrideCommand::EmergencyStop).await.unwrap();
        handle
            .submit(OverrideCommand::ManualBuy { mint: "M1".to_string(), size_sol: None, slippage_bps: None })
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(manual_rx.try_recv().is_err());
    }
}
