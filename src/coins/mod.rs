//! Coin display states and the active coin set

pub mod display;
pub mod lifecycle;

pub use display::{CoinDisplayStateMachine, DisplayConfig, Transition};
pub use lifecycle::{
    ActiveCoin, CoinEvent, CoinLifecycleManager, CollectOutcome, CollectionConfig, LifecycleConfig,
};
