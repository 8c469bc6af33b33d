//! Active coin set, selection and collection gating

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algorithms::geo_math::distance_meters;
use crate::coins::display::{CoinDisplayStateMachine, DisplayConfig, Transition};
use crate::core::{CoinDisplayState, CoinTarget, GeoPoint, LocationFix, MAX_ACTIVE_COINS};
use crate::processing::alignment::CompassAlignment;
use crate::processing::mode::{Placement, PlacementFrame, PositioningMode};
use crate::processing::reconciler::ReconcilerConfig;

/// Gates applied to collection attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Fixes less accurate than this can't collect (meters)
    pub accuracy_ceiling_m: f32,
    /// Highest coin value the player may collect
    pub find_limit: f64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            accuracy_ceiling_m: 25.0,
            find_limit: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub max_active_coins: usize,
    /// Targets within this radius of the player are spawned (meters)
    pub spawn_radius_m: f64,
    /// Active coins beyond this radius are despawned (meters)
    pub despawn_radius_m: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_active_coins: MAX_ACTIVE_COINS,
            spawn_radius_m: 200.0,
            despawn_radius_m: 250.0,
        }
    }
}

/// Typed result of a collection attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectOutcome {
    /// Coin value is above the player's find limit
    Locked,
    /// Coin is not in collect range
    OutOfRange,
    /// Player fix is missing or too inaccurate
    PoorGpsAccuracy,
    /// No active coin has this id
    UnknownCoin,
    /// Collected; carries the coin's value
    Success(f64),
}

/// Outbound notifications for the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum CoinEvent {
    Spawned { id: String },
    Despawned { id: String },
    Collected { id: String, value: f64 },
    SelectionChanged { id: Option<String> },
}

/// State of one active coin
#[derive(Debug, Clone)]
pub struct ActiveCoin {
    positioning: PositioningMode,
    display: CoinDisplayStateMachine,
    placement: Option<Placement>,
    distance_m: Option<f64>,
}

impl ActiveCoin {
    pub fn target(&self) -> &CoinTarget {
        self.positioning.target()
    }

    pub fn id(&self) -> &str {
        &self.target().id
    }

    pub fn display_state(&self) -> CoinDisplayState {
        self.display.state()
    }

    /// Drawn this frame; fallback coins inside collect range are hidden
    /// but remain collectible
    pub fn should_render(&self) -> bool {
        self.display.should_render() && !self.placement.is_some_and(|p| p.pinned)
    }

    /// Latest placement; `None` while hidden
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn distance_m(&self) -> Option<f64> {
        self.distance_m
    }

    pub fn is_fallback(&self) -> bool {
        self.positioning.is_fallback()
    }
}

/// Owns every active coin in an arena of reusable slots
pub struct CoinLifecycleManager {
    config: LifecycleConfig,
    collection: CollectionConfig,
    reconciler: ReconcilerConfig,
    display: DisplayConfig,
    alignment: CompassAlignment,
    slots: Vec<Option<ActiveCoin>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    collected: HashSet<String>,
    selected: Option<String>,
    events: VecDeque<CoinEvent>,
    fallback: bool,
}

impl CoinLifecycleManager {
    pub fn new(
        config: LifecycleConfig,
        collection: CollectionConfig,
        reconciler: ReconcilerConfig,
        display: DisplayConfig,
        alignment: CompassAlignment,
    ) -> Self {
        Self {
            config,
            collection,
            reconciler,
            display,
            alignment,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            collected: HashSet::new(),
            selected: None,
            events: VecDeque::new(),
            fallback: false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.index.len()
    }

    pub fn get(&self, id: &str) -> Option<&ActiveCoin> {
        self.index.get(id).and_then(|&i| self.slots[i].as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveCoin> {
        self.slots.iter().flatten()
    }

    pub fn is_collected(&self, id: &str) -> bool {
        self.collected.contains(id)
    }

    /// Activate a coin; returns its slot, or `None` when full or already collected
    pub fn acquire(&mut self, target: CoinTarget) -> Option<usize> {
        if let Some(&slot) = self.index.get(&target.id) {
            return Some(slot);
        }
        if self.collected.contains(&target.id) || self.active_count() >= self.config.max_active_coins {
            return None;
        }

        let id = target.id.clone();
        let coin = self.make_coin(target);
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(coin);
                slot
            }
            None => {
                self.slots.push(Some(coin));
                self.slots.len() - 1
            }
        };
        self.index.insert(id.clone(), slot);
        debug!(coin = %id, slot, "coin spawned");
        self.events.push_back(CoinEvent::Spawned { id });
        Some(slot)
    }

    /// Deactivate a coin and recycle its slot
    pub fn release(&mut self, id: &str) -> Option<CoinTarget> {
        let slot = self.index.remove(id)?;
        let coin = self.slots[slot].take()?;
        self.free.push(slot);

        if self.selected.as_deref() == Some(id) {
            self.clear_selection();
        }
        debug!(coin = %id, slot, "coin despawned");
        self.events.push_back(CoinEvent::Despawned { id: id.to_string() });
        Some(coin.target().clone())
    }

    /// Reconcile the active set against the full target list
    ///
    /// Without a player position only removals of unlisted coins happen.
    pub fn sync_targets(&mut self, targets: &[CoinTarget], player: Option<&GeoPoint>) {
        let listed: HashSet<&str> = targets.iter().map(|t| t.id.as_str()).collect();

        let stale: Vec<String> = self
            .iter()
            .filter(|coin| {
                !listed.contains(coin.id())
                    || player.is_some_and(|p| {
                        distance_meters(p, &coin.target().coordinate) > self.config.despawn_radius_m
                    })
            })
            .map(|coin| coin.id().to_string())
            .collect();
        for id in stale {
            self.release(&id);
        }

        let Some(player) = player else {
            return;
        };

        let mut candidates: Vec<(f64, &CoinTarget)> = targets
            .iter()
            .filter(|t| !self.index.contains_key(&t.id) && !self.collected.contains(&t.id))
            .map(|t| (distance_meters(player, &t.coordinate), t))
            .filter(|(d, _)| *d <= self.config.spawn_radius_m)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let room = self.config.max_active_coins.saturating_sub(self.active_count());
        let spawn: Vec<CoinTarget> = candidates.into_iter().take(room).map(|(_, t)| t.clone()).collect();
        for target in spawn {
            self.acquire(target);
        }
    }

    /// Advance every active coin one frame
    pub fn update(&mut self, fix: Option<&LocationFix>, smoothed_heading: Option<f32>, dt: f32) -> Vec<(String, Transition)> {
        let player = fix.map(|f| f.coordinate).filter(GeoPoint::is_valid);
        let mut transitions = Vec::new();
        let mut finished = Vec::new();

        for coin in self.slots.iter_mut().flatten() {
            let distance = player.map(|p| distance_meters(&p, &coin.target().coordinate));
            coin.distance_m = distance.or(coin.distance_m);

            if let Some(t) = coin.display.update(distance, dt) {
                transitions.push((coin.id().to_string(), t));
            }

            coin.placement = if let Some(offset) = coin.display.placement_override() {
                Some(Placement {
                    offset,
                    frame: PlacementFrame::Camera,
                    distance_m: coin.distance_m,
                    locked: false,
                    lock_event: None,
                    pinned: false,
                })
            } else if coin.display.state().is_positioned() {
                Some(coin.positioning.update(fix, smoothed_heading, dt))
            } else {
                None
            };

            if coin.display.is_finished() {
                finished.push(coin.id().to_string());
            }
        }

        for id in finished {
            self.release(&id);
        }
        transitions
    }

    /// Switch every coin, and every coin spawned later, to fallback placement
    pub fn degrade_all(&mut self) {
        self.fallback = true;
        let (collect, view) = (self.display.collect_distance_m, self.display.view_distance_m);
        for coin in self.slots.iter_mut().flatten() {
            coin.positioning.degrade(collect, view);
        }
    }

    /// Rebuild every positioner in native mode; AR session restart only
    pub fn restore_native(&mut self) {
        self.fallback = false;
        for coin in self.slots.iter_mut().flatten() {
            let target = coin.positioning.target().clone();
            coin.positioning = PositioningMode::native(target, self.alignment.clone(), self.reconciler.clone());
            coin.placement = None;
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Forget cached offsets, e.g. after the compass reference changed
    pub fn reset_positioners(&mut self) {
        for coin in self.slots.iter_mut().flatten() {
            coin.positioning.reset();
        }
    }

    /// Closest active coin that hasn't been collected
    pub fn nearest_coin(&self) -> Option<&ActiveCoin> {
        self.iter()
            .filter(|c| c.display_state() != CoinDisplayState::Collecting)
            .filter_map(|c| c.distance_m.map(|d| (d, c)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, c)| c)
    }

    pub fn selected_coin(&self) -> Option<&ActiveCoin> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: &str) -> bool {
        if !self.index.contains_key(id) {
            return false;
        }
        if self.selected.as_deref() != Some(id) {
            self.selected = Some(id.to_string());
            self.events.push_back(CoinEvent::SelectionChanged { id: Some(id.to_string()) });
        }
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.events.push_back(CoinEvent::SelectionChanged { id: None });
        }
    }

    /// Attempt to collect a coin with the player's current fix
    ///
    /// Gates run in order: find limit, collect range, GPS accuracy.
    pub fn try_collect(&mut self, id: &str, fix: Option<&LocationFix>) -> CollectOutcome {
        let Some(&slot) = self.index.get(id) else {
            return CollectOutcome::UnknownCoin;
        };
        let Some(coin) = self.slots[slot].as_mut() else {
            return CollectOutcome::UnknownCoin;
        };

        let value = coin.target().value;
        let outcome = if value > self.collection.find_limit {
            CollectOutcome::Locked
        } else if coin.display.state() != CoinDisplayState::Collectible {
            CollectOutcome::OutOfRange
        } else if !fix.is_some_and(|f| f.horizontal_accuracy_m <= self.collection.accuracy_ceiling_m) {
            CollectOutcome::PoorGpsAccuracy
        } else {
            coin.display.collect();
            CollectOutcome::Success(value)
        };

        info!(coin = %id, ?outcome, "collection attempt");
        if let CollectOutcome::Success(value) = outcome {
            self.collected.insert(id.to_string());
            self.events.push_back(CoinEvent::Collected { id: id.to_string(), value });
        }
        outcome
    }

    /// Take all queued events in emission order
    pub fn drain_events(&mut self) -> Vec<CoinEvent> {
        self.events.drain(..).collect()
    }

    pub fn collection_config(&self) -> &CollectionConfig {
        &self.collection
    }

    pub fn set_find_limit(&mut self, find_limit: f64) {
        self.collection.find_limit = find_limit;
    }

    fn make_coin(&self, target: CoinTarget) -> ActiveCoin {
        let mut positioning = PositioningMode::native(target, self.alignment.clone(), self.reconciler.clone());
        if self.fallback {
            positioning.degrade(self.display.collect_distance_m, self.display.view_distance_m);
        }
        ActiveCoin {
            positioning,
            display: CoinDisplayStateMachine::new(self.display.clone()),
            placement: None,
            distance_m: None,
        }
    }
}
