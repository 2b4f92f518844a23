// Auction session state machine.
//
// The single source of truth for a live auction: it owns the main and
// opponent rosters plus the available-player catalog, enforces the
// Uninitialized -> Active -> Finished lifecycle, and is the only component
// that talks to the valuation service and the session store. Every mutating
// operation runs validate -> remote call -> local apply, so a failure at any
// step leaves the session in its last valid state.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AuctionError;
use crate::service::AuctionService;
use crate::store::{self, SessionStore};

use super::catalog::PlayerCatalog;
use super::player::{Money, Player, PlayerName, TeamId};
use super::roster::{Roster, RosterError, RosterSnapshot};
use super::squad::Squad;

// ---------------------------------------------------------------------------
// Public state types
// ---------------------------------------------------------------------------

/// The session's lifecycle stage. `Finished` is terminal: a finished session
/// must not be reused for a new auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Uninitialized,
    Active,
    Finished,
}

/// Result of a recorded purchase. `remaining_budget` is the locally computed
/// main-team budget for a main-team buy, or the server's advisory value (if
/// any) for an opponent pick.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOutcome {
    pub player: Player,
    pub remaining_budget: Option<Money>,
}

/// Read-only view of the whole session for presentation surfaces.
/// Opponents appear in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub main: Option<RosterSnapshot>,
    pub opponents: Vec<RosterSnapshot>,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Everything that only exists while the auction is active.
struct ActiveAuction {
    session_id: String,
    main: Roster,
    opponent_order: Vec<TeamId>,
    opponents: HashMap<TeamId, Roster>,
    catalog: PlayerCatalog,
}

impl ActiveAuction {
    /// Whether this identity is already on any tracked roster.
    fn contains_player(&self, name: &PlayerName) -> bool {
        self.main.has_player(name) || self.opponents.values().any(|r| r.has_player(name))
    }

    /// Drop any locally-rostered name the server still reports as available.
    /// The service owns the global pool, but a name on a tracked roster must
    /// never show up in the catalog.
    fn prune_rostered_from_catalog(&mut self) {
        let rostered: Vec<String> = self
            .main
            .players()
            .iter()
            .chain(self.opponents.values().flat_map(|r| r.players()))
            .map(|p| p.name.full())
            .collect();
        for name in rostered {
            if self.catalog.contains(&name) {
                warn!("server still lists rostered player '{}' as available", name);
                self.catalog.remove(&name);
            }
        }
    }

    fn to_session_state(&self) -> store::SessionState {
        store::SessionState {
            session_id: self.session_id.clone(),
            opponents: self
                .opponent_order
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            available_players: self.catalog.names().to_vec(),
            total_budget: self.main.total().unwrap_or(Money::ZERO),
        }
    }
}

enum Lifecycle {
    Uninitialized,
    Active(ActiveAuction),
    Finished,
}

// ---------------------------------------------------------------------------
// AuctionSession
// ---------------------------------------------------------------------------

/// One live auction. Constructed once per auction and passed by reference to
/// every consumer; there is no shared global instance.
///
/// All mutating methods take `&mut self`, so the borrow checker serializes
/// them: a second mutating call cannot start until the in-flight one
/// (including its await on the service) has returned, and `finish` can never
/// interleave with a purchase.
pub struct AuctionSession {
    service: Arc<dyn AuctionService>,
    store: Arc<dyn SessionStore>,
    lifecycle: Lifecycle,
}

impl AuctionSession {
    pub fn new(service: Arc<dyn AuctionService>, store: Arc<dyn SessionStore>) -> Self {
        AuctionSession {
            service,
            store,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.lifecycle {
            Lifecycle::Uninitialized => Phase::Uninitialized,
            Lifecycle::Active(_) => Phase::Active,
            Lifecycle::Finished => Phase::Finished,
        }
    }

    /// Start the auction: fix the budget and the opponent set, register both
    /// with the service, and prime the available-player catalog.
    ///
    /// Opponent names are trimmed, case-folded, and de-duplicated preserving
    /// first-seen order. Fails without any state change on a non-positive
    /// budget, fewer than 2 distinct opponents, or a service failure (no
    /// partial activation).
    pub async fn initialize(
        &mut self,
        opponent_names: &[String],
        budget: Money,
    ) -> Result<(), AuctionError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            _ => return Err(AuctionError::AlreadyInitialized),
        }
        if !budget.is_positive() {
            return Err(AuctionError::InvalidBudget(budget));
        }

        let mut order: Vec<TeamId> = Vec::new();
        for raw in opponent_names {
            if let Some(id) = TeamId::normalized(raw) {
                if !order.contains(&id) {
                    order.push(id);
                }
            }
        }
        if order.len() < 2 {
            return Err(AuctionError::InsufficientOpponents(order.len()));
        }

        let names: Vec<String> = order.iter().map(|id| id.as_str().to_string()).collect();
        self.service.initialize(&names, budget).await?;

        let available = self.service.available_players().await?;
        let mut catalog = PlayerCatalog::new();
        catalog.refresh(available);

        let opponents = order
            .iter()
            .cloned()
            .map(|id| (id.clone(), Roster::uncapped(id)))
            .collect();
        let active = ActiveAuction {
            session_id: store::generate_session_id(),
            main: Roster::capped(budget),
            opponent_order: order,
            opponents,
            catalog,
        };

        persist_state(self.store.as_ref(), &active);
        info!(
            "auction initialized: {} opponents, budget {}",
            active.opponent_order.len(),
            budget
        );
        self.lifecycle = Lifecycle::Active(active);
        Ok(())
    }

    /// Buy a player for the main team.
    ///
    /// Affordability and duplicates are checked locally first, so an
    /// unaffordable bid never costs a round-trip. Role and predicted PDK come
    /// from the service's valuation; the client never invents them.
    pub async fn buy_for_main_team(
        &mut self,
        player_name: &str,
        cost: Money,
    ) -> Result<PurchaseOutcome, AuctionError> {
        let service = Arc::clone(&self.service);
        let active = match &mut self.lifecycle {
            Lifecycle::Active(active) => active,
            _ => return Err(AuctionError::NotActive),
        };

        if !cost.is_positive() {
            return Err(AuctionError::InvalidCost(cost));
        }
        let name = PlayerName::parse(player_name).ok_or(AuctionError::InvalidPlayerName)?;
        if active.contains_player(&name) {
            return Err(RosterError::DuplicatePlayer { name: name.full() }.into());
        }
        if !active.main.can_afford(cost) {
            return Err(RosterError::BudgetExceeded {
                cost,
                remaining: active.main.remaining().unwrap_or(Money::ZERO),
            }
            .into());
        }

        let valuation = service.buy_player(&name.full(), cost).await?;

        let player = Player {
            name,
            role: valuation.role,
            cost,
            predicted_pdk: valuation.predicted_pdk,
        };
        active.main.apply_purchase(player.clone())?;
        active.catalog.remove(&player.name.full());

        let remaining = active.main.remaining();
        if let (Some(local), Some(server)) = (remaining, valuation.remaining_budget) {
            if local != server {
                warn!(
                    "server reports remaining budget {} but local arithmetic says {}",
                    server, local
                );
            }
        }

        refresh_catalog(service.as_ref(), active).await;
        persist_state(self.store.as_ref(), active);
        info!(
            "bought {} for {} (remaining budget {})",
            player.name,
            cost,
            remaining.unwrap_or(Money::ZERO)
        );
        Ok(PurchaseOutcome {
            player,
            remaining_budget: remaining,
        })
    }

    /// Record a purchase made by a registered opponent. The opponent's
    /// roster is uncapped: the cost is tracked but never enforced.
    pub async fn record_opponent_pick(
        &mut self,
        player_name: &str,
        opponent: &str,
        cost: Money,
    ) -> Result<PurchaseOutcome, AuctionError> {
        let service = Arc::clone(&self.service);
        let active = match &mut self.lifecycle {
            Lifecycle::Active(active) => active,
            _ => return Err(AuctionError::NotActive),
        };

        if !cost.is_positive() {
            return Err(AuctionError::InvalidCost(cost));
        }
        let name = PlayerName::parse(player_name).ok_or(AuctionError::InvalidPlayerName)?;
        let opponent_id = TeamId::normalized(opponent)
            .filter(|id| active.opponents.contains_key(id))
            .ok_or_else(|| AuctionError::UnknownOpponent(opponent.to_string()))?;
        if active.contains_player(&name) {
            return Err(RosterError::DuplicatePlayer { name: name.full() }.into());
        }

        let valuation = service
            .opponent_pick(&name.full(), opponent_id.as_str(), cost)
            .await?;

        let player = Player {
            name,
            role: valuation.role,
            cost,
            predicted_pdk: valuation.predicted_pdk,
        };
        let roster = active
            .opponents
            .get_mut(&opponent_id)
            .expect("opponent roster existence checked above");
        roster.apply_purchase(player.clone())?;
        active.catalog.remove(&player.name.full());

        refresh_catalog(service.as_ref(), active).await;
        persist_state(self.store.as_ref(), active);
        info!(
            "recorded opponent pick: {} -> {} for {}",
            player.name, opponent_id, cost
        );
        Ok(PurchaseOutcome {
            player,
            remaining_budget: valuation.remaining_budget,
        })
    }

    /// Ask the service for candidate balanced squads. Pure read: no roster
    /// or catalog state changes, whatever the outcome. Malformed squads in
    /// the response are rejected wholesale rather than silently coerced.
    pub async fn request_squad_generation(
        &self,
        count: u32,
    ) -> Result<Vec<Squad>, AuctionError> {
        if !matches!(self.lifecycle, Lifecycle::Active(_)) {
            return Err(AuctionError::NotActive);
        }
        if count < 1 {
            return Err(AuctionError::InvalidSquadCount(count));
        }

        let squads = self.service.generate_squads(count).await?;
        debug!("received {} candidate squads", squads.len());
        Ok(squads)
    }

    /// End the auction. Terminal: all locally cached session data is
    /// discarded and the persisted state cleared; the session object cannot
    /// be reused. On service failure the session stays Active.
    pub async fn finish(&mut self) -> Result<(), AuctionError> {
        if !matches!(self.lifecycle, Lifecycle::Active(_)) {
            return Err(AuctionError::NotActive);
        }

        self.service.finish_auction().await?;

        if let Err(e) = self.store.clear() {
            warn!("failed to clear persisted session state: {e:#}");
        }
        self.lifecycle = Lifecycle::Finished;
        info!("auction finished");
        Ok(())
    }

    /// Re-sync rosters from the service's `/team` view.
    ///
    /// The server's player lists are adopted wholesale; the remaining budget
    /// is then recomputed locally from the adopted list (which keeps the
    /// budget invariant intact) and any drift against the server's reported
    /// value is logged.
    pub async fn reconcile_with_server(&mut self) -> Result<(), AuctionError> {
        let service = Arc::clone(&self.service);
        let active = match &mut self.lifecycle {
            Lifecycle::Active(active) => active,
            _ => return Err(AuctionError::NotActive),
        };

        let overview = service.team_overview().await?;

        active.main.replace_players(overview.my_team);
        if let Some(local) = active.main.remaining() {
            if local != overview.remaining_budget {
                warn!(
                    "server reports remaining budget {} but local arithmetic says {}",
                    overview.remaining_budget, local
                );
            }
        }

        for (raw_name, players) in overview.opponent_teams {
            let Some(id) = TeamId::normalized(&raw_name) else {
                continue;
            };
            match active.opponents.get_mut(&id) {
                Some(roster) => roster.replace_players(players),
                // The opponent set is fixed at initialization; an unknown
                // team from the server is reported, not auto-registered.
                None => warn!("server reported unregistered opponent team '{}'", id),
            }
        }

        active.prune_rostered_from_catalog();
        persist_state(self.store.as_ref(), active);
        Ok(())
    }

    /// Restore a previously persisted session, then reconcile rosters from
    /// the server. Returns `Ok(false)` when there is nothing to resume. On a
    /// reconcile failure the session rolls back to Uninitialized.
    pub async fn resume(&mut self) -> Result<bool, AuctionError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            _ => return Err(AuctionError::AlreadyInitialized),
        }

        let saved = match self.store.load() {
            Ok(Some(state)) => state,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("failed to load persisted session state: {e:#}");
                return Ok(false);
            }
        };

        let mut order: Vec<TeamId> = Vec::new();
        for name in &saved.opponents {
            if let Some(id) = TeamId::normalized(name) {
                if !order.contains(&id) {
                    order.push(id);
                }
            }
        }
        let opponents = order
            .iter()
            .cloned()
            .map(|id| (id.clone(), Roster::uncapped(id)))
            .collect();
        let mut catalog = PlayerCatalog::new();
        catalog.refresh(saved.available_players);

        self.lifecycle = Lifecycle::Active(ActiveAuction {
            session_id: saved.session_id,
            main: Roster::capped(saved.total_budget),
            opponent_order: order,
            opponents,
            catalog,
        });

        match self.reconcile_with_server().await {
            Ok(()) => {
                info!("auction session resumed from persisted state");
                Ok(true)
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Uninitialized;
                Err(e)
            }
        }
    }

    /// Case-insensitive substring search over the available-player cache.
    /// Empty when the query is empty or the session is not active.
    pub fn search_available(&self, query: &str) -> Vec<String> {
        match &self.lifecycle {
            Lifecycle::Active(active) => active.catalog.search(query),
            _ => Vec::new(),
        }
    }

    /// The full available-player cache in catalog order.
    pub fn available_player_names(&self) -> Vec<String> {
        match &self.lifecycle {
            Lifecycle::Active(active) => active.catalog.names().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Read-only view of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        match &self.lifecycle {
            Lifecycle::Active(active) => SessionSnapshot {
                phase: Phase::Active,
                main: Some(active.main.snapshot()),
                opponents: active
                    .opponent_order
                    .iter()
                    .filter_map(|id| active.opponents.get(id))
                    .map(Roster::snapshot)
                    .collect(),
            },
            Lifecycle::Uninitialized => SessionSnapshot {
                phase: Phase::Uninitialized,
                main: None,
                opponents: Vec::new(),
            },
            Lifecycle::Finished => SessionSnapshot {
                phase: Phase::Finished,
                main: None,
                opponents: Vec::new(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Wholesale catalog refresh from the service after a purchase event.
/// Best-effort: the purchase already applied, so a refresh failure only
/// leaves the catalog slightly stale (the bought name was already removed
/// locally) and is logged rather than surfaced.
async fn refresh_catalog(service: &dyn AuctionService, active: &mut ActiveAuction) {
    match service.available_players().await {
        Ok(names) => {
            active.catalog.refresh(names);
            active.prune_rostered_from_catalog();
        }
        Err(e) => warn!("failed to refresh available players: {e}"),
    }
}

/// Persist the session snapshot, logging instead of failing the operation
/// that triggered it.
fn persist_state(store: &dyn SessionStore, active: &ActiveAuction) {
    if let Err(e) = store.save(&active.to_session_state()) {
        warn!("failed to persist session state: {e:#}");
    }
}
