// Roster bookkeeping: one team's purchase list and budget arithmetic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::player::{Money, Player, PlayerName, TeamId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum RosterError {
    #[error("cost {cost} exceeds remaining budget {remaining}")]
    BudgetExceeded { cost: Money, remaining: Money },

    #[error("player already purchased: {name}")]
    DuplicatePlayer { name: String },
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// The team a roster belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RosterOwner {
    /// The user's own team, the only one with an enforced budget cap.
    MainTeam,
    /// A registered opponent; purchases are tracked but never capped.
    Opponent(TeamId),
}

/// Budget state for a capped roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub total: Money,
    pub remaining: Money,
}

/// One team's tracked player list plus budget state.
///
/// Players are stored in purchase order. For a capped roster the invariant
/// `remaining = total - sum(players.cost)` with `remaining >= 0` holds after
/// every successful mutation; a purchase that would violate it is rejected
/// before anything changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    owner: RosterOwner,
    budget: Option<Budget>,
    players: Vec<Player>,
}

impl Roster {
    /// Create a budget-capped roster (the main team).
    pub fn capped(total: Money) -> Self {
        Roster {
            owner: RosterOwner::MainTeam,
            budget: Some(Budget {
                total,
                remaining: total,
            }),
            players: Vec::new(),
        }
    }

    /// Create an uncapped roster for a registered opponent.
    pub fn uncapped(owner: TeamId) -> Self {
        Roster {
            owner: RosterOwner::Opponent(owner),
            budget: None,
            players: Vec::new(),
        }
    }

    pub fn owner(&self) -> &RosterOwner {
        &self.owner
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn total(&self) -> Option<Money> {
        self.budget.map(|b| b.total)
    }

    pub fn remaining(&self) -> Option<Money> {
        self.budget.map(|b| b.remaining)
    }

    /// Sum of all purchase costs on this roster.
    pub fn spent(&self) -> Money {
        self.players.iter().map(|p| p.cost).sum()
    }

    /// Whether this roster can pay `cost`: always true when uncapped,
    /// otherwise `cost <= remaining`.
    pub fn can_afford(&self, cost: Money) -> bool {
        match self.budget {
            Some(budget) => cost <= budget.remaining,
            None => true,
        }
    }

    /// Whether a player with this identity is already on the roster.
    pub fn has_player(&self, name: &PlayerName) -> bool {
        self.players.iter().any(|p| p.name.matches(name))
    }

    /// Append a purchased player, decrementing the remaining budget by
    /// exactly the purchase cost when capped. Fails without mutating
    /// anything on a duplicate identity or an unaffordable cost.
    pub fn apply_purchase(&mut self, player: Player) -> Result<(), RosterError> {
        if self.has_player(&player.name) {
            return Err(RosterError::DuplicatePlayer {
                name: player.name.full(),
            });
        }
        if let Some(budget) = &mut self.budget {
            if player.cost > budget.remaining {
                return Err(RosterError::BudgetExceeded {
                    cost: player.cost,
                    remaining: budget.remaining,
                });
            }
            budget.remaining = budget.remaining - player.cost;
        }
        self.players.push(player);
        Ok(())
    }

    /// Replace the player list wholesale (server reconciliation) and
    /// recompute `remaining` from the new list. Floors at zero when the
    /// server-reported roster overspends the local cap; the caller compares
    /// against the server's reported remaining and logs any drift.
    pub(crate) fn replace_players(&mut self, players: Vec<Player>) {
        self.players = players;
        if let Some(budget) = &mut self.budget {
            budget.remaining = budget.total.saturating_sub(
                self.players.iter().map(|p| p.cost).sum(),
            );
        }
    }

    /// Read-only, side-effect-free view of this roster.
    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            owner: self.owner.clone(),
            players: self.players.clone(),
            total: self.total(),
            remaining: self.remaining(),
        }
    }
}

/// Point-in-time copy of a roster for presentation surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub owner: RosterOwner,
    pub players: Vec<Player>,
    pub total: Option<Money>,
    pub remaining: Option<Money>,
}
