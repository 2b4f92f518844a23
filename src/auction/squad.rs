// Server-generated squad results and their display-side ranking view.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::player::{Money, Player};

/// Tolerance for comparing a squad's reported PDK total against the sum of
/// its players' predictions.
const PDK_TOTAL_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Squad
// ---------------------------------------------------------------------------

/// A server-proposed balanced squad. Derived data, never mutated after
/// receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub squad_number: u32,
    pub players: Vec<Player>,
    pub total_cost: Money,
    pub total_predicted_pdk: f64,
}

impl Squad {
    /// Whether the reported totals equal the sums over `players` (cent-exact
    /// for cost, small epsilon for the float PDK total).
    pub fn is_consistent(&self) -> bool {
        let cost: Money = self.players.iter().map(|p| p.cost).sum();
        let pdk: f64 = self.players.iter().map(|p| p.predicted_pdk).sum();
        cost == self.total_cost && (pdk - self.total_predicted_pdk).abs() < PDK_TOTAL_EPSILON
    }
}

// ---------------------------------------------------------------------------
// SquadRankingView
// ---------------------------------------------------------------------------

/// Column a squad's player table can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Role,
    Cost,
    PredictedPdk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Display-only sort selector over a squad's player list.
///
/// Toggling the current field flips the direction; selecting a new field
/// resets to ascending. Projection never touches the underlying squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquadRankingView {
    field: SortField,
    direction: SortDirection,
}

impl Default for SquadRankingView {
    fn default() -> Self {
        SquadRankingView {
            field: SortField::Cost,
            direction: SortDirection::Ascending,
        }
    }
}

impl SquadRankingView {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        SquadRankingView { field, direction }
    }

    pub fn field(&self) -> SortField {
        self.field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Select a sort column: re-selecting the current one flips direction,
    /// a new one resets to ascending.
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.field = field;
            self.direction = SortDirection::Ascending;
        }
    }

    /// Return a sorted copy of `players` under the current field/direction.
    /// The sort is stable, so equal keys keep their received order.
    pub fn project(&self, players: &[Player]) -> Vec<Player> {
        let mut sorted = players.to_vec();
        sorted.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::Role => compare_roles(a, b),
                SortField::Cost => a.cost.cmp(&b.cost),
                SortField::PredictedPdk => a.predicted_pdk.total_cmp(&b.predicted_pdk),
            };
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        sorted
    }
}

/// Roles compare by their display string, case-folded, so the ordering
/// matches what the user sees in the role column.
fn compare_roles(a: &Player, b: &Player) -> Ordering {
    a.role
        .display_str()
        .to_lowercase()
        .cmp(&b.role.display_str().to_lowercase())
}
