// Valuation/generation service contract: the trait the session talks to,
// the JSON wire payloads, and strict decoding into the domain model.
//
// Every endpoint is request/response; nothing streams. The session treats
// any transport failure or non-2xx status uniformly as `Unavailable`, and a
// malformed 2xx body as `InvalidResponse`: payloads are rejected rather
// than silently repaired.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auction::player::{Money, Player, PlayerName, Role};
use crate::auction::squad::Squad;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure or non-2xx response.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// A 2xx response whose body does not decode into the domain model.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// Decoded results
// ---------------------------------------------------------------------------

/// Acknowledgement for calls that return only a human-readable message.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Ack {
    pub message: String,
}

/// The service's authoritative valuation of a purchase. The client never
/// invents role or predicted PDK; they always come from here.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseValuation {
    pub role: Role,
    pub predicted_pdk: f64,
    /// Server-reported remaining budget: present on main-team buys, present
    /// only when the server tracks it for opponent picks.
    pub remaining_budget: Option<Money>,
}

/// The full team view from `GET /team`.
#[derive(Debug, Clone)]
pub struct TeamOverview {
    pub my_team: Vec<Player>,
    pub remaining_budget: Money,
    pub opponent_teams: HashMap<String, Vec<Player>>,
}

// ---------------------------------------------------------------------------
// AuctionService trait
// ---------------------------------------------------------------------------

/// The remote collaborator the session calls. Object-safe so tests can
/// script it and the HTTP implementation can be swapped out wholesale.
#[async_trait]
pub trait AuctionService: Send + Sync {
    async fn initialize(
        &self,
        opponent_names: &[String],
        budget: Money,
    ) -> Result<Ack, ServiceError>;

    async fn buy_player(
        &self,
        player_name: &str,
        cost: Money,
    ) -> Result<PurchaseValuation, ServiceError>;

    async fn opponent_pick(
        &self,
        player_name: &str,
        opponent_name: &str,
        cost: Money,
    ) -> Result<PurchaseValuation, ServiceError>;

    async fn available_players(&self) -> Result<Vec<String>, ServiceError>;

    async fn generate_squads(&self, num_squads: u32) -> Result<Vec<Squad>, ServiceError>;

    async fn team_overview(&self) -> Result<TeamOverview, ServiceError>;

    async fn finish_auction(&self) -> Result<Ack, ServiceError>;
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// Response body for `POST /buy`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuyResponsePayload {
    pub message: String,
    pub remaining_budget: f64,
    pub predicted_pdk: f64,
    pub role: String,
}

/// Response body for `POST /opponent`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpponentPickPayload {
    pub message: String,
    #[serde(default)]
    pub opponent_remaining_budget: Option<f64>,
    pub predicted_pdk: f64,
    pub role: String,
}

/// A player as it appears in squad and team payloads. The squad endpoint
/// historically labels the role field `position`; both spellings decode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerPayload {
    pub first_name: String,
    pub last_name: String,
    #[serde(alias = "position")]
    pub role: String,
    pub cost: f64,
    pub predicted_pdk: f64,
}

/// A generated squad as received from `GET /generate`. `players` stays
/// optional here so a missing/null field is detected during decoding
/// instead of being coerced to an empty list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SquadPayload {
    pub squad_number: u32,
    #[serde(default)]
    pub players: Option<Vec<PlayerPayload>>,
    pub total_cost: f64,
    pub total_predicted_pdk: f64,
}

/// Response body for `GET /team`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TeamPayload {
    pub my_team: Vec<PlayerPayload>,
    pub remaining_budget: f64,
    #[serde(default)]
    pub opponent_teams: HashMap<String, Vec<PlayerPayload>>,
}

// ---------------------------------------------------------------------------
// Strict decoding
// ---------------------------------------------------------------------------

pub(crate) fn decode_role(raw: &str) -> Result<Role, ServiceError> {
    Role::from_str_role(raw)
        .ok_or_else(|| ServiceError::InvalidResponse(format!("unknown role {raw:?}")))
}

pub(crate) fn decode_player(payload: &PlayerPayload) -> Result<Player, ServiceError> {
    let role = decode_role(&payload.role)?;
    Ok(Player {
        name: PlayerName::new(payload.first_name.clone(), payload.last_name.clone()),
        role,
        cost: Money::from_f64(payload.cost),
        predicted_pdk: payload.predicted_pdk,
    })
}

/// Decode a squad payload, rejecting a missing/null player list and totals
/// that do not match the sums over the players.
pub(crate) fn decode_squad(payload: SquadPayload) -> Result<Squad, ServiceError> {
    let number = payload.squad_number;
    let players = payload.players.ok_or_else(|| {
        ServiceError::InvalidResponse(format!("squad {number} has no player list"))
    })?;
    let players = players
        .iter()
        .map(decode_player)
        .collect::<Result<Vec<_>, _>>()?;

    let squad = Squad {
        squad_number: number,
        players,
        total_cost: Money::from_f64(payload.total_cost),
        total_predicted_pdk: payload.total_predicted_pdk,
    };
    if !squad.is_consistent() {
        return Err(ServiceError::InvalidResponse(format!(
            "squad {number} totals do not match its players"
        )));
    }
    Ok(squad)
}

pub(crate) fn decode_team(payload: TeamPayload) -> Result<TeamOverview, ServiceError> {
    let my_team = payload
        .my_team
        .iter()
        .map(decode_player)
        .collect::<Result<Vec<_>, _>>()?;

    let mut opponent_teams = HashMap::new();
    for (team, players) in &payload.opponent_teams {
        let players = players
            .iter()
            .map(decode_player)
            .collect::<Result<Vec<_>, _>>()?;
        opponent_teams.insert(team.clone(), players);
    }

    Ok(TeamOverview {
        my_team,
        remaining_budget: Money::from_f64(payload.remaining_budget),
        opponent_teams,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_payload(first: &str, role: &str, cost: f64, pdk: f64) -> PlayerPayload {
        PlayerPayload {
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            role: role.to_string(),
            cost,
            predicted_pdk: pdk,
        }
    }

    // -- decode_player --

    #[test]
    fn decode_player_happy_path() {
        let player = decode_player(&player_payload("John", "P", 40.5, 22.0)).unwrap();
        assert_eq!(player.name, PlayerName::new("John", "Test"));
        assert_eq!(player.role, Role::Playmaker);
        assert_eq!(player.cost, Money::from_cents(4050));
        assert!((player.predicted_pdk - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_player_rejects_unknown_role() {
        let err = decode_player(&player_payload("John", "GK", 10.0, 5.0)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
        assert!(err.to_string().contains("GK"));
    }

    #[test]
    fn player_payload_accepts_position_alias() {
        let json = r#"{
            "first_name": "John",
            "last_name": "Smith",
            "position": "C",
            "cost": 12.0,
            "predicted_pdk": 9.5
        }"#;
        let payload: PlayerPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.role, "C");
    }

    // -- decode_squad --

    #[test]
    fn decode_squad_happy_path() {
        let payload = SquadPayload {
            squad_number: 2,
            players: Some(vec![
                player_payload("John", "P", 40.0, 20.0),
                player_payload("Mike", "C", 10.0, 8.5),
            ]),
            total_cost: 50.0,
            total_predicted_pdk: 28.5,
        };
        let squad = decode_squad(payload).unwrap();
        assert_eq!(squad.squad_number, 2);
        assert_eq!(squad.players.len(), 2);
        assert_eq!(squad.total_cost, Money::from_units(50));
    }

    #[test]
    fn decode_squad_rejects_missing_players() {
        let payload = SquadPayload {
            squad_number: 7,
            players: None,
            total_cost: 0.0,
            total_predicted_pdk: 0.0,
        };
        let err = decode_squad(payload).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
        assert!(err.to_string().contains("squad 7"));
    }

    #[test]
    fn squad_payload_null_players_decodes_to_none() {
        let json = r#"{
            "squad_number": 1,
            "players": null,
            "total_cost": 0.0,
            "total_predicted_pdk": 0.0
        }"#;
        let payload: SquadPayload = serde_json::from_str(json).unwrap();
        assert!(payload.players.is_none());

        let json = r#"{
            "squad_number": 1,
            "total_cost": 0.0,
            "total_predicted_pdk": 0.0
        }"#;
        let payload: SquadPayload = serde_json::from_str(json).unwrap();
        assert!(payload.players.is_none());
    }

    #[test]
    fn decode_squad_rejects_inconsistent_totals() {
        let payload = SquadPayload {
            squad_number: 3,
            players: Some(vec![player_payload("John", "P", 40.0, 20.0)]),
            total_cost: 99.0,
            total_predicted_pdk: 20.0,
        };
        let err = decode_squad(payload).unwrap_err();
        assert!(err.to_string().contains("totals"));
    }

    #[test]
    fn decode_squad_rejects_bad_role_inside_players() {
        let payload = SquadPayload {
            squad_number: 4,
            players: Some(vec![player_payload("John", "??", 40.0, 20.0)]),
            total_cost: 40.0,
            total_predicted_pdk: 20.0,
        };
        assert!(decode_squad(payload).is_err());
    }

    // -- decode_team --

    #[test]
    fn decode_team_happy_path() {
        let payload = TeamPayload {
            my_team: vec![player_payload("John", "P", 40.0, 20.0)],
            remaining_budget: 110.0,
            opponent_teams: HashMap::from([(
                "rivals".to_string(),
                vec![player_payload("Mike", "A", 25.0, 14.0)],
            )]),
        };
        let overview = decode_team(payload).unwrap();
        assert_eq!(overview.my_team.len(), 1);
        assert_eq!(overview.remaining_budget, Money::from_units(110));
        assert_eq!(overview.opponent_teams["rivals"].len(), 1);
    }

    #[test]
    fn decode_team_rejects_bad_opponent_player() {
        let payload = TeamPayload {
            my_team: vec![],
            remaining_budget: 150.0,
            opponent_teams: HashMap::from([(
                "rivals".to_string(),
                vec![player_payload("Mike", "nope", 25.0, 14.0)],
            )]),
        };
        assert!(decode_team(payload).is_err());
    }
}
