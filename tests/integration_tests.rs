// Integration tests for the auction assistant.
//
// These tests exercise the full system end-to-end using the library crate's
// public API. They verify that the major subsystems (session state machine,
// roster/budget bookkeeping, catalog maintenance, squad ranking, session
// persistence, and configuration) work together correctly against a
// scripted in-memory auction service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use auction_assistant::auction::player::{Money, Player, PlayerName, Role};
use auction_assistant::auction::roster::RosterError;
use auction_assistant::auction::session::{AuctionSession, Phase};
use auction_assistant::auction::squad::{SortDirection, SortField, Squad, SquadRankingView};
use auction_assistant::error::AuctionError;
use auction_assistant::service::{
    Ack, AuctionService, PurchaseValuation, ServiceError, TeamOverview,
};
use auction_assistant::store::{SessionStore, SqliteSessionStore};

// ===========================================================================
// Test helpers
// ===========================================================================

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// The player pool every test starts from -- single source of truth.
fn pool() -> Vec<String> {
    [
        "John Smith",
        "Mike Jones",
        "Luca Bianchi",
        "Marco Rossi",
        "Andrea Verdi",
        "Paolo Neri",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn opponents(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn units(n: i64) -> Money {
    Money::from_units(n)
}

fn memory_store() -> Arc<SqliteSessionStore> {
    Arc::new(SqliteSessionStore::open(":memory:").unwrap())
}

// ===========================================================================
// Scripted auction service
// ===========================================================================

/// Role assignments the fake valuation service hands out, keyed by first
/// name. Unlisted players fall back to Ala.
fn role_for(first_name: &str) -> Role {
    match first_name {
        "John" | "Andrea" => Role::Playmaker,
        "Luca" => Role::Centro,
        _ => Role::Ala,
    }
}

#[derive(Default)]
struct FakeInner {
    available: Vec<String>,
    budget: Money,
    my_team: Vec<Player>,
    opponent_teams: HashMap<String, Vec<Player>>,
    squads: Vec<Squad>,
    generate_invalid: bool,
}

/// In-memory stand-in for the remote valuation service. Tracks the same
/// state a real server would so reconciliation and resume have something
/// truthful to reconcile against.
struct FakeAuctionService {
    inner: Mutex<FakeInner>,
}

impl FakeAuctionService {
    fn new() -> Arc<Self> {
        Arc::new(FakeAuctionService {
            inner: Mutex::new(FakeInner {
                available: pool(),
                ..FakeInner::default()
            }),
        })
    }

    fn set_squads(&self, squads: Vec<Squad>) {
        self.inner.lock().unwrap().squads = squads;
    }

    fn set_generate_invalid(&self, invalid: bool) {
        self.inner.lock().unwrap().generate_invalid = invalid;
    }

    fn valuation_for(name: &str, cost: Money) -> (Player, f64) {
        let parsed = PlayerName::parse(name).unwrap();
        let role = role_for(&parsed.first);
        let pdk = cost.as_f64() / 2.0;
        (
            Player {
                name: parsed,
                role,
                cost,
                predicted_pdk: pdk,
            },
            pdk,
        )
    }
}

#[async_trait::async_trait]
impl AuctionService for FakeAuctionService {
    async fn initialize(
        &self,
        _opponent_names: &[String],
        budget: Money,
    ) -> Result<Ack, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.budget = budget;
        Ok(Ack {
            message: "auction started".into(),
        })
    }

    async fn buy_player(
        &self,
        player_name: &str,
        cost: Money,
    ) -> Result<PurchaseValuation, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let (player, pdk) = Self::valuation_for(player_name, cost);
        let role = player.role;
        inner.budget = inner.budget - cost;
        inner.my_team.push(player);
        inner
            .available
            .retain(|n| !n.eq_ignore_ascii_case(player_name));
        Ok(PurchaseValuation {
            role,
            predicted_pdk: pdk,
            remaining_budget: Some(inner.budget),
        })
    }

    async fn opponent_pick(
        &self,
        player_name: &str,
        opponent_name: &str,
        cost: Money,
    ) -> Result<PurchaseValuation, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let (player, pdk) = Self::valuation_for(player_name, cost);
        let role = player.role;
        inner
            .opponent_teams
            .entry(opponent_name.to_string())
            .or_default()
            .push(player);
        inner
            .available
            .retain(|n| !n.eq_ignore_ascii_case(player_name));
        Ok(PurchaseValuation {
            role,
            predicted_pdk: pdk,
            remaining_budget: None,
        })
    }

    async fn available_players(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.inner.lock().unwrap().available.clone())
    }

    async fn generate_squads(&self, num_squads: u32) -> Result<Vec<Squad>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        if inner.generate_invalid {
            return Err(ServiceError::InvalidResponse(
                "squad 1 has no player list".into(),
            ));
        }
        Ok(inner
            .squads
            .iter()
            .take(num_squads as usize)
            .cloned()
            .collect())
    }

    async fn team_overview(&self) -> Result<TeamOverview, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(TeamOverview {
            my_team: inner.my_team.clone(),
            remaining_budget: inner.budget,
            opponent_teams: inner.opponent_teams.clone(),
        })
    }

    async fn finish_auction(&self) -> Result<Ack, ServiceError> {
        Ok(Ack {
            message: "auction finished".into(),
        })
    }
}

/// Build a consistent squad from (first, last, role, cost, pdk) rows.
fn squad(number: u32, rows: &[(&str, &str, Role, i64, f64)]) -> Squad {
    let players: Vec<Player> = rows
        .iter()
        .map(|(first, last, role, cost, pdk)| Player {
            name: PlayerName::new(*first, *last),
            role: *role,
            cost: units(*cost),
            predicted_pdk: *pdk,
        })
        .collect();
    Squad {
        squad_number: number,
        total_cost: players.iter().map(|p| p.cost).sum(),
        total_predicted_pdk: players.iter().map(|p| p.predicted_pdk).sum(),
        players,
    }
}

// ===========================================================================
// Full lifecycle
// ===========================================================================

#[tokio::test]
async fn full_auction_lifecycle() {
    init_tracing();

    let service = FakeAuctionService::new();
    service.set_squads(vec![squad(
        1,
        &[
            ("Andrea", "Verdi", Role::Playmaker, 30, 16.0),
            ("Paolo", "Neri", Role::Ala, 22, 11.5),
            ("Luca", "Bianchi", Role::Centro, 18, 9.0),
        ],
    )]);
    let store = memory_store();
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        Arc::clone(&store) as Arc<dyn SessionStore>,
    );

    // --- initialize ---
    session
        .initialize(
            &opponents(&["Gli Squali", "  gli squali", "I Falchi"]),
            units(150),
        )
        .await
        .unwrap();
    assert_eq!(session.phase(), Phase::Active);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.opponents.len(), 2, "duplicates must collapse");
    assert_eq!(snapshot.main.as_ref().unwrap().remaining, Some(units(150)));

    // --- purchases ---
    let outcome = session
        .buy_for_main_team("John Smith", units(40))
        .await
        .unwrap();
    assert_eq!(outcome.remaining_budget, Some(units(110)));
    assert_eq!(outcome.player.role, Role::Playmaker);

    session
        .record_opponent_pick("Mike Jones", "Gli Squali", units(35))
        .await
        .unwrap();

    // Catalog reflects both purchases and still answers searches.
    let available = session.available_player_names();
    assert!(!available.iter().any(|n| n == "John Smith"));
    assert!(!available.iter().any(|n| n == "Mike Jones"));
    assert_eq!(session.search_available("luca"), vec!["Luca Bianchi"]);

    // --- squad generation (pure read) ---
    let before = session.snapshot();
    let squads = session.request_squad_generation(1).await.unwrap();
    assert_eq!(squads.len(), 1);
    assert!(squads[0].is_consistent());
    assert_eq!(session.snapshot(), before);

    // --- ranking the generated squad for display ---
    let mut view = SquadRankingView::default();
    view.toggle(SortField::PredictedPdk); // new field -> ascending
    view.toggle(SortField::PredictedPdk); // same field -> descending
    let ranked = view.project(&squads[0].players);
    assert_eq!(ranked[0].name.first, "Andrea");
    assert_eq!(ranked[2].name.first, "Luca");

    // --- finish ---
    session.finish().await.unwrap();
    assert_eq!(session.phase(), Phase::Finished);
    assert!(store.load().unwrap().is_none(), "store cleared on finish");

    let err = session
        .buy_for_main_team("Marco Rossi", units(5))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::NotActive));
}

// ===========================================================================
// Budget invariants
// ===========================================================================

#[tokio::test]
async fn budget_arithmetic_holds_across_purchase_sequence() {
    let service = FakeAuctionService::new();
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        memory_store(),
    );
    session
        .initialize(&opponents(&["A", "B"]), units(150))
        .await
        .unwrap();

    let buys = [("John Smith", 41), ("Mike Jones", 13), ("Luca Bianchi", 27)];
    let mut spent = Money::ZERO;
    for (name, cost) in buys {
        session.buy_for_main_team(name, units(cost)).await.unwrap();
        spent = spent + units(cost);

        let main = session.snapshot().main.unwrap();
        assert_eq!(main.remaining, Some(units(150) - spent));
        assert!(main.remaining.unwrap() >= Money::ZERO);
    }
}

#[tokio::test]
async fn rejected_overbid_leaves_budget_untouched() {
    let service = FakeAuctionService::new();
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        memory_store(),
    );
    session
        .initialize(&opponents(&["A", "B"]), units(100))
        .await
        .unwrap();

    session
        .buy_for_main_team("John Smith", units(40))
        .await
        .unwrap();
    assert_eq!(
        session.snapshot().main.unwrap().remaining,
        Some(units(60))
    );

    let err = session
        .buy_for_main_team("Mike Jones", units(70))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuctionError::Roster(RosterError::BudgetExceeded { .. })
    ));
    assert_eq!(
        session.snapshot().main.unwrap().remaining,
        Some(units(60))
    );

    session
        .buy_for_main_team("Mike Jones", units(50))
        .await
        .unwrap();
    assert_eq!(
        session.snapshot().main.unwrap().remaining,
        Some(units(10))
    );
}

#[tokio::test]
async fn initialize_validation_failures_leave_phase_uninitialized() {
    let service = FakeAuctionService::new();
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        memory_store(),
    );

    let err = session
        .initialize(&opponents(&["A", "B"]), Money::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::InvalidBudget(_)));
    assert_eq!(session.phase(), Phase::Uninitialized);

    let err = session
        .initialize(&opponents(&["A", "B"]), units(-5))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::InvalidBudget(_)));
    assert_eq!(session.phase(), Phase::Uninitialized);

    let err = session
        .initialize(&opponents(&["Solo"]), units(100))
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::InsufficientOpponents(1)));
    assert_eq!(session.phase(), Phase::Uninitialized);
}

// ===========================================================================
// Malformed generation payloads
// ===========================================================================

#[tokio::test]
async fn invalid_generation_response_is_surfaced_without_side_effects() {
    let service = FakeAuctionService::new();
    service.set_generate_invalid(true);
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        memory_store(),
    );
    session
        .initialize(&opponents(&["A", "B"]), units(100))
        .await
        .unwrap();
    session
        .buy_for_main_team("John Smith", units(40))
        .await
        .unwrap();

    let before = session.snapshot();
    let err = session.request_squad_generation(3).await.unwrap_err();
    assert!(matches!(err, AuctionError::InvalidServiceResponse(_)));
    assert_eq!(session.snapshot(), before);
    assert_eq!(session.phase(), Phase::Active);
}

// ===========================================================================
// Session persistence and resume
// ===========================================================================

#[tokio::test]
async fn crashed_session_resumes_from_store_and_server() {
    init_tracing();

    let service = FakeAuctionService::new();
    let store = memory_store();

    {
        let mut session = AuctionSession::new(
            Arc::clone(&service) as Arc<dyn AuctionService>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        session
            .initialize(&opponents(&["Gli Squali", "I Falchi"]), units(150))
            .await
            .unwrap();
        session
            .buy_for_main_team("John Smith", units(40))
            .await
            .unwrap();
        session
            .record_opponent_pick("Mike Jones", "I Falchi", units(22))
            .await
            .unwrap();
        // Session dropped here: simulated crash.
    }

    let mut revived = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        Arc::clone(&store) as Arc<dyn SessionStore>,
    );
    assert!(revived.resume().await.unwrap());
    assert_eq!(revived.phase(), Phase::Active);

    let snapshot = revived.snapshot();
    let main = snapshot.main.unwrap();
    assert_eq!(main.total, Some(units(150)));
    assert_eq!(main.remaining, Some(units(110)));
    assert_eq!(main.players.len(), 1);

    let falchi = snapshot
        .opponents
        .iter()
        .find(|r| r.players.len() == 1)
        .expect("opponent roster restored");
    assert_eq!(falchi.players[0].name.full(), "Mike Jones");

    // The revived session keeps enforcing the same invariants.
    let err = revived
        .buy_for_main_team("john smith", units(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuctionError::Roster(RosterError::DuplicatePlayer { .. })
    ));
}

#[tokio::test]
async fn resume_with_nothing_persisted_is_a_noop() {
    let service = FakeAuctionService::new();
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        memory_store(),
    );
    assert!(!session.resume().await.unwrap());
    assert_eq!(session.phase(), Phase::Uninitialized);
}

// ===========================================================================
// Ranking view sanity over generated squads
// ===========================================================================

#[tokio::test]
async fn ranking_view_is_idempotent_and_involutive_over_generated_squad() {
    let service = FakeAuctionService::new();
    service.set_squads(vec![squad(
        1,
        &[
            ("Andrea", "Verdi", Role::Playmaker, 30, 16.0),
            ("Paolo", "Neri", Role::Ala, 22, 11.5),
            ("Luca", "Bianchi", Role::Centro, 18, 9.0),
            ("Marco", "Rossi", Role::Ala, 11, 6.0),
        ],
    )]);
    let mut session = AuctionSession::new(
        Arc::clone(&service) as Arc<dyn AuctionService>,
        memory_store(),
    );
    session
        .initialize(&opponents(&["A", "B"]), units(100))
        .await
        .unwrap();

    let squads = session.request_squad_generation(1).await.unwrap();
    let players = &squads[0].players;

    let view = SquadRankingView::new(SortField::Cost, SortDirection::Ascending);
    let once = view.project(players);
    let twice = view.project(&once);
    assert_eq!(once, twice, "same sort applied twice is idempotent");

    // No equal cost keys above, so flip + flip restores the sorted order.
    let down = SquadRankingView::new(SortField::Cost, SortDirection::Descending);
    let flipped = down.project(&once);
    let restored = view.project(&flipped);
    assert_eq!(restored, once);
}
