// HTTP implementation of the auction service contract using reqwest.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::auction::player::Money;
use crate::auction::squad::Squad;
use crate::config::Config;

use super::{
    decode_role, decode_squad, decode_team, Ack, AuctionService, BuyResponsePayload,
    OpponentPickPayload, PurchaseValuation, ServiceError, SquadPayload, TeamOverview,
    TeamPayload,
};

/// JSON/HTTP client for the valuation service.
pub struct HttpAuctionService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuctionService {
    /// Create a client for the service at `base_url`
    /// (e.g. `http://localhost:5000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpAuctionService {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        HttpAuctionService::new(config.service.base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON body. Transport failures and
    /// non-2xx statuses map to `Unavailable`; undecodable 2xx bodies map to
    /// `InvalidResponse`.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Unavailable(format!(
                "service returned status {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("undecodable body: {e}")))
    }
}

#[async_trait]
impl AuctionService for HttpAuctionService {
    async fn initialize(
        &self,
        opponent_names: &[String],
        budget: Money,
    ) -> Result<Ack, ServiceError> {
        let body = serde_json::json!({
            "opponent_names": opponent_names,
            "budget": budget,
        });
        self.execute(self.http.post(self.url("/initialize")).json(&body))
            .await
    }

    async fn buy_player(
        &self,
        player_name: &str,
        cost: Money,
    ) -> Result<PurchaseValuation, ServiceError> {
        let body = serde_json::json!({
            "player_name": player_name,
            "cost": cost,
        });
        let payload: BuyResponsePayload = self
            .execute(self.http.post(self.url("/buy")).json(&body))
            .await?;
        Ok(PurchaseValuation {
            role: decode_role(&payload.role)?,
            predicted_pdk: payload.predicted_pdk,
            remaining_budget: Some(Money::from_f64(payload.remaining_budget)),
        })
    }

    async fn opponent_pick(
        &self,
        player_name: &str,
        opponent_name: &str,
        cost: Money,
    ) -> Result<PurchaseValuation, ServiceError> {
        let body = serde_json::json!({
            "player_name": player_name,
            "opponent_name": opponent_name,
            "cost": cost,
        });
        let payload: OpponentPickPayload = self
            .execute(self.http.post(self.url("/opponent")).json(&body))
            .await?;
        Ok(PurchaseValuation {
            role: decode_role(&payload.role)?,
            predicted_pdk: payload.predicted_pdk,
            remaining_budget: payload.opponent_remaining_budget.map(Money::from_f64),
        })
    }

    async fn available_players(&self) -> Result<Vec<String>, ServiceError> {
        self.execute(self.http.get(self.url("/available"))).await
    }

    async fn generate_squads(&self, num_squads: u32) -> Result<Vec<Squad>, ServiceError> {
        let payloads: Vec<SquadPayload> = self
            .execute(
                self.http
                    .get(self.url("/generate"))
                    .query(&[("num_squads", num_squads)]),
            )
            .await?;
        payloads.into_iter().map(decode_squad).collect()
    }

    async fn team_overview(&self) -> Result<TeamOverview, ServiceError> {
        let payload: TeamPayload = self.execute(self.http.get(self.url("/team"))).await?;
        decode_team(payload)
    }

    async fn finish_auction(&self) -> Result<Ack, ServiceError> {
        self.execute(
            self.http
                .post(self.url("/finish"))
                .json(&serde_json::json!({})),
        )
        .await
    }
}
