//! HTTP client for the external odds/scores provider.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Display prices for one named outcome of an event.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOdds {
    pub selection: String,
    pub back: Option<Decimal>,
    pub lay: Option<Decimal>,
}

/// Final result of an event. `winner` is the winning outcome's name;
/// a completed event without a winner is abandoned (refund-all).
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderResult {
    pub completed: bool,
    pub winner: Option<String>,
}

/// The provider surface the pollers need.
#[async_trait]
pub trait OddsProvider: Send + Sync {
    async fn fetch_odds(&self, sport_key: &str, external_id: &str)
        -> CoreResult<Vec<ProviderOdds>>;
    async fn fetch_result(&self, sport_key: &str, external_id: &str)
        -> CoreResult<ProviderResult>;
}

/// reqwest-backed provider client.
pub struct RestOddsProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestOddsProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn feed_error(e: reqwest::Error) -> CoreError {
        CoreError::InvalidState(format!("odds provider request failed: {}", e))
    }
}

#[async_trait]
impl OddsProvider for RestOddsProvider {
    async fn fetch_odds(
        &self,
        sport_key: &str,
        external_id: &str,
    ) -> CoreResult<Vec<ProviderOdds>> {
        let url = format!(
            "{}/sports/{}/events/{}/odds?apiKey={}",
            self.base_url, sport_key, external_id, self.api_key
        );
        let odds = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::feed_error)?
            .error_for_status()
            .map_err(Self::feed_error)?
            .json::<Vec<ProviderOdds>>()
            .await
            .map_err(Self::feed_error)?;
        Ok(odds)
    }

    async fn fetch_result(
        &self,
        sport_key: &str,
        external_id: &str,
    ) -> CoreResult<ProviderResult> {
        let url = format!(
            "{}/sports/{}/events/{}/scores?apiKey={}",
            self.base_url, sport_key, external_id, self.api_key
        );
        let result = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::feed_error)?
            .error_for_status()
            .map_err(Self::feed_error)?
            .json::<ProviderResult>()
            .await
            .map_err(Self::feed_error)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_odds_deserialize() {
        let json = r#"[{"selection": "Arsenal", "back": "2.10", "lay": "2.14"},
                       {"selection": "Chelsea", "back": null, "lay": null}]"#;
        let odds: Vec<ProviderOdds> = serde_json::from_str(json).unwrap();
        assert_eq!(odds.len(), 2);
        assert_eq!(odds[0].back.unwrap().to_string(), "2.10");
        assert!(odds[1].back.is_none());
    }

    #[test]
    fn provider_result_deserialize() {
        let json = r#"{"completed": true, "winner": "Arsenal"}"#;
        let result: ProviderResult = serde_json::from_str(json).unwrap();
        assert!(result.completed);
        assert_eq!(result.winner.as_deref(), Some("Arsenal"));

        let abandoned: ProviderResult =
            serde_json::from_str(r#"{"completed": true, "winner": null}"#).unwrap();
        assert!(abandoned.winner.is_none());
    }
}
