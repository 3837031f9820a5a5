//! HTTP implementation of the travel backend

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::ApiConfig;
use crate::domain::{FlightResult, HotelResult, ResultSet, TripDetails, WorkflowStep};

use super::planner;
use super::{
    ApiError, BookingConfirmation, BookingRequest, ErrorPayload, FlightSearchRequest, HotelSearchRequest,
    MultiCityFlightSearchRequest, MultiCityHotelSearchRequest, PlanError, PlanOutcome, PlanRequest,
    SubscriptionStatus, TravelApi,
};

/// Map a non-success response to an [`ApiError::Status`]
///
/// The backend reports failures as `{"detail": "..."}`; the detail text is
/// surfaced when present, the raw body otherwise.
pub(crate) async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorPayload>(&text)
        .ok()
        .and_then(|payload| payload.detail.or(payload.message))
        .unwrap_or(text);
    debug!(status, %message, "error_from_response: called");
    ApiError::Status { status, message }
}

/// Travel backend reached over HTTP
pub struct HttpTravelApi {
    http: Client,
    config: ApiConfig,
}

impl HttpTravelApi {
    /// Create a new client from configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Network)?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Streaming and legacy planning URLs for the trip type
    fn plan_urls(&self, details: &TripDetails) -> (String, String) {
        let endpoints = &self.config.endpoints;
        match details {
            TripDetails::Single(_) => (
                self.config.url(&endpoints.plan_stream),
                self.config.url(&endpoints.plan_legacy),
            ),
            TripDetails::Multi(_) => (
                self.config.url(&endpoints.multi_city_plan_stream),
                self.config.url(&endpoints.multi_city_plan_legacy),
            ),
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        debug!(%url, "post_json: called");
        let response = self.http.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TravelApi for HttpTravelApi {
    async fn plan_trip(
        &self,
        details: &TripDetails,
        step_tx: mpsc::Sender<WorkflowStep>,
    ) -> Result<PlanOutcome, PlanError> {
        debug!(trip_type = %details.trip_type(), "plan_trip: called");
        let (stream_url, legacy_url) = self.plan_urls(details);
        let request = PlanRequest::from(details);
        planner::plan_trip(&self.http, &stream_url, &legacy_url, &request, step_tx).await
    }

    async fn search_flights(&self, details: &TripDetails) -> Result<ResultSet<FlightResult>, ApiError> {
        debug!(trip_type = %details.trip_type(), "search_flights: called");
        let endpoints = &self.config.endpoints;
        match details {
            TripDetails::Single(trip) => {
                let request = FlightSearchRequest {
                    origin: trip.origin.clone(),
                    destination: trip.destination.clone(),
                    departure_date: trip.departure_date,
                    return_date: trip.return_date,
                };
                self.post_json(&endpoints.flight_search, &request).await
            }
            TripDetails::Multi(trip) => {
                let request = MultiCityFlightSearchRequest { legs: trip.legs.clone() };
                self.post_json(&endpoints.multi_city_flight_search, &request).await
            }
        }
    }

    async fn search_hotels(&self, details: &TripDetails) -> Result<ResultSet<HotelResult>, ApiError> {
        debug!(trip_type = %details.trip_type(), "search_hotels: called");
        let endpoints = &self.config.endpoints;
        let stays = details.hotel_stays();
        match details {
            TripDetails::Single(_) => {
                let stay = stays
                    .first()
                    .ok_or_else(|| ApiError::InvalidResponse("Trip has no hotel stay".to_string()))?;
                self.post_json(&endpoints.hotel_search, &HotelSearchRequest::from(stay))
                    .await
            }
            TripDetails::Multi(_) => {
                let request = MultiCityHotelSearchRequest {
                    cities: stays.iter().map(HotelSearchRequest::from).collect(),
                };
                self.post_json(&endpoints.multi_city_hotel_search, &request).await
            }
        }
    }

    async fn create_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation, ApiError> {
        debug!(email = %request.user_email, total_cost = request.total_cost, "create_booking: called");
        self.post_json(&self.config.endpoints.bookings, request).await
    }

    async fn has_active_subscription(&self, email: &str) -> Result<bool, ApiError> {
        let url = self
            .config
            .subscription_url(email)
            .map_err(|e| ApiError::InvalidUrl(format!("{e:#}")))?;
        debug!(%url, "has_active_subscription: called");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let status: SubscriptionStatus = response.json().await?;
        Ok(status.has_active_subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PlanSource;
    use crate::trip::tests_support::{round_trip, three_city};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> HttpTravelApi {
        let config = ApiConfig {
            base_url: server.uri(),
            ..ApiConfig::default()
        };
        HttpTravelApi::from_config(&config).unwrap()
    }

    fn sse(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
    }

    const STREAM_OK: &str = "event: workflow_step\ndata: {\"type\": \"agent_start\", \"agent\": \"PlannerAgent\", \"message\": \"PlannerAgent is starting...\"}\n\n\
event: workflow_step\ndata: {\"type\": \"handoff\", \"from\": \"PlannerAgent\", \"to\": \"FlightAgent\", \"message\": \"handoff\"}\n\n\
event: final_result\ndata: {\"success\": true, \"final_response\": \"## Plan\"}\n\n";

    async fn collect(rx: &mut mpsc::Receiver<WorkflowStep>) -> Vec<WorkflowStep> {
        let mut steps = Vec::new();
        while let Some(step) = rx.recv().await {
            steps.push(step);
        }
        steps
    }

    // === Planning ===

    #[tokio::test]
    async fn test_plan_trip_streams_steps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip/stream"))
            .and(body_partial_json(json!({"origin": "New York", "passengers": 2})))
            .respond_with(sse(STREAM_OK))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, mut rx) = mpsc::channel(16);
        let outcome = api.plan_trip(&round_trip(), tx).await.unwrap();
        let steps = collect(&mut rx).await;

        assert_eq!(outcome.final_response, "## Plan");
        assert_eq!(outcome.source, PlanSource::Stream);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].to.as_deref(), Some("FlightAgent"));
        assert_eq!(outcome.workflow_steps, steps);
    }

    #[tokio::test]
    async fn test_plan_trip_not_found_falls_back_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip/stream"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "plan": "legacy plan",
                "messages": [],
                "workflow_steps": [{"type": "agent_end", "message": "done"}],
                "final_response": "legacy plan"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, mut rx) = mpsc::channel(16);
        let outcome = api.plan_trip(&round_trip(), tx).await.unwrap();

        assert_eq!(outcome.source, PlanSource::Legacy);
        assert_eq!(outcome.final_response, "legacy plan");
        assert_eq!(outcome.workflow_steps.len(), 1);
        assert!(collect(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_plan_trip_empty_body_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip/stream"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "plan": "p"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, _rx) = mpsc::channel(16);
        let outcome = api.plan_trip(&round_trip(), tx).await.unwrap();
        assert_eq!(outcome.final_response, "p");
    }

    #[tokio::test]
    async fn test_plan_trip_error_event_retries_legacy() {
        let server = MockServer::start().await;
        let body = "event: workflow_step\ndata: {\"type\": \"agent_start\", \"message\": \"starting\"}\n\n\
event: error\ndata: {\"detail\": \"agent crashed\"}\n\n";
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip/stream"))
            .respond_with(sse(body))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "plan": "recovered"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, mut rx) = mpsc::channel(16);
        let outcome = api.plan_trip(&round_trip(), tx).await.unwrap();

        assert_eq!(outcome.final_response, "recovered");
        assert_eq!(outcome.source, PlanSource::Legacy);
        assert_eq!(collect(&mut rx).await.len(), 1);
    }

    #[tokio::test]
    async fn test_plan_trip_dual_failure_prefers_stream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip/stream"))
            .respond_with(sse("event: error\ndata: {\"message\": \"agent crashed\"}\n\n"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "Error planning trip: boom"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, _rx) = mpsc::channel(16);
        let err = api.plan_trip(&round_trip(), tx).await.unwrap_err();
        assert_eq!(err, PlanError::Failed("agent crashed".to_string()));
    }

    #[tokio::test]
    async fn test_plan_trip_not_found_then_legacy_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip/stream"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_trip"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "OPENAI_API_KEY not configured"})))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, _rx) = mpsc::channel(16);
        let err = api.plan_trip(&round_trip(), tx).await.unwrap_err();
        assert_eq!(err, PlanError::Failed("OPENAI_API_KEY not configured".to_string()));
    }

    #[tokio::test]
    async fn test_plan_trip_forbidden_is_subscription_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_multi_city/stream"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Premium required"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_multi_city"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "plan": "p"})))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, _rx) = mpsc::channel(16);
        let err = api.plan_trip(&three_city(), tx).await.unwrap_err();
        assert!(err.is_subscription_required());
    }

    #[tokio::test]
    async fn test_plan_trip_multi_city_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/planner/plan_multi_city/stream"))
            .and(body_partial_json(json!({"trip_legs": [{"origin": "New York", "leg_number": 1}]})))
            .respond_with(sse(STREAM_OK))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let (tx, _rx) = mpsc::channel(16);
        let outcome = api.plan_trip(&three_city(), tx).await.unwrap();
        assert_eq!(outcome.final_response, "## Plan");
    }

    // === Searches ===

    #[tokio::test]
    async fn test_search_single_returns_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flights/search"))
            .and(body_partial_json(json!({"origin": "New York", "destination": "Los Angeles"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "FL001", "airline": "SkyHigh", "price": 450.0},
                {"id": "FL002", "airline": "Jet", "price": 300.0}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hotels/search"))
            .and(body_partial_json(json!({"city": "Los Angeles"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "HT001", "name": "Grand", "rating": 4.5, "price_per_night": 200.0}
            ])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let flights = api.search_flights(&round_trip()).await.unwrap();
        let hotels = api.search_hotels(&round_trip()).await.unwrap();

        match flights {
            ResultSet::List(list) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[0].field("airline"), Some("SkyHigh"));
            }
            other => panic!("expected list, got {:?}", other),
        }
        assert_eq!(hotels.len(), 1);
    }

    #[tokio::test]
    async fn test_search_multi_city_returns_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flights/search_multi_city"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "leg_1": [{"id": "F1", "price": 100.0}],
                "leg_2": [{"id": "F2", "price": 200.0}],
                "leg_3": [{"id": "F3", "price": 300.0}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hotels/search_multi_city"))
            .and(body_partial_json(json!({"cities": [{"city": "Chicago"}, {"city": "Denver"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Chicago": [{"id": "H1", "rating": 4.0, "pricePerNight": 120.0}],
                "Denver": [{"id": "H2", "rating": 3.5, "price_per_night": 90.0}]
            })))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let flights = api.search_flights(&three_city()).await.unwrap();
        let hotels = api.search_hotels(&three_city()).await.unwrap();

        assert!(matches!(flights, ResultSet::ByKey(ref map) if map.len() == 3));
        assert!(matches!(hotels, ResultSet::ByKey(ref map) if map.contains_key("Denver")));
    }

    #[tokio::test]
    async fn test_search_failure_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flights/search"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "Error searching flights: db"})))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.search_flights(&round_trip()).await.unwrap_err();
        assert_eq!(err.message(), "Error searching flights: db");
    }

    // === Booking and subscription ===

    #[tokio::test]
    async fn test_create_booking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .and(body_partial_json(json!({
                "user_email": "traveler@example.com",
                "origin": "New York",
                "flight_id": "FL001",
                "hotel_id": "HT001",
                "total_cost": 1450.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "user_email": "traveler@example.com",
                "total_cost": 1450.0,
                "created_at": "2025-12-01T10:00:00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let request = BookingRequest {
            user_email: "traveler@example.com".to_string(),
            trip: round_trip(),
            flight_id: Some("FL001".to_string()),
            hotel_id: Some("HT001".to_string()),
            flight_ids: Default::default(),
            hotel_ids: Default::default(),
            total_cost: 1450.0,
        };

        let confirmation = api.create_booking(&request).await.unwrap();
        assert_eq!(confirmation.id, Some(7));
    }

    #[tokio::test]
    async fn test_has_active_subscription() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stripe/subscription-status/pro@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "active",
                "hasActiveSubscription": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stripe/subscription-status/free@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "free", "hasActiveSubscription": false})))
            .mount(&server)
            .await;

        let api = api_for(&server);
        assert!(api.has_active_subscription("pro@example.com").await.unwrap());
        assert!(!api.has_active_subscription("free@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_subscription_email_stays_in_its_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stripe/subscription-status/team%2Fops%3Fx@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hasActiveSubscription": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        assert!(api.has_active_subscription("team/ops?x@example.com").await.unwrap());
    }
}
