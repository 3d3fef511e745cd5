use crate::handlers;
use axum::routing::{get, post};
use axum::Router;
use finboard_core::{FinanceStore, LedgerService, TransactionService};
use std::sync::Arc;
use std::time::Duration;

pub fn app() -> Router<AppState> {
    let api = Router::<AppState>::new()
        // cards
        .route("/cards", get(handlers::get_cards))
        .route("/cards/update", post(handlers::update_cards))
        .route("/cards/reset", post(handlers::reset_cards))
        .route("/cards/history", get(handlers::list_history))
        // charts
        .route("/charts", get(handlers::get_charts))
        // transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/health", get(handlers::health));

    Router::new().nest("/api", api)
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FinanceStore>,
    pub ledger: Arc<LedgerService>,
    pub transactions: Arc<TransactionService>,
    pub request_timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::{app, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::NaiveDate;
    use finboard_core::{
        AmountMode, Clock, FinanceStore, FixedClock, HistoryRecorder, LedgerService,
        TransactionService,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app(mode: AmountMode) -> (Router, Arc<FinanceStore>) {
        let store = Arc::new(FinanceStore::open_in_memory().unwrap());
        // 2024-03-06 was a Wednesday.
        let now = NaiveDate::from_ymd_opt(2024, 3, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(now));
        let history = HistoryRecorder::inline(Arc::clone(&store));
        let state = AppState {
            store: Arc::clone(&store),
            ledger: Arc::new(LedgerService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                mode,
                history.clone(),
            )),
            transactions: Arc::new(TransactionService::new(
                Arc::clone(&store),
                clock,
                mode,
                history,
            )),
            request_timeout: Duration::from_secs(5),
        };
        (app().with_state(state), store)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn income_update_moves_cards_and_charts() {
        let (app, _store) = test_app(AmountMode::Integer);

        let (status, body) = send(
            &app,
            "POST",
            "/api/cards/update",
            Some(json!({"type": "income", "value": 500, "isIncremental": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["income"], 500);
        assert_eq!(body["balance"], 500);

        let (status, cards) = send(&app, "GET", "/api/cards", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            cards,
            json!({"savings": 0, "income": 500, "expenses": 0, "balance": 500})
        );

        let (status, charts) = send(&app, "GET", "/api/charts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(charts["months"][2], "Mar");
        assert_eq!(charts["income"][2], 500);
        assert_eq!(charts["days"][2], "Wed");
        assert_eq!(charts["earning"][2], 500);
        assert_eq!(charts["spent"], json!([0, 0, 0, 0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn invalid_updates_are_rejected_with_400() {
        let (app, _store) = test_app(AmountMode::Integer);

        for body in [
            json!({"type": "bonus", "value": 5}),
            json!({"type": "income", "value": -1}),
            json!({"type": "income", "value": 100000000}),
            json!({"type": "income", "value": 1.5}),
            json!({"type": "income", "value": 1.0005}),
            json!({"type": "income", "value": "ten"}),
        ] {
            let (status, response) = send(&app, "POST", "/api/cards/update", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(response["error"].is_string());
        }

        let (_, cards) = send(&app, "GET", "/api/cards", None).await;
        assert_eq!(cards["income"], 0);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_with_400() {
        let (app, _store) = test_app(AmountMode::Integer);
        let request = Request::builder()
            .method("POST")
            .uri("/api/cards/update")
            .header("content-type", "application/json")
            .body(Body::from("{\"type\": \"income\","))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_lists_updates_newest_first() {
        let (app, _store) = test_app(AmountMode::Integer);
        send(
            &app,
            "POST",
            "/api/cards/update",
            Some(json!({"type": "savings", "value": 1000, "isIncremental": false})),
        )
        .await;
        send(
            &app,
            "POST",
            "/api/cards/update",
            Some(json!({"type": "expenses", "value": 40, "isIncremental": true})),
        )
        .await;

        let (status, history) = send(&app, "GET", "/api/cards/history", None).await;
        assert_eq!(status, StatusCode::OK);
        let entries = history.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["operationType"], "expenses");
        assert_eq!(entries[0]["isIncremental"], true);
        assert_eq!(entries[1]["operationType"], "savings");
        assert_eq!(entries[1]["amount"], 1000);
    }

    #[tokio::test]
    async fn transactions_are_created_and_listed() {
        let (app, _store) = test_app(AmountMode::Decimal);

        let (status, created) = send(
            &app,
            "POST",
            "/api/transactions",
            Some(json!({"type": "Expense", "amount": 12.5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["type"], "expense");
        assert_eq!(created["amount"], 12.5);

        let (status, rejected) = send(
            &app,
            "POST",
            "/api/transactions",
            Some(json!({"type": "expense", "amount": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(rejected["error"].is_string());

        let (status, listed) = send(&app, "GET", "/api/transactions?limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (_, cards) = send(&app, "GET", "/api/cards", None).await;
        assert_eq!(cards["expenses"], 12.5);
        assert_eq!(cards["balance"], -12.5);
    }

    #[tokio::test]
    async fn reset_zeroes_cards_and_charts() {
        let (app, _store) = test_app(AmountMode::Integer);
        send(
            &app,
            "POST",
            "/api/cards/update",
            Some(json!({"type": "income", "value": 70})),
        )
        .await;

        let (status, cards) = send(&app, "POST", "/api/cards/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cards["income"], 0);

        let (_, charts) = send(&app, "GET", "/api/charts", None).await;
        assert_eq!(charts["income"], json!([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn health_reports_store_state() {
        let (app, store) = test_app(AmountMode::Integer);
        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        assert!(store.close(Duration::from_millis(100)));
        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn wrong_method_gets_405() {
        let (app, _store) = test_app(AmountMode::Integer);
        let (status, _) = send(&app, "DELETE", "/api/cards", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
