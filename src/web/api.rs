use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::web::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListTicketsParams {
    pub limit: Option<usize>,
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<Value>, ApiError> {
    let tickets = state.db.closed_tickets(params.limit).await?;

    Ok(Json(json!({
        "success": true,
        "count": tickets.len(),
        "data": tickets,
    })))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let response = match state.db.ticket_by_id(id).await? {
        Some(ticket) => Json(json!({ "success": true, "data": ticket })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Ticket not found" })),
        )
            .into_response(),
    };

    Ok(response)
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let stats = state.db.ticket_stats().await?;

    Ok(Json(json!({ "success": true, "data": stats })))
}

pub async fn info() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "tickets": "GET /api/tickets?limit=N",
            "ticket": "GET /api/tickets/:id",
            "stats": "GET /api/stats",
            "health": "GET /health",
            "dashboard": "GET /",
        },
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "activeTickets": state.tracker.active_count().await,
    }))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::Retention;
    use crate::db::{DbHandle, spawn_test_db, store::test_options};
    use crate::ticket::{
        TicketTracker,
        types::{ArchivedTicket, TicketKind, fixtures},
    };
    use crate::web::test_util::get_json;

    async fn state_with(dir: &TempDir, tickets: Vec<ArchivedTicket>) -> Arc<AppState> {
        let db: DbHandle = spawn_test_db(test_options(dir.path(), Retention::Unbounded)).await;
        for ticket in tickets {
            db.add_closed_ticket(ticket).await.unwrap();
        }
        Arc::new(AppState::new(db.clone(), Arc::new(TicketTracker::new(db))))
    }

    #[tokio::test]
    async fn tickets_are_listed_newest_first() {
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            vec![
                fixtures::archived(1, TicketKind::Inquiry),
                fixtures::archived(2, TicketKind::Promotion),
                fixtures::archived(3, TicketKind::Disciplinary),
            ],
        )
        .await;

        let (status, body) = get_json(state.clone(), "/api/tickets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"][0]["type"], "disciplinary");
        assert_eq!(body["data"][2]["type"], "inquiry");

        let (_, body) = get_json(state, "/api/tickets?limit=1").await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn single_ticket_lookup() {
        let dir = TempDir::new().unwrap();
        let ticket = fixtures::archived(7, TicketKind::Promotion);
        let id = ticket.id.clone();
        let state = state_with(&dir, vec![ticket]).await;

        let (status, body) = get_json(state.clone(), &format!("/api/tickets/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (status, body) = get_json(state, "/api/tickets/TKT-0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "Ticket not found" }));
    }

    #[tokio::test]
    async fn stats_add_up_to_the_total() {
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            vec![
                fixtures::archived(1, TicketKind::Inquiry),
                fixtures::archived(2, TicketKind::Inquiry),
                fixtures::archived(3, TicketKind::Promotion),
            ],
        )
        .await;

        let (status, body) = get_json(state, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["total"], 3);
        assert_eq!(data["byType"]["inquiry"], 2);
        assert_eq!(data["byType"]["promotion"], 1);
        assert_eq!(data["byType"]["disciplinary"], 0);

        let by_status: u64 = data["byStatus"]
            .as_object()
            .unwrap()
            .values()
            .map(|count| count.as_u64().unwrap())
            .sum();
        assert_eq!(by_status, 3);
    }

    #[tokio::test]
    async fn health_reports_active_tickets() {
        let dir = TempDir::new().unwrap();
        let state = state_with(&dir, Vec::new()).await;

        let (status, body) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["activeTickets"], 0);
        assert!(body["uptime"].is_number());
    }
}
