use axum::{extract::State, response::Html};
use chrono::Utc;
use serde_json::{json, Value};

use super::error_boundary::PageError;
use super::views::{dashboard_layout, escape, flight_table, format_date, risk_badge};
use crate::database::models::Flight;
use crate::providers::RequiredSession;
use crate::rpc::RpcError;
use crate::AppState;

const UPCOMING_LIMIT: i64 = 5;

/// Flights inside a procedure result
pub(crate) fn flights_from(value: Value) -> Result<Vec<Flight>, PageError> {
    serde_json::from_value(value).map_err(|e| {
        PageError::Rpc(RpcError::internal(format!("Unexpected flight payload: {}", e)))
    })
}

pub async fn overview(
    State(state): State<AppState>,
    session: RequiredSession,
) -> Result<Html<String>, PageError> {
    let ctx = session.context(&state);
    let client = state.query_client();

    // Minute precision keeps the cache key stable between reloads
    let start = Utc::now().format("%Y-%m-%dT%H:%M:00Z").to_string();
    let upcoming = client
        .fetch(
            "flight.list",
            json!({ "startDate": start, "limit": UPCOMING_LIMIT }),
            ctx.clone(),
        )
        .await?;
    let total = upcoming["total"].as_i64().unwrap_or_default();
    let upcoming = flights_from(upcoming["flights"].clone())?;
    let alerts = flights_from(client.fetch("flight.alerts", Value::Null, ctx).await?)?;

    let user = &session.0.user;
    let content = format!(
        r#"<p class="welcome">Welcome back, {name}.</p>
<section class="alerts">
<h2>Weather alerts</h2>
{alerts}
</section>
<section class="upcoming">
<h2>Upcoming flights <small>({total} total)</small></h2>
{upcoming}
<p><a href="/dashboard/flights">View all flights</a></p>
</section>"#,
        name = escape(user.display_name()),
        alerts = alert_panel(&alerts),
        total = total,
        upcoming = flight_table(&upcoming, "No upcoming flights. Book one to get started."),
    );

    Ok(dashboard_layout(user, "/dashboard", "Dashboard", &content))
}

fn alert_panel(alerts: &[Flight]) -> String {
    if alerts.is_empty() {
        return r#"<p class="empty">No weather alerts for your upcoming flights.</p>"#.to_string();
    }

    let items: String = alerts
        .iter()
        .map(|flight| {
            format!(
                "<li>{} from {}: {} risk, {}% chance of cancellation</li>\n",
                format_date(&flight.scheduled_date),
                escape(&flight.departure_location.name),
                risk_badge(flight.risk_level),
                flight.cancellation_probability,
            )
        })
        .collect();
    format!("<ul class=\"alert-list\">\n{items}</ul>")
}
