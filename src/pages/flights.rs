use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::dashboard::flights_from;
use super::error_boundary::PageError;
use super::views::{dashboard_layout, escape, flight_table};
use crate::database::models::{FlightStatus, InstructorSummary, LabeledEnum, TrainingLevel};
use crate::providers::RequiredSession;
use crate::rpc::ErrorCode;
use crate::schemas::flight::MAX_LIST_LIMIT;
use crate::schemas::ValidationErrors;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub offset: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    session: RequiredSession,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, PageError> {
    // Unknown filter values fall back to every status
    let status = query.status.as_deref().and_then(FlightStatus::parse);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut input = json!({ "limit": MAX_LIST_LIMIT, "offset": offset });
    if let Some(status) = status {
        input["status"] = json!(status);
    }
    let page = state
        .query_client()
        .fetch("flight.list", input, session.context(&state))
        .await?;
    let flights = flights_from(page["flights"].clone())?;
    let total = page["total"].as_i64().unwrap_or(offset + flights.len() as i64);

    let filters: String = std::iter::once(("".to_string(), "All".to_string(), status.is_none()))
        .chain(FlightStatus::ALL.iter().map(|s| {
            (
                format!("?status={}", s.as_str()),
                s.label().to_string(),
                status == Some(*s),
            )
        }))
        .map(|(href, label, selected)| {
            let current = if selected { r#" aria-current="true""# } else { "" };
            format!(r#"<a href="/dashboard/flights{href}"{current}>{label}</a> "#)
        })
        .collect();

    let content = format!(
        r#"<nav class="filters">{filters}</nav>
{table}
{pager}
<p><a href="/dashboard/flights/new">Book a flight</a></p>"#,
        filters = filters,
        table = flight_table(&flights, "No flights match this filter."),
        pager = pager(status, offset, flights.len(), total),
    );
    Ok(dashboard_layout(
        &session.0.user,
        "/dashboard/flights",
        "Flights",
        &content,
    ))
}

/// Position and previous/next links once the list spans more than one page
fn pager(status: Option<FlightStatus>, offset: i64, shown: usize, total: i64) -> String {
    if offset == 0 && total <= MAX_LIST_LIMIT {
        return String::new();
    }

    let href = |offset: i64| match status {
        Some(status) => format!("/dashboard/flights?status={}&amp;offset={}", status.as_str(), offset),
        None => format!("/dashboard/flights?offset={}", offset),
    };
    let last = offset + shown as i64;

    let mut html = if shown == 0 {
        format!(r#"<nav class="pager"><span>No flights past {offset} of {total}</span>"#)
    } else {
        format!(
            r#"<nav class="pager"><span>Showing {} to {} of {}</span>"#,
            offset + 1,
            last,
            total
        )
    };
    if offset > 0 {
        let previous = (offset - MAX_LIST_LIMIT).max(0);
        html.push_str(&format!(r#" <a href="{}" rel="prev">Previous</a>"#, href(previous)));
    }
    if last < total && shown > 0 {
        html.push_str(&format!(r#" <a href="{}" rel="next">Next</a>"#, href(last)));
    }
    html.push_str("</nav>");
    html
}

pub async fn new_form(
    State(state): State<AppState>,
    session: RequiredSession,
) -> Result<Html<String>, PageError> {
    let instructors = state.store.list_instructors().await?;
    Ok(render_form(
        &session,
        &instructors,
        &HashMap::new(),
        &ValidationErrors::new(),
    ))
}

/// Form submission: booked flights redirect to the list, invalid ones
/// re-render with the submitted values and per-field messages
pub async fn create(
    State(state): State<AppState>,
    session: RequiredSession,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, PageError> {
    let input = form_input(&form);
    let caller = state.rpc.caller(session.context(&state));

    let errors = match caller.mutation("flight.create", input).await {
        Ok(created) => {
            state.query_client().invalidate("flight").await;
            tracing::info!("Flight {} booked from the dashboard", created["id"]);
            return Ok(Redirect::to("/dashboard/flights").into_response());
        }
        Err(err) if err.code == ErrorCode::BadRequest => err.field_errors.unwrap_or_default(),
        Err(err) if err.code == ErrorCode::NotFound => {
            let mut errors = ValidationErrors::new();
            errors.add("instructorId", err.message);
            errors
        }
        Err(err) => return Err(err.into()),
    };

    let instructors = state.store.list_instructors().await?;
    let html = render_form(&session, &instructors, &form, &errors);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, html).into_response())
}

fn text(form: &HashMap<String, String>, key: &str) -> Option<String> {
    form.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Numbers go through as JSON numbers; anything unparsable stays a string so
/// validation reports it against the field
fn number(form: &HashMap<String, String>, key: &str) -> Value {
    match text(form, key) {
        None => Value::Null,
        Some(raw) => match raw.parse::<f64>() {
            Ok(n) => json!(n),
            Err(_) => Value::String(raw),
        },
    }
}

fn location(form: &HashMap<String, String>, prefix: &str) -> Value {
    let mut location = Map::new();
    location.insert("name".into(), json!(text(form, &format!("{prefix}Name")).unwrap_or_default()));
    location.insert("latitude".into(), number(form, &format!("{prefix}Latitude")));
    location.insert("longitude".into(), number(form, &format!("{prefix}Longitude")));
    if let Some(icao) = text(form, &format!("{prefix}IcaoCode")) {
        location.insert("icaoCode".into(), json!(icao.to_uppercase()));
    }
    Value::Object(location)
}

/// Flat form fields to the `flight.create` input shape
pub fn form_input(form: &HashMap<String, String>) -> Value {
    let mut input = json!({
        "instructorId": text(form, "instructorId"),
        "scheduledDate": text(form, "scheduledDate"),
        "trainingLevel": text(form, "trainingLevel"),
        "departureLocation": location(form, "departure"),
        "duration": number(form, "duration"),
    });
    if text(form, "destinationName").is_some() {
        input["destinationLocation"] = location(form, "destination");
    }
    if let Some(notes) = text(form, "notes") {
        input["notes"] = json!(notes);
    }
    input
}

fn field_error(errors: &ValidationErrors, paths: &[&str]) -> String {
    paths
        .iter()
        .flat_map(|path| errors.messages(path))
        .map(|m| format!(r#"<span class="field-error">{}</span>"#, escape(m)))
        .collect()
}

fn render_form(
    session: &RequiredSession,
    instructors: &[InstructorSummary],
    values: &HashMap<String, String>,
    errors: &ValidationErrors,
) -> Html<String> {
    let value = |key: &str| escape(values.get(key).map(String::as_str).unwrap_or_default());

    let instructor_options: String = instructors
        .iter()
        .map(|i| {
            let selected = if values.get("instructorId") == Some(&i.id) { " selected" } else { "" };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                escape(&i.id),
                selected,
                escape(i.name.as_deref().unwrap_or(&i.email))
            )
        })
        .collect();

    let level_options: String = TrainingLevel::ALL
        .iter()
        .map(|level| {
            let selected = if values.get("trainingLevel").map(String::as_str) == Some(level.as_str()) {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                level.as_str(),
                selected,
                escape(level.label())
            )
        })
        .collect();

    let summary = if errors.is_empty() {
        String::new()
    } else {
        r#"<p class="alert" role="alert">Please correct the highlighted fields.</p>"#.to_string()
    };

    let content = format!(
        r#"{summary}<form method="post" action="/dashboard/flights/new" class="flight-form">
<label>Instructor
<select name="instructorId" required><option value="">Select an instructor</option>{instructor_options}</select>
{instructor_error}</label>
<label>Date and time (UTC) <input type="datetime-local" name="scheduledDate" value="{scheduled}" required>
{date_error}</label>
<label>Training level <select name="trainingLevel" required>{level_options}</select>
{level_error}</label>
<fieldset><legend>Departure</legend>
<label>Name <input name="departureName" value="{dep_name}" required></label>
<label>Latitude <input name="departureLatitude" value="{dep_lat}" inputmode="decimal" required></label>
<label>Longitude <input name="departureLongitude" value="{dep_lon}" inputmode="decimal" required></label>
<label>ICAO code <input name="departureIcaoCode" value="{dep_icao}" maxlength="4"></label>
{departure_error}</fieldset>
<fieldset><legend>Destination (optional)</legend>
<label>Name <input name="destinationName" value="{dest_name}"></label>
<label>Latitude <input name="destinationLatitude" value="{dest_lat}" inputmode="decimal"></label>
<label>Longitude <input name="destinationLongitude" value="{dest_lon}" inputmode="decimal"></label>
<label>ICAO code <input name="destinationIcaoCode" value="{dest_icao}" maxlength="4"></label>
{destination_error}</fieldset>
<label>Duration (hours) <input type="number" name="duration" value="{duration}" min="0.1" max="10" step="0.1" required>
{duration_error}</label>
<label>Notes <textarea name="notes" maxlength="1000">{notes}</textarea>
{notes_error}</label>
<button type="submit">Book flight</button>
</form>"#,
        summary = summary,
        instructor_options = instructor_options,
        instructor_error = field_error(errors, &["instructorId"]),
        scheduled = value("scheduledDate"),
        date_error = field_error(errors, &["scheduledDate"]),
        level_options = level_options,
        level_error = field_error(errors, &["trainingLevel"]),
        dep_name = value("departureName"),
        dep_lat = value("departureLatitude"),
        dep_lon = value("departureLongitude"),
        dep_icao = value("departureIcaoCode"),
        departure_error = field_error(
            errors,
            &[
                "departureLocation",
                "departureLocation.name",
                "departureLocation.latitude",
                "departureLocation.longitude",
            ]
        ),
        dest_name = value("destinationName"),
        dest_lat = value("destinationLatitude"),
        dest_lon = value("destinationLongitude"),
        dest_icao = value("destinationIcaoCode"),
        destination_error = field_error(
            errors,
            &[
                "destinationLocation.name",
                "destinationLocation.latitude",
                "destinationLocation.longitude",
            ]
        ),
        duration = value("duration"),
        duration_error = field_error(errors, &["duration"]),
        notes = value("notes"),
        notes_error = field_error(errors, &["notes"]),
    );

    dashboard_layout(
        &session.0.user,
        "/dashboard/flights/new",
        "Book a flight",
        &content,
    )
}
