//! HTML building blocks shared by the pages

use axum::response::Html;
use chrono::{DateTime, Utc};

use crate::auth::SessionUser;
use crate::database::models::{Flight, FlightStatus, LabeledEnum, RiskLevel};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full HTML document around `body`
pub fn document(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | SkyShift</title>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape(title),
        body = body,
    ))
}

const NAV: [(&str, &str); 3] = [
    ("/dashboard", "Overview"),
    ("/dashboard/flights", "Flights"),
    ("/dashboard/flights/new", "Book a flight"),
];

/// Dashboard chrome: header with the signed-in user, sidebar, main content
pub fn dashboard_layout(user: &SessionUser, active: &str, title: &str, content: &str) -> Html<String> {
    let nav: String = NAV
        .iter()
        .map(|(href, label)| {
            let current = if *href == active { r#" aria-current="page""# } else { "" };
            format!(r#"<li><a href="{href}"{current}>{label}</a></li>"#)
        })
        .collect();

    let body = format!(
        r#"<header class="topbar">
<a class="brand" href="/dashboard">SkyShift</a>
<span class="user">{name} <small>{role}</small></span>
<form method="post" action="/api/auth/signout"><button type="submit">Sign out</button></form>
</header>
<div class="shell">
<nav class="sidebar"><ul>{nav}</ul></nav>
<main>
<h1>{title}</h1>
{content}
</main>
</div>"#,
        name = escape(user.display_name()),
        role = escape(user.role.label()),
        nav = nav,
        title = escape(title),
        content = content,
    );
    document(title, &body)
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a %b %-d, %Y %H:%M UTC").to_string()
}

pub fn status_badge(status: FlightStatus) -> String {
    format!(
        r#"<span class="status status-{}">{}</span>"#,
        status.as_str().to_lowercase(),
        escape(status.label())
    )
}

pub fn risk_badge(risk: RiskLevel) -> String {
    format!(
        r#"<span class="risk risk-{}">{}</span>"#,
        risk.as_str().to_lowercase(),
        escape(risk.label())
    )
}

fn route(flight: &Flight) -> String {
    match &flight.destination_location {
        Some(destination) => format!(
            "{} &rarr; {}",
            escape(&flight.departure_location.name),
            escape(&destination.name)
        ),
        None => format!("{} (local)", escape(&flight.departure_location.name)),
    }
}

pub fn flight_table(flights: &[Flight], empty_message: &str) -> String {
    if flights.is_empty() {
        return format!(r#"<p class="empty">{}</p>"#, escape(empty_message));
    }

    let rows: String = flights
        .iter()
        .map(|flight| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1} h</td><td>{}</td><td>{}%</td><td>{}</td></tr>\n",
                format_date(&flight.scheduled_date),
                route(flight),
                escape(flight.training_level.label()),
                flight.duration,
                status_badge(flight.status),
                flight.cancellation_probability,
                risk_badge(flight.risk_level),
            )
        })
        .collect();

    format!(
        r#"<table class="flights">
<thead><tr><th>Date</th><th>Route</th><th>Training</th><th>Duration</th><th>Status</th><th>Cancellation</th><th>Weather risk</th></tr></thead>
<tbody>
{rows}</tbody>
</table>"#
    )
}
