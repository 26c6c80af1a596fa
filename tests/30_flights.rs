mod common;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use common::{TestServer, ADMIN, INSTRUCTOR, STUDENT};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

async fn instructor_id(server: &TestServer, client: &Client) -> Result<String> {
    let (status, body) = server.query(client, "user.instructors", None).await?;
    assert_eq!(status, StatusCode::OK);
    let id = body["result"]["data"][0]["id"]
        .as_str()
        .context("no instructor returned")?;
    Ok(id.to_string())
}

fn booking(instructor_id: &str) -> Value {
    json!({
        "instructorId": instructor_id,
        "scheduledDate": (Utc::now() + Duration::days(2)).to_rfc3339(),
        "trainingLevel": "STUDENT",
        "departureLocation": {"name": "Palo Alto", "latitude": 37.46, "longitude": -122.11, "icaoCode": "KPAO"},
        "destinationLocation": {"name": "San Carlos", "latitude": 37.51, "longitude": -122.25},
        "duration": 1.5,
        "notes": "Pattern work"
    })
}

#[tokio::test]
async fn student_books_and_lists_a_flight() -> Result<()> {
    let server = TestServer::start().await?;
    let student = server.signed_in(STUDENT).await?;
    let instructor = instructor_id(&server, &student).await?;

    let mut input = booking(&instructor);
    input["studentId"] = json!("cspoofedstudent01");
    let (status, body) = server.mutation(&student, "flight.create", &input).await?;
    assert_eq!(status, StatusCode::OK);
    let flight = &body["result"]["data"];
    assert_eq!(flight["status"], "SCHEDULED");
    assert_eq!(flight["cancellationProbability"], 0);
    assert_eq!(flight["riskLevel"], "LOW");
    assert_ne!(flight["studentId"], "cspoofedstudent01");

    let (status, body) = server.query(&student, "flight.list", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["total"], 1);
    assert_eq!(body["result"]["data"]["flights"][0]["id"], flight["id"]);
    Ok(())
}

#[tokio::test]
async fn invalid_booking_reports_field_errors() -> Result<()> {
    let server = TestServer::start().await?;
    let student = server.signed_in(STUDENT).await?;
    let instructor = instructor_id(&server, &student).await?;

    let mut input = booking(&instructor);
    input["duration"] = json!(12);
    input["scheduledDate"] = json!("2001-01-01T10:00:00Z");
    let (status, body) = server.mutation(&student, "flight.create", &input).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(
        body["error"]["fieldErrors"]["duration"],
        json!(["Duration cannot exceed 10 hours"])
    );
    assert_eq!(
        body["error"]["fieldErrors"]["scheduledDate"],
        json!(["Flight must be scheduled in the future"])
    );
    Ok(())
}

#[tokio::test]
async fn only_instructors_update_and_anyone_involved_reschedules() -> Result<()> {
    let server = TestServer::start().await?;
    let student = server.signed_in(STUDENT).await?;
    let instructor_client = server.signed_in(INSTRUCTOR).await?;
    let instructor = instructor_id(&server, &student).await?;

    let (_, body) = server.mutation(&student, "flight.create", &booking(&instructor)).await?;
    let id = body["result"]["data"]["id"].as_str().context("flight id")?.to_string();

    let update = json!({"id": id, "status": "AT_RISK", "cancellationProbability": 80, "riskLevel": "HIGH"});
    let (status, _) = server.mutation(&student, "flight.update", &update).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.mutation(&instructor_client, "flight.update", &update).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["status"], "AT_RISK");

    let (status, body) = server.query(&student, "flight.alerts", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"][0]["id"], id.as_str());

    let later = (Utc::now() + Duration::days(5)).to_rfc3339();
    let (status, body) = server
        .mutation(&student, "flight.reschedule", &json!({"id": id, "scheduledDate": later, "reason": "Thunderstorms"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let flight = &body["result"]["data"];
    assert_eq!(flight["status"], "RESCHEDULED");
    assert_eq!(flight["riskLevel"], "LOW");
    assert_eq!(flight["cancellationProbability"], 0);
    Ok(())
}

#[tokio::test]
async fn admins_see_every_flight() -> Result<()> {
    let server = TestServer::start().await?;
    let student = server.signed_in(STUDENT).await?;
    let admin = server.signed_in(ADMIN).await?;
    let instructor = instructor_id(&server, &student).await?;

    let (_, body) = server.mutation(&student, "flight.create", &booking(&instructor)).await?;
    let id = body["result"]["data"]["id"].clone();

    let (status, body) = server.query(&admin, "flight.byId", Some(&json!({"id": id}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["id"], id);

    let (status, body) = server.query(&admin, "flight.list", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn mutations_require_post() -> Result<()> {
    let server = TestServer::start().await?;
    let student = server.signed_in(STUDENT).await?;

    let (status, body) = server.query(&student, "flight.create", None).await?;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "METHOD_NOT_SUPPORTED");

    let (status, _) = server.query(&student, "flight.nope", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_date_range_includes_its_bounds() -> Result<()> {
    let server = TestServer::start().await?;
    let student = server.signed_in(STUDENT).await?;
    let instructor = instructor_id(&server, &student).await?;

    let mut dates = Vec::new();
    for days in [2, 4, 6] {
        let mut input = booking(&instructor);
        input["scheduledDate"] = json!((Utc::now() + Duration::days(days)).to_rfc3339());
        let (status, body) = server.mutation(&student, "flight.create", &input).await?;
        assert_eq!(status, StatusCode::OK);
        dates.push(body["result"]["data"]["scheduledDate"].clone());
    }

    let range = json!({"startDate": dates[0], "endDate": dates[1]});
    let (status, body) = server.query(&student, "flight.list", Some(&range)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"]["total"], 2);
    assert_eq!(body["result"]["data"]["flights"][1]["scheduledDate"], dates[1]);

    let after = json!({"startDate": dates[2]});
    let (_, body) = server.query(&student, "flight.list", Some(&after)).await?;
    assert_eq!(body["result"]["data"]["total"], 1);
    Ok(())
}
