//! `flight.*` procedures

use crate::database::models::{
    Flight, FlightChanges, FlightPage, FlightQuery, FlightScope, FlightStatus, LabeledEnum,
    NewFlight, RiskLevel, Role,
};
use crate::rpc::procedure::protected_procedure;
use crate::rpc::{AuthedContext, RpcError, RpcRouter};
use crate::schemas::{
    CreateFlightInput, FlightIdInput, ListFlightsInput, RescheduleFlightInput, UpdateFlightInput,
};

pub fn router() -> RpcRouter {
    RpcRouter::new()
        .procedure("create", protected_procedure().input::<CreateFlightInput>().mutation(create))
        .procedure("update", protected_procedure().input::<UpdateFlightInput>().mutation(update))
        .procedure("list", protected_procedure().input::<ListFlightsInput>().query(list))
        .procedure("byId", protected_procedure().input::<FlightIdInput>().query(by_id))
        .procedure("alerts", protected_procedure().query(alerts))
        .procedure(
            "reschedule",
            protected_procedure().input::<RescheduleFlightInput>().mutation(reschedule),
        )
}

/// Admins see every flight, everyone else the flights they take part in
pub fn scope_for(ctx: &AuthedContext) -> FlightScope {
    match ctx.session.user.role {
        Role::Admin => FlightScope::All,
        Role::Student | Role::Instructor => FlightScope::Participant(ctx.user_id().to_string()),
    }
}

/// The flight, if it exists and the caller may see it. Invisible flights are
/// reported as missing so their existence does not leak.
async fn visible_flight(ctx: &AuthedContext, id: &str) -> Result<Flight, RpcError> {
    match ctx.store.find_flight(id).await? {
        Some(flight) if scope_for(ctx).admits(&flight) => Ok(flight),
        _ => Err(RpcError::not_found("Flight not found")),
    }
}

async fn create(ctx: AuthedContext, input: CreateFlightInput) -> Result<Flight, RpcError> {
    let instructor = ctx.store.find_user_by_id(&input.instructor_id).await?;
    if !matches!(&instructor, Some(user) if user.role == Role::Instructor) {
        return Err(RpcError::not_found("Instructor not found"));
    }

    let flight = ctx
        .store
        .create_flight(NewFlight {
            instructor_id: input.instructor_id,
            student_id: ctx.user_id().to_string(),
            scheduled_date: input.scheduled_date,
            training_level: input.training_level,
            departure_location: input.departure_location,
            destination_location: input.destination_location,
            duration: input.duration,
            notes: input.notes,
        })
        .await?;

    tracing::info!(
        "Flight {} booked by {} with instructor {}",
        flight.id,
        flight.student_id,
        flight.instructor_id
    );
    Ok(flight)
}

async fn update(ctx: AuthedContext, input: UpdateFlightInput) -> Result<Flight, RpcError> {
    let flight = visible_flight(&ctx, &input.id).await?;

    let user = &ctx.session.user;
    if !(user.is_admin() || flight.instructor_id == user.id) {
        return Err(RpcError::forbidden(
            "Only the flight's instructor or an administrator can update it",
        ));
    }

    let changes = input.changes();
    if changes.is_empty() {
        return Ok(flight);
    }

    let updated = ctx
        .store
        .update_flight(&flight.id, &changes)
        .await?
        .ok_or_else(|| RpcError::not_found("Flight not found"))?;

    tracing::info!("Flight {} updated by {}", updated.id, user.id);
    Ok(updated)
}

async fn list(ctx: AuthedContext, input: ListFlightsInput) -> Result<FlightPage, RpcError> {
    let query = FlightQuery {
        scope: scope_for(&ctx),
        status: input.status,
        start_date: input.start_date,
        end_date: input.end_date,
        limit: input.limit,
        offset: input.offset,
    };
    Ok(ctx.store.list_flights(&query).await?)
}

async fn by_id(ctx: AuthedContext, input: FlightIdInput) -> Result<Flight, RpcError> {
    visible_flight(&ctx, &input.id).await
}

async fn alerts(ctx: AuthedContext, _input: ()) -> Result<Vec<Flight>, RpcError> {
    Ok(ctx.store.list_alerts(&scope_for(&ctx), ctx.now).await?)
}

async fn reschedule(ctx: AuthedContext, input: RescheduleFlightInput) -> Result<Flight, RpcError> {
    let flight = visible_flight(&ctx, &input.id).await?;

    if !flight.status.can_reschedule() {
        return Err(RpcError::conflict(format!(
            "A {} flight cannot be rescheduled",
            flight.status.as_str()
        )));
    }

    let changes = FlightChanges {
        scheduled_date: Some(input.scheduled_date),
        status: Some(FlightStatus::Rescheduled),
        cancellation_probability: Some(0),
        risk_level: Some(RiskLevel::Low),
    };
    let updated = ctx
        .store
        .update_flight(&flight.id, &changes)
        .await?
        .ok_or_else(|| RpcError::not_found("Flight not found"))?;

    tracing::info!(
        "Flight {} rescheduled to {} by {} ({})",
        updated.id,
        updated.scheduled_date,
        ctx.user_id(),
        input.reason.as_deref().unwrap_or("no reason given")
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use crate::database::models::{FlightChanges, FlightStatus, RiskLevel};
    use crate::rpc::{app_router, ErrorCode};
    use crate::testing::TestContext;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn create_books_for_the_caller() {
        let t = TestContext::new().await.unwrap();
        let mut input = t.create_input();
        input["studentId"] = json!(t.other_student.id);

        let created = app_router()
            .caller(t.context_for(&t.student))
            .mutation("flight.create", input)
            .await
            .unwrap();

        assert_eq!(created["studentId"], json!(t.student.id));
        assert_eq!(created["instructorId"], json!(t.instructor.id));
        assert_eq!(created["status"], "SCHEDULED");
        assert_eq!(created["cancellationProbability"], 0);
        assert_eq!(created["riskLevel"], "LOW");
    }

    #[tokio::test]
    async fn create_requires_a_real_instructor() {
        let t = TestContext::new().await.unwrap();
        let router = app_router();
        let caller = router.caller(t.context_for(&t.student));

        let mut input = t.create_input();
        input["instructorId"] = json!(t.other_student.id);
        let err = caller.mutation("flight.create", input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Instructor not found");

        let mut input = t.create_input();
        input["instructorId"] = json!("cdoesnotexist");
        let err = caller.mutation("flight.create", input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn create_reports_validation_errors() {
        let t = TestContext::new().await.unwrap();
        let mut input = t.create_input();
        input["duration"] = json!(11);
        input["scheduledDate"] = json!((Utc::now() - Duration::hours(1)).to_rfc3339());

        let err = app_router()
            .caller(t.context_for(&t.student))
            .mutation("flight.create", input)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        let fields = err.field_errors.unwrap();
        assert_eq!(fields.messages("duration"), ["Duration cannot exceed 10 hours"]);
        assert_eq!(
            fields.messages("scheduledDate"),
            ["Flight must be scheduled in the future"]
        );
    }

    #[tokio::test]
    async fn anonymous_callers_are_unauthorized() {
        let t = TestContext::new().await.unwrap();
        let err = app_router()
            .caller(t.anonymous())
            .query("flight.list", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn only_instructor_or_admin_may_update() {
        let t = TestContext::new().await.unwrap();
        let flight = t.book(&t.student, 24).await.unwrap();
        let router = app_router();
        let input = json!({"id": flight.id, "status": "AT_RISK", "cancellationProbability": 70});

        let err = router
            .caller(t.context_for(&t.student))
            .mutation("flight.update", input.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let updated = router
            .caller(t.context_for(&t.instructor))
            .mutation("flight.update", input)
            .await
            .unwrap();
        assert_eq!(updated["status"], "AT_RISK");
        assert_eq!(updated["cancellationProbability"], 70);

        let updated = router
            .caller(t.context_for(&t.admin))
            .mutation("flight.update", json!({"id": flight.id, "riskLevel": "HIGH"}))
            .await
            .unwrap();
        assert_eq!(updated["riskLevel"], "HIGH");
        assert_eq!(updated["status"], "AT_RISK");
    }

    #[tokio::test]
    async fn update_of_unknown_flight_is_not_found() {
        let t = TestContext::new().await.unwrap();
        let err = app_router()
            .caller(t.context_for(&t.admin))
            .mutation("flight.update", json!({"id": "cmissingflight", "status": "COMPLETED"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn list_is_scoped_by_role() {
        let t = TestContext::new().await.unwrap();
        let mine = t.book(&t.student, 48).await.unwrap();
        let earlier = t.book(&t.student, 24).await.unwrap();
        t.book(&t.other_student, 12).await.unwrap();
        let router = app_router();

        let page = router
            .caller(t.context_for(&t.student))
            .query("flight.list", Value::Null)
            .await
            .unwrap();
        assert_eq!(page["total"], 2);
        assert_eq!(page["limit"], 20);
        assert_eq!(page["flights"][0]["id"], json!(earlier.id));
        assert_eq!(page["flights"][1]["id"], json!(mine.id));

        for user in [&t.instructor, &t.admin] {
            let page = router
                .caller(t.context_for(user))
                .query("flight.list", json!({"limit": 2}))
                .await
                .unwrap();
            assert_eq!(page["total"], 3);
            assert_eq!(page["flights"].as_array().unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn list_filters_by_inclusive_date_range() {
        let t = TestContext::new().await.unwrap();
        let early = t.book(&t.student, 24).await.unwrap();
        let middle = t.book(&t.student, 48).await.unwrap();
        let late = t.book(&t.student, 72).await.unwrap();
        let router = app_router();
        let caller = router.caller(t.context_for(&t.student));

        let page = caller
            .query(
                "flight.list",
                json!({
                    "startDate": middle.scheduled_date.to_rfc3339(),
                    "endDate": late.scheduled_date.to_rfc3339(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(page["total"], 2);
        assert_eq!(page["flights"][0]["id"], json!(middle.id));
        assert_eq!(page["flights"][1]["id"], json!(late.id));

        let page = caller
            .query("flight.list", json!({"endDate": early.scheduled_date.to_rfc3339()}))
            .await
            .unwrap();
        assert_eq!(page["total"], 1);
        assert_eq!(page["flights"][0]["id"], json!(early.id));

        let err = caller
            .query("flight.list", json!({"startDate": "next tuesday"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn by_id_hides_other_peoples_flights() {
        let t = TestContext::new().await.unwrap();
        let flight = t.book(&t.student, 24).await.unwrap();
        let router = app_router();
        let input = json!({"id": flight.id});

        let err = router
            .caller(t.context_for(&t.other_student))
            .query("flight.byId", input.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        for user in [&t.student, &t.instructor, &t.admin] {
            let found = router
                .caller(t.context_for(user))
                .query("flight.byId", input.clone())
                .await
                .unwrap();
            assert_eq!(found["id"], json!(flight.id));
        }
    }

    #[tokio::test]
    async fn alerts_list_risky_upcoming_flights() {
        let t = TestContext::new().await.unwrap();
        t.book(&t.student, 24).await.unwrap();
        let stormy = t.book(&t.student, 30).await.unwrap();
        t.store
            .update_flight(
                &stormy.id,
                &FlightChanges {
                    risk_level: Some(RiskLevel::Extreme),
                    ..FlightChanges::default()
                },
            )
            .await
            .unwrap();

        let alerts = app_router()
            .caller(t.context_for(&t.student))
            .query("flight.alerts", Value::Null)
            .await
            .unwrap();
        let ids: Vec<&Value> = alerts.as_array().unwrap().iter().map(|f| &f["id"]).collect();
        assert_eq!(ids, vec![&json!(stormy.id)]);
    }

    #[tokio::test]
    async fn reschedule_resets_risk() {
        let t = TestContext::new().await.unwrap();
        let flight = t.book(&t.student, 24).await.unwrap();
        t.store
            .update_flight(
                &flight.id,
                &FlightChanges {
                    status: Some(FlightStatus::AtRisk),
                    cancellation_probability: Some(80),
                    risk_level: Some(RiskLevel::High),
                    ..FlightChanges::default()
                },
            )
            .await
            .unwrap();

        let new_date = Utc::now() + Duration::days(5);
        let updated = app_router()
            .caller(t.context_for(&t.student))
            .mutation(
                "flight.reschedule",
                json!({"id": flight.id, "scheduledDate": new_date.to_rfc3339(), "reason": "Thunderstorms"}),
            )
            .await
            .unwrap();
        assert_eq!(updated["status"], "RESCHEDULED");
        assert_eq!(updated["cancellationProbability"], 0);
        assert_eq!(updated["riskLevel"], "LOW");
    }

    #[tokio::test]
    async fn finished_flights_cannot_be_rescheduled() {
        let t = TestContext::new().await.unwrap();
        let flight = t.book(&t.student, 24).await.unwrap();
        t.store
            .update_flight(
                &flight.id,
                &FlightChanges {
                    status: Some(FlightStatus::Cancelled),
                    ..FlightChanges::default()
                },
            )
            .await
            .unwrap();

        let err = app_router()
            .caller(t.context_for(&t.admin))
            .mutation(
                "flight.reschedule",
                json!({"id": flight.id, "scheduledDate": (Utc::now() + Duration::days(1)).to_rfc3339()}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }
}
