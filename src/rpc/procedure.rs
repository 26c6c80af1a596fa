//! Procedure builders.
//!
//! A procedure is built from a context kind (public or protected), an input
//! schema and an async handler. Protected procedures convert the request
//! [`Context`] into an [`AuthedContext`] before anything else runs, so their
//! handlers can only be written against a context that holds a session.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use super::{AuthedContext, Context, RpcError};
use crate::schemas::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

type Handler = Arc<dyn Fn(Context, Value) -> BoxFuture<'static, Result<Value, RpcError>> + Send + Sync>;

/// A finished, type-erased procedure
#[derive(Clone)]
pub struct Procedure {
    kind: ProcedureKind,
    handler: Handler,
}

impl Procedure {
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub async fn call(&self, ctx: Context, input: Value) -> Result<Value, RpcError> {
        (self.handler)(ctx, input).await
    }
}

/// Context a procedure handler receives
pub trait FromContext: Sized + Send + 'static {
    fn from_context(ctx: Context) -> Result<Self, RpcError>;
}

impl FromContext for Context {
    fn from_context(ctx: Context) -> Result<Self, RpcError> {
        Ok(ctx)
    }
}

impl FromContext for AuthedContext {
    fn from_context(ctx: Context) -> Result<Self, RpcError> {
        ctx.authed()
    }
}

pub struct ProcedureBuilder<C, I> {
    _marker: PhantomData<fn() -> (C, I)>,
}

pub fn public_procedure() -> ProcedureBuilder<Context, ()> {
    ProcedureBuilder {
        _marker: PhantomData,
    }
}

pub fn protected_procedure() -> ProcedureBuilder<AuthedContext, ()> {
    ProcedureBuilder {
        _marker: PhantomData,
    }
}

impl<C: FromContext, I> ProcedureBuilder<C, I> {
    pub fn input<T: Schema>(self) -> ProcedureBuilder<C, T> {
        ProcedureBuilder {
            _marker: PhantomData,
        }
    }
}

impl<C, I> ProcedureBuilder<C, I>
where
    C: FromContext,
    I: Schema + Send + 'static,
{
    pub fn query<F, Fut, O>(self, handler: F) -> Procedure
    where
        F: Fn(C, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
        O: Serialize,
    {
        Self::build(ProcedureKind::Query, handler)
    }

    pub fn mutation<F, Fut, O>(self, handler: F) -> Procedure
    where
        F: Fn(C, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
        O: Serialize,
    {
        Self::build(ProcedureKind::Mutation, handler)
    }

    fn build<F, Fut, O>(kind: ProcedureKind, handler: F) -> Procedure
    where
        F: Fn(C, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
        O: Serialize,
    {
        let handler = Arc::new(handler);
        let erased: Handler = Arc::new(move |ctx: Context, raw: Value| {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let now = ctx.now;
                // Session check first: anonymous callers never reach validation
                let ctx = C::from_context(ctx)?;
                let input = I::parse(&raw, now)?;
                let output = (*handler)(ctx, input).await?;
                serde_json::to_value(output).map_err(|e| {
                    tracing::error!("Failed to serialize procedure output: {}", e);
                    RpcError::internal("Failed to serialize response")
                })
            })
        });

        Procedure {
            kind,
            handler: erased,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, SessionUser};
    use crate::database::models::{Role, TrainingLevel};
    use crate::database::MemoryStore;
    use crate::rpc::{ErrorCode, SessionState};
    use crate::schemas::FlightIdInput;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(session: SessionState) -> Context {
        Context::new(Arc::new(MemoryStore::new()), session)
    }

    fn student() -> SessionState {
        SessionState::Authenticated(Session {
            user: SessionUser {
                id: "cstudent0001".to_string(),
                name: Some("Sam".to_string()),
                email: "sam@example.com".to_string(),
                role: Role::Student,
                training_level: TrainingLevel::Student,
            },
            expires: Utc::now() + Duration::hours(1),
        })
    }

    #[tokio::test]
    async fn protected_rejects_anonymous_without_running_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let procedure = protected_procedure().query(move |_ctx, ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!("secret")) }
        });

        let err = procedure
            .call(context(SessionState::Anonymous), Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.message, "You must be logged in to access this resource");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let ok = procedure.call(context(student()), Value::Null).await.unwrap();
        assert_eq!(ok, json!("secret"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn protected_handler_sees_the_session() {
        let procedure = protected_procedure()
            .query(|ctx: AuthedContext, ()| async move { Ok(ctx.user_id().to_string()) });
        let out = procedure.call(context(student()), Value::Null).await.unwrap();
        assert_eq!(out, json!("cstudent0001"));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_handler() {
        let procedure = public_procedure()
            .input::<FlightIdInput>()
            .query(|_ctx, input| async move { Ok(input.id) });

        let err = procedure
            .call(context(SessionState::Anonymous), json!({"id": "bad"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert!(err.field_errors.unwrap().messages("id").len() == 1);

        let ok = procedure
            .call(context(SessionState::Anonymous), json!({"id": "cflight12345"}))
            .await
            .unwrap();
        assert_eq!(ok, json!("cflight12345"));
    }

    #[test]
    fn kinds_are_recorded() {
        let q = public_procedure().query(|_ctx, ()| async { Ok(1) });
        let m = public_procedure().mutation(|_ctx, ()| async { Ok(1) });
        assert_eq!(q.kind(), ProcedureKind::Query);
        assert_eq!(m.kind(), ProcedureKind::Mutation);
    }
}
