use std::collections::BTreeMap;

use serde_json::Value;

use super::procedure::{Procedure, ProcedureKind};
use super::routers;
use super::{Context, ErrorCode, RpcError};

/// Named procedures, addressed by dotted path (`flight.list`)
#[derive(Clone, Default)]
pub struct RpcRouter {
    procedures: BTreeMap<String, Procedure>,
}

impl RpcRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn procedure(mut self, name: &str, procedure: Procedure) -> Self {
        self.procedures.insert(name.to_string(), procedure);
        self
    }

    /// Mount every procedure of `other` under `prefix.`
    pub fn merge(mut self, prefix: &str, other: RpcRouter) -> Self {
        for (name, procedure) in other.procedures {
            self.procedures.insert(format!("{}.{}", prefix, name), procedure);
        }
        self
    }

    pub fn get(&self, path: &str) -> Option<&Procedure> {
        self.procedures.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    /// Resolve `path`, check it is invoked as the right kind, then run it
    pub async fn call(
        &self,
        path: &str,
        kind: ProcedureKind,
        ctx: Context,
        input: Value,
    ) -> Result<Value, RpcError> {
        let procedure = self.get(path).ok_or_else(|| {
            RpcError::not_found(format!("No procedure found on path \"{}\"", path))
        })?;

        if procedure.kind() != kind {
            let expected = match procedure.kind() {
                ProcedureKind::Query => "GET",
                ProcedureKind::Mutation => "POST",
            };
            return Err(RpcError::new(
                ErrorCode::MethodNotSupported,
                format!("Unsupported method for \"{}\"; use {}", path, expected),
            ));
        }

        procedure.call(ctx, input).await
    }

    /// Server-side caller bound to one request context
    pub fn caller(&self, ctx: Context) -> Caller<'_> {
        Caller { router: self, ctx }
    }
}

/// Invokes procedures in-process, as page handlers do
pub struct Caller<'a> {
    router: &'a RpcRouter,
    ctx: Context,
}

impl Caller<'_> {
    pub async fn query(&self, path: &str, input: Value) -> Result<Value, RpcError> {
        self.router
            .call(path, ProcedureKind::Query, self.ctx.clone(), input)
            .await
    }

    pub async fn mutation(&self, path: &str, input: Value) -> Result<Value, RpcError> {
        self.router
            .call(path, ProcedureKind::Mutation, self.ctx.clone(), input)
            .await
    }
}

/// The application's procedure tree
pub fn app_router() -> RpcRouter {
    RpcRouter::new()
        .procedure("health", routers::health())
        .merge("flight", routers::flight::router())
        .merge("user", routers::user::router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::rpc::SessionState;
    use std::sync::Arc;

    fn anonymous() -> Context {
        Context::new(Arc::new(MemoryStore::new()), SessionState::Anonymous)
    }

    #[test]
    fn app_router_exposes_every_procedure() {
        let router = app_router();
        let paths: Vec<&str> = router.paths().collect();
        assert_eq!(
            paths,
            vec![
                "flight.alerts",
                "flight.byId",
                "flight.create",
                "flight.list",
                "flight.reschedule",
                "flight.update",
                "health",
                "user.instructors",
                "user.me",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let err = app_router()
            .call("flight.delete", ProcedureKind::Mutation, anonymous(), Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn wrong_kind_is_method_not_supported() {
        let router = app_router();
        let err = router
            .call("flight.create", ProcedureKind::Query, anonymous(), Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MethodNotSupported);

        let err = router
            .call("health", ProcedureKind::Mutation, anonymous(), Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MethodNotSupported);
    }

    #[tokio::test]
    async fn public_health_answers_anonymous_callers() {
        let out = app_router()
            .caller(anonymous())
            .query("health", Value::Null)
            .await
            .unwrap();
        assert_eq!(out["status"], "ok");
    }
}
