//! `user.*` procedures

use crate::auth::SessionUser;
use crate::database::models::InstructorSummary;
use crate::rpc::procedure::protected_procedure;
use crate::rpc::{AuthedContext, RpcError, RpcRouter};

pub fn router() -> RpcRouter {
    RpcRouter::new()
        .procedure("instructors", protected_procedure().query(instructors))
        .procedure("me", protected_procedure().query(me))
}

async fn instructors(ctx: AuthedContext, _input: ()) -> Result<Vec<InstructorSummary>, RpcError> {
    Ok(ctx.store.list_instructors().await?)
}

async fn me(ctx: AuthedContext, _input: ()) -> Result<SessionUser, RpcError> {
    Ok(ctx.session.user)
}
