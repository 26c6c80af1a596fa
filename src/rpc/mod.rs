//! Typed procedure layer: request context, procedure builders, the named
//! procedure tree and its HTTP adapter.

pub mod adapter;
pub mod context;
pub mod error;
pub mod procedure;
pub mod router;
pub mod routers;

pub use context::{create_context, AuthedContext, Context, SessionState};
pub use error::{ErrorCode, RpcError};
pub use procedure::{protected_procedure, public_procedure, Procedure, ProcedureKind};
pub use router::{app_router, Caller, RpcRouter};
