use axum::response::Redirect;

use crate::providers::CurrentSession;

pub async fn root(CurrentSession(session): CurrentSession) -> Redirect {
    match session {
        Some(_) => Redirect::temporary("/dashboard"),
        None => Redirect::temporary("/login"),
    }
}

pub async fn flights() -> Redirect {
    Redirect::temporary("/dashboard/flights")
}

pub async fn new_flight() -> Redirect {
    Redirect::temporary("/dashboard/flights/new")
}
