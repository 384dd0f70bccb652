use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::session::USER_ID_KEY;

pub async fn require_auth(session: Session, request: Request, next: Next) -> Response {
    if let Ok(Some(_user_id)) = session.get::<i64>(USER_ID_KEY).await {
        next.run(request).await
    } else {
        Redirect::to("/").into_response()
    }
}

pub async fn redirect_if_authenticated(session: Session, request: Request, next: Next) -> Response {
    if let Ok(Some(_user_id)) = session.get::<i64>(USER_ID_KEY).await {
        Redirect::to("/dashboard").into_response()
    } else {
        next.run(request).await
    }
}
