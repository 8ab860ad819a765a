use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};

use crate::chat::{self, ChatClient};
use crate::notifier::{self, Notifier};
use crate::store::Store;
use crate::{auth, services};

/// Request-handling context, built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Notifier,
    pub chat: ChatClient,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier, chat: ChatClient) -> Self {
        Self {
            store,
            notifier,
            chat,
        }
    }
}

/// Every method router falls back to the JSON 404, so a known path called
/// with the wrong method answers like an unknown path.
pub fn app() -> Router<AppState> {
    let not_found = services::not_found_handler;
    Router::<AppState>::new()
        // users
        .route(
            "/api/usuarios",
            post(auth::register)
                .get(services::list_users_handler)
                .delete(services::delete_users_handler)
                .fallback(not_found),
        )
        .route("/api/usuarios/login", post(auth::login).fallback(not_found))
        .route(
            "/api/usuarios/:id",
            delete(services::delete_user_handler).fallback(not_found),
        )
        .route(
            "/api/usuarios/:id/transacciones",
            get(services::list_user_transactions_handler).fallback(not_found),
        )
        .route(
            "/api/usuarios/:id/reportes/:period",
            get(services::monthly_report_handler).fallback(not_found),
        )
        // transactions
        .route(
            "/api/transacciones",
            post(services::create_transaction_handler)
                .get(services::list_transactions_handler)
                .delete(services::delete_transactions_handler)
                .fallback(not_found),
        )
        .route(
            "/api/transacciones/:id",
            delete(services::delete_transaction_handler).fallback(not_found),
        )
        // reports
        .route(
            "/api/reportes",
            post(services::create_report_handler)
                .get(services::list_reports_handler)
                .fallback(not_found),
        )
        .route(
            "/api/reportes/listar",
            get(services::list_reports_handler).fallback(not_found),
        )
        // live events and chat
        .route(
            "/api/eventos",
            get(notifier::events_handler).fallback(not_found),
        )
        .route("/gemini-chat", post(chat::chat_handler).fallback(not_found))
        .fallback(not_found)
        .layer(from_fn(cors_middleware))
}

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Open CORS policy; preflight requests never reach the handlers.
pub async fn cors_middleware(req: Request, next: Next) -> Response {
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let headers = res.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    res
}
