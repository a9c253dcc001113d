//! HTTP router assembly.
//!
//! Three route groups share one state:
//! - `/signup` - public subscriber creation
//! - `/signin` - email-code sign-in
//! - `/admin` - subscriber CRUD behind the session token middleware

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware, state::AppState};

/// Allowed browser origin per route group. `None` leaves the group without CORS headers.
#[derive(Debug, Clone, Default)]
pub struct CorsOrigins {
    pub signup: Option<String>,
    pub signin: Option<String>,
    pub admin: Option<String>,
}

fn with_cors(
    router: Router<AppState>,
    origin: Option<&str>,
    allow_authorization: bool,
) -> Router<AppState> {
    let Some(origin) = origin else {
        return router;
    };

    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
            return router;
        }
    };

    let mut headers = vec![header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT];
    if allow_authorization {
        headers.push(header::AUTHORIZATION);
    }

    router.layer(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(headers),
    )
}

pub fn build_router(state: AppState, cors: &CorsOrigins) -> Router {
    let signup_routes = Router::new().route(
        "/signup/subscribers",
        post(handlers::subscribers::signup_subscriber),
    );

    let signin_routes = Router::new()
        .route("/signin/request", post(handlers::signin::request_code))
        .route("/signin/verify", post(handlers::signin::verify_code));

    let admin_routes = Router::new()
        .route(
            "/admin/subscribers",
            post(handlers::subscribers::create_subscriber)
                .get(handlers::subscribers::list_subscribers),
        )
        .route(
            "/admin/subscribers/{id}",
            get(handlers::subscribers::get_subscriber)
                .put(handlers::subscribers::update_subscriber)
                .delete(handlers::subscribers::delete_subscriber),
        )
        // Every admin route requires a token backed by a live session
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(with_cors(signup_routes, cors.signup.as_deref(), false))
        .merge(with_cors(signin_routes, cors.signin.as_deref(), false))
        .merge(with_cors(admin_routes, cors.admin.as_deref(), true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
