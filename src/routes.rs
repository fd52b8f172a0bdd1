// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, audio, auth, certificate, modules, progress, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, modules, quiz, audio, progress, certificates, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let module_routes = Router::new()
        .route("/", get(modules::list_modules))
        .route("/{id}", get(modules::get_module))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_routes = Router::new()
        .route("/submit", post(quiz::submit_quiz))
        .route("/attempts", get(quiz::list_attempts))
        .route("/attempts/{module_id}", get(quiz::list_module_attempts))
        .route("/best/{module_id}", get(quiz::best_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let audio_routes = Router::new()
        .route("/progress", post(audio::update_audio_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let progress_routes = Router::new()
        .route("/", get(progress::get_progress))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Verification is deliberately public: anyone holding a code can check a
    // certificate without an account.
    let certificate_routes = Router::new()
        .route("/verify/{code}", get(certificate::verify_certificate))
        .merge(
            Router::new()
                .route("/request", post(certificate::request_certificate))
                .route("/me", get(certificate::get_my_certificate))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/certificates", get(admin::list_certificates))
        .route("/attempts", get(admin::list_attempts))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/modules", module_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/audio", audio_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/certificates", certificate_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
