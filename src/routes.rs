// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, exam, question, quiz_set, report, topic},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, topics, questions, quiz sets, exam, reports).
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
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh_token))
        // User administration: Auth first, then Admin check
        .merge(
            Router::new()
                .route("/users", get(auth::list_users).delete(auth::delete_user))
                .layer(middleware::from_fn(admin_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let topic_routes = Router::new()
        .route("/", get(topic::list_topics))
        .route("/difficulties", get(topic::topics_difficulties))
        // Mutations are reserved for teachers and admins
        .merge(
            Router::new()
                .route(
                    "/",
                    post(topic::create_topics)
                        .put(topic::update_topic)
                        .delete(topic::delete_topic),
                )
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // The plain question listing exposes correct options, so the whole
    // resource is teacher-gated. Students receive questions through the
    // exam quiz-set lookup instead.
    let question_routes = Router::new()
        .route(
            "/",
            get(question::list_questions)
                .post(question::create_questions)
                .delete(question::delete_question),
        )
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_set_routes = Router::new()
        .route("/", get(quiz_set::list_quiz_sets))
        .merge(
            Router::new()
                .route(
                    "/",
                    post(quiz_set::create_quiz_set)
                        .put(quiz_set::update_quiz_set)
                        .delete(quiz_set::delete_quiz_set),
                )
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let exam_routes = Router::new()
        .route("/quiz-set", post(quiz_set::lookup_quiz_set))
        .route("/attempts", get(exam::list_attempts))
        .route("/attempts/start", post(exam::start_attempt))
        .route("/answers", get(exam::list_answers).post(exam::submit_answers))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let report_routes = Router::new()
        .route("/results", get(report::student_results))
        .route("/leaderboard", get(report::leaderboard))
        .route("/leaderboard/top3", get(report::leaderboard_top3))
        .merge(
            Router::new()
                .route("/reports/teacher", get(report::teacher_report))
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/topics", topic_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/quiz-sets", quiz_set_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api", report_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
