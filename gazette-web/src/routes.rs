// Gazette - A content backend for online publications
// Copyright (C) 2025 Gazette Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


use crate::{
    cors::cors_layer, handlers, rate_limit::login_rate_limit_middleware,
    request_logging::request_logging_middleware,
    security_headers::{media_headers_middleware, security_headers_middleware},
    AppState,
};
use axum::extract::DefaultBodyLimit;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register/{method}", post(handlers::register))
        .route(
            "/login/{method}",
            post(handlers::login).layer(middleware::from_fn_with_state(
                state.login_rate_limiter.clone(),
                login_rate_limit_middleware,
            )),
        )
        .route("/logout", delete(handlers::logout))
        .route("/verify", post(handlers::verify_email))
        .route("/check-session", get(handlers::check_session))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route("/articles/search", get(handlers::search_articles))
        .route(
            "/articles/{meta_title}",
            get(handlers::get_article)
                .patch(handlers::edit_article)
                .delete(handlers::delete_article),
        )
        .route(
            "/articles/{meta_title}/like",
            post(handlers::like_article).delete(handlers::unlike_article),
        )
        .route(
            "/articles/{meta_title}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/articles/{meta_title}/comments/{id}",
            delete(handlers::delete_comment),
        )
        .route("/posts", get(handlers::list_posts).post(handlers::create_post))
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .patch(handlers::edit_post)
                .delete(handlers::delete_post),
        )
        .route("/upload", post(handlers::presign_upload))
        .route("/upload/{*key}", delete(handlers::delete_upload))
        .route("/users/{id}", get(handlers::public_profile))
}

pub fn create_router(state: AppState) -> Router {
    let max_upload_size = state.config.upload.max_size;
    let headers_config = Arc::new(state.config.security.headers.clone());
    let cors = cors_layer(state.config.security.cors_allowed_origins.as_deref());

    Router::new()
        .route("/", get(handlers::index))
        .route("/.health", get(handlers::health))
        .route("/protected", get(handlers::protected))
        .route("/views", get(handlers::views))
        .nest("/auth", auth_routes(&state))
        .nest("/api", api_routes())
        .route("/.upload/{*key}", put(handlers::receive_signed_upload))
        .nest_service(
            "/media",
            ServiceBuilder::new()
                .layer(middleware::from_fn(media_headers_middleware))
                .service(ServeDir::new(&state.config.storage.root)),
        )
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(middleware::from_fn_with_state(
            headers_config,
            security_headers_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(max_upload_size))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
