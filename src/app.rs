use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Uri},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::handlers::{auth, bootcamps, courses, reviews, system, users};
use crate::middleware::{admin_only, protect, rate_limit_middleware, sanitize_json_body};
use crate::state::AppState;

/// Multipart framing on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Full application router with global middleware
pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload.path);
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest_service("/uploads", uploads)
        .nest("/api/v1", api_routes(state.clone()))
        .fallback(route_not_found)
        // Global middleware
        .layer(from_fn_with_state(state.clone(), sanitize_json_body))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(state.clone()))
        .merge(bootcamp_routes(state.clone()))
        .merge(course_routes(state.clone()))
        .merge(review_routes(state.clone()))
        .nest("/users", user_routes(state))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    let signed_in = Router::new()
        .route("/auth/me", get(auth::get_me))
        .route("/auth/updatedetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
        .route_layer(from_fn_with_state(state, protect));

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/:resettoken", put(auth::reset_password))
        .merge(signed_in)
}

// Reads are public and writes go through `protect`. The layer is attached
// before the public GET so it only wraps the mutating methods.
fn bootcamp_routes(state: AppState) -> Router<AppState> {
    let protected = from_fn_with_state(state.clone(), protect);
    let photo_limit = state.config.upload.max_file_size + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/bootcamps",
            post(bootcamps::create_bootcamp)
                .route_layer(protected.clone())
                .get(bootcamps::get_bootcamps),
        )
        .route(
            "/bootcamps/:id",
            put(bootcamps::update_bootcamp)
                .delete(bootcamps::delete_bootcamp)
                .route_layer(protected.clone())
                .get(bootcamps::get_bootcamp),
        )
        .route(
            "/bootcamps/:id/photo",
            put(bootcamps::upload_photo)
                .route_layer(protected.clone())
                .layer(DefaultBodyLimit::max(photo_limit)),
        )
        .route(
            "/bootcamps/radius/:zipcode/:distance",
            get(bootcamps::get_bootcamps_in_radius),
        )
        .route(
            "/bootcamps/:id/courses",
            post(courses::add_course)
                .route_layer(protected.clone())
                .get(courses::get_bootcamp_courses),
        )
        .route(
            "/bootcamps/:id/reviews",
            post(reviews::add_review)
                .route_layer(protected)
                .get(reviews::get_bootcamp_reviews),
        )
}

fn course_routes(state: AppState) -> Router<AppState> {
    let protected = from_fn_with_state(state, protect);

    Router::new()
        .route("/courses", get(courses::get_courses))
        .route(
            "/courses/:id",
            put(courses::update_course)
                .delete(courses::delete_course)
                .route_layer(protected)
                .get(courses::get_course),
        )
}

fn review_routes(state: AppState) -> Router<AppState> {
    let protected = from_fn_with_state(state, protect);

    Router::new()
        .route("/reviews", get(reviews::get_reviews))
        .route(
            "/reviews/:id",
            put(reviews::update_review)
                .delete(reviews::delete_review)
                .route_layer(protected)
                .get(reviews::get_review),
        )
}

fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(users::get_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Last added runs first: authenticate, then require admin
        .route_layer(from_fn(admin_only))
        .route_layer(from_fn_with_state(state, protect))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed).allow_credentials(true)
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}
