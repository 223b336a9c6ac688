//! HTTP/JSON gateway.
//!
//! Transcodes REST-style calls onto the same [`ProfileService`] the gRPC
//! handler uses, so both transports share one operation contract and one
//! error taxonomy:
//!
//! | Verb     | Path                        | Operation |
//! |----------|-----------------------------|-----------|
//! | `POST`   | `/v1/users`                 | Create    |
//! | `GET`    | `/v1/users/{id}`            | Read      |
//! | `GET`    | `/v1/users`                 | List      |
//! | `PATCH`  | `/v1/users/{id}`            | Update    |
//! | `PUT`    | `/v1/users/{id}`            | Replace   |
//! | `DELETE` | `/v1/users/{id}`            | Delete    |
//! | `GET`    | `/docs/profile/swagger.json`| API description |
//!
//! Field masks travel as a comma-separated `fields` query parameter on reads
//! and as a `fields` array in the Update body.

mod error;
mod model;

pub use error::ApiError;
pub use model::{CreateBody, ListQuery, ReadQuery, UpdateBody, UserBody};

use crate::server::{
    service::{mask, resource::ProfileService},
    store::UserStore,
    telemetry::log_call,
};
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::header,
    response::IntoResponse,
    routing::get,
};
use model::{CreateReply, Empty, ListReply, ReadReply};
use profile_core::{Error, types::UserId};
use serde::Serialize;
use std::time::Instant;
use tonic::Code;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Static OpenAPI description of the gateway surface.
pub const SWAGGER_JSON: &str = include_str!("../../../api/profile.swagger.json");

pub const SWAGGER_PATH: &str = "/docs/profile/swagger.json";

struct GatewayState<S> {
    service: ProfileService<S>,
    log_payload: bool,
}

impl<S> Clone for GatewayState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            log_payload: self.log_payload,
        }
    }
}

/// Builds the gateway router over `service`.
pub fn router<S: UserStore>(service: ProfileService<S>, log_payload: bool) -> Router {
    Router::new()
        .route("/v1/users", get(list::<S>).post(create::<S>))
        .route(
            "/v1/users/{id}",
            get(read::<S>)
                .patch(update::<S>)
                .put(replace::<S>)
                .delete(delete::<S>),
        )
        .route(SWAGGER_PATH, get(swagger))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(GatewayState {
            service,
            log_payload,
        })
}

/// Extractor failures are client errors.
fn rejected(rejection: impl core::fmt::Display) -> Error {
    Error::invalid_argument(rejection.to_string())
}

fn finish<T: Serialize + core::fmt::Debug>(
    log_payload: bool,
    method: &'static str,
    start: Instant,
    result: profile_core::Result<T>,
) -> Result<Json<T>, ApiError> {
    let code = result.as_ref().map_or_else(Error::code, |_| Code::Ok);
    log_call("http", method, code, start.elapsed());
    if log_payload {
        if let Ok(body) = &result {
            tracing::debug!(method, payload = ?body, "http response");
        }
    }
    result.map(Json).map_err(ApiError::from)
}

async fn create<S: UserStore>(
    State(state): State<GatewayState<S>>,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<Json<CreateReply>, ApiError> {
    let start = Instant::now();
    let result = async {
        let Json(body) = body.map_err(rejected)?;
        let user = body
            .user
            .ok_or_else(|| Error::invalid_argument("user is required"))?;
        let id = state.service.create(user.into()).await?;
        Ok::<_, Error>(CreateReply { id })
    }
    .await;
    finish(state.log_payload, "Create", start, result)
}

async fn read<S: UserStore>(
    State(state): State<GatewayState<S>>,
    path: Result<Path<UserId>, PathRejection>,
    query: Result<Query<ReadQuery>, QueryRejection>,
) -> Result<Json<ReadReply>, ApiError> {
    let start = Instant::now();
    let result = async {
        let Path(id) = path.map_err(rejected)?;
        let Query(query) = query.map_err(rejected)?;
        let user = state
            .service
            .read(id, mask::projection(query.field_mask()))
            .await?;
        Ok::<_, Error>(ReadReply { user: user.into() })
    }
    .await;
    finish(state.log_payload, "Read", start, result)
}

async fn list<S: UserStore>(
    State(state): State<GatewayState<S>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListReply>, ApiError> {
    let start = Instant::now();
    let result = async {
        let Query(query) = query.map_err(rejected)?;
        let page = state
            .service
            .list(
                query.limit.unwrap_or(0),
                query.offset.unwrap_or(0),
                mask::projection(query.field_mask()),
            )
            .await?;
        Ok::<_, Error>(ListReply::from(page))
    }
    .await;
    finish(state.log_payload, "List", start, result)
}

async fn update<S: UserStore>(
    State(state): State<GatewayState<S>>,
    path: Result<Path<UserId>, PathRejection>,
    body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<Empty>, ApiError> {
    let start = Instant::now();
    let result = async {
        let Path(id) = path.map_err(rejected)?;
        let Json(body) = body.map_err(rejected)?;
        let whitelist = mask::update_whitelist(Some(body.field_mask()))?;
        state
            .service
            .update(id, body.user.unwrap_or_default().into(), whitelist)
            .await?;
        Ok::<_, Error>(Empty {})
    }
    .await;
    finish(state.log_payload, "Update", start, result)
}

async fn replace<S: UserStore>(
    State(state): State<GatewayState<S>>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Empty>, ApiError> {
    let start = Instant::now();
    let result = async {
        let Path(id) = path.map_err(rejected)?;
        state.service.replace(id, Default::default()).await?;
        Ok::<_, Error>(Empty {})
    }
    .await;
    finish(state.log_payload, "Replace", start, result)
}

async fn delete<S: UserStore>(
    State(state): State<GatewayState<S>>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Empty>, ApiError> {
    let start = Instant::now();
    let result = async {
        let Path(id) = path.map_err(rejected)?;
        state.service.delete(id).await?;
        Ok::<_, Error>(Empty {})
    }
    .await;
    finish(state.log_payload, "Delete", start, result)
}

async fn swagger() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], SWAGGER_JSON)
}
