use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    entities::director,
    error::AppResult,
    models::{DirectorParams, MovieParams},
    movie::Movie,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{id}", get(show_movie).patch(update_movie))
        .route("/movies/{id}/director", get(movie_director))
        .route("/directors", get(list_directors).post(create_director))
        .route("/directors/{id}", get(show_director))
        .route("/directors/{id}/movies", get(director_movies))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.catalog.list_movies().await?))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(params): Json<MovieParams>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = state.catalog.create_movie(params).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn show_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.catalog.find_movie(id).await?))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(params): Json<MovieParams>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.catalog.update_movie(id, params).await?))
}

pub async fn movie_director(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<Option<director::Model>>> {
    Ok(Json(state.catalog.movie_director(id).await?))
}

pub async fn list_directors(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<director::Model>>> {
    Ok(Json(state.catalog.list_directors().await?))
}

pub async fn create_director(
    State(state): State<Arc<AppState>>,
    Json(params): Json<DirectorParams>,
) -> AppResult<(StatusCode, Json<director::Model>)> {
    let director = state.catalog.create_director(params).await?;
    Ok((StatusCode::CREATED, Json(director)))
}

pub async fn show_director(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<director::Model>> {
    Ok(Json(state.catalog.find_director(id).await?))
}

pub async fn director_movies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.catalog.director_movies(id).await?))
}
