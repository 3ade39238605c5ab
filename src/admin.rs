use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::tmdb::TmdbApi;
use crate::views::{self, AdminMoviesView};
use axum::{extract::State, response::Html, Extension};
use tracing::warn;

pub const ADMIN_TRENDING_UNAVAILABLE: &str = "Unable to fetch movies from TMDB.";

pub async fn admin_movies_view(tmdb: &dyn TmdbApi) -> AdminMoviesView {
    match tmdb.trending().await {
        Some(result) => AdminMoviesView {
            movies: result.results,
            warning: None,
        },
        None => {
            warn!("Admin movie listing unavailable");
            AdminMoviesView {
                movies: Vec::new(),
                warning: Some(ADMIN_TRENDING_UNAVAILABLE.to_string()),
            }
        }
    }
}

pub async fn index(Extension(user): Extension<CurrentUser>) -> Html<String> {
    Html(views::admin_index(&user))
}

pub async fn movies(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Html<String> {
    let view = admin_movies_view(state.tmdb.as_ref()).await;
    Html(views::admin_movies_page(&view, &user))
}
