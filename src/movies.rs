use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::tmdb::TmdbApi;
use crate::views::{self, DetailsView, ListingView};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use tracing::{info, warn};

pub const TRENDING_UNAVAILABLE: &str = "Unable to fetch movies.";
pub const EMPTY_QUERY: &str = "Please enter a movie name.";

// `page` stays a raw string so a malformed value cannot reject the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<String>,
}

/// The `page` value is only echoed back for the client-side loader; anything unparsable is page 1.
pub fn page_number(page: Option<&str>) -> u32 {
    page.and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

pub fn no_results_message(query: &str) -> String {
    format!("No results found for '{query}'.")
}

pub async fn trending_view(tmdb: &dyn TmdbApi, page: u32) -> ListingView {
    let (movies, message) = match tmdb.trending().await {
        Some(result) => (result.results, None),
        None => {
            warn!("Trending movies unavailable");
            (Vec::new(), Some(TRENDING_UNAVAILABLE.to_string()))
        }
    };
    ListingView {
        title: "Trending this week".to_string(),
        movies,
        message,
        query: String::new(),
        page,
        load_more: true,
    }
}

pub async fn search_view(tmdb: &dyn TmdbApi, raw_query: &str, page: u32) -> ListingView {
    let query = raw_query.trim();
    let mut view = ListingView {
        title: "Search movies".to_string(),
        movies: Vec::new(),
        message: None,
        query: query.to_string(),
        page,
        load_more: false,
    };

    if query.is_empty() {
        view.message = Some(EMPTY_QUERY.to_string());
        return view;
    }

    match tmdb.search(query).await {
        Some(result) if !result.is_empty() => {
            info!("Search '{}' returned {} movies", query, result.results.len());
            view.title = format!("Search results for '{query}'");
            view.movies = result.results;
        }
        _ => view.message = Some(no_results_message(query)),
    }
    view
}

/// `None` when the movie itself is unknown; cast and similar degrade to empty sections.
pub async fn details_view(tmdb: &dyn TmdbApi, id: i32) -> Option<DetailsView> {
    let movie = tmdb.movie_details(id).await?;
    let (cast, similar) = tokio::join!(tmdb.cast(id), tmdb.similar(id));
    Some(DetailsView {
        movie,
        cast: cast.unwrap_or_default(),
        similar: similar.map(|s| s.results).unwrap_or_default(),
    })
}

pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<PageQuery>,
) -> Html<String> {
    let view = trending_view(state.tmdb.as_ref(), page_number(params.page.as_deref())).await;
    Html(views::listing_page(&view, &user))
}

pub async fn trending_partial(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Html<String> {
    let view = trending_view(state.tmdb.as_ref(), page_number(params.page.as_deref())).await;
    Html(views::movie_grid(&view.movies, view.page))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<SearchQuery>,
) -> Html<String> {
    let view = search_view(state.tmdb.as_ref(), &params.query, page_number(params.page.as_deref())).await;
    Html(views::listing_page(&view, &user))
}

pub async fn details(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Response {
    let view = match raw_id.parse::<i32>() {
        Ok(id) => details_view(state.tmdb.as_ref(), id).await,
        Err(_) => None,
    };
    match view {
        Some(view) => Html(views::details_page(&view, &user)).into_response(),
        None => {
            warn!("Movie '{}' not found", raw_id);
            (
                StatusCode::NOT_FOUND,
                Html(views::not_found_page(Some(&user))),
            )
                .into_response()
        }
    }
}
