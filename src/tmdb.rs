use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::{env, fmt, time::Duration};
use tracing::{debug, warn};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
/// v4 read access tokens are JWTs, whose base64 header always starts with this.
const BEARER_MARKER: &str = "eyJ";
pub const MAX_CAST: usize = 8;

/// Everything the pages need from TMDB. Every call collapses failures into `None`.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn trending(&self) -> Option<ResultPage>;
    async fn search(&self, query: &str) -> Option<ResultPage>;
    async fn movie_details(&self, id: i32) -> Option<MovieSummary>;
    async fn similar(&self, id: i32) -> Option<ResultPage>;
    async fn cast(&self, id: i32) -> Option<Vec<CastMember>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Bearer,
    ApiKey,
}

impl AuthMode {
    pub fn detect(credential: &str) -> Self {
        let is_token = credential
            .get(..BEARER_MARKER.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(BEARER_MARKER))
            .unwrap_or(false);
        if is_token {
            AuthMode::Bearer
        } else {
            AuthMode::ApiKey
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Bearer => f.write_str("bearer token"),
            AuthMode::ApiKey => f.write_str("api key"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("JSON parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub overview: String,
    pub release_date: String,
    pub poster_path: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub runtime: Option<u32>,
    pub genres: Vec<String>,
    pub popularity: f64,
}

impl MovieSummary {
    pub fn poster_url(&self) -> Option<String> {
        image_url("w500", &self.poster_path)
    }

    pub fn year(&self) -> Option<&str> {
        let year = self.release_date.get(..4)?;
        year.chars().all(|c| c.is_ascii_digit()).then_some(year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultPage {
    pub results: Vec<MovieSummary>,
}

impl ResultPage {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CastMember {
    pub name: String,
    pub character: String,
    pub profile_path: Option<String>,
}

impl CastMember {
    pub fn profile_url(&self) -> Option<String> {
        self.profile_path
            .as_deref()
            .and_then(|p| image_url("w185", p))
    }
}

fn image_url(size: &str, path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    Some(format!("{IMAGE_BASE}/{size}{path}"))
}

#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    auth: AuthMode,
    // Only kept in api-key mode; bearer tokens live in the client's default headers.
    api_key: Option<String>,
}

impl TmdbClient {
    pub fn new(credential: &str) -> Result<Self> {
        Self::with_base_url(credential, TMDB_BASE)
    }

    pub fn from_env() -> Result<Self> {
        let credential = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        Self::new(&credential)
    }

    pub fn with_base_url(credential: &str, base_url: &str) -> Result<Self> {
        let auth = AuthMode::detect(credential);
        let user_agent = format!("cinescope/{}", env!("CARGO_PKG_VERSION"));
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent);

        let api_key = match auth {
            AuthMode::Bearer => {
                let mut value = header::HeaderValue::from_str(&format!("Bearer {credential}"))
                    .context("TMDB bearer token is not a valid header value")?;
                value.set_sensitive(true);
                let mut headers = header::HeaderMap::new();
                headers.insert(header::AUTHORIZATION, value);
                builder = builder.default_headers(headers);
                None
            }
            AuthMode::ApiKey => Some(credential.to_string()),
        };

        let client = builder
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            api_key,
        })
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }

    /// Builds the full request URL for `path`, percent-encoding every parameter value.
    pub fn endpoint_url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut pairs = Vec::with_capacity(params.len() + 1);
        if let Some(key) = &self.api_key {
            pairs.push(format!("api_key={}", urlencoding::encode(key)));
        }
        for (name, value) in params {
            pairs.push(format!("{name}={}", urlencoding::encode(value)));
        }
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        // Transport errors carry the URL, which may hold the api key.
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.without_url()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = res
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.without_url()))?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Option<T> {
        let url = self.endpoint_url(path, params);
        match self.get_json(&url).await {
            Ok(data) => {
                debug!("TMDB {} ok", path);
                Some(data)
            }
            Err(e) => {
                warn!("TMDB {} failed: {}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn trending(&self) -> Option<ResultPage> {
        self.fetch::<ResultsDto>("trending/movie/week", &[])
            .await
            .map(ResultPage::from)
    }

    async fn search(&self, query: &str) -> Option<ResultPage> {
        self.fetch::<ResultsDto>("search/movie", &[("query", query)])
            .await
            .map(ResultPage::from)
    }

    async fn movie_details(&self, id: i32) -> Option<MovieSummary> {
        self.fetch::<MovieDto>(&format!("movie/{id}"), &[])
            .await
            .map(MovieSummary::from)
    }

    async fn similar(&self, id: i32) -> Option<ResultPage> {
        self.fetch::<ResultsDto>(&format!("movie/{id}/similar"), &[])
            .await
            .map(ResultPage::from)
    }

    async fn cast(&self, id: i32) -> Option<Vec<CastMember>> {
        self.fetch::<CreditsDto>(&format!("movie/{id}/credits"), &[])
            .await
            .map(top_cast)
    }
}

/// TMDB sends explicit `null` for plenty of fields; treat it like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ResultsDto {
    #[serde(default, deserialize_with = "null_as_default")]
    results: Vec<MovieDto>,
}

#[derive(Debug, Deserialize)]
struct MovieDto {
    #[serde(default, deserialize_with = "null_as_default")]
    id: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    overview: String,
    #[serde(default, deserialize_with = "null_as_default")]
    release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    poster_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    vote_count: i64,
    #[serde(default)]
    runtime: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    genres: Vec<GenreDto>,
    #[serde(default, deserialize_with = "null_as_default")]
    popularity: f64,
}

#[derive(Debug, Deserialize)]
struct GenreDto {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreditsDto {
    #[serde(default, deserialize_with = "null_as_default")]
    cast: Vec<CastDto>,
}

#[derive(Debug, Deserialize)]
struct CastDto {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    character: String,
    #[serde(default)]
    profile_path: Option<String>,
}

impl From<MovieDto> for MovieSummary {
    fn from(dto: MovieDto) -> Self {
        MovieSummary {
            id: dto.id,
            title: dto.title,
            overview: dto.overview,
            release_date: dto.release_date,
            poster_path: dto.poster_path,
            vote_average: dto.vote_average,
            vote_count: dto.vote_count,
            runtime: dto.runtime,
            genres: dto.genres.into_iter().map(|g| g.name).collect(),
            popularity: dto.popularity,
        }
    }
}

impl From<ResultsDto> for ResultPage {
    fn from(dto: ResultsDto) -> Self {
        ResultPage {
            results: dto.results.into_iter().map(MovieSummary::from).collect(),
        }
    }
}

impl From<CastDto> for CastMember {
    fn from(dto: CastDto) -> Self {
        CastMember {
            name: dto.name,
            character: dto.character,
            profile_path: dto.profile_path.filter(|p| !p.is_empty()),
        }
    }
}

fn top_cast(credits: CreditsDto) -> Vec<CastMember> {
    credits
        .cast
        .into_iter()
        .take(MAX_CAST)
        .map(CastMember::from)
        .collect()
}
