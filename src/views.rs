//! Server-side HTML. Every interpolated value goes through [`escape`].

use crate::auth::CurrentUser;
use crate::tmdb::{CastMember, MovieSummary};

pub struct ListingView {
    pub title: String,
    pub movies: Vec<MovieSummary>,
    pub message: Option<String>,
    pub query: String,
    pub page: u32,
    /// Only the trending listing has more pages to append.
    pub load_more: bool,
}

pub struct DetailsView {
    pub movie: MovieSummary,
    pub cast: Vec<CastMember>,
    pub similar: Vec<MovieSummary>,
}

pub struct AdminMoviesView {
    pub movies: Vec<MovieSummary>,
    pub warning: Option<String>,
}

/// Escapes text for element content and double-quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&CurrentUser>, body: &str) -> String {
    let nav = match user {
        Some(user) => {
            let admin_link = if user.is_admin() {
                r#"<a href="/admin">Admin</a>"#
            } else {
                ""
            };
            format!(
                r#"<a href="/movies">Movies</a>{admin_link}<span class="user">{}</span><form method="post" action="/logout" class="inline"><button type="submit">Log out</button></form>"#,
                escape(&user.email)
            )
        }
        None => r#"<a href="/login">Log in</a><a href="/register">Register</a>"#.to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="dark-mode">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{} - CineScope</title>
</head>
<body>
<header><a class="brand" href="/movies">CineScope</a><nav>{nav}</nav></header>
<main>
{body}
</main>
</body>
</html>
"#,
        escape(title)
    )
}

fn alert(class: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<div class="alert alert-{class}">{}</div>"#, escape(m)))
        .unwrap_or_default()
}

fn poster(movie: &MovieSummary) -> String {
    match movie.poster_url() {
        Some(url) => format!(
            r#"<img class="poster" src="{}" alt="{}" loading="lazy">"#,
            escape(&url),
            escape(&movie.title)
        ),
        None => r#"<div class="poster placeholder">No image</div>"#.to_string(),
    }
}

fn movie_card(movie: &MovieSummary) -> String {
    let year = movie
        .year()
        .map(|y| format!(r#"<span class="year">{y}</span>"#))
        .unwrap_or_default();
    format!(
        r#"<div class="movie-card-wrap"><a class="movie-card" href="/movies/{}">{}<h3>{}</h3>{year}<span class="rating">&#9733; {:.1}</span></a></div>"#,
        movie.id,
        poster(movie),
        escape(&movie.title),
        movie.vote_average
    )
}

/// Card fragment; also served on its own for the client-side "load more".
pub fn movie_grid(movies: &[MovieSummary], page: u32) -> String {
    let cards: String = movies.iter().map(movie_card).collect();
    format!(r#"<div class="movie-cards" data-page="{page}">{cards}</div>"#)
}

fn load_more_controls(view: &ListingView) -> &'static str {
    if view.load_more && !view.movies.is_empty() {
        r#"<div id="loading-indicator" style="display:none">Loading...</div>
<button id="load-more" type="button" data-source="/movies/trending">Load more</button>"#
    } else {
        ""
    }
}

pub fn listing_page(view: &ListingView, user: &CurrentUser) -> String {
    let body = format!(
        r#"<h1>{}</h1>
<form class="search" method="get" action="/movies/search"><input type="search" name="query" value="{}" placeholder="Search movies"><button type="submit">Search</button></form>
{}
<div id="movies-container" data-page="{}">{}</div>
{}"#,
        escape(&view.title),
        escape(&view.query),
        alert("warning", view.message.as_deref()),
        view.page,
        movie_grid(&view.movies, view.page),
        load_more_controls(view)
    );
    layout(&view.title, Some(user), &body)
}

pub fn details_page(view: &DetailsView, user: &CurrentUser) -> String {
    let movie = &view.movie;
    let runtime = movie
        .runtime
        .filter(|r| *r > 0)
        .map(|r| format!("<li>Runtime: {r} min</li>"))
        .unwrap_or_default();
    let release = if movie.release_date.is_empty() {
        String::new()
    } else {
        format!("<li>Released: {}</li>", escape(&movie.release_date))
    };
    let genres: String = movie
        .genres
        .iter()
        .map(|g| format!(r#"<span class="genre">{}</span>"#, escape(g)))
        .collect();

    let cast = if view.cast.is_empty() {
        r#"<p class="empty">No cast information available.</p>"#.to_string()
    } else {
        let members: String = view
            .cast
            .iter()
            .map(|c| {
                let photo = c
                    .profile_url()
                    .map(|url| format!(r#"<img src="{}" alt="{}">"#, escape(&url), escape(&c.name)))
                    .unwrap_or_default();
                format!(
                    r#"<li class="cast-member">{photo}<strong>{}</strong><span>{}</span></li>"#,
                    escape(&c.name),
                    escape(&c.character)
                )
            })
            .collect();
        format!(r#"<ul class="cast">{members}</ul>"#)
    };

    let similar = if view.similar.is_empty() {
        r#"<p class="empty">No similar movies found.</p>"#.to_string()
    } else {
        movie_grid(&view.similar, 1)
    };

    let body = format!(
        r#"<article class="movie-details">
{}
<div class="info">
<h1>{}</h1>
<ul class="facts">{release}{runtime}<li>Rating: {:.1}/10 ({} votes)</li></ul>
<div class="genres">{genres}</div>
<p class="overview">{}</p>
</div>
</article>
<section><h2>Cast</h2>{cast}</section>
<section><h2>Similar movies</h2>{similar}</section>"#,
        poster(movie),
        escape(&movie.title),
        movie.vote_average,
        movie.vote_count,
        escape(&movie.overview)
    );
    layout(&movie.title, Some(user), &body)
}

pub fn not_found_page(user: Option<&CurrentUser>) -> String {
    layout(
        "Not found",
        user,
        r#"<h1>Not found</h1><p>The page or movie you asked for does not exist.</p><a href="/movies">Back to movies</a>"#,
    )
}

pub fn forbidden_page(user: &CurrentUser) -> String {
    layout(
        "Access denied",
        Some(user),
        "<h1>Access denied</h1><p>You do not have access to this resource.</p>",
    )
}

pub fn admin_index(user: &CurrentUser) -> String {
    layout(
        "Admin",
        Some(user),
        r#"<h1>Admin dashboard</h1><ul><li><a href="/admin/movies">Manage movies</a></li></ul>"#,
    )
}

pub fn admin_movies_page(view: &AdminMoviesView, user: &CurrentUser) -> String {
    let rows: String = view
        .movies
        .iter()
        .map(|m| {
            format!(
                r#"<tr><td>{}</td><td><a href="/movies/{}">{}</a></td><td>{}</td><td>{:.1}</td><td>{:.1}</td></tr>"#,
                m.id,
                m.id,
                escape(&m.title),
                escape(&m.release_date),
                m.vote_average,
                m.popularity
            )
        })
        .collect();
    let body = format!(
        r#"<h1>Manage movies</h1>
{}
<table class="admin-movies"><thead><tr><th>ID</th><th>Title</th><th>Release date</th><th>Rating</th><th>Popularity</th></tr></thead><tbody>{rows}</tbody></table>"#,
        alert("warning", view.warning.as_deref())
    );
    layout("Manage movies", Some(user), &body)
}

pub fn login_page(message: Option<&str>, email: &str) -> String {
    let body = format!(
        r#"<h1>Log in</h1>
{}
<form method="post" action="/login">
<label>Email <input type="email" name="email" value="{}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>
<p><a href="/register">Register as a new user</a></p>"#,
        alert("danger", message),
        escape(email)
    );
    layout("Log in", None, &body)
}

pub fn register_page(message: Option<&str>, email: &str) -> String {
    let body = format!(
        r#"<h1>Register</h1>
{}
<form method="post" action="/register">
<label>Email <input type="email" name="email" value="{}" required></label>
<label>Password <input type="password" name="password" required></label>
<label>Confirm password <input type="password" name="confirm_password" required></label>
<button type="submit">Register</button>
</form>"#,
        alert("danger", message),
        escape(email)
    );
    layout("Register", None, &body)
}
