//! Fetch TMDB data through the app's client and print the mapped view models.
//! Usage:
//!   cargo run --bin tmdb_props -- trending
//!   cargo run --bin tmdb_props -- search <query>
//!   cargo run --bin tmdb_props -- movie <tmdb_id>
//!   cargo run --bin tmdb_props -- similar <tmdb_id>
//!   cargo run --bin tmdb_props -- cast <tmdb_id>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{anyhow, bail, Context, Result};
use cinescope::tmdb::{TmdbApi, TmdbClient};
use dotenvy::dotenv;
use serde::Serialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Trending,
    Search,
    Movie,
    Similar,
    Cast,
}

impl FromStr for Command {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trending" => Ok(Command::Trending),
            "search" => Ok(Command::Search),
            "movie" => Ok(Command::Movie),
            "similar" => Ok(Command::Similar),
            "cast" => Ok(Command::Cast),
            _ => Err(anyhow!(
                "command must be one of: trending, search, movie, similar, cast"
            )),
        }
    }
}

fn print_json<T: Serialize>(value: Option<T>) -> Result<()> {
    let value = value.ok_or_else(|| anyhow!("TMDB returned no data"))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn parse_id(arg: Option<&String>) -> Result<i32> {
    arg.context("missing <tmdb_id>")?
        .parse()
        .context("tmdb_id must be an integer")
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("usage: tmdb_props <trending|search <query>|movie <id>|similar <id>|cast <id>>");
    };
    let command: Command = command.parse()?;

    let client = TmdbClient::from_env()?;
    eprintln!("Using {} authentication", client.auth_mode());

    match command {
        Command::Trending => print_json(client.trending().await),
        Command::Search => {
            let query = args[1..].join(" ");
            if query.trim().is_empty() {
                bail!("missing <query>");
            }
            print_json(client.search(&query).await)
        }
        Command::Movie => print_json(client.movie_details(parse_id(args.get(1))?).await),
        Command::Similar => print_json(client.similar(parse_id(args.get(1))?).await),
        Command::Cast => print_json(client.cast(parse_id(args.get(1))?).await),
    }
}
