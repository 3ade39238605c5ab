pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod identity;
pub mod movies;
pub mod tmdb;
pub mod views;
