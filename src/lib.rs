pub mod app;
pub mod backend;
pub mod banner;
pub mod characters;
pub mod chat;
pub mod commands;
pub mod config;
pub mod consts;
pub mod events;
pub mod logging;
pub mod route;
pub mod spinner;
pub mod story;
