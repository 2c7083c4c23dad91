//! Discord integration for stickler.
//!
//! [`platform::DiscordPlatform`] implements the engine's chat platform over
//! serenity's REST client, [`handler::StickerHandler`] feeds gateway events
//! to the sticky service, and [`bot::run`] drives the gateway connection.

pub mod bot;
pub mod commands;
pub mod error;
pub mod handler;
pub mod payload;
pub mod platform;

pub use {
    error::{Error, Result},
    handler::StickerHandler,
    platform::DiscordPlatform,
};
