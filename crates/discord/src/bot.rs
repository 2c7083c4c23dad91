//! Serenity client lifecycle.

use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    serenity::{Client, http::Http},
    stickler_sticky::StickyService,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{Error, Result, handler::StickerHandler};

fn token_str(token: &Secret<String>) -> Result<&str> {
    let raw = token.expose_secret().trim();
    if raw.is_empty() {
        return Err(Error::message("discord token is not configured"));
    }
    Ok(raw)
}

/// REST client for the engine's platform calls, separate from the gateway.
pub fn http_client(token: &Secret<String>) -> Result<Arc<Http>> {
    Ok(Arc::new(Http::new(token_str(token)?)))
}

/// Connect to the gateway and process events until `cancel` fires.
pub async fn run(
    token: &Secret<String>,
    service: Arc<StickyService>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut client = Client::builder(token_str(token)?, StickerHandler::intents())
        .event_handler(StickerHandler::new(service))
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        cancel.cancelled().await;
        info!("shutting down discord gateway");
        shard_manager.shutdown_all().await;
    });

    info!("connecting to discord gateway");
    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_rejected() {
        let token = Secret::new("   ".to_string());
        assert!(matches!(http_client(&token), Err(Error::Message { .. })));
    }
}
