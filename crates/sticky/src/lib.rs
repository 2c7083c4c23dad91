//! Sticky message engine: keeps one auto-republished message at the bottom
//! of each configured channel.
//!
//! Inbound messages flow through the [`tracker::ActivityTracker`], which
//! counts them and, outside the debounce window, asks the
//! [`reconcile::Reconciler`] whether the threshold has been reached. The
//! reconciler removes the previous post, dispatches a new one via
//! [`render::Dispatcher`], and persists the new message id. A
//! [`webhook::WebhookManager`] keeps channel webhooks healthy in the
//! background. [`service::StickyService`] ties it all together.

pub mod debounce;
pub mod error;
pub mod platform;
pub mod reconcile;
pub mod render;
pub mod service;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod store_sqlite;
pub mod tracker;
pub mod types;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    error::{Error, Result},
    platform::ChatPlatform,
    service::{CommandReply, StickyService},
    store::StickyStore,
};

/// Run database migrations for the sticky crate.
///
/// Creates the `sticky_records` table. Call this at application startup
/// when sharing a pool; [`store_sqlite::SqliteStore::new`] runs it itself.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
