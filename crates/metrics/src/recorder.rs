//! Metrics recorder initialization and configuration.

use tracing::info;

use crate::Result;

/// Handle to the metrics system, providing access to exported metrics.
#[derive(Clone, Default)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format.
    ///
    /// Empty when metrics are disabled or served by the HTTP listener.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle
                .as_ref()
                .map(metrics_exporter_prometheus::PrometheusHandle::render)
                .unwrap_or_default()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Serve a Prometheus scrape endpoint on this address
    pub listen: Option<String>,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup, from inside a tokio runtime when `listen` is set.
/// Without the `prometheus` feature every metric is discarded by the facade's
/// no-op recorder.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle::default());
    }

    #[cfg(feature = "prometheus")]
    {
        init_prometheus(config)
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics feature not enabled at compile time");
        Ok(MetricsHandle {})
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Suffix("_duration_seconds".to_string()),
        crate::buckets::PLATFORM_DURATION,
    )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    match config.listen {
        Some(listen) => {
            let addr: std::net::SocketAddr = listen
                .parse()
                .map_err(|_| crate::Error::invalid_listen_address(&listen))?;
            builder.with_http_listener(addr).install()?;
            info!(%addr, "prometheus scrape endpoint listening");
            Ok(MetricsHandle {
                prometheus_handle: None,
            })
        },
        None => {
            let handle = builder.install_recorder()?;
            info!("prometheus metrics recorder installed");
            Ok(MetricsHandle {
                prometheus_handle: Some(handle),
            })
        },
    }
}
