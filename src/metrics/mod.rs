// metrics/mod.rs
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn setup_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to setup metrics: {}", e))?;

    metrics::describe_counter!("homestrip_operations_total", "Operations run by the device worker");
    metrics::describe_counter!("homestrip_dispatch_total", "Corrective commands sent to the strip");
    metrics::describe_counter!(
        "homestrip_dispatch_failures_total",
        "Corrective commands the strip did not accept"
    );
    metrics::describe_counter!("homestrip_poll_failures_total", "Status polls that failed or timed out");
    metrics::describe_counter!(
        "homestrip_queue_rejections_total",
        "Operations rejected because the backlog was full"
    );
    Ok(())
}
