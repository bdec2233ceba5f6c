use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "maitred_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "maitred_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "maitred_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "maitred_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "maitred_connections_rejected_total";

/// Gauge: number of active venues (loaded engines).
pub const VENUES_ACTIVE: &str = "maitred_venues_active";

/// Counter: startup/auth failures.
pub const AUTH_FAILURES_TOTAL: &str = "maitred_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "maitred_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "maitred_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertCustomer { .. } => "insert_customer",
        Command::InsertTable { .. } => "insert_table",
        Command::SetTableActive { .. } => "set_table_active",
        Command::InsertReservation { .. } => "insert_reservation",
        Command::SetReservationStatus { .. } => "set_reservation_status",
        Command::ReassignTables { .. } => "reassign_tables",
        Command::SelectCustomers => "select_customers",
        Command::SelectTables => "select_tables",
        Command::SelectAvailableTables { .. } => "select_available_tables",
        Command::SelectReservations { .. } => "select_reservations",
        Command::SelectReservationTables { .. } => "select_reservation_tables",
        Command::Listen { .. } => "listen",
    }
}
