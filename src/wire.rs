use std::fmt::Debug;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;
use ulid::Ulid;

use crate::auth::MaitredAuthSource;
use crate::engine::{Engine, ErrorKind};
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command};
use crate::tenant::VenueManager;

pub struct MaitredHandler {
    venues: Arc<VenueManager>,
    query_parser: Arc<MaitredQueryParser>,
}

impl MaitredHandler {
    pub fn new(venues: Arc<VenueManager>) -> Self {
        Self {
            venues,
            query_parser: Arc::new(MaitredQueryParser),
        }
    }

    /// The client's "database" startup parameter names the venue.
    fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.venues.get_or_create(&db).map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("venue error: {e}"),
            )))
        })
    }

    async fn run_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        let label = observability::command_label(&cmd);
        let start = Instant::now();
        let result = self.execute_command(engine, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(start.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        match cmd {
            Command::InsertCustomer {
                id,
                full_name,
                phone,
                email,
            } => {
                engine
                    .add_customer(id, full_name, phone, email)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::InsertTable {
                id,
                code,
                capacity,
                active,
            } => {
                engine
                    .add_table(id, code, capacity, active)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::SetTableActive { id, active } => {
                let changed = engine.set_table_active(id, active).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(
                    Tag::new("UPDATE").with_rows(usize::from(changed)),
                )])
            }
            Command::InsertReservation {
                id,
                customer_id,
                start_at,
                end_at,
                party_size,
                status,
                notes,
                table_ids,
            } => {
                match table_ids {
                    Some(ids) => {
                        engine
                            .create_with_tables(
                                id, customer_id, start_at, end_at, party_size, status, notes, &ids,
                            )
                            .await
                            .map_err(engine_err)?;
                    }
                    None => {
                        engine
                            .create_auto_assign(
                                id, customer_id, start_at, end_at, party_size, status, notes,
                            )
                            .await
                            .map_err(engine_err)?;
                    }
                }
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::SetReservationStatus { id, status, reason } => {
                let changed = match status {
                    ReservationStatus::Confirmed => {
                        engine.confirm_reservation(id).await.map_err(engine_err)?
                    }
                    ReservationStatus::Cancelled => engine
                        .cancel_reservation(id, reason)
                        .await
                        .map_err(engine_err)?,
                    ReservationStatus::NoShow => {
                        engine.mark_no_show(id).await.map_err(engine_err)?
                    }
                    ReservationStatus::Pending => {
                        return Err(PgWireError::UserError(Box::new(ErrorInfo::new(
                            "ERROR".into(),
                            "P0001".into(),
                            "a reservation cannot be moved back to PENDING".into(),
                        ))));
                    }
                };
                Ok(vec![Response::Execution(
                    Tag::new("UPDATE").with_rows(usize::from(changed)),
                )])
            }
            Command::ReassignTables { id, table_ids } => {
                engine
                    .reassign_tables(id, &table_ids)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::SelectCustomers => {
                let customers = engine.list_customers();
                let schema = Arc::new(customers_schema());
                let rows: Vec<PgWireResult<_>> = customers
                    .into_iter()
                    .map(|c| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&c.id.to_string())?;
                        encoder.encode_field(&c.full_name)?;
                        encoder.encode_field(&c.phone)?;
                        encoder.encode_field(&c.email)?;
                        encoder.encode_field(&c.created_at)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectTables => {
                let tables = engine.list_tables().await;
                let schema = Arc::new(tables_schema());
                let rows: Vec<PgWireResult<_>> = tables
                    .into_iter()
                    .map(|t| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&t.id.to_string())?;
                        encoder.encode_field(&t.code)?;
                        encoder.encode_field(&(t.capacity as i32))?;
                        encoder.encode_field(&t.active)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectAvailableTables { start, end } => {
                // Reject inverted windows here; Span construction requires start < end.
                if end.is_some_and(|e| e <= start) {
                    return Err(engine_err(crate::engine::EngineError::InvalidInput(
                        "end must be after start",
                    )));
                }
                let window = effective_window(start, end);
                let tables = engine
                    .list_available_tables(&window)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(available_tables_schema());
                let rows: Vec<PgWireResult<_>> = tables
                    .into_iter()
                    .map(|t| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&t.id.to_string())?;
                        encoder.encode_field(&t.code)?;
                        encoder.encode_field(&(t.capacity as i32))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectReservations { start, end, status } => {
                if let (Some(s), Some(e)) = (start, end) {
                    if e <= s {
                        return Err(engine_err(crate::engine::EngineError::InvalidInput(
                            "end must be after start",
                        )));
                    }
                }
                let window = match (start, end) {
                    (Some(s), Some(e)) => Some(Span::new(s, e)),
                    (Some(s), None) => Some(Span::new(s, Ms::MAX)),
                    (None, Some(e)) => Some(Span::new(Ms::MIN, e)),
                    (None, None) => None,
                };
                let reservations = engine.list_reservations(window.as_ref(), status).await;
                let schema = Arc::new(reservations_schema());
                let rows: Vec<PgWireResult<_>> = reservations
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id.to_string())?;
                        encoder.encode_field(&r.customer_id.to_string())?;
                        encoder.encode_field(&r.customer_name)?;
                        encoder.encode_field(&r.start_at)?;
                        encoder.encode_field(&r.end_at)?;
                        encoder.encode_field(&(r.party_size as i32))?;
                        encoder.encode_field(&r.status.as_str())?;
                        encoder.encode_field(&r.notes)?;
                        encoder.encode_field(&r.cancellation_reason)?;
                        encoder.encode_field(&r.table_codes.join(","))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::SelectReservationTables { reservation_id } => {
                let pairs = engine
                    .reservation_tables(reservation_id)
                    .await
                    .map_err(engine_err)?;
                let schema = Arc::new(reservation_tables_schema());
                let rid = reservation_id.to_string();
                let rows: Vec<PgWireResult<_>> = pairs
                    .into_iter()
                    .map(|(tid, code)| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&rid)?;
                        encoder.encode_field(&tid.to_string())?;
                        encoder.encode_field(&code)?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
            Command::Listen { channel } => {
                let table_id_str = channel.strip_prefix("table_").ok_or_else(|| {
                    PgWireError::UserError(Box::new(ErrorInfo::new(
                        "ERROR".into(),
                        "42000".into(),
                        format!("invalid channel: {channel} (expected table_{{id}})"),
                    )))
                })?;
                let _table_id = Ulid::from_string(table_id_str).map_err(|e| {
                    PgWireError::UserError(Box::new(ErrorInfo::new(
                        "ERROR".into(),
                        "42000".into(),
                        format!("bad ULID in channel: {e}"),
                    )))
                })?;
                Ok(vec![Response::Execution(Tag::new("LISTEN"))])
            }
        }
    }
}

fn customers_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("full_name".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("phone".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("email".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("created_at".into(), None, None, Type::INT8, FieldFormat::Text),
    ]
}

fn tables_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("code".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("capacity".into(), None, None, Type::INT4, FieldFormat::Text),
        FieldInfo::new("active".into(), None, None, Type::BOOL, FieldFormat::Text),
    ]
}

fn available_tables_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("code".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("capacity".into(), None, None, Type::INT4, FieldFormat::Text),
    ]
}

fn reservations_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("customer_id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("customer_name".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("start_at".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new("end_at".into(), None, None, Type::INT8, FieldFormat::Text),
        FieldInfo::new("party_size".into(), None, None, Type::INT4, FieldFormat::Text),
        FieldInfo::new("status".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("notes".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "cancellation_reason".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new("table_codes".into(), None, None, Type::VARCHAR, FieldFormat::Text),
    ]
}

fn reservation_tables_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new(
            "reservation_id".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new("table_id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new("table_code".into(), None, None, Type::VARCHAR, FieldFormat::Text),
    ]
}

/// Schema for a statement, going by the table it selects from.
fn statement_schema(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    if !upper.contains("SELECT") {
        return vec![];
    }
    if upper.contains("RESERVATION_TABLES") {
        reservation_tables_schema()
    } else if upper.contains("AVAILABLE_TABLES") {
        available_tables_schema()
    } else if upper.contains("RESERVATIONS") {
        reservations_schema()
    } else if upper.contains("CUSTOMERS") {
        customers_schema()
    } else if upper.contains("TABLES") {
        tables_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for MaitredHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.run_command(&engine, cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct MaitredQueryParser;

#[async_trait]
impl QueryParser for MaitredQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(statement_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for MaitredHandler {
    type Statement = String;
    type QueryParser = MaitredQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.run_command(&engine, cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            statement_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(statement_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    if n > max {
                        max = n;
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct MaitredFactory {
    handler: Arc<MaitredHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<MaitredAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl MaitredFactory {
    pub fn new(venues: Arc<VenueManager>, password: String) -> Self {
        let auth_source = MaitredAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(MaitredHandler::new(venues)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for MaitredFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection to completion.
pub async fn process_connection(
    socket: TcpStream,
    venues: Arc<VenueManager>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> io::Result<()> {
    let factory = MaitredFactory::new(venues, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

fn engine_err(e: crate::engine::EngineError) -> PgWireError {
    let code = match e.kind() {
        ErrorKind::InvalidInput => "22023",
        ErrorKind::NotFound => "P0002",
        ErrorKind::Conflict => "P0001",
        ErrorKind::Unexpected => "XX000",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
