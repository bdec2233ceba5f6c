use sqlparser::ast::{self, Expr, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertCustomer {
        id: Ulid,
        full_name: String,
        phone: String,
        email: Option<String>,
    },
    InsertTable {
        id: Ulid,
        code: String,
        capacity: u32,
        active: bool,
    },
    SetTableActive {
        id: Ulid,
        active: bool,
    },
    InsertReservation {
        id: Ulid,
        customer_id: Ulid,
        start_at: Ms,
        end_at: Option<Ms>,
        party_size: u32,
        status: Option<ReservationStatus>,
        notes: Option<String>,
        /// None means auto-assign.
        table_ids: Option<Vec<Ulid>>,
    },
    SetReservationStatus {
        id: Ulid,
        status: ReservationStatus,
        reason: Option<String>,
    },
    ReassignTables {
        id: Ulid,
        table_ids: Vec<Ulid>,
    },
    SelectCustomers,
    SelectTables,
    SelectAvailableTables {
        start: Ms,
        end: Option<Ms>,
    },
    SelectReservations {
        start: Option<Ms>,
        end: Option<Ms>,
        status: Option<ReservationStatus>,
    },
    SelectReservationTables {
        reservation_id: Ulid,
    },
    Listen {
        channel: String,
    },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim();
    if trimmed.to_uppercase().starts_with("LISTEN ") {
        let channel = trimmed[7..].trim().trim_matches(';').to_string();
        return Ok(Command::Listen { channel });
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "customers" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("customers", 3, values.len()));
            }
            let email = if values.len() >= 4 {
                parse_string_or_null(&values[3])?
            } else {
                None
            };
            Ok(Command::InsertCustomer {
                id: parse_ulid_expr(&values[0])?,
                full_name: parse_string(&values[1])?,
                phone: parse_string(&values[2])?,
                email,
            })
        }
        "tables" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("tables", 3, values.len()));
            }
            let active = if values.len() >= 4 {
                parse_bool(&values[3])?
            } else {
                true
            };
            Ok(Command::InsertTable {
                id: parse_ulid_expr(&values[0])?,
                code: parse_string(&values[1])?,
                capacity: parse_u32(&values[2])?,
                active,
            })
        }
        "reservations" => {
            if values.len() < 5 {
                return Err(SqlError::WrongArity("reservations", 5, values.len()));
            }
            let status = if values.len() >= 6 {
                parse_status_or_null(&values[5])?
            } else {
                None
            };
            let notes = if values.len() >= 7 {
                parse_string_or_null(&values[6])?
            } else {
                None
            };
            let table_ids = if values.len() >= 8 {
                parse_ulid_list_or_null(&values[7])?
            } else {
                None
            };
            Ok(Command::InsertReservation {
                id: parse_ulid_expr(&values[0])?,
                customer_id: parse_ulid_expr(&values[1])?,
                start_at: parse_ms_expr(&values[2])?,
                end_at: parse_ms_or_null(&values[3])?,
                party_size: parse_u32(&values[4])?,
                status,
                notes,
                table_ids,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    let id = extract_where_id(selection, "id")?;

    match table.as_str() {
        "tables" => {
            let active = assignments
                .iter()
                .find(|a| assignment_column(a).as_deref() == Some("active"))
                .ok_or(SqlError::Unsupported("UPDATE tables only supports active".into()))?;
            Ok(Command::SetTableActive {
                id,
                active: parse_bool(&active.value)?,
            })
        }
        "reservations" => {
            let mut status = None;
            let mut reason = None;
            let mut table_ids = None;
            for a in assignments {
                match assignment_column(a).as_deref() {
                    Some("status") => status = Some(parse_status(&a.value)?),
                    Some("cancellation_reason") => reason = parse_string_or_null(&a.value)?,
                    Some("table_ids") => {
                        table_ids = Some(parse_ulid_list(&a.value)?);
                    }
                    Some(col) => {
                        return Err(SqlError::Unsupported(format!(
                            "cannot update reservations.{col}"
                        )));
                    }
                    None => return Err(SqlError::Parse("bad assignment target".into())),
                }
            }
            match (status, table_ids) {
                (Some(status), None) => Ok(Command::SetReservationStatus { id, status, reason }),
                (None, Some(table_ids)) => Ok(Command::ReassignTables { id, table_ids }),
                (Some(_), Some(_)) => Err(SqlError::Unsupported(
                    "cannot change status and table_ids in one statement".into(),
                )),
                (None, None) => Err(SqlError::MissingFilter("status or table_ids")),
            }
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "customers" => Ok(Command::SelectCustomers),
        "tables" => Ok(Command::SelectTables),
        "available_tables" => {
            let mut filters = WindowFilters::default();
            if let Some(selection) = &select.selection {
                extract_window_filters(selection, &mut filters)?;
            }
            Ok(Command::SelectAvailableTables {
                start: filters.start.ok_or(SqlError::MissingFilter("start_at"))?,
                end: filters.end,
            })
        }
        "reservations" => {
            let mut filters = WindowFilters::default();
            if let Some(selection) = &select.selection {
                extract_window_filters(selection, &mut filters)?;
            }
            Ok(Command::SelectReservations {
                start: filters.start,
                end: filters.end,
                status: filters.status,
            })
        }
        "reservation_tables" => {
            let reservation_id = extract_where_id(&select.selection, "reservation_id")?;
            Ok(Command::SelectReservationTables { reservation_id })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

#[derive(Default)]
struct WindowFilters {
    start: Option<Ms>,
    end: Option<Ms>,
    status: Option<ReservationStatus>,
}

fn extract_window_filters(expr: &Expr, filters: &mut WindowFilters) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                extract_window_filters(left, filters)?;
                extract_window_filters(right, filters)?;
            }
            ast::BinaryOperator::GtEq => {
                if expr_column_name(left).as_deref() == Some("start_at") {
                    filters.start = Some(parse_ms_expr(right)?);
                }
            }
            ast::BinaryOperator::LtEq => {
                if expr_column_name(left).as_deref() == Some("end_at") {
                    filters.end = Some(parse_ms_expr(right)?);
                }
            }
            ast::BinaryOperator::Eq => {
                if expr_column_name(left).as_deref() == Some("status") {
                    filters.status = Some(parse_status(right)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn assignment_column(a: &ast::Assignment) -> Option<String> {
    match &a.target {
        ast::AssignmentTarget::ColumnName(name) => object_name_last(name),
        _ => None,
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            Ok(values.rows[0].clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>, column: &'static str) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter(column))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some(column) {
                parse_ulid_expr(right)
            } else {
                Err(SqlError::MissingFilter(column))
            }
        }
        _ => Err(SqlError::MissingFilter(column)),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid_expr(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

/// Comma-separated ULID list in a single quoted string.
fn parse_ulid_list(expr: &Expr) -> Result<Vec<Ulid>, SqlError> {
    let value = extract_value(expr)
        .ok_or_else(|| SqlError::Parse(format!("expected value, got {expr:?}")))?;
    match value {
        Value::SingleQuotedString(s) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Ulid::from_string(p).map_err(|e| SqlError::Parse(format!("bad ULID: {e}"))))
            .collect(),
        _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
    }
}

fn parse_ulid_list_or_null(expr: &Expr) -> Result<Option<Vec<Ulid>>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => Ok(Some(parse_ulid_list(expr)?)),
    }
}

/// Timestamp in epoch milliseconds, or a quoted RFC 3339 string.
fn parse_ms_expr(expr: &Expr) -> Result<Ms, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad timestamp: {e}"))),
            Value::SingleQuotedString(s) => {
                if let Ok(n) = s.parse() {
                    return Ok(n);
                }
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.timestamp_millis())
                    .map_err(|e| SqlError::Parse(format!("bad timestamp '{s}': {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected timestamp, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_ms_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_ms_or_null(expr: &Expr) -> Result<Option<Ms>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => Ok(Some(parse_ms_expr(expr)?)),
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => Ok(s.clone()),
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => Ok(Some(parse_string(expr)?)),
    }
}

fn parse_status(expr: &Expr) -> Result<ReservationStatus, SqlError> {
    let s = parse_string(expr)?;
    ReservationStatus::parse(&s).ok_or_else(|| SqlError::Parse(format!("bad status: {s}")))
}

fn parse_status_or_null(expr: &Expr) -> Result<Option<ReservationStatus>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => Ok(Some(parse_status(expr)?)),
    }
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_ms_expr(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
            },
            Value::Number(n, _) => Ok(n != "0"),
            _ => Err(SqlError::Parse(format!("expected bool, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    const U: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    #[test]
    fn parse_insert_customer() {
        let sql = format!(
            "INSERT INTO customers (id, full_name, phone) VALUES ('{U}', 'Ada Marchetti', '+1-555-0100')"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertCustomer {
                id,
                full_name,
                phone,
                email,
            } => {
                assert_eq!(id.to_string(), U);
                assert_eq!(full_name, "Ada Marchetti");
                assert_eq!(phone, "+1-555-0100");
                assert_eq!(email, None);
            }
            _ => panic!("expected InsertCustomer, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_customer_with_email() {
        let sql = format!(
            "INSERT INTO customers (id, full_name, phone, email) VALUES ('{U}', 'Ada', '+1', 'ada@example.com')"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertCustomer { email, .. } => {
                assert_eq!(email.as_deref(), Some("ada@example.com"));
            }
            cmd => panic!("expected InsertCustomer, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_table_defaults_active() {
        let sql = format!("INSERT INTO tables (id, code, capacity) VALUES ('{U}', 'T1', 4)");
        match parse_sql(&sql).unwrap() {
            Command::InsertTable {
                code,
                capacity,
                active,
                ..
            } => {
                assert_eq!(code, "T1");
                assert_eq!(capacity, 4);
                assert!(active);
            }
            cmd => panic!("expected InsertTable, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_table_active() {
        let sql = format!("UPDATE tables SET active = false WHERE id = '{U}'");
        match parse_sql(&sql).unwrap() {
            Command::SetTableActive { id, active } => {
                assert_eq!(id.to_string(), U);
                assert!(!active);
            }
            cmd => panic!("expected SetTableActive, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_reservation_minimal() {
        let sql = format!(
            "INSERT INTO reservations (id, customer_id, start_at, end_at, party_size) VALUES ('{U}', '{U}', 1000, NULL, 4)"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertReservation {
                start_at,
                end_at,
                party_size,
                status,
                notes,
                table_ids,
                ..
            } => {
                assert_eq!(start_at, 1000);
                assert_eq!(end_at, None);
                assert_eq!(party_size, 4);
                assert_eq!(status, None);
                assert_eq!(notes, None);
                assert_eq!(table_ids, None);
            }
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_reservation_full() {
        let sql = format!(
            "INSERT INTO reservations (id, customer_id, start_at, end_at, party_size, status, notes, table_ids) \
             VALUES ('{U}', '{U}', 1000, 2000, 4, 'CONFIRMED', 'window seat', '{U},{U}')"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertReservation {
                end_at,
                status,
                notes,
                table_ids,
                ..
            } => {
                assert_eq!(end_at, Some(2000));
                assert_eq!(status, Some(ReservationStatus::Confirmed));
                assert_eq!(notes.as_deref(), Some("window seat"));
                assert_eq!(table_ids.unwrap().len(), 2);
            }
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_reservation_iso_timestamps() {
        let sql = format!(
            "INSERT INTO reservations (id, customer_id, start_at, end_at, party_size) \
             VALUES ('{U}', '{U}', '2026-03-14T20:00:00Z', NULL, 2)"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertReservation { start_at, .. } => {
                assert_eq!(start_at, 1773518400000);
            }
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_reservation_status() {
        let sql = format!("UPDATE reservations SET status = 'CONFIRMED' WHERE id = '{U}'");
        match parse_sql(&sql).unwrap() {
            Command::SetReservationStatus { status, reason, .. } => {
                assert_eq!(status, ReservationStatus::Confirmed);
                assert_eq!(reason, None);
            }
            cmd => panic!("expected SetReservationStatus, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_reservation_cancel_with_reason() {
        let sql = format!(
            "UPDATE reservations SET status = 'CANCELLED', cancellation_reason = 'storm' WHERE id = '{U}'"
        );
        match parse_sql(&sql).unwrap() {
            Command::SetReservationStatus { status, reason, .. } => {
                assert_eq!(status, ReservationStatus::Cancelled);
                assert_eq!(reason.as_deref(), Some("storm"));
            }
            cmd => panic!("expected SetReservationStatus, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_reservation_tables() {
        let sql = format!("UPDATE reservations SET table_ids = '{U}' WHERE id = '{U}'");
        match parse_sql(&sql).unwrap() {
            Command::ReassignTables { table_ids, .. } => {
                assert_eq!(table_ids.len(), 1);
            }
            cmd => panic!("expected ReassignTables, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_customers_and_tables() {
        assert_eq!(
            parse_sql("SELECT * FROM customers").unwrap(),
            Command::SelectCustomers
        );
        assert_eq!(
            parse_sql("SELECT * FROM tables").unwrap(),
            Command::SelectTables
        );
    }

    #[test]
    fn parse_select_available_tables() {
        let sql = "SELECT * FROM available_tables WHERE start_at >= 1000 AND end_at <= 2000";
        match parse_sql(sql).unwrap() {
            Command::SelectAvailableTables { start, end } => {
                assert_eq!(start, 1000);
                assert_eq!(end, Some(2000));
            }
            cmd => panic!("expected SelectAvailableTables, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_available_tables_requires_start() {
        let sql = "SELECT * FROM available_tables WHERE end_at <= 2000";
        assert!(matches!(
            parse_sql(sql),
            Err(SqlError::MissingFilter("start_at"))
        ));
    }

    #[test]
    fn parse_select_reservations_with_filters() {
        let sql =
            "SELECT * FROM reservations WHERE start_at >= 1000 AND end_at <= 2000 AND status = 'PENDING'";
        match parse_sql(sql).unwrap() {
            Command::SelectReservations { start, end, status } => {
                assert_eq!(start, Some(1000));
                assert_eq!(end, Some(2000));
                assert_eq!(status, Some(ReservationStatus::Pending));
            }
            cmd => panic!("expected SelectReservations, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_reservations_unfiltered() {
        match parse_sql("SELECT * FROM reservations").unwrap() {
            Command::SelectReservations { start, end, status } => {
                assert_eq!(start, None);
                assert_eq!(end, None);
                assert_eq!(status, None);
            }
            cmd => panic!("expected SelectReservations, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_reservation_tables() {
        let sql = format!("SELECT * FROM reservation_tables WHERE reservation_id = '{U}'");
        match parse_sql(&sql).unwrap() {
            Command::SelectReservationTables { reservation_id } => {
                assert_eq!(reservation_id.to_string(), U);
            }
            cmd => panic!("expected SelectReservationTables, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_listen() {
        let sql = format!("LISTEN table_{U}");
        match parse_sql(&sql).unwrap() {
            Command::Listen { channel } => {
                assert_eq!(channel, format!("table_{U}"));
            }
            cmd => panic!("expected Listen, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_unknown_table_errors() {
        let sql = format!("INSERT INTO foobar (id) VALUES ('{U}')");
        assert!(parse_sql(&sql).is_err());
    }

    #[test]
    fn parse_bad_status_errors() {
        let sql = format!("UPDATE reservations SET status = 'SEATED' WHERE id = '{U}'");
        assert!(parse_sql(&sql).is_err());
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }
}
