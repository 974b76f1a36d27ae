//! Conversions from external infrastructure errors into domain errors.

use focusledger_domain::LedgerError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LedgerError);

impl From<InfraError> for LedgerError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LedgerError> for InfraError {
    fn from(value: LedgerError) -> Self {
        InfraError(value)
    }
}

trait IntoLedgerError {
    fn into_ledger(self) -> LedgerError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → LedgerError */
/* -------------------------------------------------------------------------- */

impl IntoLedgerError for SqlError {
    fn into_ledger(self) -> LedgerError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => LedgerError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        LedgerError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        LedgerError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        LedgerError::Database("foreign key constraint violation".into())
                    }
                    (ErrorCode::CannotOpen, _) => {
                        LedgerError::Config(format!("cannot open database file: {message}"))
                    }
                    _ => LedgerError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => LedgerError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                LedgerError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                LedgerError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => LedgerError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => LedgerError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_ledger())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → LedgerError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(LedgerError::Database(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → LedgerError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(LedgerError::Internal(format!("json encoding: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* tokio JoinError → LedgerError */
/* -------------------------------------------------------------------------- */

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        if value.is_cancelled() {
            InfraError(LedgerError::Internal("blocking task cancelled".into()))
        } else {
            InfraError(LedgerError::Internal(format!("blocking task failed: {value}")))
        }
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LedgerError */
/* -------------------------------------------------------------------------- */

impl IntoLedgerError for HttpError {
    fn into_ledger(self) -> LedgerError {
        if self.is_timeout() {
            return LedgerError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return LedgerError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => LedgerError::Config(format!("{message}: credentials rejected")),
                404 => LedgerError::NotFound(message),
                400..=499 if code != 408 && code != 429 => LedgerError::InvalidInput(message),
                _ => LedgerError::Network(message),
            };
        }

        if self.is_decode() {
            return LedgerError::Oracle(format!("undecodable response body: {self}"));
        }

        LedgerError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_ledger())
    }
}

/// Shorthand used by repositories: `.map_err(map_sql)`.
pub fn map_sql(err: SqlError) -> LedgerError {
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
