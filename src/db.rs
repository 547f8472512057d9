use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{PulseError, Result};
use crate::models::{
    Client, ClientAssessment, ClientSignals, ClientStatus, ClientUpdate, DashboardStats, Message,
    Metadata, NewClient, NewMessage, NewSignal, Signal, NEUTRAL_HEALTH_SCORE,
};
use crate::schema::{clients, messages, signals};

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Result of storing a message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageInsert {
    /// The message was new and has been stored
    Inserted(Message),
    /// A message with the same source and external id already exists
    Duplicate,
}

/// JSON metadata stored in a text column
struct JsonMetadata(Metadata);

impl FromSql for JsonMetadata {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        if raw.is_empty() {
            return Ok(Self(Metadata::new()));
        }
        serde_json::from_str(raw)
            .map(Self)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn metadata_json(metadata: &Metadata) -> Result<String> {
    Ok(serde_json::to_string(metadata)?)
}

/// Strip the `sqlite:` / `sqlite://` scheme from a database URL
fn database_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

/// Record store for clients, messages and signals
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_settings(database_url, 10, Duration::from_secs(30))
    }

    /// Create a new database connection pool
    pub fn with_pool_settings(
        database_url: &str,
        max_connections: u32,
        connection_timeout: Duration,
    ) -> Result<Self> {
        let path = database_path(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(connection_timeout)
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        debug!(path, "Database ready");

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2026-10-16-000000_create_tables/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    /// Register a new client with the initial `unknown` status
    pub fn create_client(&self, new_client: &NewClient) -> Result<Client> {
        let conn = self.get_connection()?;
        let now = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                clients::TABLE,
                clients::NAME,
                clients::COMPANY,
                clients::EMAIL,
                clients::STATUS,
                clients::HEALTH_SCORE,
                clients::METADATA,
                clients::CREATED_AT,
                clients::UPDATED_AT
            ),
            params![
                new_client.name,
                new_client.company,
                new_client.email,
                ClientStatus::Unknown,
                NEUTRAL_HEALTH_SCORE,
                metadata_json(&new_client.metadata)?,
                now,
                now
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::fetch_client(&conn, id)?.ok_or(PulseError::ClientNotFound(id))
    }

    /// Get a client by ID
    pub fn get_client(&self, client_id: i64) -> Result<Option<Client>> {
        let conn = self.get_connection()?;
        Self::fetch_client(&conn, client_id)
    }

    /// Get a client by ID, failing when it does not exist
    pub fn require_client(&self, client_id: i64) -> Result<Client> {
        self.get_client(client_id)?
            .ok_or(PulseError::ClientNotFound(client_id))
    }

    fn fetch_client(conn: &Connection, client_id: i64) -> Result<Option<Client>> {
        let client = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", clients::TABLE, clients::ID),
                params![client_id],
                Self::map_client,
            )
            .optional()?;
        Ok(client)
    }

    /// Find a client by contact email (case-insensitive)
    pub fn find_client_by_email(&self, email: &str) -> Result<Option<Client>> {
        let conn = self.get_connection()?;
        let client = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE lower({}) = lower(?)",
                    clients::TABLE,
                    clients::EMAIL
                ),
                params![email.trim()],
                Self::map_client,
            )
            .optional()?;
        Ok(client)
    }

    /// List all clients, weakest health first
    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} ASC, {} ASC",
            clients::TABLE,
            clients::HEALTH_SCORE,
            clients::ID
        ))?;
        let rows = stmt.query_map([], Self::map_client)?;

        let mut results = Vec::new();
        for client in rows {
            results.push(client?);
        }
        Ok(results)
    }

    /// Apply an administrative profile edit
    pub fn update_client(&self, client_id: i64, update: &ClientUpdate) -> Result<Client> {
        let conn = self.get_connection()?;

        let mut update_fields = Vec::new();
        let mut update_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(name) = &update.name {
            update_fields.push(format!("{} = ?", clients::NAME));
            update_params.push(Box::new(name.clone()));
        }
        if let Some(company) = &update.company {
            update_fields.push(format!("{} = ?", clients::COMPANY));
            update_params.push(Box::new(company.clone()));
        }
        if let Some(email) = &update.email {
            update_fields.push(format!("{} = ?", clients::EMAIL));
            update_params.push(Box::new(email.clone()));
        }
        if let Some(metadata) = &update.metadata {
            update_fields.push(format!("{} = ?", clients::METADATA));
            update_params.push(Box::new(metadata_json(metadata)?));
        }

        update_fields.push(format!("{} = ?", clients::UPDATED_AT));
        update_params.push(Box::new(Utc::now()));
        update_params.push(Box::new(client_id));

        let query = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            clients::TABLE,
            update_fields.join(", "),
            clients::ID
        );
        let changed = conn.execute(&query, rusqlite::params_from_iter(update_params.iter()))?;
        if changed == 0 {
            return Err(PulseError::ClientNotFound(client_id));
        }

        Self::fetch_client(&conn, client_id)?.ok_or(PulseError::ClientNotFound(client_id))
    }

    /// Delete a client together with its messages and signals
    pub fn delete_client(&self, client_id: i64) -> Result<bool> {
        let conn = self.get_connection()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?", clients::TABLE, clients::ID),
            params![client_id],
        )?;
        Ok(deleted > 0)
    }

    /// Move the last contact date forward to `timestamp`; older timestamps are ignored
    pub fn advance_last_contact(&self, client_id: i64, timestamp: DateTime<Utc>) -> Result<()> {
        let conn = self.get_connection()?;
        let current: Option<DateTime<Utc>> = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?",
                    clients::LAST_CONTACT_DATE,
                    clients::TABLE,
                    clients::ID
                ),
                params![client_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(PulseError::ClientNotFound(client_id))?;

        if current.is_some_and(|existing| existing >= timestamp) {
            return Ok(());
        }

        conn.execute(
            &format!(
                "UPDATE {} SET {} = ?, {} = ? WHERE {} = ?",
                clients::TABLE,
                clients::LAST_CONTACT_DATE,
                clients::UPDATED_AT,
                clients::ID
            ),
            params![timestamp, Utc::now(), client_id],
        )?;
        Ok(())
    }

    /// Write a scoring pass back to the client and mark its messages analyzed
    ///
    /// Both writes happen in one transaction.
    pub fn commit_assessment(
        &self,
        client_id: i64,
        assessment: &ClientAssessment,
    ) -> Result<(Client, usize)> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            &format!(
                "UPDATE {} SET {} = ?, {} = ?, {} = ?, {} = ?, {} = ?, {} = ? WHERE {} = ?",
                clients::TABLE,
                clients::HEALTH_SCORE,
                clients::STATUS,
                clients::SENTIMENT_AVG,
                clients::TOTAL_MESSAGES,
                clients::RESPONSE_TIME_AVG,
                clients::UPDATED_AT,
                clients::ID
            ),
            params![
                assessment.health_score,
                assessment.status,
                assessment.sentiment_avg,
                assessment.total_messages,
                assessment.response_time_avg,
                Utc::now(),
                client_id
            ],
        )?;
        if changed == 0 {
            return Err(PulseError::ClientNotFound(client_id));
        }

        let analyzed = tx.execute(
            &format!(
                "UPDATE {} SET {} = 1 WHERE {} = ? AND {} = 0",
                messages::TABLE,
                messages::ANALYZED,
                messages::CLIENT_ID,
                messages::ANALYZED
            ),
            params![client_id],
        )?;

        let client = Self::fetch_client(&tx, client_id)?.ok_or(PulseError::ClientNotFound(client_id))?;
        tx.commit()?;

        Ok((client, analyzed))
    }

    /// Portfolio-level counts for the dashboard
    pub fn stats(&self) -> Result<DashboardStats> {
        let conn = self.get_connection()?;

        let (total_clients, avg_health_score): (i64, Option<f64>) = conn.query_row(
            &format!(
                "SELECT COUNT(*), AVG({}) FROM {}",
                clients::HEALTH_SCORE,
                clients::TABLE
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let count_status = |status: ClientStatus| -> Result<i64> {
            Ok(conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?",
                    clients::TABLE,
                    clients::STATUS
                ),
                params![status],
                |row| row.get(0),
            )?)
        };

        let unread_signals: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = 0",
                signals::TABLE,
                signals::ADDRESSED
            ),
            [],
            |row| row.get(0),
        )?;

        Ok(DashboardStats {
            total_clients,
            at_risk_count: count_status(ClientStatus::AtRisk)?,
            opportunity_count: count_status(ClientStatus::Opportunity)?,
            healthy_count: count_status(ClientStatus::Healthy)?,
            avg_health_score: avg_health_score.unwrap_or(0.0),
            unread_signals,
        })
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Store a message unless its `(source, external_id)` pair is already known
    pub fn insert_message(&self, new_message: &NewMessage) -> Result<MessageInsert> {
        let conn = self.get_connection()?;

        let inserted = conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT ({}, {}) DO NOTHING",
                messages::TABLE,
                messages::CLIENT_ID,
                messages::THREAD_ID,
                messages::FROM_EMAIL,
                messages::TO_EMAIL,
                messages::SUBJECT,
                messages::BODY,
                messages::BODY_SNIPPET,
                messages::TIMESTAMP,
                messages::SOURCE,
                messages::SENTIMENT_SCORE,
                messages::IS_FROM_CLIENT,
                messages::EXTERNAL_ID,
                messages::METADATA,
                messages::CREATED_AT,
                messages::SOURCE,
                messages::EXTERNAL_ID
            ),
            params![
                new_message.client_id,
                new_message.thread_id,
                new_message.from_email,
                new_message.to_email,
                new_message.subject,
                new_message.body,
                new_message.body_snippet,
                new_message.timestamp,
                new_message.source,
                new_message.sentiment_score,
                new_message.is_from_client,
                new_message.external_id,
                metadata_json(&new_message.metadata)?,
                Utc::now()
            ],
        )?;

        if inserted == 0 {
            return Ok(MessageInsert::Duplicate);
        }

        let id = conn.last_insert_rowid();
        let message = conn.query_row(
            &format!("SELECT * FROM {} WHERE {} = ?", messages::TABLE, messages::ID),
            params![id],
            Self::map_message,
        )?;
        Ok(MessageInsert::Inserted(message))
    }

    /// The newest `limit` messages for a client, returned oldest first
    pub fn recent_messages(&self, client_id: i64, limit: usize) -> Result<Vec<Message>> {
        let conn = self.get_connection()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} DESC, {} DESC LIMIT ?",
            messages::TABLE,
            messages::CLIENT_ID,
            messages::TIMESTAMP,
            messages::ID
        ))?;
        let rows = stmt.query_map(params![client_id, limit], Self::map_message)?;

        let mut results = Vec::new();
        for message in rows {
            results.push(message?);
        }
        results.reverse();
        Ok(results)
    }

    /// Number of messages stored for a client
    pub fn count_messages(&self, client_id: i64) -> Result<i64> {
        let conn = self.get_connection()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                messages::TABLE,
                messages::CLIENT_ID
            ),
            params![client_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    /// Store proposed signals in one transaction
    pub fn insert_signals(&self, new_signals: &[NewSignal]) -> Result<Vec<Signal>> {
        if new_signals.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut stored = Vec::with_capacity(new_signals.len());

        for new_signal in new_signals {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
                    signals::TABLE,
                    signals::CLIENT_ID,
                    signals::MESSAGE_ID,
                    signals::SIGNAL_TYPE,
                    signals::SEVERITY,
                    signals::TITLE,
                    signals::DESCRIPTION,
                    signals::CONTEXT,
                    signals::ADDRESSED,
                    signals::CREATED_AT
                ),
                params![
                    new_signal.client_id,
                    new_signal.message_id,
                    new_signal.signal_type,
                    new_signal.severity,
                    new_signal.title,
                    new_signal.description,
                    new_signal.context,
                    now
                ],
            )?;

            stored.push(Signal {
                id: tx.last_insert_rowid(),
                client_id: new_signal.client_id,
                message_id: new_signal.message_id,
                signal_type: new_signal.signal_type,
                severity: new_signal.severity,
                title: new_signal.title.clone(),
                description: new_signal.description.clone(),
                context: new_signal.context.clone(),
                addressed: false,
                created_at: now,
            });
        }

        tx.commit()?;
        Ok(stored)
    }

    /// Get a signal by ID
    pub fn get_signal(&self, signal_id: i64) -> Result<Option<Signal>> {
        let conn = self.get_connection()?;
        let signal = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", signals::TABLE, signals::ID),
                params![signal_id],
                Self::map_signal,
            )
            .optional()?;
        Ok(signal)
    }

    /// Unaddressed signals for a client, newest first
    pub fn unaddressed_signals(&self, client_id: i64) -> Result<Vec<Signal>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? AND {} = 0 ORDER BY {} DESC, {} DESC",
            signals::TABLE,
            signals::CLIENT_ID,
            signals::ADDRESSED,
            signals::CREATED_AT,
            signals::ID
        ))?;
        let rows = stmt.query_map(params![client_id], Self::map_signal)?;

        let mut results = Vec::new();
        for signal in rows {
            results.push(signal?);
        }
        Ok(results)
    }

    /// Every client that has unaddressed signals, in client list order
    pub fn unaddressed_signals_by_client(&self) -> Result<Vec<ClientSignals>> {
        let mut grouped = Vec::new();
        for client in self.list_clients()? {
            let signals = self.unaddressed_signals(client.id)?;
            if !signals.is_empty() {
                grouped.push(ClientSignals { client, signals });
            }
        }
        Ok(grouped)
    }

    /// Flip a signal's `addressed` flag; addressing twice is harmless
    pub fn mark_signal_addressed(&self, signal_id: i64) -> Result<Signal> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET {} = 1 WHERE {} = ?",
                signals::TABLE,
                signals::ADDRESSED,
                signals::ID
            ),
            params![signal_id],
        )?;
        if changed == 0 {
            return Err(PulseError::SignalNotFound(signal_id));
        }

        self.get_signal(signal_id)?
            .ok_or(PulseError::SignalNotFound(signal_id))
    }

    // ------------------------------------------------------------------
    // Row mapping
    // ------------------------------------------------------------------

    /// Map a database row to a Client
    fn map_client(row: &Row) -> rusqlite::Result<Client> {
        Ok(Client {
            id: row.get(clients::ID)?,
            name: row.get(clients::NAME)?,
            company: row.get(clients::COMPANY)?,
            email: row.get(clients::EMAIL)?,
            status: row.get(clients::STATUS)?,
            health_score: row.get(clients::HEALTH_SCORE)?,
            last_contact_date: row.get(clients::LAST_CONTACT_DATE)?,
            total_messages: row.get(clients::TOTAL_MESSAGES)?,
            response_time_avg: row.get(clients::RESPONSE_TIME_AVG)?,
            sentiment_avg: row.get(clients::SENTIMENT_AVG)?,
            metadata: row.get::<_, JsonMetadata>(clients::METADATA)?.0,
            created_at: row.get(clients::CREATED_AT)?,
            updated_at: row.get(clients::UPDATED_AT)?,
        })
    }

    /// Map a database row to a Message
    fn map_message(row: &Row) -> rusqlite::Result<Message> {
        Ok(Message {
            id: row.get(messages::ID)?,
            client_id: row.get(messages::CLIENT_ID)?,
            thread_id: row.get(messages::THREAD_ID)?,
            from_email: row.get(messages::FROM_EMAIL)?,
            to_email: row.get(messages::TO_EMAIL)?,
            subject: row.get(messages::SUBJECT)?,
            body: row.get(messages::BODY)?,
            body_snippet: row.get(messages::BODY_SNIPPET)?,
            timestamp: row.get(messages::TIMESTAMP)?,
            source: row.get(messages::SOURCE)?,
            sentiment_score: row.get(messages::SENTIMENT_SCORE)?,
            is_from_client: row.get(messages::IS_FROM_CLIENT)?,
            analyzed: row.get(messages::ANALYZED)?,
            external_id: row.get(messages::EXTERNAL_ID)?,
            metadata: row.get::<_, JsonMetadata>(messages::METADATA)?.0,
            created_at: row.get(messages::CREATED_AT)?,
        })
    }

    /// Map a database row to a Signal
    fn map_signal(row: &Row) -> rusqlite::Result<Signal> {
        Ok(Signal {
            id: row.get(signals::ID)?,
            client_id: row.get(signals::CLIENT_ID)?,
            message_id: row.get(signals::MESSAGE_ID)?,
            signal_type: row.get(signals::SIGNAL_TYPE)?,
            severity: row.get(signals::SEVERITY)?,
            title: row.get(signals::TITLE)?,
            description: row.get(signals::DESCRIPTION)?,
            context: row.get(signals::CONTEXT)?,
            addressed: row.get(signals::ADDRESSED)?,
            created_at: row.get(signals::CREATED_AT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_strips_scheme() {
        assert_eq!(database_path("sqlite://data/pulse.db"), "data/pulse.db");
        assert_eq!(database_path("sqlite:data/pulse.db"), "data/pulse.db");
        assert_eq!(database_path("/tmp/pulse.db"), "/tmp/pulse.db");
    }
}
