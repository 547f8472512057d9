//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Clients table schema
pub mod clients {
    /// Table name
    pub const TABLE: &str = "clients";
    /// Primary key column
    pub const ID: &str = "id";
    /// Display name column
    pub const NAME: &str = "name";
    /// Company column
    pub const COMPANY: &str = "company";
    /// Contact email column (unique)
    pub const EMAIL: &str = "email";
    /// Status label column
    pub const STATUS: &str = "status";
    /// Health score column
    pub const HEALTH_SCORE: &str = "health_score";
    /// Last contact timestamp column
    pub const LAST_CONTACT_DATE: &str = "last_contact_date";
    /// Message count column
    pub const TOTAL_MESSAGES: &str = "total_messages";
    /// Typical response hours column
    pub const RESPONSE_TIME_AVG: &str = "response_time_avg";
    /// Sentiment column
    pub const SENTIMENT_AVG: &str = "sentiment_avg";
    /// JSON metadata column
    pub const METADATA: &str = "metadata";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
    /// Modification timestamp column
    pub const UPDATED_AT: &str = "updated_at";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to clients
    pub const CLIENT_ID: &str = "client_id";
    /// Thread identifier column
    pub const THREAD_ID: &str = "thread_id";
    /// Sender column
    pub const FROM_EMAIL: &str = "from_email";
    /// Recipient column
    pub const TO_EMAIL: &str = "to_email";
    /// Subject column
    pub const SUBJECT: &str = "subject";
    /// Body column
    pub const BODY: &str = "body";
    /// Snippet column
    pub const BODY_SNIPPET: &str = "body_snippet";
    /// Sent timestamp column
    pub const TIMESTAMP: &str = "timestamp";
    /// Channel column
    pub const SOURCE: &str = "source";
    /// Sentiment column
    pub const SENTIMENT_SCORE: &str = "sentiment_score";
    /// Direction flag column
    pub const IS_FROM_CLIENT: &str = "is_from_client";
    /// Consumed-by-scoring flag column
    pub const ANALYZED: &str = "analyzed";
    /// Channel-specific dedup id column
    pub const EXTERNAL_ID: &str = "external_id";
    /// JSON metadata column
    pub const METADATA: &str = "metadata";
    /// Storage timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Signals table schema
pub mod signals {
    /// Table name
    pub const TABLE: &str = "signals";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to clients
    pub const CLIENT_ID: &str = "client_id";
    /// Originating message column (not a foreign key)
    pub const MESSAGE_ID: &str = "message_id";
    /// Signal type label column
    pub const SIGNAL_TYPE: &str = "signal_type";
    /// Severity column
    pub const SEVERITY: &str = "severity";
    /// Title column
    pub const TITLE: &str = "title";
    /// Description column
    pub const DESCRIPTION: &str = "description";
    /// Evidence quote column
    pub const CONTEXT: &str = "context";
    /// Addressed flag column
    pub const ADDRESSED: &str = "addressed";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}
