use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate client display name
    pub fn validate_client_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Client name cannot be empty"));
        }

        if name.len() > 100 {
            return Err(anyhow!("Client name too long (max 100 characters)"));
        }

        // Check for potentially dangerous characters
        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(anyhow!("Client name contains invalid characters"));
        }

        Ok(())
    }

    /// Validate company name
    pub fn validate_company(company: &str) -> Result<()> {
        if company.trim().is_empty() {
            return Err(anyhow!("Company cannot be empty"));
        }

        if company.len() > 200 {
            return Err(anyhow!("Company name too long (max 200 characters)"));
        }

        Ok(())
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(anyhow!("Email cannot be empty"));
        }

        if email.len() > 254 {
            return Err(anyhow!("Email too long (max 254 characters)"));
        }

        // Basic email validation
        if !email.contains('@') {
            return Err(anyhow!("Email must contain @ symbol"));
        }

        let parts: Vec<&str> = email.trim().split('@').collect();
        if parts.len() != 2 {
            return Err(anyhow!("Email must have exactly one @ symbol"));
        }

        let local_part = parts[0];
        let domain_part = parts[1];

        if local_part.is_empty() || local_part.len() > 64 {
            return Err(anyhow!("Email local part invalid"));
        }

        if domain_part.is_empty() || !domain_part.contains('.') {
            return Err(anyhow!("Email domain invalid"));
        }

        Ok(())
    }

    /// Validate message subject
    pub fn validate_subject(subject: &str) -> Result<()> {
        if subject.trim().is_empty() {
            return Err(anyhow!("Subject cannot be empty"));
        }

        if subject.len() > 1000 {
            return Err(anyhow!("Subject too long (max 1000 characters)"));
        }

        Ok(())
    }

    /// Validate a caller-supplied sentiment score
    ///
    /// Out-of-range values are accepted (they are clamped on ingest); only
    /// non-numbers are rejected.
    pub fn validate_sentiment(score: f64) -> Result<()> {
        if !score.is_finite() {
            return Err(anyhow!("Sentiment score must be a finite number"));
        }

        Ok(())
    }

    /// Validate a message timestamp
    pub fn validate_timestamp(timestamp: DateTime<Utc>) -> Result<()> {
        // A day of slack for clock skew between channels
        if timestamp > Utc::now() + Duration::days(1) {
            return Err(anyhow!("Message timestamp cannot be in the future"));
        }

        Ok(())
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        if path.to_string_lossy().is_empty() {
            return Err(anyhow!("File path cannot be empty"));
        }

        // Check for path traversal attempts
        let path_str = path.to_string_lossy();
        if path_str.contains("..") || path_str.contains('~') {
            return Err(anyhow!(
                "File path contains potentially dangerous characters"
            ));
        }

        // Check path length
        if path_str.len() > 4096 {
            return Err(anyhow!("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate the per-client message window
    pub fn validate_message_window(window: usize) -> Result<()> {
        if window == 0 {
            return Err(anyhow!("Message window must be greater than 0"));
        }

        if window > 1000 {
            return Err(anyhow!("Message window too large (max 1,000)"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(anyhow!("Database URL cannot be empty"));
        }

        if !url.starts_with("sqlite:") {
            return Err(anyhow!("Only SQLite databases are supported"));
        }

        if url.len() > 1000 {
            return Err(anyhow!("Database URL too long"));
        }

        Ok(())
    }
}
