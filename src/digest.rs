//! Daily digest of unaddressed signals
//!
//! Signals from every client are split into alerts (risk), opportunities and
//! check-ins. Alerts and opportunities are ordered by descending severity;
//! equal severities keep the order they were encountered in. Check-ins keep
//! encounter order. Positive and negative signals are not part of the digest.

use std::fmt::Write as _;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Client, ClientSignals, Signal, SignalType};

/// A signal paired with the client it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    /// The signal
    pub signal: Signal,
    /// Its owning client
    pub client: Client,
}

/// Prioritized view of unaddressed signals across clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    /// When the digest was built
    pub generated_at: DateTime<Utc>,
    /// Risk signals, most severe first
    pub alerts: Vec<DigestEntry>,
    /// Opportunity signals, most severe first
    pub opportunities: Vec<DigestEntry>,
    /// Check-in signals in encounter order
    pub check_ins: Vec<DigestEntry>,
}

impl Digest {
    /// Total number of entries across all buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len() + self.opportunities.len() + self.check_ins.len()
    }

    /// True when there is nothing to act on
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sections(&self) -> [(&'static str, &[DigestEntry]); 3] {
        [
            ("alert", self.alerts.as_slice()),
            ("opportunity", self.opportunities.as_slice()),
            ("check_in", self.check_ins.as_slice()),
        ]
    }
}

/// Build the digest from each client's unaddressed signals
///
/// Addressed signals are skipped, so a signal disappears from the digest
/// as soon as it is addressed.
#[must_use]
pub fn build_digest(clients: &[ClientSignals], generated_at: DateTime<Utc>) -> Digest {
    let mut alerts = Vec::new();
    let mut opportunities = Vec::new();
    let mut check_ins = Vec::new();

    for group in clients {
        for signal in group.signals.iter().filter(|s| !s.addressed) {
            let bucket = match signal.signal_type {
                SignalType::Risk => &mut alerts,
                SignalType::Opportunity => &mut opportunities,
                SignalType::CheckIn => &mut check_ins,
                SignalType::Positive | SignalType::Negative => continue,
            };
            bucket.push(DigestEntry {
                signal: signal.clone(),
                client: group.client.clone(),
            });
        }
    }

    // sort_by is stable: equal severities keep encounter order
    alerts.sort_by(|a, b| b.signal.severity.cmp(&a.signal.severity));
    opportunities.sort_by(|a, b| b.signal.severity.cmp(&a.signal.severity));

    Digest {
        generated_at,
        alerts,
        opportunities,
        check_ins,
    }
}

/// Render the digest as a markdown document
#[must_use]
pub fn render_markdown(digest: &Digest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Daily Digest\n");
    let _ = writeln!(
        out,
        "_Generated {}_\n",
        digest.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    if digest.is_empty() {
        out.push_str("All clear! No unaddressed signals.\n");
        return out;
    }

    let sections = [
        ("Urgent Attention Needed", &digest.alerts, true),
        ("Opportunities", &digest.opportunities, true),
        ("Check-ins Due", &digest.check_ins, false),
    ];

    for (heading, entries, show_severity) in sections {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "## {heading} ({})\n", entries.len());
        for entry in entries {
            let _ = write!(out, "- **{}** ({})", entry.client.name, entry.client.company);
            if show_severity {
                let _ = write!(out, " [severity {}/10]", entry.signal.severity);
            }
            let _ = writeln!(out, ": {}", entry.signal.title);
            if !entry.signal.description.is_empty() {
                let _ = writeln!(out, "  {}", entry.signal.description);
            }
            if let Some(context) = entry.signal.context.as_deref().filter(|c| !c.is_empty()) {
                let _ = writeln!(out, "  > \"{context}\"");
            }
        }
        out.push('\n');
    }

    out
}

#[derive(Serialize)]
struct CsvRow<'a> {
    category: &'a str,
    client: &'a str,
    company: &'a str,
    severity: u8,
    title: &'a str,
    description: &'a str,
    created_at: String,
}

/// Write the digest as CSV, one row per entry
pub fn write_csv<W: Write>(digest: &Digest, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for (category, entries) in digest.sections() {
        for entry in entries {
            csv_writer.serialize(CsvRow {
                category,
                client: &entry.client.name,
                company: &entry.client.company,
                severity: entry.signal.severity.get(),
                title: &entry.signal.title,
                description: &entry.signal.description,
                created_at: entry.signal.created_at.to_rfc3339(),
            })?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}
