//! Analysis result records
//!
//! [`ResultAssembler`] packages the re-encoded images, both metric
//! summaries and the impact report into an immutable [`AnalysisResult`],
//! stamped with a UTC timestamp and a fresh [`SessionId`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use verileaf_core::io::{encode_data_url, ImageFormat};
use verileaf_core::{Error, Result, RgbRaster};

use crate::change::ImpactReport;
use crate::maybe_rayon::join;
use crate::statistics::MetricsSummary;

// ---------------------------------------------------------------------------
// Session identifiers
// ---------------------------------------------------------------------------

/// Identifier of one stored analysis.
///
/// Generated ids are 32 lower-case hex characters. Parsed ids are limited to
/// ASCII alphanumerics, `-` and `_`, so an id is always a valid file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// A new random id
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().simple().to_string())
    }

    pub fn parse(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.len() <= 128
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidParameter {
                name: "session_id",
                value: s.to_string(),
                reason: "expected 1-128 ASCII letters, digits, '-' or '_'".to_string(),
            });
        }
        Ok(SessionId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SessionId::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        SessionId::parse(&s)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> String {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `2026-10-19T08:15:02.123456Z`
mod utc_micros {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// One completed before/after analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(with = "utc_micros")]
    pub timestamp: DateTime<Utc>,
    /// Data URL of the re-encoded before image
    pub before_image: String,
    /// Data URL of the re-encoded after image
    pub after_image: String,
    pub before_metrics: MetricsSummary,
    pub after_metrics: MetricsSummary,
    pub impact_analysis: ImpactReport,
    pub status: Status,
    pub session_id: SessionId,
}

/// User-visible failure record: `{"status": "error", "error": "<message>"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub status: Status,
    pub error: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            error: message.into(),
        }
    }
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        ErrorReport::new(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Builds [`AnalysisResult`] records; holds only the transport image format
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler {
    format: ImageFormat,
}

impl ResultAssembler {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Assemble with the current time (microsecond precision) and a new session id
    pub fn assemble(
        &self,
        before: &RgbRaster,
        after: &RgbRaster,
        before_metrics: MetricsSummary,
        after_metrics: MetricsSummary,
        impact: ImpactReport,
    ) -> Result<AnalysisResult> {
        self.assemble_with(
            before,
            after,
            before_metrics,
            after_metrics,
            impact,
            Utc::now().trunc_subsecs(6),
            SessionId::generate(),
        )
    }

    /// Assemble with an explicit timestamp and session id
    #[allow(clippy::too_many_arguments)]
    pub fn assemble_with(
        &self,
        before: &RgbRaster,
        after: &RgbRaster,
        before_metrics: MetricsSummary,
        after_metrics: MetricsSummary,
        impact: ImpactReport,
        timestamp: DateTime<Utc>,
        session_id: SessionId,
    ) -> Result<AnalysisResult> {
        let (before_image, after_image) = join(
            || encode_data_url(before, self.format),
            || encode_data_url(after, self.format),
        );

        Ok(AnalysisResult {
            timestamp,
            before_image: before_image?,
            after_image: after_image?,
            before_metrics,
            after_metrics,
            impact_analysis: impact,
            status: Status::Success,
            session_id,
        })
    }
}
