use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::organization::{relation_name, Relation};
use crate::normalize::{Entity, Normalize};
use crate::utils::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemarkKind {
    Positive,
    Negative,
}

impl RemarkKind {
    /// Lenient parse of the `type` field; unknown values are unspecified.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "positif" | "positiv" | "pos" | "+" => Some(RemarkKind::Positive),
            "negative" | "négative" | "negatif" | "négatif" | "neg" | "-" => {
                Some(RemarkKind::Negative)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemarkKind::Positive => "positive",
            RemarkKind::Negative => "negative",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RemarkKind::Positive => "Positive",
            RemarkKind::Negative => "Négative",
        }
    }
}

impl std::fmt::Display for RemarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A dated, timed note about an instructor's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remark {
    pub id: Option<i64>,
    pub date: String,
    #[serde(rename = "heure_debut")]
    pub start_time: String,
    #[serde(rename = "heure_fin")]
    pub end_time: String,
    #[serde(rename = "contenu")]
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<RemarkKind>,
    #[serde(rename = "instructeur")]
    pub instructor: Option<Relation>,
    #[serde(rename = "matiere")]
    pub subject: Option<Relation>,
    #[serde(rename = "stagiaire")]
    pub trainee: Option<Relation>,
}

impl Normalize for Remark {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            date: entity.text(&["date"]),
            start_time: entity.text(&["heure_debut", "startTime", "start_time"]),
            end_time: entity.text(&["heure_fin", "endTime", "end_time"]),
            content: entity.text(&["contenu", "content", "remarque", "texte"]),
            kind: RemarkKind::parse(&entity.text(&["type", "kind"])),
            instructor: Relation::field(entity, &["instructeur", "instructor"]),
            subject: Relation::field(entity, &["matiere", "subject", "sujet"]),
            trainee: Relation::field(entity, &["stagiaire", "trainee"]),
        }
    }
}

impl Remark {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn instructor_name(&self) -> &str {
        relation_name(&self.instructor)
    }

    pub fn subject_title(&self) -> &str {
        relation_name(&self.subject)
    }

    pub fn kind_label(&self) -> &'static str {
        self.kind.map(|k| k.label()).unwrap_or("")
    }

    pub fn is_positive(&self) -> bool {
        self.kind == Some(RemarkKind::Positive)
    }

    pub fn is_negative(&self) -> bool {
        self.kind == Some(RemarkKind::Negative)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field is empty: {0}")]
    MissingField(&'static str),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("End time {end} is before start time {start}")]
    TimeRange { start: String, end: String },
}

/// A remark queued for creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemarkDraft {
    pub date: String,
    #[serde(rename = "heure_debut", default)]
    pub start_time: String,
    #[serde(rename = "heure_fin", default)]
    pub end_time: String,
    #[serde(rename = "contenu")]
    pub content: String,
    #[serde(rename = "type")]
    pub kind: RemarkKind,
    #[serde(rename = "instructeur")]
    pub instructor_id: i64,
    #[serde(rename = "matiere", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
}

impl RemarkDraft {
    /// Check required fields before anything is sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.date.trim().is_empty() {
            return Err(ValidationError::MissingField("date"));
        }
        if parse_date(&self.date).is_none() {
            return Err(ValidationError::InvalidDate(self.date.clone()));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::MissingField("contenu"));
        }
        let (start, end) = (self.start_time.trim(), self.end_time.trim());
        // "HH:MM[:SS]" compares correctly as text
        if !start.is_empty() && !end.is_empty() && end < start {
            return Err(ValidationError::TimeRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(())
    }

    /// Body for a Strapi create request
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "data": self })
    }
}
