//! Per-trainee records: medical consultations, punishments and permissions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use super::organization::{relation_name, Relation};
use crate::normalize::{Entity, Normalize};
use crate::utils::parse_date;

const TRAINEE: &[&str] = &["stagiaire", "trainee"];
const REASON: &[&str] = &["motif", "reason", "raison"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Option<i64>,
    pub date: String,
    pub note: String,
    #[serde(rename = "stagiaire")]
    pub trainee: Option<Relation>,
    #[serde(rename = "fichier")]
    pub file: Option<Attachment>,
}

impl Normalize for Consultation {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            date: entity.text(&["date", "date_consultation"]),
            note: entity.text(&["note", "observation", "diagnostic"]),
            trainee: Relation::field(entity, TRAINEE),
            file: Attachment::field(entity, &["fichier", "file", "document"]),
        }
    }
}

impl Consultation {
    pub fn day(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn trainee_name(&self) -> &str {
        relation_name(&self.trainee)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Punishment {
    pub id: Option<i64>,
    pub date: String,
    #[serde(rename = "motif")]
    pub reason: String,
    /// Duration in days
    #[serde(rename = "duree")]
    pub duration_days: Option<i64>,
    #[serde(rename = "stagiaire")]
    pub trainee: Option<Relation>,
}

impl Normalize for Punishment {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            date: entity.text(&["date"]),
            reason: entity.text(REASON),
            duration_days: entity.integer(&["duree", "duration", "jours"]),
            trainee: Relation::field(entity, TRAINEE),
        }
    }
}

impl Punishment {
    pub fn duration_display(&self) -> String {
        match self.duration_days {
            Some(1) => "1 jour".to_string(),
            Some(d) => format!("{} jours", d),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Option<i64>,
    #[serde(rename = "date_debut")]
    pub start_date: String,
    #[serde(rename = "date_fin")]
    pub end_date: String,
    #[serde(rename = "motif")]
    pub reason: String,
    #[serde(rename = "stagiaire")]
    pub trainee: Option<Relation>,
}

impl Normalize for Permission {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            start_date: entity.text(&["date_debut", "startDate", "start_date"]),
            end_date: entity.text(&["date_fin", "endDate", "end_date"]),
            reason: entity.text(REASON),
            trainee: Relation::field(entity, TRAINEE),
        }
    }
}

impl Permission {
    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> Option<i64> {
        let start = parse_date(&self.start_date)?;
        let end = parse_date(&self.end_date)?;
        (end >= start).then(|| (end - start).num_days() + 1)
    }
}
