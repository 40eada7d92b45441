use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use super::organization::Relation;
use crate::normalize::{Entity, Normalize};
use crate::utils::parse_date;

const FIRST_NAME: &[&str] = &["prenom", "firstName", "first_name"];
const LAST_NAME: &[&str] = &["nom", "lastName", "last_name"];
const NATIONAL_ID: &[&str] = &["cin", "nationalId", "national_id"];
const SERVICE_NUMBER: &[&str] = &["matricule", "serviceNumber", "service_number"];
const PHONE: &[&str] = &["telephone", "tel", "phone"];
const SPECIALTY: &[&str] = &["specialite", "specialty"];
const PHOTO: &[&str] = &["photo", "image", "avatar"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonType {
    Trainee,
    Instructor,
}

impl std::fmt::Display for PersonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersonType::Trainee => write!(f, "Stagiaire"),
            PersonType::Instructor => write!(f, "Instructeur"),
        }
    }
}

/// A trainee (stagiaire) enrolled in a training program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trainee {
    pub id: Option<i64>,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "cin")]
    pub national_id: String,
    #[serde(rename = "matricule")]
    pub service_number: String,
    pub grade: String,
    #[serde(rename = "date_naissance")]
    pub birth_date: String,
    #[serde(rename = "groupe_sanguin")]
    pub blood_group: String,
    #[serde(rename = "adresse")]
    pub address: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    #[serde(rename = "specialite")]
    pub specialty: Option<Relation>,
    #[serde(rename = "stage")]
    pub training_program: Option<Relation>,
    pub brigade: Option<Relation>,
    pub photo: Option<Attachment>,
}

impl Normalize for Trainee {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            first_name: entity.text(FIRST_NAME),
            last_name: entity.text(LAST_NAME),
            national_id: entity.text(NATIONAL_ID),
            service_number: entity.text(SERVICE_NUMBER),
            grade: entity.text(&["grade"]),
            birth_date: entity.text(&["date_naissance", "birthDate", "date_of_birth"]),
            blood_group: entity.text(&["groupe_sanguin", "bloodGroup", "blood_group"]),
            address: entity.text(&["adresse", "address"]),
            phone: entity.text(PHONE),
            specialty: Relation::field(entity, SPECIALTY),
            training_program: Relation::field(entity, &["stage", "formation", "trainingProgram"]),
            brigade: Relation::field(entity, &["brigade"]),
            photo: Attachment::field(entity, PHOTO),
        }
    }
}

impl Trainee {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    /// "NOM Prénom" as printed on official documents
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }

    pub fn date_of_birth(&self) -> Option<NaiveDate> {
        parse_date(&self.birth_date)
    }

    pub fn age(&self) -> Option<i32> {
        self.date_of_birth().map(|dob| age_on(dob, Utc::now().date_naive()))
    }

    pub fn specialty_name(&self) -> &str {
        super::organization::relation_name(&self.specialty)
    }

    pub fn as_relation(&self) -> Relation {
        Relation {
            id: self.id,
            name: self.full_name(),
        }
    }
}

/// An instructor, subject of remark tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: Option<i64>,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "cin")]
    pub national_id: String,
    #[serde(rename = "matricule")]
    pub service_number: String,
    pub grade: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    #[serde(rename = "specialite")]
    pub specialty: Option<Relation>,
    pub photo: Option<Attachment>,
}

impl Normalize for Instructor {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            first_name: entity.text(FIRST_NAME),
            last_name: entity.text(LAST_NAME),
            national_id: entity.text(NATIONAL_ID),
            service_number: entity.text(SERVICE_NUMBER),
            grade: entity.text(&["grade"]),
            phone: entity.text(PHONE),
            specialty: Relation::field(entity, SPECIALTY),
            photo: Attachment::field(entity, PHOTO),
        }
    }
}

impl Instructor {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name)
    }

    pub fn specialty_name(&self) -> &str {
        super::organization::relation_name(&self.specialty)
    }

    pub fn as_relation(&self) -> Relation {
        Relation {
            id: self.id,
            name: self.full_name(),
        }
    }
}

fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last).trim().to_string()
}

fn display_name(first: &str, last: &str) -> String {
    format!("{} {}", last.to_uppercase(), first).trim().to_string()
}

fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}
