//! Data models for training-center entities.
//!
//! This module contains the normalized, display-ready records:
//!
//! - `Trainee`, `Instructor`: people, with specialty and photo
//! - `Subject`: taught subjects and their ordered documents
//! - `Remark`, `RemarkDraft`: instructor remarks, read and to be created
//! - `Consultation`, `Punishment`, `Permission`: per-trainee records
//! - `Relation`, `Attachment`, `Specialty`: shared reference types
//! - `TraineeDossier`, `InstructorDossier`: what a report prints

pub mod attachment;
pub mod dossier;
pub mod organization;
pub mod person;
pub mod records;
pub mod remark;
pub mod subject;

pub use attachment::Attachment;
pub use dossier::{InstructorDossier, TraineeDossier};
pub use organization::{relation_name, Relation, Specialty};
pub use person::{Instructor, PersonType, Trainee};
pub use records::{Consultation, Permission, Punishment};
pub use remark::{Remark, RemarkDraft, RemarkKind, ValidationError};
pub use subject::Subject;
