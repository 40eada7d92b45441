//! Record bundles handed to the report renderer.
//!
//! A dossier carries exactly the records that get printed. The renderer
//! never fetches anything on its own, so assembling the dossier is where
//! the caller decides what belongs in the report.

use super::person::{Instructor, Trainee};
use super::records::{Consultation, Permission, Punishment};
use super::remark::Remark;

#[derive(Debug, Clone, PartialEq)]
pub struct TraineeDossier {
    pub trainee: Trainee,
    pub remarks: Vec<Remark>,
    pub consultations: Vec<Consultation>,
    pub punishments: Vec<Punishment>,
    pub permissions: Vec<Permission>,
}

impl TraineeDossier {
    pub fn new(trainee: Trainee) -> Self {
        Self {
            trainee,
            remarks: Vec::new(),
            consultations: Vec::new(),
            punishments: Vec::new(),
            permissions: Vec::new(),
        }
    }

    /// Attach the records that point at this trainee, keeping their order.
    pub fn collect(
        trainee: Trainee,
        remarks: &[Remark],
        consultations: &[Consultation],
        punishments: &[Punishment],
        permissions: &[Permission],
    ) -> Self {
        let id = trainee.id;
        let owned = |rel: &Option<super::Relation>| id.is_some() && rel.as_ref().and_then(|r| r.id) == id;

        Self {
            remarks: remarks.iter().filter(|r| owned(&r.trainee)).cloned().collect(),
            consultations: consultations.iter().filter(|c| owned(&c.trainee)).cloned().collect(),
            punishments: punishments.iter().filter(|p| owned(&p.trainee)).cloned().collect(),
            permissions: permissions.iter().filter(|p| owned(&p.trainee)).cloned().collect(),
            trainee,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstructorDossier {
    pub instructor: Instructor,
    pub remarks: Vec<Remark>,
}

impl InstructorDossier {
    pub fn new(instructor: Instructor) -> Self {
        Self {
            instructor,
            remarks: Vec::new(),
        }
    }

    pub fn collect(instructor: Instructor, remarks: &[Remark]) -> Self {
        let id = instructor.id;
        Self {
            remarks: remarks
                .iter()
                .filter(|r| id.is_some() && r.instructor.as_ref().and_then(|i| i.id) == id)
                .cloned()
                .collect(),
            instructor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalize;
    use serde_json::json;

    #[test]
    fn test_trainee_dossier_collects_owned_records() {
        let trainee = Trainee::normalize(&json!({"id": 3, "prenom": "Y.", "nom": "Alaoui"}));
        let consultations = vec![
            Consultation::normalize(&json!({"id": 1, "note": "a", "stagiaire": {"id": 3}})),
            Consultation::normalize(&json!({"id": 2, "note": "b", "stagiaire": {"id": 4}})),
            Consultation::normalize(&json!({"id": 3, "note": "c", "stagiaire": {"data": {"id": 3}}})),
        ];
        let punishments = vec![Punishment::normalize(&json!({"id": 1, "stagiaire": null}))];

        let dossier = TraineeDossier::collect(trainee, &[], &consultations, &punishments, &[]);
        let notes: Vec<&str> = dossier.consultations.iter().map(|c| c.note.as_str()).collect();
        assert_eq!(notes, vec!["a", "c"]);
        assert!(dossier.punishments.is_empty());
    }

    #[test]
    fn test_instructor_dossier_without_id_collects_nothing() {
        let instructor = Instructor::normalize(&json!({"nom": "Sans id"}));
        let remarks = vec![Remark::normalize(&json!({"id": 1, "instructeur": {"name": "x"}}))];
        assert!(InstructorDossier::collect(instructor, &remarks).remarks.is_empty());
    }
}
