use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use super::organization::{relation_name, Relation};
use crate::normalize::{Entity, Normalize};

/// A taught subject (matière) with its course documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Option<i64>,
    #[serde(rename = "titre")]
    pub title: String,
    pub description: String,
    /// Taught across every specialty
    #[serde(rename = "transversale")]
    pub cross_specialty: bool,
    #[serde(rename = "specialite")]
    pub specialty: Option<Relation>,
    pub documents: Vec<Attachment>,
}

impl Normalize for Subject {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            title: entity.text(&["titre", "title", "nom", "name"]),
            description: entity.text(&["description"]),
            cross_specialty: entity.boolean(&["transversale", "isTransversal", "crossSpecialty"]),
            specialty: Relation::field(entity, &["specialite", "specialty"]),
            documents: Attachment::list(entity, &["documents", "fichiers", "files"]),
        }
    }
}

impl Subject {
    pub fn specialty_label(&self) -> &str {
        if self.cross_specialty {
            "Transversale"
        } else {
            relation_name(&self.specialty)
        }
    }

    /// Move the document at `from` to position `to`, shifting the others.
    /// Returns false when either index is out of range.
    pub fn move_document(&mut self, from: usize, to: usize) -> bool {
        if from >= self.documents.len() || to >= self.documents.len() {
            return false;
        }
        let doc = self.documents.remove(from);
        self.documents.insert(to, doc);
        true
    }

    /// Document ids in display order, as sent back when saving a new order
    pub fn document_order(&self) -> Vec<i64> {
        self.documents.iter().filter_map(|d| d.id).collect()
    }
}
