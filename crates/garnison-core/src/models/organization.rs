//! Organizational references: specialties, brigades, training programs,
//! and the generic `{ id, name }` relation used to point at them.

use serde::{Deserialize, Serialize};

use crate::normalize::{Entity, Normalize};

/// A reference to another entity by id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: Option<i64>,
    pub name: String,
}

impl Relation {
    /// Build a relation from an unwrapped entity; people get "prenom nom".
    pub fn from_entity(entity: &Entity<'_>) -> Option<Self> {
        let mut name = entity.text(&["name"]);
        if name.is_empty() {
            let first = entity.text(&["prenom", "firstName", "first_name"]);
            let last = entity.text(&["nom", "lastName", "last_name"]);
            name = format!("{} {}", first, last).trim().to_string();
        }
        if name.is_empty() {
            name = entity.text(&["titre", "title", "label", "libelle", "intitule"]);
        }

        if entity.id.is_none() && name.is_empty() {
            None
        } else {
            Some(Self {
                id: entity.id,
                name,
            })
        }
    }

    /// Follow a relation field on `entity`
    pub fn field(entity: &Entity<'_>, keys: &[&str]) -> Option<Self> {
        entity.nested(keys).and_then(|e| Self::from_entity(&e))
    }

    pub fn id_string(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }
}

/// Name of an optional relation, empty when absent
pub fn relation_name(relation: &Option<Relation>) -> &str {
    relation.as_ref().map(|r| r.name.as_str()).unwrap_or("")
}

/// Specialty as listed by the `specialites` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: Option<i64>,
    #[serde(rename = "nom")]
    pub name: String,
    pub description: String,
}

impl Normalize for Specialty {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            name: entity.text(&["nom", "name", "titre", "title"]),
            description: entity.text(&["description"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relation_from_person() {
        let raw = json!({"data": {"id": 4, "attributes": {"prenom": "A.", "nom": "Bennani"}}});
        let rel = Relation::from_entity(&Entity::unwrap(&raw)).expect("relation");
        assert_eq!(rel.id, Some(4));
        assert_eq!(rel.name, "A. Bennani");
    }

    #[test]
    fn test_relation_name_wins_over_parts() {
        let raw = json!({"id": 4, "name": "A. Bennani", "nom": "ignored"});
        let rel = Relation::from_entity(&Entity::unwrap(&raw)).expect("relation");
        assert_eq!(rel.name, "A. Bennani");
    }

    #[test]
    fn test_relation_from_title() {
        let raw = json!({"id": 9, "titre": "Topographie"});
        let rel = Relation::from_entity(&Entity::unwrap(&raw)).expect("relation");
        assert_eq!(rel.name, "Topographie");
        assert_eq!(rel.id_string().as_deref(), Some("9"));
    }

    #[test]
    fn test_relation_field_absent() {
        let raw = json!({"id": 1, "specialite": {"data": null}});
        assert!(Relation::field(&Entity::unwrap(&raw), &["specialite"]).is_none());
        assert_eq!(relation_name(&None), "");
    }

    #[test]
    fn test_specialty_normalize() {
        let raw = json!({"id": 2, "attributes": {"nom": "Transmissions"}});
        let s = Specialty::normalize(&raw);
        assert_eq!(s.name, "Transmissions");
        assert_eq!(s.description, "");
    }
}
