use serde::{Deserialize, Serialize};

use crate::normalize::{Entity, Normalize};

/// Uploaded file descriptor (`{ name, url, ext, size }`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Option<i64>,
    pub name: String,
    pub url: String,
    pub ext: String,
    /// Size in kilobytes, as the upload plugin reports it
    pub size: Option<f64>,
}

impl Attachment {
    /// Follow a single-file field
    pub fn field(entity: &Entity<'_>, keys: &[&str]) -> Option<Self> {
        entity
            .nested(keys)
            .map(|e| Self::from_entity(&e))
            .filter(|a| !a.url.is_empty())
    }

    /// Follow a multi-file field, keeping order
    pub fn list(entity: &Entity<'_>, keys: &[&str]) -> Vec<Self> {
        entity
            .nested_list(keys)
            .iter()
            .map(Self::from_entity)
            .filter(|a| !a.url.is_empty())
            .collect()
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self.ext.trim_start_matches('.').to_lowercase().as_str(),
            "png" | "jpg" | "jpeg"
        )
    }

    /// "12.5 Ko" style size for listings
    pub fn size_display(&self) -> String {
        match self.size {
            Some(kb) if kb >= 1024.0 => format!("{:.1} Mo", kb / 1024.0),
            Some(kb) => format!("{:.1} Ko", kb),
            None => "-".to_string(),
        }
    }
}

impl Normalize for Attachment {
    fn from_entity(entity: &Entity<'_>) -> Self {
        Self {
            id: entity.id,
            name: entity.text(&["name"]),
            url: entity.text(&["url"]),
            ext: entity.text(&["ext"]),
            size: entity.float(&["size"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attachment_field_wrapped() {
        let raw = json!({"photo": {"data": {"id": 3, "attributes": {
            "name": "portrait.jpg", "url": "/uploads/portrait.jpg", "ext": ".jpg", "size": 48.2
        }}}});
        let a = Attachment::field(&Entity::unwrap(&raw), &["photo"]).expect("photo");
        assert_eq!(a.url, "/uploads/portrait.jpg");
        assert!(a.is_image());
        assert_eq!(a.size_display(), "48.2 Ko");
    }

    #[test]
    fn test_attachment_without_url_is_dropped() {
        let raw = json!({"photo": {"id": 3, "name": "ghost"}});
        assert!(Attachment::field(&Entity::unwrap(&raw), &["photo"]).is_none());
    }

    #[test]
    fn test_size_display() {
        let a = Attachment {
            id: None,
            name: "cours.pdf".into(),
            url: "/uploads/cours.pdf".into(),
            ext: ".pdf".into(),
            size: Some(2048.0),
        };
        assert_eq!(a.size_display(), "2.0 Mo");
        assert!(!a.is_image());
    }
}
