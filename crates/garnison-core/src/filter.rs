//! Client-side filtering, grouping and sorting of normalized records.
//!
//! Everything here is pure: records come in as slices and go out as
//! borrowed views in their original order.

use std::hash::Hash;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::models::{
    relation_name, Consultation, Instructor, Relation, Remark, RemarkKind, Subject, Trainee,
};
use crate::utils::{cmp_ignore_case, contains_ignore_case, parse_date};

/// A field that can be matched exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Specialty,
    Grade,
    Date,
    Type,
    /// Category id: the specialty of a person or subject, the subject of a remark
    Category,
    Brigade,
    Instructor,
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "specialty" | "specialite" => Ok(FilterField::Specialty),
            "grade" => Ok(FilterField::Grade),
            "date" => Ok(FilterField::Date),
            "type" => Ok(FilterField::Type),
            "category" | "categorie" => Ok(FilterField::Category),
            "brigade" => Ok(FilterField::Brigade),
            "instructor" | "instructeur" => Ok(FilterField::Instructor),
            other => Err(format!("Unknown filter field: {}", other)),
        }
    }
}

/// A record the filter engine can search.
pub trait Searchable {
    /// Display fields the free-text query is matched against
    fn search_fields(&self) -> Vec<&str>;

    /// Value for an exact filter; `None` when the record has no such field
    fn field_value(&self, field: FilterField) -> Option<String>;
}

/// Free-text query plus exact field filters, all ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    query: Option<String>,
    fields: Vec<(FilterField, String)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text query; blank text means no query.
    pub fn query(mut self, text: &str) -> Self {
        let text = text.trim();
        self.query = (!text.is_empty()).then(|| text.to_lowercase());
        self
    }

    /// Add an exact filter. Dates and remark types are canonicalized.
    pub fn with(mut self, field: FilterField, value: &str) -> Self {
        let value = value.trim();
        let value = match field {
            FilterField::Date => parse_date(value)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| value.to_string()),
            FilterField::Type => RemarkKind::parse(value)
                .map(|k| k.as_str().to_string())
                .unwrap_or_else(|| value.to_lowercase()),
            _ => value.to_string(),
        };
        self.fields.push((field, value));
        self
    }

    /// Optional variant of `with`, for CLI flags
    pub fn with_opt(self, field: FilterField, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => self.with(field, v),
            _ => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.fields.is_empty()
    }

    pub fn matches<T: Searchable>(&self, record: &T) -> bool {
        if let Some(ref query) = self.query {
            let hit = record
                .search_fields()
                .iter()
                .any(|field| contains_ignore_case(field, query));
            if !hit {
                return false;
            }
        }

        self.fields
            .iter()
            .all(|(field, expected)| record.field_value(*field).as_deref() == Some(expected.as_str()))
    }
}

/// Records satisfying every clause of `spec`, in input order
pub fn filter<'a, T: Searchable>(records: &'a [T], spec: &FilterSpec) -> Vec<&'a T> {
    records.iter().filter(|r| spec.matches(*r)).collect()
}

/// Group records by a caller-supplied key.
///
/// Keys appear in first-seen order; each group keeps input order.
pub fn group_by<'a, T, K, F>(records: &'a [T], mut key_fn: F) -> IndexMap<K, Vec<&'a T>>
where
    K: Hash + Eq,
    F: FnMut(&T) -> K,
{
    let mut groups: IndexMap<K, Vec<&'a T>> = IndexMap::new();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record);
    }
    groups
}

/// Sort options for trainee and instructor tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersonSortColumn {
    #[default]
    Name,
    ServiceNumber,
    Grade,
    Specialty,
}

impl PersonSortColumn {
    pub fn next(&self) -> Self {
        match self {
            PersonSortColumn::Name => PersonSortColumn::ServiceNumber,
            PersonSortColumn::ServiceNumber => PersonSortColumn::Grade,
            PersonSortColumn::Grade => PersonSortColumn::Specialty,
            PersonSortColumn::Specialty => PersonSortColumn::Name,
        }
    }
}

impl FromStr for PersonSortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "nom" => Ok(PersonSortColumn::Name),
            "matricule" | "service-number" => Ok(PersonSortColumn::ServiceNumber),
            "grade" => Ok(PersonSortColumn::Grade),
            "specialty" | "specialite" => Ok(PersonSortColumn::Specialty),
            other => Err(format!("Unknown sort column: {}", other)),
        }
    }
}

/// Fields shared by trainees and instructors for sorting
pub trait Person {
    fn first_name(&self) -> &str;
    fn last_name(&self) -> &str;
    fn service_number(&self) -> &str;
    fn grade(&self) -> &str;
    fn specialty(&self) -> &str;
}

macro_rules! impl_person {
    ($ty:ty) => {
        impl Person for $ty {
            fn first_name(&self) -> &str {
                &self.first_name
            }
            fn last_name(&self) -> &str {
                &self.last_name
            }
            fn service_number(&self) -> &str {
                &self.service_number
            }
            fn grade(&self) -> &str {
                &self.grade
            }
            fn specialty(&self) -> &str {
                relation_name(&self.specialty)
            }
        }
    };
}

impl_person!(Trainee);
impl_person!(Instructor);

/// Sort people in place; ties fall back to last then first name.
pub fn sort_people<T: Person>(people: &mut [&T], column: PersonSortColumn, ascending: bool) {
    people.sort_by(|a, b| {
        let name_cmp = |x: &T, y: &T| {
            cmp_ignore_case(x.last_name(), y.last_name())
                .then_with(|| cmp_ignore_case(x.first_name(), y.first_name()))
        };

        let cmp = match column {
            PersonSortColumn::Name => name_cmp(a, b),
            PersonSortColumn::ServiceNumber => {
                cmp_ignore_case(a.service_number(), b.service_number()).then_with(|| name_cmp(a, b))
            }
            PersonSortColumn::Grade => {
                cmp_ignore_case(a.grade(), b.grade()).then_with(|| name_cmp(a, b))
            }
            PersonSortColumn::Specialty => {
                cmp_ignore_case(a.specialty(), b.specialty()).then_with(|| name_cmp(a, b))
            }
        };

        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}

/// Sort remarks by date then start time; stable for equal keys.
pub fn sort_remarks_by_date(remarks: &mut [&Remark], ascending: bool) {
    remarks.sort_by(|a, b| {
        let cmp = a
            .day()
            .cmp(&b.day())
            .then_with(|| a.start_time.cmp(&b.start_time));
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn relation_id(rel: &Option<Relation>) -> Option<String> {
    rel.as_ref().and_then(Relation::id_string)
}

fn date_key(date: &str) -> Option<String> {
    parse_date(date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .or_else(|| non_empty(date))
}

impl Searchable for Trainee {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.service_number.as_str(),
        ]
    }

    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::Specialty => non_empty(relation_name(&self.specialty)),
            FilterField::Grade => non_empty(&self.grade),
            FilterField::Brigade => non_empty(relation_name(&self.brigade)),
            FilterField::Category => relation_id(&self.specialty),
            FilterField::Date | FilterField::Type | FilterField::Instructor => None,
        }
    }
}

impl Searchable for Instructor {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.service_number.as_str(),
        ]
    }

    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::Specialty => non_empty(relation_name(&self.specialty)),
            FilterField::Grade => non_empty(&self.grade),
            FilterField::Category => relation_id(&self.specialty),
            FilterField::Instructor => self.id.map(|id| id.to_string()),
            FilterField::Date | FilterField::Type | FilterField::Brigade => None,
        }
    }
}

impl Searchable for Subject {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }

    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::Specialty => non_empty(self.specialty_label()),
            FilterField::Category => relation_id(&self.specialty),
            _ => None,
        }
    }
}

impl Searchable for Remark {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.content.as_str()]
    }

    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::Date => date_key(&self.date),
            FilterField::Type => self.kind.map(|k| k.as_str().to_string()),
            FilterField::Instructor => relation_id(&self.instructor),
            FilterField::Category => relation_id(&self.subject),
            _ => None,
        }
    }
}

impl Searchable for Consultation {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.note.as_str()]
    }

    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::Date => date_key(&self.date),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalize;
    use serde_json::json;

    fn trainees() -> Vec<Trainee> {
        [
            json!({"id": 1, "prenom": "Youssef", "nom": "Bennani", "matricule": "M-1", "grade": "Caporal",
                   "specialite": {"id": 2, "name": "Transmissions"}}),
            json!({"id": 2, "prenom": "Omar", "nom": "Alaoui", "matricule": "BEN-22", "grade": "Soldat"}),
            json!({"id": 3, "prenom": "Karim", "nom": "Tazi", "matricule": "M-3", "grade": "Caporal",
                   "adresse": "Rue Ben Barka", "specialite": {"id": 3, "name": "Génie"}}),
            json!({"id": 4, "prenom": "Benjamin", "nom": "Idrissi", "matricule": "M-4", "grade": "Soldat"}),
            json!({"id": 5, "prenom": "Sara", "nom": "Fassi", "matricule": "M-5", "grade": "Caporal",
                   "specialite": {"id": 2, "name": "Transmissions"}}),
        ]
        .iter()
        .map(Trainee::normalize)
        .collect()
    }

    fn ids<T>(records: &[&T], id: impl Fn(&T) -> Option<i64>) -> Vec<i64> {
        records.iter().filter_map(|r| id(r)).collect()
    }

    #[test]
    fn test_free_text_on_name_and_service_number() {
        let list = trainees();
        let spec = FilterSpec::new().query("BEN");
        let found = filter(&list, &spec);
        // Tazi lives on "Rue Ben Barka" but the address is not a search field
        assert_eq!(ids(&found, |t: &Trainee| t.id), vec![1, 2, 4]);
    }

    #[test]
    fn test_filter_soundness_and_completeness() {
        let list = trainees();
        let spec = FilterSpec::new()
            .query("a")
            .with(FilterField::Grade, "Caporal")
            .with(FilterField::Specialty, "Transmissions");
        let found = filter(&list, &spec);

        for t in &list {
            let kept = found.iter().any(|f| f.id == t.id);
            assert_eq!(kept, spec.matches(t));
        }
        assert_eq!(ids(&found, |t: &Trainee| t.id), vec![1, 5]);
    }

    #[test]
    fn test_missing_field_fails_clause() {
        let list = trainees();
        let spec = FilterSpec::new().with(FilterField::Brigade, "B1");
        assert!(filter(&list, &spec).is_empty());
    }

    #[test]
    fn test_blank_query_is_no_clause() {
        let list = trainees();
        let spec = FilterSpec::new().query("   ");
        assert!(spec.is_empty());
        assert_eq!(filter(&list, &spec).len(), 5);
    }

    #[test]
    fn test_empty_input() {
        let empty: Vec<Trainee> = Vec::new();
        assert!(filter(&empty, &FilterSpec::new().query("x")).is_empty());
        assert!(group_by(&empty, |t| t.grade.clone()).is_empty());
    }

    #[test]
    fn test_remark_type_and_date_filters() {
        let remarks: Vec<Remark> = [
            json!({"id": 1, "date": "2024-03-01", "type": "positive", "contenu": "Bien"}),
            json!({"id": 2, "date": "2024-03-01T09:00:00.000Z", "type": "negative", "contenu": "Retard"}),
            json!({"id": 3, "date": "2024-03-02", "type": "positive", "contenu": "Bien"}),
        ]
        .iter()
        .map(Remark::normalize)
        .collect();

        let spec = FilterSpec::new()
            .with(FilterField::Date, "2024-03-01")
            .with(FilterField::Type, "Positif");
        assert_eq!(ids(&filter(&remarks, &spec), |r: &Remark| r.id), vec![1]);

        let spec = FilterSpec::new().with(FilterField::Date, "2024-03-01");
        assert_eq!(ids(&filter(&remarks, &spec), |r: &Remark| r.id), vec![1, 2]);
    }

    #[test]
    fn test_group_by_date_keeps_order() {
        let remarks: Vec<Remark> = [
            json!({"id": 1, "date": "2024-03-02", "contenu": "a"}),
            json!({"id": 2, "date": "2024-03-01", "contenu": "b"}),
            json!({"id": 3, "date": "2024-03-02", "contenu": "c"}),
        ]
        .iter()
        .map(Remark::normalize)
        .collect();

        let groups = group_by(&remarks, |r| crate::utils::format_date(&r.date));
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["02/03/2024", "01/03/2024"]);
        assert_eq!(ids(&groups["02/03/2024"], |r: &Remark| r.id), vec![1, 3]);
    }

    #[test]
    fn test_sort_people() {
        let list = trainees();
        let mut view: Vec<&Trainee> = list.iter().collect();
        sort_people(&mut view, PersonSortColumn::Name, true);
        let names: Vec<&str> = view.iter().map(|t| t.last_name.as_str()).collect();
        assert_eq!(names, vec!["Alaoui", "Bennani", "Fassi", "Idrissi", "Tazi"]);

        sort_people(&mut view, PersonSortColumn::Grade, false);
        assert_eq!(view[0].grade, "Soldat");
        assert_eq!(PersonSortColumn::Specialty.next(), PersonSortColumn::Name);
    }

    #[test]
    fn test_sort_remarks_by_date() {
        let remarks: Vec<Remark> = [
            json!({"id": 1, "date": "2024-03-02", "heure_debut": "10:00"}),
            json!({"id": 2, "date": "2024-03-01"}),
            json!({"id": 3, "date": "2024-03-02", "heure_debut": "08:00"}),
        ]
        .iter()
        .map(Remark::normalize)
        .collect();
        let mut view: Vec<&Remark> = remarks.iter().collect();
        sort_remarks_by_date(&mut view, true);
        assert_eq!(ids(&view, |r: &Remark| r.id), vec![2, 3, 1]);
    }

    #[test]
    fn test_filter_field_from_str() {
        assert_eq!("Specialite".parse::<FilterField>(), Ok(FilterField::Specialty));
        assert!("color".parse::<FilterField>().is_err());
    }
}
