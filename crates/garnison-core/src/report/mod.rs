//! Printable reports.
//!
//! A report is rendered in two phases: content is laid out page by page
//! (see [`layout::Layout`]), then the finished page list gets its
//! "Page X sur Y" footers and is serialized to PDF. Rendering only reads the
//! records and pre-fetched images it is handed; it never calls the API.

pub mod assets;
pub mod layout;
pub mod pdf;
pub mod table;

mod remarks;
mod sheets;
mod statistics;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::debug;

pub use assets::{load_assets, AssetFetcher, AssetPlan, ImageAsset, ReportAssets};
pub use layout::{LaidOutDocument, SectionStart};

use crate::models::{InstructorDossier, Remark, TraineeDossier};
use crate::stats::{Period, StatisticsSummary};
use layout::{Layout, Letterhead, Orientation};

/// Letterhead used when the configuration has none
pub const DEFAULT_LETTERHEAD: &[&str] = &["CENTRE D'INSTRUCTION", "Bureau de la formation"];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Nothing to print: {0}")]
    Empty(&'static str),

    #[error("No instructor has positive remarks for {0}; no certificate can be issued")]
    NoTopPerformer(String),

    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    TraineeSheet,
    InstructorSheet,
    RemarksList,
    InstructorStatistics,
    Certificate,
}

impl ReportKind {
    /// Filename stem
    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::TraineeSheet => "fiches_stagiaires",
            ReportKind::InstructorSheet => "fiches_instructeurs",
            ReportKind::RemarksList => "remarques",
            ReportKind::InstructorStatistics => "statistiques_instructeurs",
            ReportKind::Certificate => "certificat",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::TraineeSheet => "Fiches stagiaires",
            ReportKind::InstructorSheet => "Fiches instructeurs",
            ReportKind::RemarksList => "Liste des remarques",
            ReportKind::InstructorStatistics => "Statistiques des instructeurs",
            ReportKind::Certificate => "Certificat d'excellence",
        }
    }
}

/// What to print, with every record the report needs
#[derive(Debug, Clone)]
pub enum ReportRequest {
    TraineeSheets(Vec<TraineeDossier>),
    InstructorSheets(Vec<InstructorDossier>),
    RemarksList {
        title: String,
        remarks: Vec<Remark>,
    },
    InstructorStatistics {
        period: Period,
        summary: Option<StatisticsSummary>,
    },
    Certificate(StatisticsSummary),
}

impl ReportRequest {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportRequest::TraineeSheets(_) => ReportKind::TraineeSheet,
            ReportRequest::InstructorSheets(_) => ReportKind::InstructorSheet,
            ReportRequest::RemarksList { .. } => ReportKind::RemarksList,
            ReportRequest::InstructorStatistics { .. } => ReportKind::InstructorStatistics,
            ReportRequest::Certificate(_) => ReportKind::Certificate,
        }
    }

    /// Images this request can use. The border only decorates certificates.
    pub fn asset_plan(&self, logo_url: Option<&str>, border_url: Option<&str>) -> AssetPlan {
        let photo_urls = match self {
            ReportRequest::TraineeSheets(dossiers) => dossiers
                .iter()
                .filter_map(|d| d.trainee.photo.as_ref())
                .map(|p| p.url.clone())
                .collect(),
            ReportRequest::InstructorSheets(dossiers) => dossiers
                .iter()
                .filter_map(|d| d.instructor.photo.as_ref())
                .map(|p| p.url.clone())
                .collect(),
            _ => Vec::new(),
        };
        let border_url = match self {
            ReportRequest::Certificate(_) => border_url.map(str::to_string),
            _ => None,
        };
        AssetPlan {
            logo_url: logo_url.map(str::to_string),
            border_url,
            photo_urls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub letterhead: Vec<String>,
    pub generated_at: NaiveDateTime,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            letterhead: DEFAULT_LETTERHEAD.iter().map(|s| s.to_string()).collect(),
            generated_at: Local::now().naive_local(),
        }
    }
}

impl RenderOptions {
    pub fn new(letterhead: Vec<String>) -> Self {
        let mut options = Self::default();
        if !letterhead.is_empty() {
            options.letterhead = letterhead;
        }
        options
    }

    pub fn at(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }
}

/// A finished PDF ready to be written out
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl RenderedReport {
    /// Write into `dir`, creating it if needed
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `<kind>_<YYYYMMDD_HHMMSS>.pdf`
pub fn report_filename(kind: ReportKind, generated_at: NaiveDateTime) -> String {
    format!("{}_{}.pdf", kind.slug(), generated_at.format("%Y%m%d_%H%M%S"))
}

/// Phase one and two without PDF serialization
pub fn layout_report(
    request: &ReportRequest,
    options: &RenderOptions,
    assets: &ReportAssets,
) -> Result<LaidOutDocument, ReportError> {
    let orientation = match request {
        ReportRequest::Certificate(_) => Orientation::Landscape,
        _ => Orientation::Portrait,
    };
    let mut layout = Layout::new(
        orientation,
        Letterhead {
            lines: options.letterhead.clone(),
            logo: None,
            date: options.generated_at.format("%d/%m/%Y").to_string(),
        },
    );
    let logo = assets.logo.clone().map(|image| layout.add_image(image));
    layout.set_logo(logo);

    match request {
        ReportRequest::TraineeSheets(dossiers) => {
            if dossiers.is_empty() {
                return Err(ReportError::Empty("no trainee selected"));
            }
            sheets::trainee_sheets(&mut layout, dossiers, assets);
        }
        ReportRequest::InstructorSheets(dossiers) => {
            if dossiers.is_empty() {
                return Err(ReportError::Empty("no instructor selected"));
            }
            sheets::instructor_sheets(&mut layout, dossiers, assets);
        }
        ReportRequest::RemarksList { title, remarks } => {
            remarks::remarks_list(&mut layout, title, remarks);
        }
        ReportRequest::InstructorStatistics { period, summary } => {
            statistics::statistics_table(&mut layout, period, summary.as_ref());
        }
        ReportRequest::Certificate(summary) => {
            let top = summary
                .top_positive
                .as_ref()
                .ok_or_else(|| ReportError::NoTopPerformer(summary.period.label()))?;
            let border = assets.border.clone().map(|image| layout.add_image(image));
            layout.set_background(border);
            statistics::certificate(
                &mut layout,
                summary,
                top,
                options.generated_at,
                border.is_some(),
            );
        }
    }

    Ok(layout.finish())
}

/// Render a report to PDF bytes.
pub fn render_report(
    request: &ReportRequest,
    options: &RenderOptions,
    assets: &ReportAssets,
) -> Result<RenderedReport, ReportError> {
    let kind = request.kind();
    let laid_out = layout_report(request, options, assets)?;
    debug!(
        kind = kind.slug(),
        pages = laid_out.page_count(),
        sections = laid_out.sections.len(),
        images = laid_out.images.len(),
        "Report laid out"
    );

    let bytes = pdf::write_pdf(&laid_out, kind.title())?;
    Ok(RenderedReport {
        filename: report_filename(kind, options.generated_at),
        bytes,
        page_count: laid_out.page_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::assets::tests::FakeFetcher;
    use super::*;
    use crate::models::{Consultation, Instructor, Trainee};
    use crate::normalize::Normalize;
    use crate::stats::compute_statistics;
    use chrono::NaiveDate;
    use serde_json::json;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn options() -> RenderOptions {
        RenderOptions::new(vec!["CENTRE D'INSTRUCTION".into(), "Bureau formation".into()]).at(fixed_time())
    }

    fn trainee(id: i64, first: &str, last: &str) -> Trainee {
        Trainee::normalize(&json!({
            "id": id,
            "attributes": {
                "prenom": first,
                "nom": last,
                "matricule": format!("M-{}", id),
                "photo": {"data": {"id": 9, "attributes": {"url": format!("/uploads/p{}.png", id)}}}
            }
        }))
    }

    fn remarks() -> Vec<Remark> {
        let raw = json!({"data": [
            {"id": 1, "attributes": {"date": "2024-03-04", "type": "positive", "contenu": "Bon cours",
                "instructeur": {"data": {"id": 7, "attributes": {"prenom": "Karim", "nom": "Idrissi"}}}}},
            {"id": 2, "attributes": {"date": "2024-03-05", "type": "positive", "contenu": "Clair",
                "instructeur": {"data": {"id": 7, "attributes": {"prenom": "Karim", "nom": "Idrissi"}}}}},
            {"id": 3, "attributes": {"date": "2024-03-04", "type": "negative", "contenu": "Retard",
                "instructeur": {"data": {"id": 7, "attributes": {"prenom": "Karim", "nom": "Idrissi"}}}}}
        ]});
        crate::normalize::normalize_collection(&raw)
    }

    #[test]
    fn test_trainee_sheets_one_section_per_trainee() {
        let request = ReportRequest::TraineeSheets(vec![
            TraineeDossier::new(trainee(1, "Youssef", "Alaoui")),
            TraineeDossier::new(trainee(2, "Sara", "Bennani")),
        ]);
        let doc = layout_report(&request, &options(), &ReportAssets::default()).unwrap();

        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["FICHE STAGIAIRE - ALAOUI Youssef", "FICHE STAGIAIRE - BENNANI Sara"]
        );
        assert!(doc.sections[0].page < doc.sections[1].page);
        for section in &doc.sections {
            let page = &doc.pages[section.page];
            assert!(page.has_header);
            let texts = page.texts();
            let header = texts.iter().position(|t| *t == "CENTRE D'INSTRUCTION").unwrap();
            let title = texts.iter().position(|t| *t == section.title).unwrap();
            assert!(header < title);
        }
    }

    #[test]
    fn test_missing_fields_use_placeholders() {
        let request = ReportRequest::TraineeSheets(vec![TraineeDossier::new(trainee(1, "Youssef", "Alaoui"))]);
        let doc = layout_report(&request, &options(), &ReportAssets::default()).unwrap();
        let texts = doc.all_text();
        assert!(texts.contains(&"Non spécifié"));
        assert!(texts.contains(&"M-1"));
        assert!(!texts.iter().any(|t| t.contains("null") || t.contains("undefined")));
    }

    #[test]
    fn test_trainee_sheet_lists_exactly_given_records() {
        let mut dossier = TraineeDossier::new(trainee(1, "Youssef", "Alaoui"));
        dossier.consultations = vec![Consultation::normalize(&json!({"id": 4, "date": "2024-03-02", "note": "Entorse"}))];
        let doc = layout_report(&ReportRequest::TraineeSheets(vec![dossier]), &options(), &ReportAssets::default())
            .unwrap();
        let texts = doc.all_text();
        assert!(texts.contains(&"Consultations (1)"));
        assert!(texts.contains(&"Entorse"));
        assert!(texts.contains(&"Aucune punition enregistrée."));
    }

    #[tokio::test]
    async fn test_failed_logo_still_renders_document() {
        let fetcher = FakeFetcher::new(&[]);
        let request = ReportRequest::RemarksList {
            title: "REMARQUES DE MARS".into(),
            remarks: remarks(),
        };
        let plan = request.asset_plan(Some("/uploads/logo.png"), None);
        let assets = load_assets(&fetcher, &plan).await;
        assert!(assets.logo.is_none());

        let report = render_report(&request, &options(), &assets).unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));

        let doc = layout_report(&request, &options(), &assets).unwrap();
        assert_eq!(doc.image_count(), 0);
        assert!(doc.images.is_empty());
        let texts = doc.all_text();
        assert!(texts.contains(&"REMARQUES DE MARS"));
        assert!(texts.contains(&"Bon cours"));
    }

    #[tokio::test]
    async fn test_logo_and_photo_embedded_once() {
        let fetcher = FakeFetcher::new(&["/uploads/logo.png", "/uploads/p1.png"]);
        let request = ReportRequest::TraineeSheets(vec![TraineeDossier::new(trainee(1, "Youssef", "Alaoui"))]);
        let assets = load_assets(&fetcher, &request.asset_plan(Some("/uploads/logo.png"), None)).await;

        let doc = layout_report(&request, &options(), &assets).unwrap();
        assert_eq!(doc.images.len(), 2);
        assert_eq!(doc.pages[0].image_count(), 2);
    }

    #[tokio::test]
    async fn test_shared_photo_embedded_once_across_sheets() {
        let fetcher = FakeFetcher::new(&["/uploads/p1.png"]);
        let mut twin = trainee(2, "Sara", "Bennani");
        twin.photo = trainee(1, "Youssef", "Alaoui").photo;
        let request = ReportRequest::TraineeSheets(vec![
            TraineeDossier::new(trainee(1, "Youssef", "Alaoui")),
            TraineeDossier::new(twin),
        ]);
        let assets = load_assets(&fetcher, &request.asset_plan(None, None)).await;

        let doc = layout_report(&request, &options(), &assets).unwrap();
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.image_count(), 2);
    }

    #[test]
    fn test_remarks_grouped_by_day_in_order() {
        let request = ReportRequest::RemarksList {
            title: "REMARQUES".into(),
            remarks: remarks(),
        };
        let doc = layout_report(&request, &options(), &ReportAssets::default()).unwrap();
        let texts = doc.all_text();
        let first = texts.iter().position(|t| *t == "04/03/2024 (2)").unwrap();
        let second = texts.iter().position(|t| *t == "05/03/2024 (1)").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_statistics_without_data_prints_message() {
        let period: Period = "2023-01".parse().unwrap();
        let request = ReportRequest::InstructorStatistics {
            summary: compute_statistics(&remarks(), &period),
            period,
        };
        let doc = layout_report(&request, &options(), &ReportAssets::default()).unwrap();
        assert!(doc.all_text().contains(&"Aucune donnée disponible pour cette période."));
    }

    #[test]
    fn test_statistics_prints_two_decimals() {
        let period: Period = "2024-03".parse().unwrap();
        let request = ReportRequest::InstructorStatistics {
            summary: compute_statistics(&remarks(), &period),
            period,
        };
        let doc = layout_report(&request, &options(), &ReportAssets::default()).unwrap();
        assert!(doc.all_text().contains(&"66.67%"));
    }

    #[test]
    fn test_certificate_requires_top_performer() {
        let raw = json!([{"id": 1, "date": "2024-03-04", "type": "negative",
            "instructeur": {"id": 7, "name": "Idrissi"}}]);
        let period: Period = "2024-03".parse().unwrap();
        let remarks = crate::normalize::normalize_collection::<Remark>(&raw);
        let summary = compute_statistics(&remarks, &period).unwrap();
        let err = render_report(&ReportRequest::Certificate(summary), &options(), &ReportAssets::default())
            .unwrap_err();
        assert!(matches!(err, ReportError::NoTopPerformer(_)));
    }

    #[test]
    fn test_certificate_is_landscape_with_recipient() {
        let period: Period = "2024-03".parse().unwrap();
        let summary = compute_statistics(&remarks(), &period).unwrap();
        let request = ReportRequest::Certificate(summary);
        let doc = layout_report(&request, &options(), &ReportAssets::default()).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages[0].width > doc.pages[0].height);
        assert!(doc.all_text().contains(&"Karim Idrissi"));
    }

    #[test]
    fn test_filename_carries_kind_and_timestamp() {
        let request = ReportRequest::InstructorSheets(vec![InstructorDossier::new(Instructor::normalize(
            &json!({"id": 7, "prenom": "Karim", "nom": "Idrissi"}),
        ))]);
        let report = render_report(&request, &options(), &ReportAssets::default()).unwrap();
        assert_eq!(report.filename, "fiches_instructeurs_20240315_140509.pdf");
        assert_eq!(report.page_count, 1);
    }

    #[test]
    fn test_empty_selection_is_an_error() {
        let err = render_report(&ReportRequest::TraineeSheets(vec![]), &options(), &ReportAssets::default())
            .unwrap_err();
        assert!(matches!(err, ReportError::Empty(_)));
    }

    #[test]
    fn test_save_in_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = RenderedReport {
            filename: "remarques_20240315_140509.pdf".into(),
            bytes: b"%PDF-1.5".to_vec(),
            page_count: 1,
        };
        let path = report.save_in(&dir.path().join("exports")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.5");
    }
}
