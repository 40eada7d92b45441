//! Per-record sheets: one trainee or instructor per page run.

use super::assets::ReportAssets;
use super::layout::{Color, Font, Layout};
use super::table::{
    draw_table, CONSULTATION_COLUMNS, INSTRUCTOR_REMARK_COLUMNS, PERMISSION_COLUMNS,
    PUNISHMENT_COLUMNS, TRAINEE_REMARK_COLUMNS,
};
use crate::models::{
    relation_name, Attachment, Consultation, InstructorDossier, Permission, Punishment, Remark,
    TraineeDossier,
};
use crate::utils::{format_date, format_time_range, or_placeholder, NOT_SPECIFIED};

const PHOTO_WIDTH: f32 = 90.0;
const PHOTO_HEIGHT: f32 = 110.0;
const PHOTO_GAP: f32 = 16.0;

fn field(value: &str) -> String {
    or_placeholder(value, NOT_SPECIFIED).to_string()
}

fn date_field(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        format_date(value)
    }
}

/// Identity block: label/value rows on the left, photo on the right.
fn identity_block(
    layout: &mut Layout,
    assets: &ReportAssets,
    photo: Option<&Attachment>,
    rows: &[(&str, String)],
) {
    layout.ensure_space(PHOTO_HEIGHT);
    let top = layout.cursor();
    let column_width = layout.content_width() - PHOTO_WIDTH - PHOTO_GAP;

    if let Some((url, image)) = photo.and_then(|p| assets.photo(&p.url).map(|i| (&p.url, i))) {
        let (w, h) = image.fit(PHOTO_WIDTH, PHOTO_HEIGHT);
        let x = layout.right() - PHOTO_WIDTH + (PHOTO_WIDTH - w) / 2.0;
        let id = layout.image_for_url(url, image);
        layout.image(id, x, top, w, h);
    }

    let left = layout.left();
    for (label, value) in rows {
        layout.field_row(left, column_width, label, value);
    }

    let photo_bottom = top + PHOTO_HEIGHT;
    if layout.cursor() < photo_bottom {
        let gap = photo_bottom - layout.cursor();
        layout.advance(gap);
    }
    layout.spacer(12.0);
}

fn trainee_remark_rows(remarks: &[Remark]) -> Vec<Vec<String>> {
    remarks
        .iter()
        .map(|r| {
            vec![
                format_date(&r.date),
                format_time_range(&r.start_time, &r.end_time),
                r.instructor_name().to_string(),
                r.kind_label().to_string(),
                r.content.clone(),
            ]
        })
        .collect()
}

fn consultation_rows(consultations: &[Consultation]) -> Vec<Vec<String>> {
    consultations
        .iter()
        .map(|c| {
            vec![
                format_date(&c.date),
                c.note.clone(),
                c.file.as_ref().map(|f| f.name.clone()).unwrap_or_default(),
            ]
        })
        .collect()
}

fn punishment_rows(punishments: &[Punishment]) -> Vec<Vec<String>> {
    punishments
        .iter()
        .map(|p| vec![format_date(&p.date), p.reason.clone(), p.duration_display()])
        .collect()
}

fn permission_rows(permissions: &[Permission]) -> Vec<Vec<String>> {
    permissions
        .iter()
        .map(|p| {
            vec![
                format_date(&p.start_date),
                format_date(&p.end_date),
                p.days().map(|d| d.to_string()).unwrap_or_default(),
                p.reason.clone(),
            ]
        })
        .collect()
}

pub(super) fn trainee_sheets(layout: &mut Layout, dossiers: &[TraineeDossier], assets: &ReportAssets) {
    for dossier in dossiers {
        let t = &dossier.trainee;
        layout.begin_record(&format!("FICHE STAGIAIRE - {}", t.display_name()));

        let birth = match t.age() {
            Some(age) => format!("{} ({} ans)", date_field(&t.birth_date), age),
            None => date_field(&t.birth_date),
        };
        let rows = [
            ("Nom", field(&t.last_name)),
            ("Prénom", field(&t.first_name)),
            ("CIN", field(&t.national_id)),
            ("Matricule", field(&t.service_number)),
            ("Grade", field(&t.grade)),
            ("Date de naissance", birth),
            ("Groupe sanguin", field(&t.blood_group)),
            ("Adresse", field(&t.address)),
            ("Téléphone", field(&t.phone)),
            ("Spécialité", field(t.specialty_name())),
            ("Stage", field(relation_name(&t.training_program))),
            ("Brigade", field(relation_name(&t.brigade))),
        ];
        identity_block(layout, assets, t.photo.as_ref(), &rows);

        layout.heading(&format!("Remarques ({})", dossier.remarks.len()));
        draw_table(
            layout,
            TRAINEE_REMARK_COLUMNS,
            &trainee_remark_rows(&dossier.remarks),
            "Aucune remarque enregistrée.",
        );

        layout.heading(&format!("Consultations ({})", dossier.consultations.len()));
        draw_table(
            layout,
            CONSULTATION_COLUMNS,
            &consultation_rows(&dossier.consultations),
            "Aucune consultation enregistrée.",
        );

        layout.heading(&format!("Punitions ({})", dossier.punishments.len()));
        draw_table(
            layout,
            PUNISHMENT_COLUMNS,
            &punishment_rows(&dossier.punishments),
            "Aucune punition enregistrée.",
        );

        layout.heading(&format!("Permissions ({})", dossier.permissions.len()));
        draw_table(
            layout,
            PERMISSION_COLUMNS,
            &permission_rows(&dossier.permissions),
            "Aucune permission enregistrée.",
        );
    }
}

pub(super) fn instructor_sheets(
    layout: &mut Layout,
    dossiers: &[InstructorDossier],
    assets: &ReportAssets,
) {
    for dossier in dossiers {
        let i = &dossier.instructor;
        layout.begin_record(&format!("FICHE INSTRUCTEUR - {}", i.display_name()));

        let rows = [
            ("Nom", field(&i.last_name)),
            ("Prénom", field(&i.first_name)),
            ("CIN", field(&i.national_id)),
            ("Matricule", field(&i.service_number)),
            ("Grade", field(&i.grade)),
            ("Téléphone", field(&i.phone)),
            ("Spécialité", field(i.specialty_name())),
        ];
        identity_block(layout, assets, i.photo.as_ref(), &rows);

        let positive = dossier.remarks.iter().filter(|r| r.is_positive()).count();
        let negative = dossier.remarks.iter().filter(|r| r.is_negative()).count();
        layout.heading(&format!("Remarques ({})", dossier.remarks.len()));
        layout.paragraph(
            &format!("Positives : {}    Négatives : {}", positive, negative),
            10.0,
            Font::Regular,
            Color::GREY,
        );
        layout.spacer(4.0);

        let rows: Vec<Vec<String>> = dossier
            .remarks
            .iter()
            .map(|r| {
                vec![
                    format_date(&r.date),
                    format_time_range(&r.start_time, &r.end_time),
                    relation_name(&r.trainee).to_string(),
                    r.subject_title().to_string(),
                    r.kind_label().to_string(),
                    r.content.clone(),
                ]
            })
            .collect();
        draw_table(layout, INSTRUCTOR_REMARK_COLUMNS, &rows, "Aucune remarque enregistrée.");
    }
}
