use super::layout::{Color, Font, Layout};
use super::table::{draw_table, REMARK_LIST_COLUMNS};
use crate::filter::{group_by, sort_remarks_by_date};
use crate::models::{relation_name, Remark};
use crate::utils::{format_date, format_time_range};

const UNDATED: &str = "Sans date";

/// Remarks grouped under one heading per day, oldest day first.
pub(super) fn remarks_list(layout: &mut Layout, title: &str, remarks: &[Remark]) {
    layout.begin_record(title);

    let positive = remarks.iter().filter(|r| r.is_positive()).count();
    let negative = remarks.iter().filter(|r| r.is_negative()).count();
    layout.paragraph(
        &format!(
            "Total : {} remarque(s), dont {} positive(s) et {} négative(s)",
            remarks.len(),
            positive,
            negative
        ),
        10.0,
        Font::Regular,
        Color::GREY,
    );
    layout.spacer(8.0);

    if remarks.is_empty() {
        layout.paragraph(
            "Aucune remarque pour cette sélection.",
            11.0,
            Font::Italic,
            Color::GREY,
        );
        return;
    }

    let mut sorted: Vec<&Remark> = remarks.iter().collect();
    sort_remarks_by_date(&mut sorted, true);

    let groups = group_by(&sorted, |r| day_label(r));

    for (day, group) in &groups {
        layout.heading(&format!("{} ({})", day, group.len()));
        let rows: Vec<Vec<String>> = group
            .iter()
            .map(|r| {
                vec![
                    format_time_range(&r.start_time, &r.end_time),
                    relation_name(&r.trainee).to_string(),
                    r.instructor_name().to_string(),
                    r.subject_title().to_string(),
                    r.kind_label().to_string(),
                    r.content.clone(),
                ]
            })
            .collect();
        draw_table(layout, REMARK_LIST_COLUMNS, &rows, "");
    }
}

fn day_label(remark: &Remark) -> String {
    if remark.day().is_some() {
        format_date(&remark.date)
    } else {
        UNDATED.to_string()
    }
}
