//! Instructor statistics table and the top-performer certificate.

use chrono::NaiveDateTime;

use super::layout::{line_height, Align, Color, DrawOp, Font, Layout};
use super::table::{draw_table, STATISTICS_COLUMNS};
use crate::stats::{Period, StatisticsSnapshot, StatisticsSummary};
use crate::utils::{format_percent_print, NOT_AVAILABLE};

pub(super) fn statistics_table(
    layout: &mut Layout,
    period: &Period,
    summary: Option<&StatisticsSummary>,
) {
    layout.begin_record("STATISTIQUES DES INSTRUCTEURS");
    layout.paragraph(
        &format!("Période : {}", period.label()),
        11.0,
        Font::Bold,
        Color::BLACK,
    );
    layout.spacer(8.0);

    let summary = match summary {
        Some(summary) if !summary.snapshots.is_empty() => summary,
        _ => {
            layout.paragraph(
                "Aucune donnée disponible pour cette période.",
                11.0,
                Font::Italic,
                Color::GREY,
            );
            return;
        }
    };

    let typed = summary.total_positive() + summary.total_negative();
    let overall = if typed == 0 {
        0.0
    } else {
        f64::from(summary.total_positive()) / f64::from(typed) * 100.0
    };
    layout.heading("Synthèse");
    let left = layout.left();
    let width = layout.content_width();
    layout.field_row(left, width, "Remarques", &summary.remark_count.to_string());
    layout.field_row(left, width, "Positives", &summary.total_positive().to_string());
    layout.field_row(left, width, "Négatives", &summary.total_negative().to_string());
    layout.field_row(left, width, "Taux de satisfaction", &format_percent_print(overall));
    let best = top_line(summary.top_positive.as_ref(), |s| s.positive, "positive");
    let worst = top_line(summary.top_negative.as_ref(), |s| s.negative, "négative");
    layout.field_row(left, width, "Meilleur instructeur", &best);
    layout.field_row(left, width, "Plus de remarques négatives", &worst);
    layout.spacer(10.0);

    layout.heading(&format!("Classement ({} instructeurs)", summary.snapshots.len()));
    let rows: Vec<Vec<String>> = summary
        .ranked()
        .iter()
        .enumerate()
        .map(|(rank, s)| {
            vec![
                (rank + 1).to_string(),
                s.instructor.name.clone(),
                s.positive.to_string(),
                s.negative.to_string(),
                s.total.to_string(),
                s.score_print(),
            ]
        })
        .collect();
    draw_table(layout, STATISTICS_COLUMNS, &rows, "");
}

fn top_line(
    snapshot: Option<&StatisticsSnapshot>,
    count: impl Fn(&StatisticsSnapshot) -> u32,
    kind: &str,
) -> String {
    match snapshot {
        Some(s) => format!("{} ({} remarque(s) {}(s))", s.instructor.name, count(s), kind),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn centered(layout: &mut Layout, text: &str, size: f32, font: Font, color: Color) {
    let y = layout.cursor() + size;
    layout.text_aligned(y, text, size, font, color, Align::Center);
    layout.advance(line_height(size));
}

/// Landscape certificate for the instructor with the most positive remarks.
/// The caller guarantees `top` is the period's top performer.
pub(super) fn certificate(
    layout: &mut Layout,
    summary: &StatisticsSummary,
    top: &StatisticsSnapshot,
    generated_at: NaiveDateTime,
    has_border: bool,
) {
    layout.begin_record("CERTIFICAT D'EXCELLENCE");

    if !has_border {
        let (width, height) = layout.page_size();
        for (inset, line_width) in [(14.0, 3.0), (22.0, 0.8)] {
            layout.push(DrawOp::StrokeRect {
                x: inset,
                y: inset,
                w: width - 2.0 * inset,
                h: height - 2.0 * inset,
                color: Color::GOLD,
                width: line_width,
            });
        }
    }

    layout.spacer(12.0);
    centered(layout, "Le présent certificat est décerné à", 13.0, Font::Italic, Color::BLACK);
    layout.spacer(10.0);
    centered(layout, &top.instructor.name, 26.0, Font::Bold, Color::GOLD);
    layout.spacer(10.0);
    centered(
        layout,
        "en reconnaissance de la qualité de son encadrement",
        13.0,
        Font::Regular,
        Color::BLACK,
    );
    centered(
        layout,
        &format!("pour la période : {}", summary.period.label()),
        13.0,
        Font::Regular,
        Color::BLACK,
    );
    layout.spacer(8.0);
    centered(
        layout,
        &format!(
            "{} remarque(s) positive(s) sur {} (score {})",
            top.positive,
            top.total,
            top.score_print()
        ),
        11.0,
        Font::Regular,
        Color::NAVY,
    );

    layout.spacer(30.0);
    let y = layout.cursor() + 11.0;
    let (left, right) = (layout.left() + 40.0, layout.right() - 40.0);
    layout.text_in(
        left,
        right,
        y,
        &format!("Fait le {}", generated_at.format("%d/%m/%Y")),
        11.0,
        Font::Regular,
        Color::BLACK,
        Align::Left,
    );
    layout.text_in(
        left,
        right,
        y,
        "Le Commandant du centre",
        11.0,
        Font::Bold,
        Color::BLACK,
        Align::Right,
    );
}
