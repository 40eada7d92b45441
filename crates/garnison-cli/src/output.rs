//! Plain-text tables for terminal output.

use garnison_core::models::{
    relation_name, Consultation, Instructor, Remark, Specialty, Subject, Trainee,
};
use garnison_core::utils::{format_date, format_time_range, or_placeholder, truncate, NOT_AVAILABLE};
use garnison_core::StatisticsSummary;

/// Widest a column may grow before its cells are truncated
const MAX_COLUMN_WIDTH: usize = 40;

pub fn id(id: Option<i64>) -> String {
    id.map(|i| i.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn cell(value: &str) -> String {
    truncate(or_placeholder(value, "-"), MAX_COLUMN_WIDTH)
}

/// Render rows under a header, columns padded to their widest cell
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

pub fn trainees(rows: &[&Trainee]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|t| {
            vec![
                id(t.id),
                cell(&t.display_name()),
                cell(&t.service_number),
                cell(&t.grade),
                cell(t.specialty_name()),
                cell(relation_name(&t.brigade)),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["Id", "Nom", "Matricule", "Grade", "Spécialité", "Brigade"], &rows)
    );
}

pub fn instructors(rows: &[&Instructor]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|i| {
            vec![
                id(i.id),
                cell(&i.display_name()),
                cell(&i.service_number),
                cell(&i.grade),
                cell(i.specialty_name()),
                cell(&i.phone),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["Id", "Nom", "Matricule", "Grade", "Spécialité", "Téléphone"], &rows)
    );
}

pub fn subjects(rows: &[&Subject]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|s| {
            vec![
                id(s.id),
                cell(&s.title),
                cell(s.specialty_label()),
                s.documents.len().to_string(),
            ]
        })
        .collect();
    println!("{}", render_table(&["Id", "Matière", "Spécialité", "Documents"], &rows));
}

pub fn remarks(rows: &[&Remark]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                cell(&format_date(&r.date)),
                cell(&format_time_range(&r.start_time, &r.end_time)),
                cell(r.instructor_name()),
                cell(relation_name(&r.trainee)),
                cell(r.kind_label()),
                cell(&r.content),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["Date", "Horaire", "Instructeur", "Stagiaire", "Type", "Contenu"], &rows)
    );
}

pub fn consultations(rows: &[&Consultation]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|c| {
            vec![
                cell(&format_date(&c.date)),
                cell(c.trainee_name()),
                cell(&c.note),
                cell(c.file.as_ref().map(|f| f.name.as_str()).unwrap_or("")),
            ]
        })
        .collect();
    println!("{}", render_table(&["Date", "Stagiaire", "Note", "Pièce jointe"], &rows));
}

pub fn specialties(rows: &[&Specialty]) {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|s| vec![id(s.id), cell(&s.name), cell(&s.description)])
        .collect();
    println!("{}", render_table(&["Id", "Spécialité", "Description"], &rows));
}

pub fn statistics(summary: &StatisticsSummary) {
    println!(
        "Période : {}  |  {} remarque(s), {} positive(s), {} négative(s)\n",
        summary.period.label(),
        summary.remark_count,
        summary.total_positive(),
        summary.total_negative()
    );
    let rows: Vec<Vec<String>> = summary
        .ranked()
        .iter()
        .map(|s| {
            vec![
                cell(&s.instructor.name),
                s.positive.to_string(),
                s.negative.to_string(),
                s.total.to_string(),
                s.score_display(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(&["Instructeur", "Positives", "Négatives", "Total", "Score"], &rows)
    );
    if let Some(ref top) = summary.top_positive {
        println!("\nMeilleur instructeur : {} ({} positive(s))", top.instructor.name, top.positive);
    }
    if let Some(ref top) = summary.top_negative {
        println!("Plus de négatives : {} ({} négative(s))", top.instructor.name, top.negative);
    }
}

/// Heading for a day group
pub fn day_heading(remark: &Remark) -> String {
    match remark.day() {
        Some(day) => day.format("%d/%m/%Y").to_string(),
        None => "Sans date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnison_core::Normalize;
    use serde_json::json;

    #[test]
    fn test_render_table_pads_columns() {
        let table = render_table(
            &["Nom", "Grade"],
            &[vec!["ALAOUI Youssef".into(), "Sergent".into()], vec!["B".into(), "-".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Nom             Grade");
        assert_eq!(lines[1], "--------------  -------");
        assert_eq!(lines[3], "B               -");
    }

    #[test]
    fn test_cell_placeholder_and_truncation() {
        assert_eq!(cell("  "), "-");
        assert!(cell(&"x".repeat(100)).chars().count() <= MAX_COLUMN_WIDTH);
    }

    #[test]
    fn test_day_heading() {
        let dated = Remark::normalize(&json!({"date": "2024-03-04T09:00:00.000Z"}));
        assert_eq!(day_heading(&dated), "04/03/2024");
        assert_eq!(day_heading(&Remark::normalize(&json!({}))), "Sans date");
    }
}
