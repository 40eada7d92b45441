//! Tabular sections: a navy header row, zebra-shaded body rows, wrapped
//! cells. The header row is repeated after every page break.

use super::layout::{line_height, wrap_text, Color, DrawOp, Font, Layout};
use crate::utils::NOT_AVAILABLE;

const CELL_PADDING: f32 = 4.0;
const FONT_SIZE: f32 = 9.0;

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    /// Relative share of the content width
    pub weight: f32,
}

impl Column {
    pub const fn new(header: &'static str, weight: f32) -> Self {
        Self { header, weight }
    }
}

/// Resolve relative column weights into absolute widths
pub fn column_widths(columns: &[Column], total_width: f32) -> Vec<f32> {
    let sum: f32 = columns.iter().map(|c| c.weight.max(0.0)).sum();
    if sum <= 0.0 {
        let even = total_width / columns.len().max(1) as f32;
        return vec![even; columns.len()];
    }
    columns
        .iter()
        .map(|c| total_width * c.weight.max(0.0) / sum)
        .collect()
}

// ===== Column plans =====

pub const TRAINEE_REMARK_COLUMNS: &[Column] = &[
    Column::new("Date", 14.0),
    Column::new("Horaire", 14.0),
    Column::new("Instructeur", 18.0),
    Column::new("Type", 10.0),
    Column::new("Contenu", 44.0),
];

pub const INSTRUCTOR_REMARK_COLUMNS: &[Column] = &[
    Column::new("Date", 14.0),
    Column::new("Horaire", 14.0),
    Column::new("Stagiaire", 18.0),
    Column::new("Matière", 16.0),
    Column::new("Type", 10.0),
    Column::new("Contenu", 28.0),
];

pub const REMARK_LIST_COLUMNS: &[Column] = &[
    Column::new("Horaire", 13.0),
    Column::new("Stagiaire", 17.0),
    Column::new("Instructeur", 17.0),
    Column::new("Matière", 15.0),
    Column::new("Type", 10.0),
    Column::new("Contenu", 28.0),
];

pub const CONSULTATION_COLUMNS: &[Column] = &[
    Column::new("Date", 18.0),
    Column::new("Note", 57.0),
    Column::new("Pièce jointe", 25.0),
];

pub const PUNISHMENT_COLUMNS: &[Column] = &[
    Column::new("Date", 18.0),
    Column::new("Motif", 62.0),
    Column::new("Durée", 20.0),
];

pub const PERMISSION_COLUMNS: &[Column] = &[
    Column::new("Du", 18.0),
    Column::new("Au", 18.0),
    Column::new("Jours", 12.0),
    Column::new("Motif", 52.0),
];

pub const STATISTICS_COLUMNS: &[Column] = &[
    Column::new("Rang", 8.0),
    Column::new("Instructeur", 36.0),
    Column::new("Positives", 14.0),
    Column::new("Négatives", 14.0),
    Column::new("Total", 12.0),
    Column::new("Score", 16.0),
];

// ===== Drawing =====

fn cell_lines(text: &str, width: f32, font: Font) -> Vec<String> {
    let text = if text.trim().is_empty() { NOT_AVAILABLE } else { text };
    wrap_text(text, (width - 2.0 * CELL_PADDING).max(1.0), FONT_SIZE, font)
}

fn row_height(lines: &[Vec<String>]) -> f32 {
    let count = lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
    count as f32 * line_height(FONT_SIZE) + 2.0 * CELL_PADDING
}

fn draw_row(
    layout: &mut Layout,
    widths: &[f32],
    cells: &[Vec<String>],
    height: f32,
    font: Font,
    text_color: Color,
    fill: Option<Color>,
) {
    let top = layout.cursor();
    let left = layout.left();
    let total: f32 = widths.iter().sum();

    if let Some(color) = fill {
        layout.push(DrawOp::FillRect {
            x: left,
            y: top,
            w: total,
            h: height,
            color,
        });
    }

    let mut x = left;
    for (lines, width) in cells.iter().zip(widths) {
        for (i, line) in lines.iter().enumerate() {
            let y = top + CELL_PADDING + FONT_SIZE + i as f32 * line_height(FONT_SIZE);
            layout.text_at(x + CELL_PADDING, y, line, FONT_SIZE, font, text_color);
        }
        x += width;
    }
    layout.advance(height);
}

fn header_cells(columns: &[Column], widths: &[f32]) -> Vec<Vec<String>> {
    columns
        .iter()
        .zip(widths)
        .map(|(c, w)| cell_lines(c.header, *w, Font::Bold))
        .collect()
}

fn draw_header(layout: &mut Layout, columns: &[Column], widths: &[f32]) {
    let cells = header_cells(columns, widths);
    let height = row_height(&cells);
    layout.ensure_space(height + row_height(&[vec![String::new()]]));
    draw_row(layout, widths, &cells, height, Font::Bold, Color::WHITE, Some(Color::NAVY));
}

/// Draw a row taller than a page in slices, one per page, with the
/// header repeated above each continuation.
fn draw_split_row(
    layout: &mut Layout,
    columns: &[Column],
    widths: &[f32],
    cells: &[Vec<String>],
    fill: Option<Color>,
) {
    let lh = line_height(FONT_SIZE);
    let line_count = cells.iter().map(Vec::len).max().unwrap_or(1);
    let mut start = 0;
    let mut fresh = false;

    while start < line_count {
        let fit = ((layout.remaining() - 2.0 * CELL_PADDING) / lh).floor();
        if fit < 1.0 && !fresh {
            layout.start_page();
            draw_header(layout, columns, widths);
            fresh = true;
            continue;
        }
        let end = (start + fit.max(1.0) as usize).min(line_count);
        let slice: Vec<Vec<String>> = cells
            .iter()
            .map(|lines| lines[start.min(lines.len())..end.min(lines.len())].to_vec())
            .collect();
        let height = row_height(&slice);
        draw_row(layout, widths, &slice, height, Font::Regular, Color::BLACK, fill);
        start = end;
        fresh = false;
    }
}

/// Draw a table across as many pages as needed. An empty row set prints
/// `empty_message` instead of a header with no body.
pub fn draw_table(layout: &mut Layout, columns: &[Column], rows: &[Vec<String>], empty_message: &str) {
    if rows.is_empty() {
        layout.paragraph(empty_message, 9.0, Font::Italic, Color::GREY);
        layout.spacer(8.0);
        return;
    }

    let widths = column_widths(columns, layout.content_width());
    draw_header(layout, columns, &widths);
    let header_height = row_height(&header_cells(columns, &widths));

    for (index, row) in rows.iter().enumerate() {
        let cells: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| cell_lines(row.get(i).map(String::as_str).unwrap_or(""), *w, Font::Regular))
            .collect();
        let height = row_height(&cells);
        let fill = (index % 2 == 1).then_some(Color::SHADE);

        if height > layout.remaining() {
            if height > layout.body_height() - header_height {
                draw_split_row(layout, columns, &widths, &cells, fill);
                continue;
            }
            layout.start_page();
            draw_header(layout, columns, &widths);
        }
        draw_row(layout, &widths, &cells, height, Font::Regular, Color::BLACK, fill);
    }

    let bottom = layout.cursor();
    let (x1, x2) = (layout.left(), layout.right());
    layout.push(DrawOp::Line {
        x1,
        y1: bottom,
        x2,
        y2: bottom,
        color: Color::NAVY,
        width: 0.6,
    });
    layout.spacer(10.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::layout::{Letterhead, Orientation, FOOTER_HEIGHT, MARGIN};

    fn layout() -> Layout {
        Layout::new(
            Orientation::Portrait,
            Letterhead {
                lines: vec!["EN-TÊTE".into()],
                logo: None,
                date: String::new(),
            },
        )
    }

    #[test]
    fn test_column_widths_fill_total() {
        let widths = column_widths(REMARK_LIST_COLUMNS, 515.0);
        let sum: f32 = widths.iter().sum();
        assert!((sum - 515.0).abs() < 0.01);
        assert!(widths[5] > widths[4]);
    }

    #[test]
    fn test_empty_cells_show_placeholder() {
        let mut layout = layout();
        draw_table(
            &mut layout,
            PUNISHMENT_COLUMNS,
            &[vec!["01/03/2024".into(), String::new(), "2 jours".into()]],
            "Aucune punition",
        );
        let doc = layout.finish();
        let texts = doc.all_text();
        assert!(texts.contains(&"Motif"));
        assert!(texts.contains(&"N/A"));
        assert!(!texts.contains(&"Aucune punition"));
    }

    #[test]
    fn test_empty_table_prints_message() {
        let mut layout = layout();
        draw_table(&mut layout, PUNISHMENT_COLUMNS, &[], "Aucune punition");
        let texts = layout.finish();
        let texts = texts.all_text();
        assert!(texts.contains(&"Aucune punition"));
        assert!(!texts.contains(&"Motif"));
    }

    #[test]
    fn test_header_repeats_after_page_break() {
        let mut layout = layout();
        let rows: Vec<Vec<String>> = (0..120)
            .map(|i| vec![format!("{:02}/03/2024", i % 28 + 1), format!("Motif {}", i), "1 jour".into()])
            .collect();
        draw_table(&mut layout, PUNISHMENT_COLUMNS, &rows, "");
        let doc = layout.finish();
        assert!(doc.page_count() > 1);
        for page in &doc.pages {
            assert!(page.texts().contains(&"Motif"));
        }
    }

    #[test]
    fn test_row_taller_than_page_continues_on_next_pages() {
        let mut layout = layout();
        let content = "mot ".repeat(1500);
        let row = vec![
            "04/03/2024".into(),
            "08:00 - 10:00".into(),
            "IDRISSI Karim".into(),
            "Positive".into(),
            content,
        ];
        draw_table(&mut layout, TRAINEE_REMARK_COLUMNS, &[row], "");
        let doc = layout.finish();

        assert!(doc.page_count() > 2);
        for page in &doc.pages {
            let limit = page.height - MARGIN - FOOTER_HEIGHT;
            for op in &page.ops {
                if let DrawOp::Text { y, text, .. } = op {
                    if !text.starts_with("Page ") {
                        assert!(*y <= limit, "{:?} drawn at {} below {}", text, y, limit);
                    }
                }
            }
            assert!(page.texts().contains(&"Contenu"));
        }
        let words: usize = doc.all_text().iter().map(|t| t.matches("mot").count()).sum();
        assert_eq!(words, 1500);
        assert_eq!(doc.all_text().iter().filter(|t| **t == "IDRISSI Karim").count(), 1);
    }

    #[test]
    fn test_row_that_fits_a_page_is_not_split() {
        let mut layout = layout();
        let mut rows: Vec<Vec<String>> = (0..40)
            .map(|i| vec!["01/03/2024".into(), format!("Motif {}", i), "1 jour".into()])
            .collect();
        rows.push(vec!["02/03/2024".into(), "ligne ".repeat(60), "2 jours".into()]);
        draw_table(&mut layout, PUNISHMENT_COLUMNS, &rows, "");
        let doc = layout.finish();

        let pages_with_tail: Vec<usize> = doc
            .pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.texts().iter().any(|t| t.contains("ligne")))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(pages_with_tail.len(), 1);
    }
}
