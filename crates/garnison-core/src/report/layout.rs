//! Page model and two-phase layout.
//!
//! Phase one draws content top to bottom, opening pages as needed and
//! redrawing the letterhead on each. Phase two (`Layout::finish`) runs once
//! the page count is final and stamps "Page X sur Y" on every page.
//!
//! Coordinates are in PDF points, measured from the top-left corner; the
//! PDF writer flips them.

use std::collections::HashMap;

use super::assets::ImageAsset;

pub const A4_SHORT: f32 = 595.0;
pub const A4_LONG: f32 = 842.0;

pub const MARGIN: f32 = 40.0;
pub const FOOTER_HEIGHT: f32 = 36.0;
const HEADER_LOGO_SIZE: f32 = 52.0;
const LINE_SPACING: f32 = 1.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn size(&self) -> (f32, f32) {
        match self {
            Orientation::Portrait => (A4_SHORT, A4_LONG),
            Orientation::Landscape => (A4_LONG, A4_SHORT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub const BLACK: Color = Color(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color(1.0, 1.0, 1.0);
    pub const NAVY: Color = Color(0.11, 0.22, 0.37);
    pub const GREY: Color = Color(0.45, 0.45, 0.45);
    pub const SHADE: Color = Color(0.94, 0.95, 0.97);
    pub const GOLD: Color = Color(0.72, 0.56, 0.18);
    pub const GREEN: Color = Color(0.13, 0.49, 0.25);
    pub const RED: Color = Color(0.70, 0.15, 0.15);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Index into the document's embedded image table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the text baseline
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Color,
        text: String,
    },
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    },
    StrokeRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
        width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Color,
        width: f32,
    },
    Image {
        image: ImageId,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
    pub has_header: bool,
}

impl Page {
    /// Text of every text op, in drawing order
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

/// Letterhead repeated at the top of every page
#[derive(Debug, Clone, PartialEq)]
pub struct Letterhead {
    pub lines: Vec<String>,
    pub logo: Option<ImageId>,
    pub date: String,
}

/// Where a top-level record section begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStart {
    pub title: String,
    pub page: usize,
}

/// Result of both layout phases
#[derive(Debug, Clone)]
pub struct LaidOutDocument {
    pub pages: Vec<Page>,
    pub sections: Vec<SectionStart>,
    pub images: Vec<ImageAsset>,
}

impl LaidOutDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn image_count(&self) -> usize {
        self.pages.iter().map(Page::image_count).sum()
    }

    /// Every text op of every page
    pub fn all_text(&self) -> Vec<&str> {
        self.pages.iter().flat_map(|p| p.texts()).collect()
    }
}

/// Phase-one layout state
pub struct Layout {
    orientation: Orientation,
    letterhead: Letterhead,
    pages: Vec<Page>,
    sections: Vec<SectionStart>,
    images: Vec<ImageAsset>,
    /// Images registered by source URL, embedded once per document
    images_by_url: HashMap<String, ImageId>,
    background: Option<ImageId>,
    cursor: f32,
}

impl Layout {
    pub fn new(orientation: Orientation, letterhead: Letterhead) -> Self {
        Self {
            orientation,
            letterhead,
            pages: Vec::new(),
            sections: Vec::new(),
            images: Vec::new(),
            images_by_url: HashMap::new(),
            background: None,
            cursor: 0.0,
        }
    }

    /// Register an image for embedding; the id can be drawn on any page.
    pub fn add_image(&mut self, image: ImageAsset) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    /// Like `add_image`, but an image already registered under `url` is reused.
    pub fn image_for_url(&mut self, url: &str, image: &ImageAsset) -> ImageId {
        if let Some(id) = self.images_by_url.get(url) {
            return *id;
        }
        let id = self.add_image(image.clone());
        self.images_by_url.insert(url.to_string(), id);
        id
    }

    pub fn set_logo(&mut self, logo: Option<ImageId>) {
        self.letterhead.logo = logo;
    }

    /// Image stretched over every page opened from now on, under all content
    pub fn set_background(&mut self, background: Option<ImageId>) {
        self.background = background;
    }

    pub fn page_size(&self) -> (f32, f32) {
        self.orientation.size()
    }

    pub fn left(&self) -> f32 {
        MARGIN
    }

    pub fn right(&self) -> f32 {
        self.page_size().0 - MARGIN
    }

    pub fn content_width(&self) -> f32 {
        self.right() - self.left()
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn advance(&mut self, dy: f32) {
        self.cursor += dy;
    }

    fn bottom(&self) -> f32 {
        self.page_size().1 - MARGIN - FOOTER_HEIGHT
    }

    pub fn remaining(&self) -> f32 {
        self.bottom() - self.cursor
    }

    /// Where content starts below the letterhead
    fn content_top(&self) -> f32 {
        let text_bottom = MARGIN
            + 11.0
            + self
                .letterhead
                .lines
                .iter()
                .enumerate()
                .map(|(i, _)| line_height(if i == 0 { 11.0 } else { 9.0 }))
                .sum::<f32>();
        (MARGIN + HEADER_LOGO_SIZE).max(text_bottom) + 6.0 + 16.0
    }

    /// Usable height of a freshly opened page
    pub fn body_height(&self) -> f32 {
        self.bottom() - self.content_top()
    }

    /// Open a fresh page and draw the letterhead on it.
    pub fn start_page(&mut self) {
        let (width, height) = self.page_size();
        self.pages.push(Page {
            width,
            height,
            ops: Vec::new(),
            has_header: true,
        });
        if let Some(image) = self.background {
            self.push(DrawOp::Image {
                image,
                x: 0.0,
                y: 0.0,
                w: width,
                h: height,
            });
        }
        self.cursor = MARGIN;
        self.draw_letterhead();
    }

    /// Make sure `height` points fit, breaking the page otherwise.
    /// Returns true when a new page was started.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.pages.is_empty() || self.cursor + height > self.bottom() {
            self.start_page();
            true
        } else {
            false
        }
    }

    /// Start a top-level record on its own page
    pub fn begin_record(&mut self, title: &str) {
        self.start_page();
        self.sections.push(SectionStart {
            title: title.to_string(),
            page: self.pages.len() - 1,
        });
        self.title(title);
    }

    pub fn push(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.start_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn text_at(&mut self, x: f32, y: f32, text: &str, size: f32, font: Font, color: Color) {
        self.push(DrawOp::Text {
            x,
            y,
            size,
            font,
            color,
            text: text.to_string(),
        });
    }

    /// One line of text aligned inside [left, right], baseline at `y`
    pub fn text_aligned(
        &mut self,
        y: f32,
        text: &str,
        size: f32,
        font: Font,
        color: Color,
        align: Align,
    ) {
        let (left, right) = (self.left(), self.right());
        self.text_in(left, right, y, text, size, font, color, align);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn text_in(
        &mut self,
        left: f32,
        right: f32,
        y: f32,
        text: &str,
        size: f32,
        font: Font,
        color: Color,
        align: Align,
    ) {
        let width = text_width(text, size, font);
        let x = match align {
            Align::Left => left,
            Align::Center => left + ((right - left) - width) / 2.0,
            Align::Right => right - width,
        };
        self.text_at(x, y, text, size, font, color);
    }

    /// Centered document title
    pub fn title(&mut self, text: &str) {
        self.ensure_space(34.0);
        let y = self.cursor + 18.0;
        self.text_aligned(y, text, 16.0, Font::Bold, Color::NAVY, Align::Center);
        self.cursor += 34.0;
    }

    /// Section heading with an underline rule
    pub fn heading(&mut self, text: &str) {
        // keep a heading together with at least two lines of its content
        self.ensure_space(24.0 + 2.0 * line_height(10.0));
        let y = self.cursor + 13.0;
        self.text_at(self.left(), y, text, 12.0, Font::Bold, Color::NAVY);
        let rule_y = self.cursor + 17.0;
        let (x1, x2) = (self.left(), self.right());
        self.push(DrawOp::Line {
            x1,
            y1: rule_y,
            x2,
            y2: rule_y,
            color: Color::NAVY,
            width: 0.8,
        });
        self.cursor += 24.0;
    }

    /// Wrapped paragraph, breaking pages between lines
    pub fn paragraph(&mut self, text: &str, size: f32, font: Font, color: Color) {
        let lh = line_height(size);
        for line in wrap_text(text, self.content_width(), size, font) {
            self.ensure_space(lh);
            let y = self.cursor + size;
            self.text_at(self.left(), y, &line, size, font, color);
            self.cursor += lh;
        }
    }

    /// "Label : value" row inside a column of width `width` starting at `x`
    pub fn field_row(&mut self, x: f32, width: f32, label: &str, value: &str) {
        let size = 10.0;
        let label_width = 120.0_f32.min(width / 2.0);
        let lines = wrap_text(value, width - label_width, size, Font::Regular);
        let lh = line_height(size);
        // keep short values on one page, long ones flow line by line
        let block = lh * lines.len() as f32;
        if block <= self.body_height() {
            self.ensure_space(block);
        }

        for (i, line) in lines.iter().enumerate() {
            self.ensure_space(lh);
            let y = self.cursor + size;
            if i == 0 {
                self.text_at(x, y, &format!("{} :", label), size, Font::Bold, Color::BLACK);
            }
            self.text_at(x + label_width, y, line, size, Font::Regular, Color::BLACK);
            self.cursor += lh;
        }
    }

    pub fn image(&mut self, image: ImageId, x: f32, y: f32, w: f32, h: f32) {
        self.push(DrawOp::Image { image, x, y, w, h });
    }

    pub fn spacer(&mut self, height: f32) {
        self.cursor += height;
    }

    fn draw_letterhead(&mut self) {
        let (left, right) = (self.left(), self.right());
        let top = MARGIN;
        let letterhead = self.letterhead.clone();

        if let Some(logo) = letterhead.logo {
            self.push(DrawOp::Image {
                image: logo,
                x: left,
                y: top,
                w: HEADER_LOGO_SIZE,
                h: HEADER_LOGO_SIZE,
            });
        }

        let mut y = top + 11.0;
        for (i, line) in letterhead.lines.iter().enumerate() {
            let (size, font) = if i == 0 { (11.0, Font::Bold) } else { (9.0, Font::Regular) };
            self.text_in(left, right, y, line, size, font, Color::BLACK, Align::Center);
            y += line_height(size);
        }

        self.text_in(
            left,
            right,
            top + 11.0,
            &letterhead.date,
            9.0,
            Font::Regular,
            Color::GREY,
            Align::Right,
        );

        let rule_y = (top + HEADER_LOGO_SIZE).max(y) + 6.0;
        self.push(DrawOp::Line {
            x1: left,
            y1: rule_y,
            x2: right,
            y2: rule_y,
            color: Color::NAVY,
            width: 1.2,
        });
        self.cursor = rule_y + 16.0;
    }

    /// Phase two: stamp page numbers now that the total is known.
    pub fn finish(mut self) -> LaidOutDocument {
        if self.pages.is_empty() {
            self.start_page();
        }

        let total = self.pages.len();
        for (index, page) in self.pages.iter_mut().enumerate() {
            let label = format!("Page {} sur {}", index + 1, total);
            let size = 9.0;
            let width = text_width(&label, size, Font::Regular);
            let y = page.height - MARGIN + 4.0;
            page.ops.push(DrawOp::Line {
                x1: MARGIN,
                y1: y - 14.0,
                x2: page.width - MARGIN,
                y2: y - 14.0,
                color: Color::GREY,
                width: 0.4,
            });
            page.ops.push(DrawOp::Text {
                x: (page.width - width) / 2.0,
                y,
                size,
                font: Font::Regular,
                color: Color::GREY,
                text: label,
            });
        }

        LaidOutDocument {
            pages: self.pages,
            sections: self.sections,
            images: self.images,
        }
    }
}

pub fn line_height(size: f32) -> f32 {
    size * LINE_SPACING
}

/// Approximate Helvetica advance width in 1/1000 em
fn char_width(c: char) -> f32 {
    match c {
        ' ' | '.' | ',' | ':' | ';' | '!' | 'i' | 'j' | 'l' | '\'' | '|' => 260.0,
        'f' | 't' | 'r' | 'I' => 300.0,
        '(' | ')' | '[' | ']' | '-' | '/' => 333.0,
        'm' | 'M' => 833.0,
        'w' => 722.0,
        'W' => 944.0,
        '@' | '%' => 900.0,
        c if c.is_ascii_digit() => 556.0,
        c if c.is_uppercase() => 680.0,
        _ => 540.0,
    }
}

/// Approximate rendered width of `text` in points
pub fn text_width(text: &str, size: f32, font: Font) -> f32 {
    let em: f32 = text.chars().map(char_width).sum();
    let factor = if font == Font::Bold { 1.06 } else { 1.0 };
    em * size / 1000.0 * factor
}

/// Greedy word wrap. Explicit newlines are kept; words wider than the
/// line are split by characters. Always yields at least one line.
pub fn wrap_text(text: &str, max_width: f32, size: f32, font: Font) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if text_width(&candidate, size, font) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, size, font) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    current.push(c);
                    if text_width(&current, size, font) > max_width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
