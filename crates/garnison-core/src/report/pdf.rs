//! Serialize a laid-out document to PDF bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::layout::{Color, DrawOp, Font, LaidOutDocument, Page};
use super::ReportError;

fn font_name(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
        Font::Italic => "F3",
    }
}

/// Encode text for the standard fonts' WinAnsiEncoding.
/// Characters outside the code page become '?'.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '…' => 0x85,
            'Œ' => 0x8C,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            'œ' => 0x9C,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![real(color.0), real(color.1), real(color.2)]
}

/// Content-stream operations for one page. Layout coordinates are
/// top-down; PDF user space is bottom-up.
fn page_operations(page: &Page) -> Vec<Operation> {
    let flip = |y: f32| page.height - y;
    let mut ops = Vec::new();

    for op in &page.ops {
        match op {
            DrawOp::Text { x, y, size, font, color, text } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![font_name(*font).into(), real(*size)]));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new("Td", vec![real(*x), real(flip(*y))]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::FillRect { x, y, w, h, color } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new("re", vec![real(*x), real(flip(y + h)), real(*w), real(*h)]));
                ops.push(Operation::new("f", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::StrokeRect { x, y, w, h, color, width } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("w", vec![real(*width)]));
                ops.push(Operation::new("re", vec![real(*x), real(flip(y + h)), real(*w), real(*h)]));
                ops.push(Operation::new("S", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Line { x1, y1, x2, y2, color, width } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new("RG", color_operands(*color)));
                ops.push(Operation::new("w", vec![real(*width)]));
                ops.push(Operation::new("m", vec![real(*x1), real(flip(*y1))]));
                ops.push(Operation::new("l", vec![real(*x2), real(flip(*y2))]));
                ops.push(Operation::new("S", vec![]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::Image { image, x, y, w, h } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![real(*w), real(0.0), real(0.0), real(*h), real(*x), real(flip(y + h))],
                ));
                ops.push(Operation::new("Do", vec![Object::Name(format!("Im{}", image.0).into_bytes())]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    ops
}

fn add_font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Write the document. Each embedded image is stored once and shared by
/// every page that draws it.
pub fn write_pdf(laid_out: &LaidOutDocument, title: &str) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let fonts = dictionary! {
        "F1" => add_font(&mut doc, "Helvetica"),
        "F2" => add_font(&mut doc, "Helvetica-Bold"),
        "F3" => add_font(&mut doc, "Helvetica-Oblique"),
    };

    let mut xobjects = Dictionary::new();
    for (index, image) in laid_out.images.iter().enumerate() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            image.rgb.clone(),
        );
        let id = doc.add_object(stream);
        xobjects.set(format!("Im{}", index), id);
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let mut kids = Vec::with_capacity(laid_out.pages.len());
    for page in &laid_out.pages {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(page.width), real(page.height)],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(win_ansi(title), StringFormat::Literal),
        "Producer" => Object::String(b"garnison".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
