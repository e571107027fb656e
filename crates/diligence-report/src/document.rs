//! PDF output and text extraction
//!
//! Reports are laid out on A4 pages with the built-in Helvetica faces: the
//! narrative first, one annotated line at a time, then every chart scaled to
//! the text width. Extraction reads a produced document back into plain text.

use crate::error::{ReportError, Result};
use crate::market::DateRange;
use crate::narrative::{LineStyle, Narrative, to_latin1};
use lopdf::content::{Content, Operation};
use lopdf::Object;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;

/// Millimetres per typographic point
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size
const AVG_GLYPH_EM: f32 = 0.5;
const LINE_SPACING: f32 = 1.4;
const IMAGE_GAP: f32 = 4.0;

/// Prefix of documents produced by the comprehensive phase
pub const COMPREHENSIVE_PREFIX: &str = "comprehensive_";

/// `{ticker}_{start}_to_{end}_analysis.pdf`
pub fn report_file_name(ticker: &str, range: &DateRange) -> String {
    format!("{}_analysis.pdf", range.file_stem(ticker))
}

/// Path of the comprehensive document next to `prior`
pub fn comprehensive_path(prior: &Path) -> PathBuf {
    let name = prior
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    prior.with_file_name(format!("{COMPREHENSIVE_PREFIX}{name}"))
}

/// Greedy word wrap on a character budget; overlong words are split
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn pdf_error(e: impl std::fmt::Debug) -> ReportError {
    ReportError::Document(format!("{e:?}"))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Top-down cursor over a growing document
struct Layout {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    /// Distance of the next baseline from the bottom edge
    cursor: f32,
    pages: usize,
}

impl Layout {
    fn new(title: &str) -> Self {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        Self {
            doc,
            layer,
            cursor: PAGE_HEIGHT - MARGIN,
            pages: 1,
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    /// Start a new page unless `height` still fits
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN {
            self.new_page();
        }
    }

    fn write(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        let line_height = size * PT_TO_MM * LINE_SPACING;
        if text.trim().is_empty() {
            self.reserve(line_height);
            self.cursor -= line_height;
            return;
        }

        let max_chars = (TEXT_WIDTH / (size * PT_TO_MM * AVG_GLYPH_EM)) as usize;
        for line in wrap(text, max_chars) {
            self.reserve(line_height);
            self.cursor -= line_height;
            self.layer
                .use_text(line, size, Mm(MARGIN), Mm(self.cursor), font);
        }
    }

    fn place_image(&mut self, path: &Path) -> Result<()> {
        let reader = std::io::BufReader::new(File::open(path)?);
        let decoder =
            printpdf::image_crate::codecs::png::PngDecoder::new(reader).map_err(pdf_error)?;
        let image = Image::try_from(decoder).map_err(pdf_error)?;

        let px_width = image.image.width.0.max(1) as f32;
        let px_height = image.image.height.0 as f32;

        let max_height = PAGE_HEIGHT - 2.0 * MARGIN;
        let mut width = TEXT_WIDTH;
        let mut height = px_height * width / px_width;
        if height > max_height {
            width *= max_height / height;
            height = max_height;
        }

        self.reserve(height + IMAGE_GAP);
        self.cursor -= height + IMAGE_GAP;

        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.cursor)),
                dpi: Some(px_width * 25.4 / width),
                ..Default::default()
            },
        );
        Ok(())
    }
}

/// Render `narrative` and `charts` into a PDF at `path`
///
/// Missing or undecodable chart files are skipped with a warning. Returns the
/// number of pages written.
pub fn render_pdf(
    path: &Path,
    title: &str,
    narrative: &Narrative,
    charts: &[PathBuf],
) -> Result<usize> {
    let mut layout = Layout::new(title);
    let fonts = Fonts {
        regular: layout
            .doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
        bold: layout
            .doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?,
    };

    for line in narrative.lines() {
        let (size, font) = match line.style {
            LineStyle::Heading => (HEADING_SIZE, &fonts.bold),
            LineStyle::Emphasis => (BODY_SIZE, &fonts.bold),
            LineStyle::Plain => (BODY_SIZE, &fonts.regular),
        };
        layout.write(&to_latin1(&line.display_text()), size, font);
    }

    for chart in charts {
        if !chart.exists() {
            warn!("Chart {} no longer exists, skipping", chart.display());
            continue;
        }
        if let Err(e) = layout.place_image(chart) {
            warn!("Could not embed chart {}: {e}", chart.display());
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let pages = layout.pages;
    let mut writer = BufWriter::new(File::create(path)?);
    layout.doc.save(&mut writer).map_err(pdf_error)?;

    info!("Wrote {} ({pages} pages)", path.display());
    Ok(pages)
}

/// Windows-1252 code points for bytes 0x80..=0x9F; the rest of WinAnsi is Latin-1
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// Decode a string operand written with the built-in fonts' WinAnsiEncoding
fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => WIN_ANSI_HIGH[usize::from(b - 0x80)],
            _ => char::from(b),
        })
        .collect()
}

/// Append the text shown by one content stream operation
fn push_shown_text(operation: &Operation, out: &mut String) {
    match operation.operator.as_str() {
        "Tj" | "'" | "\"" => {
            if let Some(Object::String(bytes, _)) = operation.operands.last() {
                out.push_str(&decode_win_ansi(bytes));
            }
        }
        "TJ" => {
            if let Some(Object::Array(items)) = operation.operands.first() {
                for item in items {
                    if let Object::String(bytes, _) = item {
                        out.push_str(&decode_win_ansi(bytes));
                    }
                }
            }
        }
        "ET" => out.push('\n'),
        _ => {}
    }
}

/// Plain text of every page of the PDF at `path`
///
/// Reads the shown strings of each page's content stream, one line per text
/// object, decoded with the WinAnsi encoding the built-in fonts are written
/// with.
pub fn extract_text(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)?;

    let mut text = String::new();
    for page_id in doc.get_pages().into_values() {
        let content = Content::decode(&doc.get_page_content(page_id)?)?;
        for operation in &content.operations {
            push_shown_text(operation, &mut text);
        }
    }

    debug!("Extracted {} chars from {}", text.len(), path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use diligence_platform::testing::SAMPLE_PNG;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            report_file_name("MSFT", &range()),
            "MSFT_2024-06-01_to_2024-06-10_analysis.pdf"
        );
        assert_eq!(
            comprehensive_path(Path::new("/out/MSFT_2024-06-01_to_2024-06-10_analysis.pdf")),
            PathBuf::from("/out/comprehensive_MSFT_2024-06-01_to_2024-06-10_analysis.pdf")
        );
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a bb ccc dddd", 6), vec!["a bb", "ccc", "dddd"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap("   ", 10).is_empty());
        assert_eq!(wrap("one", 0), vec!["o", "n", "e"]);
    }

    #[test]
    fn test_render_and_extract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(report_file_name("MSFT", &range()));

        let mut narrative = Narrative::from_lines(["**Ticker:** MSFT", "**Change:** +10.00%"]);
        narrative.push_block("## Summary\nRevenue grew \u{2013} margins held.");

        let pages = render_pdf(&path, "Due Diligence Report - MSFT", &narrative, &[]).unwrap();
        assert_eq!(pages, 1);
        assert!(path.exists());

        let text = extract_text(&path).unwrap();
        assert!(text.contains("Ticker: MSFT"));
        assert!(text.contains("Summary"));
        assert!(text.contains("Revenue grew - margins held."));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_extract_keeps_accented_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accents.pdf");
        let narrative = Narrative::from_lines([
            "## Soci\u{e9}t\u{e9} G\u{e9}n\u{e9}rale",
            "Caf\u{e9} costs \u{a3}5 \u{2013} na\u{ef}ve \u{fc}ber",
        ]);

        render_pdf(&path, "Accents", &narrative, &[]).unwrap();
        let text = extract_text(&path).unwrap();

        assert!(text.contains("Soci\u{e9}t\u{e9} G\u{e9}n\u{e9}rale\n"));
        assert!(text.contains("Caf\u{e9} costs \u{a3}5 - na\u{ef}ve \u{fc}ber"));
        assert!(!text.contains('\u{d8}'));
    }

    #[test]
    fn test_decode_win_ansi() {
        assert_eq!(decode_win_ansi(b"caf\xe9 \xa35"), "caf\u{e9} \u{a3}5");
        assert_eq!(decode_win_ansi(b"\x80 \x93x\x94 \x97"), "\u{20ac} \u{201c}x\u{201d} \u{2014}");
    }

    #[test]
    fn test_long_narrative_spans_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        let narrative = Narrative::from_lines((0..200).map(|i| format!("Line number {i}")));

        let pages = render_pdf(&path, "Long", &narrative, &[]).unwrap();
        assert!(pages > 1);
    }

    #[test]
    fn test_charts_are_embedded_and_missing_ones_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let chart = dir.path().join("file-1_image_file.png");
        std::fs::write(&chart, SAMPLE_PNG).unwrap();
        let missing = dir.path().join("gone_image_file.png");
        let path = dir.path().join("charts.pdf");

        let narrative = Narrative::from_lines(["Chart below"]);
        render_pdf(&path, "Charts", &narrative, &[chart, missing]).unwrap();

        let with_chart = std::fs::metadata(&path).unwrap().len();
        let plain = dir.path().join("plain.pdf");
        render_pdf(&plain, "Charts", &narrative, &[]).unwrap();
        assert!(with_chart > std::fs::metadata(&plain).unwrap().len());
    }
}
