//! PDF reading: glyph positions through `pdf-extract`, grouped into lines and
//! cells; tables are inferred from cells that line up under a header row.

use crate::domain::model::PageContent;
use crate::domain::ports::DocumentReader;
use crate::utils::error::{PipelineError, Result};
use lopdf::Document;
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use std::panic::{self, AssertUnwindSafe};

/// Horizontal gap, in font-size units, that separates two cells on a line.
/// A regular word space is around 0.25 to 0.6.
const COLUMN_GAP_EM: f64 = 1.0;
/// Gap above which two glyphs in the same cell are separate words.
const WORD_GAP_EM: f64 = 0.1;
/// Baselines closer than this (in font-size units) belong to one line.
const LINE_TOLERANCE_EM: f64 = 0.5;

/// Thresholds for treating a block of aligned lines as a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDetection {
    /// Cells a line needs to open a table (its header).
    pub min_columns: usize,
    /// Lines a block needs, header included.
    pub min_rows: usize,
}

impl Default for TableDetection {
    fn default() -> Self {
        Self {
            min_columns: 3,
            min_rows: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfDocumentReader {
    detection: TableDetection,
}

impl PdfDocumentReader {
    pub fn new(detection: TableDetection) -> Self {
        Self { detection }
    }
}

impl DocumentReader for PdfDocumentReader {
    fn read_pages(&self, document_name: &str, bytes: &[u8]) -> Result<Vec<PageContent>> {
        let mut doc = Document::load_mem(bytes).map_err(|e| {
            PipelineError::extraction(document_name, format!("Failed to parse PDF: {e}"))
        })?;

        if doc.is_encrypted() {
            doc.decrypt("").map_err(|e| {
                PipelineError::extraction(document_name, format!("Encrypted PDF: {e}"))
            })?;
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PipelineError::extraction(document_name, "PDF has no pages"));
        }

        let glyph_pages =
            collect_glyphs(&doc).map_err(|e| PipelineError::extraction(document_name, e))?;
        tracing::debug!(page_count, rendered_pages = glyph_pages.len(), "Collected page glyphs");

        let pages = glyph_pages
            .into_iter()
            .map(|(number, glyphs)| {
                let lines = layout_lines(glyphs);
                let table = detect_table(&lines, &self.detection);
                let text = page_text(&lines);
                PageContent {
                    number,
                    text: (!text.is_empty()).then_some(text),
                    table,
                }
            })
            .collect();

        Ok(pages)
    }
}

/// One rendered character, `y` growing down the page.
#[derive(Debug, Clone, PartialEq)]
struct Glyph {
    x: f64,
    y: f64,
    right: f64,
    size: f64,
    text: String,
}

#[derive(Debug, Default)]
struct GlyphCollector {
    page_height: f64,
    page_number: u32,
    current: Vec<Glyph>,
    pages: Vec<(u32, Vec<Glyph>)>,
}

impl OutputDev for GlyphCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        self.page_height = media_box.ury - media_box.lly;
        self.page_number = page_num;
        self.current.clear();
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        let glyphs = std::mem::take(&mut self.current);
        self.pages.push((self.page_number, glyphs));
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> std::result::Result<(), OutputError> {
        if char.trim().is_empty() {
            return Ok(());
        }

        let scale = (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let size = if scale > 0.0 { font_size * scale } else { font_size };
        let x = trm.m31;
        self.current.push(Glyph {
            x,
            y: self.page_height - trm.m32,
            right: x + width * size,
            size: size.max(f64::EPSILON),
            text: char.to_string(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }
}

fn collect_glyphs(doc: &Document) -> std::result::Result<Vec<(u32, Vec<Glyph>)>, String> {
    // pdf-extract panics on some malformed font programs.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut collector = GlyphCollector::default();
        pdf_extract::output_doc(doc, &mut collector).map(|()| collector.pages)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(format!("Text extraction failed: {e:?}")),
        Err(_) => {
            tracing::warn!("pdf-extract panicked while decoding the document");
            Err("Text extraction failed: unsupported PDF content".to_string())
        }
    }
}

/// A run of text on one line with its horizontal extent.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    left: f64,
    right: f64,
    text: String,
}

/// Groups glyphs into lines (top to bottom) of cells (left to right).
fn layout_lines(mut glyphs: Vec<Glyph>) -> Vec<Vec<Cell>> {
    glyphs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    for glyph in glyphs {
        match lines.last_mut() {
            Some(line)
                if (glyph.y - line[0].y).abs()
                    <= line[0].size.max(glyph.size) * LINE_TOLERANCE_EM =>
            {
                line.push(glyph)
            }
            _ => lines.push(vec![glyph]),
        }
    }

    lines.into_iter().map(cells_on_line).collect()
}

fn cells_on_line(mut line: Vec<Glyph>) -> Vec<Cell> {
    line.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut cells: Vec<Cell> = Vec::new();
    for glyph in line {
        match cells.last_mut() {
            Some(cell) if glyph.x - cell.right < glyph.size * COLUMN_GAP_EM => {
                if glyph.x - cell.right > glyph.size * WORD_GAP_EM {
                    cell.text.push(' ');
                }
                cell.text.push_str(&glyph.text);
                cell.right = cell.right.max(glyph.right);
            }
            _ => cells.push(Cell {
                left: glyph.x,
                right: glyph.right,
                text: glyph.text,
            }),
        }
    }
    cells
}

fn page_text(lines: &[Vec<Cell>]) -> String {
    lines
        .iter()
        .map(|cells| {
            cells
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Column `i` spans from the midpoint of the gap before its header cell to
/// the midpoint of the gap after it; the outer columns are open-ended.
fn column_bounds(header: &[Cell]) -> Vec<(f64, f64)> {
    header
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let start = match idx {
                0 => f64::NEG_INFINITY,
                _ => (header[idx - 1].right + col.left) / 2.0,
            };
            let end = header
                .get(idx + 1)
                .map_or(f64::INFINITY, |next| (col.right + next.left) / 2.0);
            (start, end)
        })
        .collect()
}

fn column_for(bounds: &[(f64, f64)], cell: &Cell) -> usize {
    let mut best = 0;
    let mut best_overlap = f64::NEG_INFINITY;

    for (idx, (start, end)) in bounds.iter().enumerate() {
        let overlap = cell.right.min(*end) - cell.left.max(*start);
        if overlap > best_overlap {
            best = idx;
            best_overlap = overlap;
        }
    }

    best
}

fn align_to_header(bounds: &[(f64, f64)], cells: &[Cell]) -> Vec<String> {
    let mut row = vec![String::new(); bounds.len()];
    for cell in cells {
        let slot = &mut row[column_for(bounds, cell)];
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(&cell.text);
    }
    row
}

/// Finds the largest block of column-aligned lines on a page.
///
/// A block opens on a line with at least `min_columns` cells and continues
/// through lines with two or more cells; any other line closes it. Rows are
/// aligned to the header's column spans.
fn detect_table(lines: &[Vec<Cell>], detection: &TableDetection) -> Option<Vec<Vec<String>>> {
    let mut best: Option<Vec<Vec<String>>> = None;
    let mut bounds: Option<Vec<(f64, f64)>> = None;
    let mut grid: Vec<Vec<String>> = Vec::new();

    let close = |grid: &mut Vec<Vec<String>>, best: &mut Option<Vec<Vec<String>>>| {
        let rows = std::mem::take(grid);
        if rows.len() >= detection.min_rows
            && best.as_ref().map_or(true, |b| rows.len() > b.len())
        {
            *best = Some(rows);
        }
    };

    for cells in lines {
        if let (Some(columns), true) = (&bounds, cells.len() >= 2) {
            grid.push(align_to_header(columns, cells));
            continue;
        }

        close(&mut grid, &mut best);
        if cells.len() >= detection.min_columns {
            grid.push(cells.iter().map(|c| c.text.clone()).collect());
            bounds = Some(column_bounds(cells));
        } else {
            bounds = None;
        }
    }
    close(&mut grid, &mut best);

    best
}
