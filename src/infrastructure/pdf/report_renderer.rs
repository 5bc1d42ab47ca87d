// ============================================================
// PDF REPORT RENDERER
// ============================================================
// A4 equipment report laid out with lopdf content operations

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, StringFormat, Stream};

use crate::domain::dataset::Dataset;
use crate::domain::equipment::EquipmentRecord;
use crate::domain::error::{AppError, Result};
use crate::domain::summary::DatasetSummary;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;
const INCH: f32 = 72.0;

const HEADER_FILL: Rgb = Rgb(0x25, 0x63, 0xeb);
const HEADER_TEXT: Rgb = Rgb(0xf5, 0xf5, 0xf5);
const BODY_FILL: Rgb = Rgb(0xf8, 0xfa, 0xfc);
const GRID: Rgb = Rgb(0xe2, 0xe8, 0xf0);
const TEXT: Rgb = Rgb(0x00, 0x00, 0x00);

#[derive(Debug, Clone, Copy)]
struct Rgb(u8, u8, u8);

impl Rgb {
    fn operands(self) -> Vec<Object> {
        [self.0, self.1, self.2]
            .iter()
            .map(|c| Object::from(*c as f32 / 255.0))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

pub struct ReportRenderer {
    row_limit: usize,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self { row_limit: 50 }
    }
}

impl ReportRenderer {
    pub fn new(row_limit: usize) -> Self {
        Self { row_limit }
    }

    /// Render the report for one dataset.
    ///
    /// `records` are listed in the order given, truncated to the row limit.
    pub fn render(
        &self,
        dataset: &Dataset,
        records: &[EquipmentRecord],
        summary: &DatasetSummary,
    ) -> Result<Vec<u8>> {
        let mut canvas = Canvas::new();

        canvas.centered_text(Font::Bold, 24.0, "Equipment Analysis Report");
        canvas.spacer(30.0 + 12.0);

        canvas.label_line("File:", &dataset.filename);
        canvas.label_line(
            "Uploaded:",
            &dataset.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
        );
        canvas.label_line("Total Equipment:", &dataset.total_count.to_string());
        canvas.spacer(20.0);

        canvas.heading("Summary Statistics");
        let mut summary_rows = Vec::new();
        if !records.is_empty() {
            summary_rows.push(stat_row(
                "Flowrate",
                dataset.avg_flowrate,
                summary.min_values.flowrate,
                summary.max_values.flowrate,
            ));
            summary_rows.push(stat_row(
                "Pressure",
                dataset.avg_pressure,
                summary.min_values.pressure,
                summary.max_values.pressure,
            ));
            summary_rows.push(stat_row(
                "Temperature",
                dataset.avg_temperature,
                summary.min_values.temperature,
                summary.max_values.temperature,
            ));
        }
        canvas.table(
            &[1.5 * INCH, 1.2 * INCH, 1.2 * INCH, 1.2 * INCH],
            &["Metric", "Average", "Min", "Max"],
            &summary_rows,
            10.0,
        );
        canvas.spacer(20.0);

        canvas.heading("Equipment Type Distribution");
        let type_rows: Vec<Vec<String>> = summary
            .type_percentages()
            .into_iter()
            .map(|(equipment_type, count, share)| {
                vec![equipment_type, count.to_string(), format!("{:.1}%", share)]
            })
            .collect();
        canvas.table(
            &[2.5 * INCH, 1.2 * INCH, 1.2 * INCH],
            &["Equipment Type", "Count", "Percentage"],
            &type_rows,
            10.0,
        );
        canvas.spacer(20.0);

        canvas.heading("Equipment List");
        let equipment_rows: Vec<Vec<String>> = records
            .iter()
            .take(self.row_limit)
            .map(|record| {
                vec![
                    record.name.clone(),
                    record.equipment_type.clone(),
                    format!("{:.1}", record.flowrate),
                    format!("{:.1}", record.pressure),
                    format!("{:.1}", record.temperature),
                ]
            })
            .collect();
        canvas.table(
            &[1.4 * INCH, 1.2 * INCH, 0.9 * INCH, 0.9 * INCH, 1.0 * INCH],
            &["Name", "Type", "Flowrate", "Pressure", "Temperature"],
            &equipment_rows,
            9.0,
        );

        assemble(canvas.finish())
    }
}

fn stat_row(metric: &str, average: f64, min: f64, max: f64) -> Vec<String> {
    vec![
        metric.to_string(),
        format!("{:.2}", average),
        format!("{:.2}", min),
        format!("{:.2}", max),
    ]
}

/// Page-by-page operation buffer with a top-down cursor
struct Canvas {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(std::mem::take(&mut self.current));
        self.pages
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    /// Returns true when a page break happened.
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.cursor - height < MARGIN {
            self.new_page();
            return true;
        }
        false
    }

    fn spacer(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, color: Rgb, value: &str) {
        let (encoded, _, _) = WINDOWS_1252.encode(value);
        self.current.push(Operation::new("BT", vec![]));
        self.current.push(Operation::new("rg", color.operands()));
        self.current.push(Operation::new(
            "Tf",
            vec![font.resource_name().into(), size.into()],
        ));
        self.current
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        self.current.push(Operation::new(
            "Tj",
            vec![Object::String(encoded.into_owned(), StringFormat::Literal)],
        ));
        self.current.push(Operation::new("ET", vec![]));
    }

    fn centered_text(&mut self, font: Font, size: f32, value: &str) {
        self.ensure_space(size * 1.2);
        self.cursor -= size;
        let x = (PAGE_WIDTH - approx_width(value, size)) / 2.0;
        self.text(font, size, x.max(MARGIN), self.cursor, TEXT, value);
        self.cursor -= size * 0.2;
    }

    fn heading(&mut self, value: &str) {
        // keep a heading together with at least one table row
        self.ensure_space(14.0 * 1.2 + 10.0 + 40.0);
        self.cursor -= 14.0;
        self.text(Font::Bold, 14.0, MARGIN, self.cursor, TEXT, value);
        self.cursor -= 14.0 * 0.2 + 10.0;
    }

    fn label_line(&mut self, label: &str, value: &str) {
        let size = 10.0;
        self.ensure_space(size * 1.4);
        self.cursor -= size;
        self.text(Font::Bold, size, MARGIN, self.cursor, TEXT, label);
        let offset = approx_width(label, size) + 4.0;
        self.text(Font::Regular, size, MARGIN + offset, self.cursor, TEXT, value);
        self.cursor -= size * 0.4;
    }

    fn table(&mut self, widths: &[f32], header: &[&str], rows: &[Vec<String>], font_size: f32) {
        let header_cells: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        let header_height = font_size + 16.0;
        let row_height = font_size + 8.0;

        self.ensure_space(header_height);
        self.table_row(widths, &header_cells, header_height, font_size, true);

        for row in rows {
            if self.ensure_space(row_height) {
                self.table_row(widths, &header_cells, header_height, font_size, true);
            }
            self.table_row(widths, row, row_height, font_size, false);
        }
    }

    fn table_row(
        &mut self,
        widths: &[f32],
        cells: &[String],
        height: f32,
        font_size: f32,
        is_header: bool,
    ) {
        let total: f32 = widths.iter().sum();
        let mut x = (PAGE_WIDTH - total) / 2.0;
        let bottom = self.cursor - height;
        let (fill, font, color) = if is_header {
            (HEADER_FILL, Font::Bold, HEADER_TEXT)
        } else {
            (BODY_FILL, Font::Regular, TEXT)
        };

        for (width, cell) in widths.iter().zip(cells.iter()) {
            self.rect(x, bottom, *width, height, fill);
            let text_width = approx_width(cell, font_size).min(width - 4.0);
            let text_x = x + ((width - text_width) / 2.0).max(2.0);
            let baseline = if is_header {
                // reserve bottom padding under header labels
                bottom + 12.0
            } else {
                bottom + (height - font_size) / 2.0 + 1.0
            };
            self.text(font, font_size, text_x, baseline, color, cell);
            x += width;
        }

        self.cursor = bottom;
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Rgb) {
        self.current.push(Operation::new("rg", fill.operands()));
        self.current.push(Operation::new("RG", GRID.operands()));
        self.current.push(Operation::new("w", vec![1.0f32.into()]));
        self.current.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.current.push(Operation::new("B", vec![]));
    }
}

/// Helvetica averages about half an em per character.
fn approx_width(value: &str, size: f32) -> f32 {
    value.chars().count() as f32 * size * 0.5
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Internal(format!("Failed to encode report page: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![Object::from(0), Object::from(0), Object::from(PAGE_WIDTH), Object::from(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to write report: {}", e)))?;
    Ok(buffer)
}
