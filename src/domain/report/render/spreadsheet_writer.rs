use std::io::Write;

use anyhow::Result;
use rust_xlsxwriter::{Format, Workbook};

use crate::domain::report::model::{OutputFormat, RenderOutcome};
use crate::domain::report::registry::{CellValue, ReportTable};
use crate::domain::report::sink::RenderSink;

/// Writes an `.xlsx` workbook into the sink.
///
/// An empty table writes nothing unless `export_empty` is set, in which case a
/// header-only workbook is sent and the outcome is marked committed.
pub fn write_table(
    sink: &mut dyn RenderSink,
    report_id: &str,
    title: &str,
    table: &ReportTable,
    export_empty: bool,
) -> Result<RenderOutcome> {
    if table.rows.is_empty() && !export_empty {
        return Ok(RenderOutcome::rows(0));
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(report_id))?;

    worksheet.write_string_with_format(0, 0, title, &header_format)?;
    for (c, col) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(1, c as u16, &col.title, &header_format)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 2) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                CellValue::Text(s) => worksheet.write_string(r, c, s)?,
                CellValue::Integer(n) => worksheet.write_number(r, c, *n as f64)?,
                CellValue::Number(n) => worksheet.write_number(r, c, *n)?,
            };
        }
    }
    worksheet.autofit();

    let bytes = workbook.save_to_buffer()?;
    sink.set_content_type(OutputFormat::Xlsx.content_type());
    sink.set_header(
        "Content-Disposition",
        &format!("attachment; filename={}.xlsx", report_id),
    );
    sink.write_all(&bytes)?;

    Ok(RenderOutcome {
        row_count: table.row_count(),
        committed: sink.is_committed(),
        error_message: None,
    })
}

/// Worksheet names are limited to 31 characters without `[]:*?/\`.
fn sheet_name(report_id: &str) -> String {
    let name: String = report_id
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if name.is_empty() {
        "Report".to_string()
    } else {
        name
    }
}
