use anyhow::Result;

use crate::domain::report::model::{OutputFormat, RenderOutcome};
use crate::domain::report::registry::ReportTable;
use crate::domain::report::sink::RenderSink;

/// Comma separated rows with a title header. `Txt` is the same body served as plain text.
pub fn write_table(
    sink: &mut dyn RenderSink,
    report_id: &str,
    format: OutputFormat,
    table: &ReportTable,
) -> Result<RenderOutcome> {
    sink.set_content_type(format.content_type());
    if format == OutputFormat::Csv {
        sink.set_header(
            "Content-Disposition",
            &format!("attachment; filename={}.{}", report_id, format.extension()),
        );
    }

    let mut wtr = csv::Writer::from_writer(&mut *sink);
    wtr.write_record(table.columns.iter().map(|c| c.title.as_str()))?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|cell| cell.display()))?;
    }
    wtr.flush()?;

    Ok(RenderOutcome::rows(table.row_count()))
}
