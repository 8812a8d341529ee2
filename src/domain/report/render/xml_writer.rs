use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::domain::report::model::{OutputFormat, RenderOutcome};
use crate::domain::report::registry::ReportTable;
use crate::domain::report::sink::RenderSink;

/// `<Report>` document with one header row and one `BodyRow` per row.
pub fn write_table(
    sink: &mut dyn RenderSink,
    report_id: &str,
    title: &str,
    table: &ReportTable,
) -> Result<RenderOutcome> {
    sink.set_content_type(OutputFormat::Xml.content_type());

    let mut writer = Writer::new_with_indent(&mut *sink, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("failed to write xml declaration")?;
    writer.write_event(Event::Start(
        BytesStart::new("Report").with_attributes([("name", report_id)]),
    ))?;
    write_text_element(&mut writer, BytesStart::new("Title"), title)?;

    writer.write_event(Event::Start(BytesStart::new("HeaderRow")))?;
    for col in &table.columns {
        write_text_element(
            &mut writer,
            BytesStart::new("HeaderColumn").with_attributes([("name", col.key.as_str())]),
            &col.title,
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("HeaderRow")))?;

    for row in &table.rows {
        writer.write_event(Event::Start(BytesStart::new("BodyRow")))?;
        for (col, cell) in table.columns.iter().zip(row) {
            write_text_element(
                &mut writer,
                BytesStart::new("BodyColumn").with_attributes([("name", col.key.as_str())]),
                &cell.display(),
            )?;
        }
        writer.write_event(Event::End(BytesEnd::new("BodyRow")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Report")))?;
    Ok(RenderOutcome::rows(table.row_count()))
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    text: &str,
) -> Result<()> {
    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}
