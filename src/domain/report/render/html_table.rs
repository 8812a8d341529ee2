use anyhow::Result;

use crate::core::util::html::escape_html;
use crate::domain::report::model::RenderOutcome;
use crate::domain::report::registry::{CellValue, ReportTable};
use crate::domain::report::sink::RenderSink;

pub const TABLE_STYLE: &str = "\
table.rptBody { border-collapse: collapse; font-size: 9pt; }
table.rptBody th { background-color: #CCDDFF; border: 1px solid #888888; padding: 2px 6px; }
table.rptBody td { border: 1px solid #CCCCCC; padding: 1px 6px; }
table.rptBody td.num { text-align: right; }
";

/// Click-to-sort for tables marked `sortable`.
pub const SORTABLE_SCRIPT: &str = "\
function rptSortTable(th) {
  var table = th.closest('table'), body = table.tBodies[0];
  var col = Array.prototype.indexOf.call(th.parentNode.children, th);
  var asc = th.getAttribute('data-dir') !== 'asc';
  var rows = Array.prototype.slice.call(body.rows);
  rows.sort(function(a, b) {
    var x = a.cells[col].textContent, y = b.cells[col].textContent;
    var nx = parseFloat(x), ny = parseFloat(y);
    var c = (!isNaN(nx) && !isNaN(ny)) ? nx - ny : x.localeCompare(y);
    return asc ? c : -c;
  });
  rows.forEach(function(r) { body.appendChild(r); });
  th.setAttribute('data-dir', asc ? 'asc' : 'desc');
}
";

pub fn write_table(sink: &mut dyn RenderSink, table: &ReportTable) -> Result<RenderOutcome> {
    sink.write_str("<table class=\"rptBody sortable\">\n<thead><tr>")?;
    for col in &table.columns {
        sink.write_str(&format!(
            "<th onclick=\"rptSortTable(this)\">{}</th>",
            escape_html(&col.title)
        ))?;
    }
    sink.write_str("</tr></thead>\n<tbody>\n")?;

    for row in &table.rows {
        sink.write_str("<tr>")?;
        for cell in row {
            let class = match cell {
                CellValue::Text(_) => "",
                _ => " class=\"num\"",
            };
            sink.write_str(&format!("<td{}>{}</td>", class, escape_html(&cell.display())))?;
        }
        sink.write_str("</tr>\n")?;
    }
    sink.write_str("</tbody>\n</table>\n")?;

    Ok(RenderOutcome::rows(table.row_count()))
}
