//! Writers turning a report into one output format

pub mod delimited_writer;
pub mod graph_writer;
pub mod html_table;
pub mod kml_writer;
pub mod map_writer;
pub mod spreadsheet_writer;
pub mod xml_writer;
