use anyhow::{Context, Result};
use chrono_tz::Tz;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{json, Value};

use crate::config::MapDataFormat;
use crate::core::persistence::fleet::fleet_entity::EventRecord;
use crate::core::util::html::{escape_html, escape_js};
use crate::domain::report::model::{OutputFormat, RenderOutcome};
use crate::domain::report::registry::ReportInstance;
use crate::domain::report::sink::RenderSink;

/// Field separator inside a point record.
const RECORD_SEP: &str = "|";

/// An event with its position in the sequence being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedEvent<'a> {
    pub event: &'a EventRecord,
    pub index: usize,
    pub is_last: bool,
}

/// Zero-based indices, with the final event flagged.
pub fn index_events<'a, I>(events: I) -> Vec<IndexedEvent<'a>>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let events: Vec<&EventRecord> = events.into_iter().collect();
    let last = events.len().saturating_sub(1);
    events
        .into_iter()
        .enumerate()
        .map(|(index, event)| IndexedEvent {
            event,
            index,
            is_last: index == last,
        })
        .collect()
}

/// Map page settings resolved before rendering.
#[derive(Debug, Clone)]
pub struct MapPage<'a> {
    pub page_title: &'a str,
    pub copyright: &'a str,
    pub provider_js: &'a str,
    pub data_format: MapDataFormat,
    pub time_zone: Tz,
    pub show_pushpin: Option<u32>,
    pub zoom_pushpin: Option<u32>,
}

/// `device|desc|epoch|date|time|tz|status|icon|lat|lon|accuracy|sats|kph|heading|alt|odom|address|index`
pub fn format_point(point: &IndexedEvent<'_>, description: &str, tz: Tz, is_fleet: bool) -> String {
    let ev = point.event;
    let local = ev.timestamp.with_timezone(&tz);
    let valid = ev.is_valid_gps();
    let icon = if point.is_last {
        "last"
    } else if is_fleet {
        "fleet"
    } else {
        "event"
    };

    [
        clean(&ev.device_id),
        clean(description),
        ev.timestamp.timestamp().to_string(),
        local.format("%Y/%m/%d").to_string(),
        local.format("%H:%M:%S").to_string(),
        local.format("%Z").to_string(),
        clean(&ev.status_code),
        icon.to_string(),
        format!("{:.6}", ev.latitude),
        format!("{:.6}", ev.longitude),
        "0.0".to_string(),
        if valid { "0" } else { "-1" }.to_string(),
        format!("{:.1}", ev.speed_kph),
        format!("{:.1}", ev.heading),
        format!("{:.0}", ev.altitude),
        format!("{:.1}", ev.odometer_km),
        clean(ev.address.as_deref().unwrap_or("")),
        point.index.to_string(),
    ]
    .join(RECORD_SEP)
}

fn clean(s: &str) -> String {
    s.replace(RECORD_SEP, " ")
}

fn actions(page: &MapPage<'_>) -> Vec<(&'static str, u32)> {
    let mut out = Vec::new();
    if let Some(n) = page.show_pushpin.filter(|n| *n > 0) {
        out.push(("showpp", n));
    }
    if let Some(n) = page.zoom_pushpin.filter(|n| *n > 0) {
        out.push(("zoompp", n));
    }
    out
}

/// `{"JMapData":{"DataSets":[...],"Actions":[...]}}`
pub fn json_payload(records: &[String], is_fleet: bool, page: &MapPage<'_>) -> Value {
    let mut map_data = json!({
        "DataSets": [{
            "type": if is_fleet { "group" } else { "device" },
            "route": !is_fleet,
            "Points": records,
        }]
    });
    let actions = actions(page);
    if !actions.is_empty() {
        map_data["Actions"] = Value::Array(
            actions
                .into_iter()
                .map(|(cmd, arg)| json!({ "cmd": cmd, "arg": arg.to_string() }))
                .collect(),
        );
    }
    json!({ "JMapData": map_data })
}

/// `<MapData><DataSet ...><P><![CDATA[...]]></P>...</DataSet><Action .../></MapData>`
pub fn xml_payload(records: &[String], is_fleet: bool, page: &MapPage<'_>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 0);
    let route = (!is_fleet).to_string();

    writer.write_event(Event::Start(BytesStart::new("MapData")))?;
    writer.write_event(Event::Start(BytesStart::new("DataSet").with_attributes([
        ("type", if is_fleet { "group" } else { "device" }),
        ("route", route.as_str()),
    ])))?;
    for rcd in records {
        writer.write_event(Event::Start(BytesStart::new("P")))?;
        // a CDATA section cannot hold `]]>`, so split it between two sections
        let mut rest = rcd.as_str();
        while let Some(pos) = rest.find("]]>") {
            writer.write_event(Event::CData(BytesCData::new(&rest[..pos + 2])))?;
            rest = &rest[pos + 2..];
        }
        writer.write_event(Event::CData(BytesCData::new(rest)))?;
        writer.write_event(Event::End(BytesEnd::new("P")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("DataSet")))?;
    for (cmd, arg) in actions(page) {
        let arg = arg.to_string();
        writer.write_event(Event::Start(
            BytesStart::new("Action").with_attributes([("command", cmd)]),
        ))?;
        writer.write_event(Event::Text(BytesText::new(&arg)))?;
        writer.write_event(Event::End(BytesEnd::new("Action")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("MapData")))?;

    String::from_utf8(writer.into_inner()).context("map payload is not valid UTF-8")
}

/// Writes the complete map document for the report's events.
pub fn write_map(
    sink: &mut dyn RenderSink,
    page: &MapPage<'_>,
    report: &dyn ReportInstance,
) -> Result<RenderOutcome> {
    let is_fleet = report.target().is_fleet();
    let points = index_events(report.events().iter().filter(|e| e.is_valid_gps()));
    let records: Vec<String> = points
        .iter()
        .map(|p| {
            let desc = report.device_description(&p.event.device_id);
            format_point(p, &desc, page.time_zone, is_fleet)
        })
        .collect();

    let payload = match page.data_format {
        MapDataFormat::Json => json_payload(&records, is_fleet, page).to_string(),
        MapDataFormat::Xml => xml_payload(&records, is_fleet, page)?,
    };

    sink.set_content_type(OutputFormat::Map.content_type());
    let mut html = String::with_capacity(payload.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta http-equiv='content-type' content='text/html; charset=UTF-8'/>\n");
    html.push_str("  <meta http-equiv='cache-control' content='no-cache'/>\n");
    html.push_str("  <meta http-equiv='expires' content='0'/>\n");
    html.push_str(&format!(
        "  <meta name='copyright' content='{}'/>\n",
        escape_html(page.copyright)
    ));
    html.push_str("  <meta name='robots' content='none'/>\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(page.page_title)));
    html.push_str(&format!(
        "  <script type='text/javascript' src='{}'></script>\n",
        escape_html(page.provider_js)
    ));
    html.push_str("<script type='text/javascript'>\n");
    html.push_str("function trackMapOnLoad() {\n");
    html.push_str(&format!("   var mapPts = \"{}\";\n", escape_js(&payload)));
    html.push_str("   mapProviderParseXML(mapPts);\n");
    html.push_str("}\n");
    html.push_str("function trackMapOnUnload() {\n   mapProviderUnload();\n}\n");
    html.push_str("</script>\n</head>\n\n");
    html.push_str(
        "<body onload=\"javascript:trackMapOnLoad();\" onunload=\"javascript:trackMapOnUnload();\">\n",
    );
    html.push_str("<div>\n<div id='mapDiv' style='width:100%; height:100%;'></div>\n</div>\n");
    html.push_str("</body>\n</html>\n");
    sink.write_str(&html)?;

    Ok(RenderOutcome {
        row_count: records.len(),
        committed: true,
        error_message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(device: &str, ts: i64, lat: f64) -> EventRecord {
        EventRecord {
            account_id: "demo".into(),
            device_id: device.into(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            status_code: "InMotion".into(),
            latitude: lat,
            longitude: -142.25,
            speed_kph: 48.0,
            heading: 90.0,
            altitude: 12.0,
            odometer_km: 1000.0,
            address: Some("Main St | Dock 4".into()),
        }
    }

    fn page(format: MapDataFormat) -> MapPage<'static> {
        MapPage {
            page_title: "Fleet",
            copyright: "(c)",
            provider_js: "/js/maps/trackmap.js",
            data_format: format,
            time_zone: chrono_tz::GMT,
            show_pushpin: Some(2),
            zoom_pushpin: None,
        }
    }

    #[test]
    fn indices_are_zero_based_and_last_is_flagged() {
        let events = vec![event("a", 1, 1.0), event("a", 2, 1.0), event("a", 3, 1.0)];
        let indexed = index_events(&events);
        assert_eq!(indexed.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(indexed.iter().filter(|e| e.is_last).count(), 1);
        assert!(indexed[2].is_last);
        assert!(index_events(Vec::<&EventRecord>::new()).is_empty());
    }

    #[test]
    fn point_record_layout() {
        let ev = event("mobile", 1_700_000_000, 39.123456789);
        let point = IndexedEvent { event: &ev, index: 4, is_last: true };
        let rcd = format_point(&point, "Mobile Unit", chrono_tz::GMT, false);
        let fields: Vec<&str> = rcd.split('|').collect();

        assert_eq!(fields.len(), 18);
        assert_eq!(fields[0], "mobile");
        assert_eq!(fields[2], "1700000000");
        assert_eq!(fields[3], "2023/11/14");
        assert_eq!(fields[7], "last");
        assert_eq!(fields[8], "39.123457");
        assert_eq!(fields[16], "Main St   Dock 4");
        assert_eq!(fields[17], "4");
    }

    #[test]
    fn json_payload_carries_route_and_actions() {
        let value = json_payload(&["r0".into()], false, &page(MapDataFormat::Json));
        let set = &value["JMapData"]["DataSets"][0];
        assert_eq!(set["type"], "device");
        assert_eq!(set["route"], true);
        assert_eq!(set["Points"][0], "r0");
        assert_eq!(value["JMapData"]["Actions"][0]["cmd"], "showpp");
        assert_eq!(value["JMapData"]["Actions"][0]["arg"], "2");

        let mut no_actions = page(MapDataFormat::Json);
        no_actions.show_pushpin = None;
        let value = json_payload(&[], true, &no_actions);
        assert!(value["JMapData"].get("Actions").is_none());
        assert_eq!(value["JMapData"]["DataSets"][0]["type"], "group");
    }

    #[test]
    fn xml_payload_wraps_points_in_cdata() {
        let xml = xml_payload(&["a|b".into()], true, &page(MapDataFormat::Xml)).unwrap();
        assert!(xml.contains("<DataSet type=\"group\" route=\"false\">"));
        assert!(xml.contains("<P><![CDATA[a|b]]></P>"));
        assert!(xml.contains("<Action command=\"showpp\">2</Action>"));
    }

    #[test]
    fn xml_payload_splits_cdata_terminator() {
        let xml = xml_payload(&["Dock ]]> 4".into()], false, &page(MapDataFormat::Xml)).unwrap();
        assert!(xml.contains("<P><![CDATA[Dock ]]]]><![CDATA[> 4]]></P>"));

        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut text = String::new();
        let mut in_point = false;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"P" => in_point = true,
                Event::End(e) if e.name().as_ref() == b"P" => in_point = false,
                Event::CData(c) if in_point => {
                    text.push_str(std::str::from_utf8(&c.into_inner()).unwrap())
                }
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(text, "Dock ]]> 4");
    }
}
