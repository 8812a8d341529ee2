use anyhow::Result;
use chrono::SecondsFormat;
use chrono_tz::Tz;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::core::persistence::fleet::fleet_entity::EventRecord;
use crate::domain::report::model::{OutputFormat, RenderOutcome};
use crate::domain::report::registry::ReportInstance;
use crate::domain::report::render::map_writer::{index_events, IndexedEvent};
use crate::domain::report::sink::RenderSink;

const KML_NS: &str = "http://www.opengis.net/kml/2.2";
const ICON_EVENT: &str = "http://maps.google.com/mapfiles/kml/paddle/blu-circle.png";
const ICON_LAST: &str = "http://maps.google.com/mapfiles/kml/paddle/red-stars.png";

/// Events split per device in first-seen order; indices restart for every device.
pub fn group_by_device<'a>(events: &'a [EventRecord]) -> Vec<(&'a str, Vec<IndexedEvent<'a>>)> {
    let mut order: Vec<&str> = Vec::new();
    for ev in events {
        if !order.contains(&ev.device_id.as_str()) {
            order.push(&ev.device_id);
        }
    }
    order
        .into_iter()
        .map(|device_id| {
            let indexed = index_events(events.iter().filter(|e| e.device_id == device_id));
            (device_id, indexed)
        })
        .collect()
}

pub fn write_kml(
    sink: &mut dyn RenderSink,
    report: &dyn ReportInstance,
    tz: Tz,
) -> Result<RenderOutcome> {
    let groups = group_by_device(report.events());
    let row_count = groups.iter().map(|(_, evs)| evs.len()).sum();

    sink.set_content_type(OutputFormat::Kml.content_type());
    sink.set_header(
        "Content-Disposition",
        &format!("attachment; filename={}.kml", report.report_id()),
    );

    let mut w = Writer::new_with_indent(&mut *sink, b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::Start(BytesStart::new("kml").with_attributes([("xmlns", KML_NS)])))?;
    w.write_event(Event::Start(BytesStart::new("Document")))?;
    text_element(&mut w, "name", report.title())?;
    icon_style(&mut w, "event", ICON_EVENT)?;
    icon_style(&mut w, "last", ICON_LAST)?;

    for (device_id, events) in &groups {
        let desc = report.device_description(device_id);
        w.write_event(Event::Start(BytesStart::new("Folder")))?;
        text_element(&mut w, "name", &desc)?;

        for point in events {
            let ev = point.event;
            let local = ev.timestamp.with_timezone(&tz);
            w.write_event(Event::Start(BytesStart::new("Placemark")))?;
            text_element(&mut w, "name", &format!("{} #{}", desc, point.index + 1))?;
            text_element(
                &mut w,
                "description",
                &format!(
                    "{} {} {:.1} km/h {}",
                    local.format("%Y/%m/%d %H:%M:%S %Z"),
                    ev.status_code,
                    ev.speed_kph,
                    ev.address.as_deref().unwrap_or("")
                )
                .trim_end()
                .to_string(),
            )?;
            w.write_event(Event::Start(BytesStart::new("TimeStamp")))?;
            text_element(&mut w, "when", &ev.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))?;
            w.write_event(Event::End(BytesEnd::new("TimeStamp")))?;
            text_element(&mut w, "styleUrl", if point.is_last { "#last" } else { "#event" })?;
            w.write_event(Event::Start(BytesStart::new("Point")))?;
            text_element(&mut w, "coordinates", &coordinates(ev))?;
            w.write_event(Event::End(BytesEnd::new("Point")))?;
            w.write_event(Event::End(BytesEnd::new("Placemark")))?;
        }

        if events.len() > 1 {
            let path: Vec<String> = events.iter().map(|p| coordinates(p.event)).collect();
            w.write_event(Event::Start(BytesStart::new("Placemark")))?;
            text_element(&mut w, "name", &format!("{} route", desc))?;
            w.write_event(Event::Start(BytesStart::new("LineString")))?;
            text_element(&mut w, "coordinates", &path.join(" "))?;
            w.write_event(Event::End(BytesEnd::new("LineString")))?;
            w.write_event(Event::End(BytesEnd::new("Placemark")))?;
        }
        w.write_event(Event::End(BytesEnd::new("Folder")))?;
    }

    w.write_event(Event::End(BytesEnd::new("Document")))?;
    w.write_event(Event::End(BytesEnd::new("kml")))?;

    Ok(RenderOutcome {
        row_count,
        committed: true,
        error_message: None,
    })
}

fn coordinates(ev: &EventRecord) -> String {
    format!("{:.6},{:.6},{:.0}", ev.longitude, ev.latitude, ev.altitude)
}

fn text_element<W: std::io::Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn icon_style<W: std::io::Write>(w: &mut Writer<W>, id: &str, href: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("Style").with_attributes([("id", id)])))?;
    w.write_event(Event::Start(BytesStart::new("IconStyle")))?;
    w.write_event(Event::Start(BytesStart::new("Icon")))?;
    text_element(w, "href", href)?;
    w.write_event(Event::End(BytesEnd::new("Icon")))?;
    w.write_event(Event::End(BytesEnd::new("IconStyle")))?;
    w.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}
