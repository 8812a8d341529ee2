use crate::core::persistence::fleet::fleet_entity::DeviceEntity;
use crate::core::util::html::escape_html;
use crate::domain::report::model::OutputFormat;
use crate::domain::report::registry::ReportRegistry;

/// Last-used filter values shown pre-filled in the menu form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuFilters {
    pub report_id: Option<String>,
    pub device_id: Option<String>,
    pub group_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub time_zone: Option<String>,
    pub limit: Option<String>,
}

/// Report selection form posting back to `action`.
pub struct ReportMenu<'a> {
    pub action: &'a str,
    pub account_id: &'a str,
    pub user_id: Option<&'a str>,
    pub registry: &'a ReportRegistry,
    pub devices: &'a [DeviceEntity],
    pub filters: &'a MenuFilters,
}

impl ReportMenu<'_> {
    pub fn content(&self) -> String {
        let f = self.filters;
        let mut html = String::new();

        html.push_str("<table class='rptMenu'>\n<tr><th>Report</th><th>Description</th></tr>\n");
        for entry in self.registry.entries() {
            let scope = if entry.factory.is_group_report() { "group" } else { "device" };
            html.push_str(&format!(
                "<tr><td>{}</td><td>{} ({})</td></tr>\n",
                escape_html(&entry.title),
                escape_html(&entry.description),
                scope
            ));
        }
        html.push_str("</table>\n");

        html.push_str(&format!(
            "<form name='ReportMenu' method='get' action='{}'>\n",
            escape_html(self.action)
        ));
        html.push_str(&hidden("account", self.account_id));
        if let Some(user) = self.user_id {
            html.push_str(&hidden("user", user));
        }

        html.push_str("<select name='r_report'>\n");
        for entry in self.registry.entries() {
            html.push_str(&option(&entry.id, &entry.title, f.report_id.as_deref()));
        }
        html.push_str("</select>\n");

        html.push_str("<select name='device'>\n<option value=''></option>\n");
        for dev in self.devices {
            let label = if dev.description.is_empty() { &dev.device_id } else { &dev.description };
            html.push_str(&option(&dev.device_id, label, f.device_id.as_deref()));
        }
        html.push_str("</select>\n");

        html.push_str(&text_input("group", "Group", f.group_id.as_deref()));
        html.push_str(&text_input("date_fr", "From", f.date_from.as_deref()));
        html.push_str(&text_input("date_to", "To", f.date_to.as_deref()));
        html.push_str(&text_input("date_tz", "Time Zone", f.time_zone.as_deref()));
        html.push_str(&text_input("r_limit", "Limit", f.limit.as_deref()));

        html.push_str("<select name='format'>\n");
        for fmt in OutputFormat::ALL {
            html.push_str(&option(fmt.token(), fmt.token(), Some("html")));
        }
        html.push_str("</select>\n");
        html.push_str(&text_input("email", "Email", None));
        html.push_str("<input type='submit' value='Display'/>\n</form>\n");
        html
    }
}

fn hidden(name: &str, value: &str) -> String {
    format!(
        "<input type='hidden' name='{}' value='{}'/>\n",
        name,
        escape_html(value)
    )
}

fn option(value: &str, label: &str, selected: Option<&str>) -> String {
    let sel = if selected == Some(value) { " selected" } else { "" };
    format!(
        "<option value='{}'{}>{}</option>\n",
        escape_html(value),
        sel,
        escape_html(label)
    )
}

fn text_input(name: &str, label: &str, value: Option<&str>) -> String {
    format!(
        "<label>{} <input type='text' name='{}' value='{}'/></label>\n",
        label,
        name,
        escape_html(value.unwrap_or(""))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_prefills_last_used_filters() {
        let registry = ReportRegistry::with_builtin_reports();
        let devices = vec![DeviceEntity {
            account_id: "demo".into(),
            device_id: "mobile".into(),
            description: "Mobile Unit".into(),
        }];
        let filters = MenuFilters {
            report_id: Some("EventSummary".into()),
            device_id: Some("mobile".into()),
            date_from: Some("2024/01/02/00:00:00".into()),
            ..Default::default()
        };
        let html = ReportMenu {
            action: "/track/report",
            account_id: "demo",
            user_id: Some("admin"),
            registry: &registry,
            devices: &devices,
            filters: &filters,
        }
        .content();

        assert!(html.contains("<option value='EventSummary' selected>Fleet Summary</option>"));
        assert!(html.contains("<option value='mobile' selected>Mobile Unit</option>"));
        assert!(html.contains("name='date_fr' value='2024/01/02/00:00:00'"));
        assert!(html.contains("<input type='hidden' name='user' value='admin'/>"));
        assert!(html.contains("<option value='ehtml'>ehtml</option>"));
    }
}
