/// HTML email builders
///
/// Every builder returns a [`RenderedEmail`]. Caller-supplied values are
/// HTML-escaped before they are interpolated.

use chrono::{DateTime, Datelike, Utc};

use crate::models::appointment::AppointmentStatus;
use crate::models::tracking::TrackingEntry;

const BRAND: &str = "MonuMe Tracker";

/// Subject and HTML body of an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Escapes text for inclusion in HTML element content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Banner colour for an appointment status
pub fn status_color(status: Option<AppointmentStatus>) -> &'static str {
    match status {
        Some(AppointmentStatus::Confirmed) => "#28a745",
        Some(AppointmentStatus::Cancelled) => "#dc3545",
        Some(AppointmentStatus::Rescheduled) => "#007bff",
        Some(AppointmentStatus::Scheduled) => "#fd7e14",
        None => "#6c757d",
    }
}

fn layout(heading: &str, accent: &str, body: &str, year: i32) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; color: #333; }}
  .container {{ max-width: 600px; margin: 0 auto; background-color: #fff; padding: 20px; border-radius: 10px; }}
  .header {{ background: {accent}; color: white; padding: 20px; text-align: center; border-radius: 8px 8px 0 0; }}
  .logo {{ font-size: 28px; font-weight: bold; margin-bottom: 10px; }}
  .panel {{ background-color: #f8f9fa; border-left: 4px solid {accent}; padding: 15px; margin: 20px 0; }}
  .button {{ display: inline-block; padding: 10px 20px; background: {accent}; color: white; text-decoration: none; border-radius: 5px; }}
  .footer {{ margin-top: 30px; text-align: center; font-size: 12px; color: #777; }}
  td {{ padding: 4px 12px 4px 0; }}
</style>
</head>
<body>
<div class="container">
  <div class="header">
    <div class="logo">{brand}</div>
    <div>{heading}</div>
  </div>
{body}
  <div class="footer">
    <p>This is an automated message from {brand}. Please do not reply to this email.</p>
    <p>&copy; {year} {brand}</p>
  </div>
</div>
</body>
</html>
"#,
        accent = accent,
        brand = BRAND,
        heading = escape_html(heading),
        body = body,
        year = year,
    )
}

/// Fixed email for checking the SMTP configuration
pub fn test_email(sent_at: DateTime<Utc>) -> RenderedEmail {
    let body = format!(
        r#"  <div class="panel">
    <p>This is a test email to confirm your email configuration is working correctly.</p>
    <p><strong>Time sent:</strong> {}</p>
  </div>
  <p>You can now use the email features in {}:</p>
  <ul>
    <li>Performance summary emails</li>
    <li>Daily reports</li>
    <li>Weekly digests</li>
  </ul>
  <p>No further action is required.</p>"#,
        sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        BRAND
    );

    RenderedEmail {
        subject: format!("{} - Test Email", BRAND),
        html: layout("Email Configuration Test", "#ff7f42", &body, sent_at.year()),
    }
}

/// Details shown in an appointment confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDetails {
    pub customer_name: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub location: Option<String>,
    pub sales_rep: Option<String>,
    /// Customer-facing link to confirm, cancel or reschedule
    pub status_url: String,
}

/// Confirmation sent to a customer after booking
pub fn appointment_confirmation(details: &AppointmentDetails, year: i32) -> RenderedEmail {
    let location_row = details
        .location
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!("<tr><td><strong>Location</strong></td><td>{}</td></tr>", escape_html(l)))
        .unwrap_or_default();
    let sales_rep_row = details
        .sales_rep
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(|r| format!("<tr><td><strong>Your host</strong></td><td>{}</td></tr>", escape_html(r)))
        .unwrap_or_default();

    let body = format!(
        r#"  <p>Hi {name},</p>
  <p>Your appointment has been scheduled.</p>
  <div class="panel">
    <table>
      <tr><td><strong>Appointment</strong></td><td>{title}</td></tr>
      <tr><td><strong>Date</strong></td><td>{date}</td></tr>
      <tr><td><strong>Time</strong></td><td>{time}</td></tr>
      {location_row}
      {sales_rep_row}
    </table>
  </div>
  <p>Please confirm, cancel or reschedule using the link below.</p>
  <p><a class="button" href="{url}">Manage my appointment</a></p>"#,
        name = escape_html(&details.customer_name),
        title = escape_html(&details.title),
        date = escape_html(&details.date),
        time = escape_html(&details.time),
        location_row = location_row,
        sales_rep_row = sales_rep_row,
        url = escape_html(&details.status_url),
    );

    RenderedEmail {
        subject: format!("Appointment Confirmation: {}", details.title),
        html: layout("Appointment Confirmation", status_color(Some(AppointmentStatus::Scheduled)), &body, year),
    }
}

/// A customer's status change, as reported to staff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotification {
    pub token: String,
    pub status: AppointmentStatus,
    pub rescheduled_for: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Staff alert for an appointment status change
pub fn staff_notification(change: &StatusNotification) -> RenderedEmail {
    let label = capitalize(change.status.as_str());
    let color = status_color(Some(change.status));

    let mut rows = format!(
        "<tr><td><strong>Status</strong></td><td style=\"color: {}; font-weight: bold;\">{}</td></tr>\n      \
         <tr><td><strong>Reference</strong></td><td>{}</td></tr>\n      \
         <tr><td><strong>Changed at</strong></td><td>{}</td></tr>",
        color,
        escape_html(&label),
        escape_html(&change.token),
        change.changed_at.format("%Y-%m-%d %H:%M UTC"),
    );
    if let Some(when) = change.rescheduled_for {
        rows.push_str(&format!(
            "\n      <tr><td><strong>New time</strong></td><td>{}</td></tr>",
            when.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    if let Some(notes) = change.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        rows.push_str(&format!(
            "\n      <tr><td><strong>Notes</strong></td><td>{}</td></tr>",
            escape_html(notes)
        ));
    }

    let body = format!(
        r#"  <p>A customer has updated their appointment.</p>
  <div class="panel">
    <table>
      {}
    </table>
  </div>"#,
        rows
    );

    RenderedEmail {
        subject: format!("Appointment {}: {}", label, change.token),
        html: layout("Appointment Status Update", color, &body, change.changed_at.year()),
    }
}

/// Summary sent to an employee after they save a day's numbers
pub fn performance_summary(display_name: &str, entry: &TrackingEntry) -> RenderedEmail {
    let body = format!(
        r#"  <p>Hi {name},</p>
  <p>Here is your performance summary for {date}.</p>
  <div class="panel">
    <table>
      <tr><td><strong>Opal demos</strong></td><td>{opal_demos}</td></tr>
      <tr><td><strong>Opal sales</strong></td><td>{opal_sales} ({opal_rate:.1}%)</td></tr>
      <tr><td><strong>Scan demos</strong></td><td>{scan_demos}</td></tr>
      <tr><td><strong>Scans sold</strong></td><td>{scan_sold} ({scan_rate:.1}%)</td></tr>
      <tr><td><strong>Net sales</strong></td><td>${net_sales:.2}</td></tr>
      <tr><td><strong>Hours worked</strong></td><td>{hours:.1}</td></tr>
      <tr><td><strong>Sales per hour</strong></td><td>${per_hour:.2}</td></tr>
    </table>
  </div>
  <p>Keep up the great work!</p>"#,
        name = escape_html(display_name),
        date = entry.date.format("%Y-%m-%d"),
        opal_demos = entry.opal_demos,
        opal_sales = entry.opal_sales,
        opal_rate = entry.opal_conversion(),
        scan_demos = entry.scan_demos,
        scan_sold = entry.scan_sold,
        scan_rate = entry.scan_conversion(),
        net_sales = entry.net_sales,
        hours = entry.hours_worked,
        per_hour = entry.sales_per_hour(),
    );

    RenderedEmail {
        subject: format!("{} - Performance Summary for {}", BRAND, entry.date.format("%Y-%m-%d")),
        html: layout("Performance Summary", "#ff7f42", &body, entry.date.year()),
    }
}

/// Free-text email; line breaks in the message are preserved
pub fn simple(subject: &str, message: &str, year: i32) -> RenderedEmail {
    let paragraphs = escape_html(message).replace("\r\n", "\n").replace('\n', "<br>\n");
    let body = format!("  <div class=\"panel\">\n    <p>{}</p>\n  </div>", paragraphs);

    RenderedEmail {
        subject: subject.to_string(),
        html: layout(subject, "#ff7f42", &body, year),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'q'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#x27;q&#x27;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(Some(AppointmentStatus::Confirmed)), "#28a745");
        assert_eq!(status_color(Some(AppointmentStatus::Cancelled)), "#dc3545");
        assert_eq!(status_color(Some(AppointmentStatus::Rescheduled)), "#007bff");
        assert_eq!(status_color(Some(AppointmentStatus::Scheduled)), "#fd7e14");
        assert_eq!(status_color(None), "#6c757d");
    }

    #[test]
    fn test_test_email() {
        let email = test_email(at(2025, 3, 1));
        assert_eq!(email.subject, "MonuMe Tracker - Test Email");
        assert!(email.html.contains("2025-03-01 14:30:00 UTC"));
        assert!(email.html.contains("&copy; 2025"));
    }

    #[test]
    fn test_appointment_confirmation_escapes_values() {
        let details = AppointmentDetails {
            customer_name: "<b>Eve</b>".to_string(),
            title: "Fitting".to_string(),
            date: "2025-03-02".to_string(),
            time: "10:00".to_string(),
            location: Some("Downtown".to_string()),
            sales_rep: None,
            status_url: "https://monume.example/appointment-status?token=abc&x=1".to_string(),
        };

        let email = appointment_confirmation(&details, 2025);
        assert_eq!(email.subject, "Appointment Confirmation: Fitting");
        assert!(email.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(!email.html.contains("<b>Eve</b>"));
        assert!(email.html.contains("token=abc&amp;x=1"));
        assert!(email.html.contains("Downtown"));
        assert!(!email.html.contains("Your host"));
    }

    #[test]
    fn test_appointment_confirmation_names_sales_rep() {
        let details = AppointmentDetails {
            customer_name: "Dana".to_string(),
            title: "Fitting".to_string(),
            date: "2025-03-02".to_string(),
            time: "10:00".to_string(),
            location: None,
            sales_rep: Some("Sam & Co".to_string()),
            status_url: "https://monume.example/static/appointment-status.html?token=abc".to_string(),
        };

        let email = appointment_confirmation(&details, 2025);
        assert!(email.html.contains("Your host"));
        assert!(email.html.contains("Sam &amp; Co"));
        assert!(!email.html.contains("<strong>Location</strong>"));
    }

    #[test]
    fn test_staff_notification_uses_status_color() {
        let change = StatusNotification {
            token: "tok-1".to_string(),
            status: AppointmentStatus::Cancelled,
            rescheduled_for: None,
            notes: Some("Can't make it <sorry>".to_string()),
            changed_at: at(2025, 3, 1),
        };

        let email = staff_notification(&change);
        assert_eq!(email.subject, "Appointment Cancelled: tok-1");
        assert!(email.html.contains("#dc3545"));
        assert!(email.html.contains("&lt;sorry&gt;"));
        assert!(!email.html.contains("New time"));
    }

    #[test]
    fn test_staff_notification_reschedule_shows_new_time() {
        let change = StatusNotification {
            token: "tok-2".to_string(),
            status: AppointmentStatus::Rescheduled,
            rescheduled_for: Some(at(2025, 4, 10)),
            notes: None,
            changed_at: at(2025, 3, 1),
        };

        let email = staff_notification(&change);
        assert!(email.html.contains("#007bff"));
        assert!(email.html.contains("2025-04-10 14:30 UTC"));
    }

    #[test]
    fn test_performance_summary() {
        let entry = TrackingEntry {
            id: 1,
            user_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            opal_demos: 4,
            opal_sales: 1,
            scan_demos: 2,
            scan_sold: 1,
            net_sales: 400.0,
            hours_worked: 8.0,
            created_at: at(2025, 3, 1),
        };

        let email = performance_summary("Jo & Co", &entry);
        assert!(email.subject.ends_with("2025-03-01"));
        assert!(email.html.contains("Jo &amp; Co"));
        assert!(email.html.contains("1 (25.0%)"));
        assert!(email.html.contains("$50.00"));
    }

    #[test]
    fn test_simple_preserves_line_breaks() {
        let email = simple("Shift change", "Line one\nLine <two>", 2025);
        assert_eq!(email.subject, "Shift change");
        assert!(email.html.contains("Line one<br>\nLine &lt;two&gt;"));
    }
}
