use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SUBJECT: &str = "Your Weekly Project Roast - It's Time To Ship! 🚢";

/// Analysis of one reminder-enabled project, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRoast {
    pub name: String,
    pub url: Option<String>,
    pub roast: String,
    pub days_since_activity: Option<i64>,
    pub stars: Option<u64>,
    pub unavailable: bool,
}

#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// "Monday, June 3, 2024"
#[must_use]
pub fn format_date(now: DateTime<Utc>) -> String {
    now.format("%A, %B %-d, %Y").to_string()
}

fn render_project(html: &mut String, project: &ProjectRoast) {
    let _ = write!(
        html,
        r#"<div style="margin-bottom: 20px; padding: 15px; border-left: 4px solid #e74c3c; background-color: #f9f9f9;"><h3 style="margin-top: 0; color: #e74c3c;">Project: {}</h3><p><strong>The Hard Truth:</strong> {}</p>"#,
        escape_html(&project.name),
        escape_html(&project.roast),
    );

    if let Some(url) = project.url.as_deref() {
        let _ = write!(
            html,
            r#"<p><a href="{}" style="color: #3498db; text-decoration: none;">View on GitHub</a></p>"#,
            escape_html(url),
        );
    }

    if let Some(days) = project.days_since_activity.filter(|days| *days > 0) {
        let _ = write!(
            html,
            r#"<p style="font-size: 14px;">Days since last activity: {days}</p>"#
        );
    }

    if let Some(stars) = project.stars {
        let _ = write!(html, r#"<p style="font-size: 14px;">Stars: {stars}</p>"#);
    }

    html.push_str("</div>");
}

#[must_use]
pub fn render_reminder_email(
    github_login: &str,
    projects: &[ProjectRoast],
    now: DateTime<Utc>,
    site_url: &str,
) -> String {
    let greeting = if github_login.trim().is_empty() {
        "there"
    } else {
        github_login
    };
    let site_label = escape_html(
        site_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/'),
    );
    let site_url = escape_html(site_url);

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<html><body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;"><div style="max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #eee; border-radius: 5px;"><h1 style="color: #2c3e50;">Weekly Project Roast - {}</h1><p>Hello {},</p><p>It's time for your weekly dose of tough love for those unfinished projects of yours:</p>"#,
        escape_html(&format_date(now)),
        escape_html(greeting),
    );

    for project in projects {
        render_project(&mut html, project);
    }

    let _ = write!(
        html,
        r#"<div style="margin: 30px 0; padding: 20px; background-color: #f8f9fa; border-radius: 5px;"><p style="margin: 0; font-style: italic;">"The difference between a successful person and others is not a lack of strength, not a lack of knowledge, but rather a lack of will." – Vince Lombardi</p></div><p>Remember, we're roasting your projects because we care. Now get back to coding!</p><p>Visit <a href="{site_url}" style="color: #3498db; text-decoration: none;">{site_label}</a> to update your progress.</p><p style="margin-top: 30px; font-size: 12px; color: #7f8c8d;">This is an automated message from Job Not Finished. You're receiving this because you enabled project reminders. You can disable these reminders from your user settings.</p></div></body></html>"#,
    );

    html
}
