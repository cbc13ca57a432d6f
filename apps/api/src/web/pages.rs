use std::time::Duration;

use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use pulldown_cmark::{html::push_html, CowStr, Event, Options, Parser, Tag};

use crate::evaluation::pipeline::EvaluationReport;
use crate::evaluation::requirements::ExperienceBracket;
use crate::usage::gate::Remaining;

const TITLE: &str = "AI Recruitment Agent";

#[derive(Debug, Clone, PartialEq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Requirement fields echoed back into the form after a rejected submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormDraft {
    pub role: String,
    pub core_skills: String,
    pub soft_skills: String,
    pub experience: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PageBody {
    /// Cooldown active: message, contact pointer, admin unlock. No form.
    Blocked { remaining: Remaining },
    Form {
        admin: bool,
        admin_code: Option<String>,
        notice: Option<Notice>,
        draft: FormDraft,
    },
    Results {
        report: EvaluationReport,
        admin: bool,
        next_eligible_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone)]
pub struct Page {
    pub contact_url: String,
    pub cooldown: Duration,
    pub body: PageBody,
}

pub fn render_page(page: &Page) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (TITLE) }
                style { (PreEscaped(styles())) }
            }
            body {
                main class="ra-main" {
                    h1 { (TITLE) " — The Hiring Brain" }
                    p class="ra-muted" { "Powered by Gemini 2.5 Flash" }
                    @match &page.body {
                        PageBody::Blocked { remaining } => {
                            (blocked_panel(remaining, &page.contact_url))
                        }
                        PageBody::Form { admin, admin_code, notice, draft } => {
                            (form_panel(*admin, admin_code.as_deref(), notice.as_ref(), draft, page))
                        }
                        PageBody::Results { report, admin, next_eligible_at } => {
                            (results_panel(report, *admin, next_eligible_at.as_ref()))
                        }
                    }
                }
            }
        }
    };

    markup.into_string()
}

fn blocked_panel(remaining: &Remaining, contact_url: &str) -> Markup {
    html! {
        div class="ra-notice error" {
            "You already used this app. Try again after " (remaining) "."
        }
        div class="ra-notice info" {
            "For unlimited use, contact admin at "
            a href=(contact_url) { (contact_url) } "."
        }
        (admin_access_form())
    }
}

fn admin_access_form() -> Markup {
    html! {
        form method="post" action="/" class="ra-form ra-admin" {
            label for="admin_code" { "Admin access code" }
            input id="admin_code" type="password" name="admin_code" autocomplete="off";
            button type="submit" { "Unlock" }
        }
    }
}

fn form_panel(
    admin: bool,
    admin_code: Option<&str>,
    notice: Option<&Notice>,
    draft: &FormDraft,
    page: &Page,
) -> Markup {
    let contact_url = page.contact_url.as_str();
    html! {
        @if let Some(notice) = notice {
            (notice_box(notice))
        }
        @if admin {
            div class="ra-notice success" { "Admin mode active — unlimited usage enabled!" }
        } @else {
            div class="ra-notice warning" {
                "Each user can only use this app " strong { (usage_allowance(page.cooldown)) } ". "
                "If you need extended access, contact admin at "
                a href=(contact_url) { (contact_url) } "."
            }
        }
        form method="post" action="/analyze" enctype="multipart/form-data" class="ra-form" {
            fieldset {
                legend { "Admin Access" }
                label for="admin_code" { "Access code" }
                input id="admin_code" type="password" name="admin_code" autocomplete="off"
                    value=(admin_code.unwrap_or_default());
            }
            fieldset {
                legend { "Define HR Requirements" }
                label for="role" { "Role Title (e.g., Data Scientist, Frontend Engineer)" }
                input id="role" type="text" name="role" value=(draft.role);
                label for="core_skills" { "Core Technical Skills (comma-separated)" }
                textarea id="core_skills" name="core_skills" placeholder="Python, Machine Learning, SQL" { (draft.core_skills) }
                label for="soft_skills" { "Soft Skills (comma-separated)" }
                textarea id="soft_skills" name="soft_skills" placeholder="Communication, Teamwork, Problem Solving" { (draft.soft_skills) }
                label for="experience" { "Experience Required" }
                select id="experience" name="experience" {
                    @for bracket in ExperienceBracket::ALL {
                        option value=(bracket.label())
                            selected[draft.experience.as_deref() == Some(bracket.label())] { (bracket.label()) }
                    }
                }
            }
            fieldset {
                legend { "Upload Candidate Resume" }
                label for="resume" { "Upload PDF or Text file" }
                input id="resume" type="file" name="resume" accept=".pdf,.txt,application/pdf,text/plain";
            }
            button type="submit" class="primary" { "Analyze Candidate" }
        }
    }
}

/// "once per 24 hours", "once per hour", "once per 90 minutes".
fn usage_allowance(cooldown: Duration) -> String {
    let secs = cooldown.as_secs();
    let (count, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if count == 1 {
        format!("once per {unit}")
    } else {
        format!("once per {count} {unit}s")
    }
}

fn results_panel(
    report: &EvaluationReport,
    admin: bool,
    next_eligible_at: Option<&DateTime<Utc>>,
) -> Markup {
    html! {
        div class="ra-notice success" { "Recruitment evaluation complete!" }
        section {
            h2 { "Candidate Summary" }
            div class="ra-notice info ra-pre" { (report.summary) }
        }
        section {
            h2 { "Evaluation Breakdown" }
            (render_markdown(&report.evaluation))
        }
        section {
            h2 { "AI HR Recommendation" }
            (render_markdown(&report.recommendation))
        }
        @if admin {
            div class="ra-notice success" { "Admin mode active — unlimited usage enabled!" }
        } @else {
            @if let Some(at) = next_eligible_at {
                div class="ra-notice info" {
                    "You can use this app again after: " (at.format("%Y-%m-%d %H:%M:%S UTC"))
                }
            }
        }
        p { a href="/" { "Back" } }
    }
}

fn notice_box(notice: &Notice) -> Markup {
    let class = match notice.level {
        NoticeLevel::Warning => "ra-notice warning",
        NoticeLevel::Error => "ra-notice error",
    };
    html! { div class=(class) { (notice.text) } }
}

/// Markdown to HTML. Raw HTML in the model output is shown as text and
/// link or image targets outside [`is_safe_url`] are blanked.
pub fn render_markdown(text: &str) -> Markup {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_safe_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if !is_safe_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed(""),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    push_html(&mut out, events);
    PreEscaped(out)
}

/// Relative URLs and the `http`, `https` and `mailto` schemes.
fn is_safe_url(url: &str) -> bool {
    // Browsers ignore embedded whitespace and control characters in schemes.
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.find(|c| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if normalized[i..].starts_with(':') => {
            matches!(&normalized[..i], "http" | "https" | "mailto")
        }
        _ => true,
    }
}

fn styles() -> &'static str {
    "body{font-family:system-ui,sans-serif;background:#f6f7f9;color:#1d2330;margin:0}\
     .ra-main{max-width:760px;margin:0 auto;padding:2rem 1rem}\
     .ra-muted{color:#6b7280;margin-top:-0.5rem}\
     .ra-notice{border-radius:6px;padding:0.75rem 1rem;margin:1rem 0}\
     .ra-notice.error{background:#fde8e8;color:#9b1c1c}\
     .ra-notice.warning{background:#fdf6b2;color:#723b13}\
     .ra-notice.info{background:#e1effe;color:#1e429f}\
     .ra-notice.success{background:#def7ec;color:#03543f}\
     .ra-pre{white-space:pre-wrap}\
     .ra-form fieldset{border:1px solid #d1d5db;border-radius:6px;margin:1rem 0;padding:1rem}\
     .ra-form label{display:block;margin:0.5rem 0 0.25rem}\
     .ra-form input[type=text],.ra-form input[type=password],.ra-form textarea,.ra-form select{width:100%;box-sizing:border-box;padding:0.4rem}\
     .ra-form button.primary{background:#1c64f2;color:#fff;border:0;border-radius:6px;padding:0.6rem 1.2rem}"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: PageBody) -> String {
        page_with_cooldown(Duration::from_secs(86_400), body)
    }

    fn page_with_cooldown(cooldown: Duration, body: PageBody) -> String {
        render_page(&Page {
            contact_url: "https://example.test/contact".to_string(),
            cooldown,
            body,
        })
    }

    fn empty_form() -> PageBody {
        PageBody::Form {
            admin: false,
            admin_code: None,
            notice: None,
            draft: FormDraft::default(),
        }
    }

    #[test]
    fn test_blocked_page_has_message_and_no_evaluation_form() {
        let html = page(PageBody::Blocked {
            remaining: Remaining { seconds: 5.0 * 3600.0 + 12.0 * 60.0 + 30.0 },
        });
        assert!(html.contains("Try again after 5h 12m."));
        assert!(html.contains("https://example.test/contact"));
        assert!(!html.contains("action=\"/analyze\""));
    }

    #[test]
    fn test_form_lists_all_experience_brackets() {
        let html = page(empty_form());
        for label in ["0-1 years", "1-3 years", "3-5 years", "5+ years"] {
            assert!(html.contains(&format!("<option value=\"{label}\">")));
        }
        assert!(html.contains("once per 24 hours"));
    }

    #[test]
    fn test_form_states_configured_cooldown() {
        assert!(page_with_cooldown(Duration::from_secs(3600), empty_form()).contains("once per hour"));
        assert!(page_with_cooldown(Duration::from_secs(5400), empty_form()).contains("once per 90 minutes"));
        assert!(!page_with_cooldown(Duration::from_secs(3600), empty_form()).contains("24 hours"));
        assert_eq!(usage_allowance(Duration::from_secs(45)), "once per 45 seconds");
    }

    #[test]
    fn test_form_keeps_submitted_values_after_warning() {
        let html = page(PageBody::Form {
            admin: false,
            admin_code: None,
            notice: Some(Notice::warning("Please fill in both HR requirements and upload a resume.")),
            draft: FormDraft {
                role: "Data \"Scientist\"".to_string(),
                core_skills: "Python, <SQL>".to_string(),
                soft_skills: "Teamwork".to_string(),
                experience: Some("3-5 years".to_string()),
            },
        });

        assert!(html.contains("Please fill in both HR requirements"));
        assert!(html.contains("value=\"Data &quot;Scientist&quot;\""));
        assert!(html.contains(">Python, &lt;SQL&gt;</textarea>"));
        assert!(html.contains(">Teamwork</textarea>"));
        assert!(html.contains("<option value=\"3-5 years\" selected>"));
        assert!(!html.contains("<option value=\"0-1 years\" selected>"));
    }

    #[test]
    fn test_results_escape_summary_and_show_next_time() {
        let html = page(PageBody::Results {
            report: EvaluationReport {
                summary: "<script>alert(1)</script>".to_string(),
                evaluation: "- Skill Match: 80%".to_string(),
                recommendation: "1. **Recommendation:** Hire".to_string(),
            },
            admin: false,
            next_eligible_at: DateTime::from_timestamp(86_400, 0),
        });
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("<strong>Recommendation:</strong>"));
        assert!(html.contains("1970-01-02 00:00:00 UTC"));
    }

    #[test]
    fn test_admin_results_confirm_unlimited_usage() {
        let html = page(PageBody::Results {
            report: EvaluationReport {
                summary: "s".to_string(),
                evaluation: "e".to_string(),
                recommendation: "r".to_string(),
            },
            admin: true,
            next_eligible_at: None,
        });
        assert!(html.contains("unlimited usage enabled"));
        assert!(!html.contains("You can use this app again"));
    }

    #[test]
    fn test_markdown_suppresses_raw_html() {
        let out = render_markdown("Hello <img src=x onerror=alert(1)>").into_string();
        assert!(!out.contains("<img"));
        assert!(out.contains("&lt;img"));
    }

    #[test]
    fn test_markdown_neutralizes_script_links() {
        let out = render_markdown("[Click for details](javascript:alert(document.cookie))").into_string();
        assert!(!out.contains("javascript:"), "{out}");
        assert!(out.contains("<a href=\"#\">Click for details</a>"));

        let out = render_markdown("![x](data:text/html;base64,PHNjcmlwdD4=) <JavaScript:alert(1)>")
            .into_string()
            .to_ascii_lowercase();
        assert!(!out.contains("src=\"data:"), "{out}");
        assert!(!out.contains("href=\"javascript:"), "{out}");
    }

    #[test]
    fn test_markdown_keeps_web_and_relative_links() {
        let out = render_markdown(
            "[site](https://example.test/a) [mail](mailto:hr@example.test) [rel](/jobs/1) [frag](#top)",
        )
        .into_string();
        assert!(out.contains("href=\"https://example.test/a\""));
        assert!(out.contains("href=\"mailto:hr@example.test\""));
        assert!(out.contains("href=\"/jobs/1\""));
        assert!(out.contains("href=\"#top\""));
    }

    #[test]
    fn test_safe_url_schemes() {
        assert!(is_safe_url("HTTPS://example.test"));
        assert!(is_safe_url("docs/readme.md"));
        assert!(is_safe_url("/path?q=a:b"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url(" java\nscript:alert(1)"));
        assert!(!is_safe_url("vbscript:msgbox"));
        assert!(!is_safe_url("data:text/html,hi"));
    }
}
