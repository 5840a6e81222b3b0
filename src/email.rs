//! Outlook e-mail ingestion.
//!
//! Turns an uploaded `.eml` or `.msg` file into the pieces of a submission:
//! the subject becomes the project, the envelope becomes the context and the
//! body becomes the update text.

use mailparse::{MailHeaderMap, ParsedMail};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, TrackerError};
use crate::fields::ActivityType;
use crate::task::{non_blank, WeeklyTaskSubmission};

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

const SUBJECT_PREFIXES: [&str; 3] = ["re:", "fw:", "fwd:"];

/// What an e-mail contributes to a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEmail {
    pub project: Option<String>,
    pub context: Option<String>,
    pub update_text: String,
}

impl ParsedEmail {
    /// Fill a submission, letting explicit values win over parsed ones.
    pub fn into_submission(
        self,
        project: Option<String>,
        context: Option<String>,
        activity_type: ActivityType,
        update: Option<String>,
    ) -> Result<WeeklyTaskSubmission> {
        let update = non_blank(update).unwrap_or(self.update_text);
        WeeklyTaskSubmission::new(
            non_blank(project).or(self.project),
            non_blank(context).or(self.context),
            activity_type,
            update,
        )
    }
}

/// Envelope fields shared by both container formats.
#[derive(Debug, Default)]
struct Envelope {
    subject: String,
    sender: String,
    recipients: String,
    date: String,
    body: String,
}

impl Envelope {
    fn into_parsed(self) -> ParsedEmail {
        let subject = strip_subject_prefix(&self.subject);
        let sender = self.sender.trim();
        let recipients = self.recipients.trim();
        let date = self.date.trim();

        let mut parts = Vec::new();
        if !sender.is_empty() {
            parts.push(format!("From {sender}"));
        }
        if !recipients.is_empty() {
            parts.push(format!("to {recipients}"));
        }
        if !date.is_empty() {
            parts.push(format!("on {date}"));
        }
        let mut context = parts.join(", ");
        if !subject.is_empty() {
            context = if context.is_empty() { subject.clone() } else { format!("{context}: {subject}") };
        }

        let body = self.body.trim().to_string();
        let update_text = if !body.is_empty() {
            body
        } else if !context.is_empty() {
            context.clone()
        } else {
            subject.clone()
        };

        ParsedEmail {
            project: Some(subject).filter(|s| !s.is_empty()),
            context: Some(context).filter(|c| !c.is_empty()),
            update_text,
        }
    }
}

/// Parse an e-mail file, dispatching on its extension.
pub fn parse_email(filename: &str, content: &[u8]) -> Result<ParsedEmail> {
    let name = filename.to_lowercase();
    if name.ends_with(".eml") {
        parse_eml(content)
    } else if name.ends_with(".msg") {
        parse_msg(content)
    } else {
        Err(TrackerError::UnsupportedFormat(format!(
            "'{filename}' (expected .eml or .msg)"
        )))
    }
}

/// Remove leading reply/forward markers, e.g. "RE: Fwd: Launch" -> "Launch".
pub fn strip_subject_prefix(subject: &str) -> String {
    let mut rest = subject.trim();
    'outer: loop {
        for prefix in SUBJECT_PREFIXES {
            let matched = rest
                .get(..prefix.len())
                .map(|head| head.eq_ignore_ascii_case(prefix))
                .unwrap_or(false);
            if matched {
                rest = rest[prefix.len()..].trim_start();
                continue 'outer;
            }
        }
        break;
    }
    rest.trim().to_string()
}

/// Lightweight tag removal. Entities are left as-is.
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

fn parse_eml(content: &[u8]) -> Result<ParsedEmail> {
    let mail = mailparse::parse_mail(content).map_err(|e| TrackerError::EmailParse(e.to_string()))?;
    let header = |name: &str| mail.headers.get_first_value(name).unwrap_or_default();

    let envelope = Envelope {
        subject: header("Subject"),
        sender: header("From"),
        recipients: header("To"),
        date: header("Date"),
        body: eml_body(&mail)?,
    };
    Ok(envelope.into_parsed())
}

/// First text/plain part, else the first text/html part without tags.
fn eml_body(mail: &ParsedMail<'_>) -> Result<String> {
    let mut parts = Vec::new();
    walk_parts(mail, &mut parts);

    let find = |mimetype: &str| parts.iter().find(|p| p.ctype.mimetype.eq_ignore_ascii_case(mimetype));

    if let Some(plain) = find("text/plain") {
        let body = plain.get_body().map_err(|e| TrackerError::EmailParse(e.to_string()))?;
        if !body.trim().is_empty() {
            return Ok(body);
        }
    }
    if let Some(html) = find("text/html") {
        let body = html.get_body().map_err(|e| TrackerError::EmailParse(e.to_string()))?;
        return Ok(strip_html(&body));
    }
    Ok(String::new())
}

/// Depth-first list of the message and all of its subparts.
fn walk_parts<'a, 'm>(mail: &'a ParsedMail<'m>, out: &mut Vec<&'a ParsedMail<'m>>) {
    out.push(mail);
    for sub in &mail.subparts {
        walk_parts(sub, out);
    }
}

#[cfg(feature = "msg")]
fn parse_msg(content: &[u8]) -> Result<ParsedEmail> {
    let message =
        msg_parser::Outlook::from_slice(content).map_err(|e| TrackerError::EmailParse(e.to_string()))?;

    let sender = if message.sender.email.is_empty() {
        message.sender.name.clone()
    } else {
        message.sender.email.clone()
    };
    let recipients = message
        .to
        .iter()
        .map(|p| if p.email.is_empty() { p.name.clone() } else { p.email.clone() })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let envelope = Envelope {
        subject: message.subject.clone(),
        sender,
        recipients,
        date: message.headers.date.clone(),
        body: message.body.clone(),
    };
    Ok(envelope.into_parsed())
}

#[cfg(not(feature = "msg"))]
fn parse_msg(_content: &[u8]) -> Result<ParsedEmail> {
    Err(TrackerError::UnsupportedFormat(
        "MSG parsing requires building wt with the `msg` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIMPLE_EML: &str = "Subject: Re: Launch Plan\r\n\
From: a@x.com\r\n\
\r\n\
Ship the landing page.\r\n";

    #[test]
    fn test_parse_plain_eml() {
        let parsed = parse_email("weekly.EML", SIMPLE_EML.as_bytes()).unwrap();
        assert_eq!(parsed.project.as_deref(), Some("Launch Plan"));
        let context = parsed.context.unwrap();
        assert!(context.contains("a@x.com"));
        assert!(context.contains("Launch Plan"));
        assert_eq!(context, "From a@x.com: Launch Plan");
        assert_eq!(parsed.update_text, "Ship the landing page.");
    }

    #[test]
    fn test_full_envelope_context() {
        let raw = "Subject: FWD: Q3 Review\r\n\
From: lead@corp.com\r\n\
To: team@corp.com\r\n\
Date: Mon, 6 Jan 2025 09:00:00 +0000\r\n\
\r\n\
Deliver the Q3 review deck to finance.\r\n";
        let parsed = parse_email("q3.eml", raw.as_bytes()).unwrap();
        assert_eq!(
            parsed.context.as_deref(),
            Some("From lead@corp.com, to team@corp.com, on Mon, 6 Jan 2025 09:00:00 +0000: Q3 Review")
        );
        assert_eq!(parsed.project.as_deref(), Some("Q3 Review"));
    }

    #[test]
    fn test_multipart_prefers_plain_text() {
        let raw = "Subject: Status\r\n\
From: a@x.com\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>HTML version.</p>\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Plain version.\r\n\
--XYZ--\r\n";
        let parsed = parse_email("status.eml", raw.as_bytes()).unwrap();
        assert_eq!(parsed.update_text, "Plain version.");
    }

    #[test]
    fn test_html_only_body_is_stripped() {
        let raw = "Subject: Status\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Plan the <b>offsite</b> &amp; agenda.</p>\r\n\
--XYZ--\r\n";
        let parsed = parse_email("status.eml", raw.as_bytes()).unwrap();
        assert_eq!(parsed.update_text, "Plan the offsite &amp; agenda.");
        assert_eq!(parsed.context.as_deref(), Some("Status"));
    }

    #[test]
    fn test_missing_body_falls_back_to_context() {
        let raw = "Subject: Re: Budget\r\nFrom: cfo@x.com\r\n\r\n";
        let parsed = parse_email("budget.eml", raw.as_bytes()).unwrap();
        assert_eq!(parsed.update_text, "From cfo@x.com: Budget");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_email("notes.txt", b"hello").unwrap_err();
        assert!(matches!(err, TrackerError::UnsupportedFormat(_)));
    }

    #[cfg(not(feature = "msg"))]
    #[test]
    fn test_msg_without_decoder_fails_cleanly() {
        let err = parse_email("weekly.msg", b"\xd0\xcf\x11\xe0").unwrap_err();
        assert!(matches!(err, TrackerError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("msg"));
    }

    #[cfg(feature = "msg")]
    #[test]
    fn test_corrupt_msg_is_a_parse_error() {
        let err = parse_email("weekly.MSG", b"\xd0\xcf\x11\xe0 not a compound file").unwrap_err();
        assert!(matches!(err, TrackerError::EmailParse(_)));
    }

    #[test]
    fn test_strip_subject_prefix() {
        assert_eq!(strip_subject_prefix("Re: Launch Plan"), "Launch Plan");
        assert_eq!(strip_subject_prefix("  RE: fw: Launch "), "Launch");
        assert_eq!(strip_subject_prefix("Fwd:Launch"), "Launch");
        assert_eq!(strip_subject_prefix("Rebrand kickoff"), "Rebrand kickoff");
        assert_eq!(strip_subject_prefix("Ré"), "Ré");
    }

    #[test]
    fn test_explicit_values_win() {
        let parsed = parse_email("weekly.eml", SIMPLE_EML.as_bytes()).unwrap();
        let submission = parsed
            .into_submission(Some("Atlas".into()), None, ActivityType::OpsCompliance, None)
            .unwrap();
        assert_eq!(submission.project.as_deref(), Some("Atlas"));
        assert_eq!(submission.context.as_deref(), Some("From a@x.com: Launch Plan"));
        assert_eq!(submission.update, "Ship the landing page.");
        assert_eq!(submission.activity_type, ActivityType::OpsCompliance);
    }
}
