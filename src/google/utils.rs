//! Mail and text helpers
//!
//! Outgoing message construction, MIME body extraction and validation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{Result, ValidationError, WorkspaceMcpError};
use crate::google::types::{EmailContent, MessagePart};

/// Validate an email address
pub fn validate_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);

    !local.is_empty()
        && !domain.is_empty()
        && !email.chars().any(|c| c.is_whitespace() || c.is_control())
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Validate every address of a comma-separated recipient list
pub fn validate_recipients(list: &str) -> Result<()> {
    if has_line_break(list) {
        return Err(WorkspaceMcpError::Validation(ValidationError::InvalidEmail {
            email: list.escape_debug().to_string(),
        }));
    }
    for address in list.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let bare = match (address.find('<'), address.rfind('>')) {
            (Some(start), Some(end)) if start < end => &address[start + 1..end],
            _ => address,
        };
        if !validate_email(bare) {
            return Err(WorkspaceMcpError::Validation(ValidationError::InvalidEmail {
                email: address.to_string(),
            }));
        }
    }
    Ok(())
}

/// Reject a value that would end its header line early
pub fn validate_header_value(name: &str, value: &str) -> Result<()> {
    if has_line_break(value) {
        return Err(WorkspaceMcpError::Validation(ValidationError::InvalidParameter {
            name: name.to_string(),
            message: "must not contain line breaks".to_string(),
        }));
    }
    Ok(())
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

/// Encode text for MIME header (RFC 2047)
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Encode a raw email message for Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from Gmail API, padded or not
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| {
            WorkspaceMcpError::Validation(ValidationError::InvalidParameter {
                name: "base64 data".to_string(),
                message: e.to_string(),
            })
        })
}

pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    String::from_utf8(bytes).map_err(|e| {
        WorkspaceMcpError::Validation(ValidationError::InvalidParameter {
            name: "UTF-8 content".to_string(),
            message: e.to_string(),
        })
    })
}

/// Recursively extract text and HTML bodies from MIME parts
pub fn extract_email_content(message_part: &MessagePart) -> EmailContent {
    let mut content = EmailContent::default();

    let mime_type = message_part.mime_type.as_deref().unwrap_or("");

    if let Some(data) = message_part.body.as_ref().and_then(|b| b.data.as_ref()) {
        if mime_type.starts_with("text/") {
            match decode_base64url_string(data) {
                Ok(decoded) => {
                    if mime_type == "text/plain" {
                        content.text = decoded;
                    } else if mime_type == "text/html" {
                        content.html = decoded;
                    }
                }
                Err(e) => {
                    tracing::debug!("Failed to decode {} part: {}", mime_type, e);
                }
            }
        }
    }

    for part in &message_part.parts {
        let nested = extract_email_content(part);
        content.text.push_str(&nested.text);
        content.html.push_str(&nested.html);
    }

    content
}

/// Plain text body, or the HTML body when there is no text part
pub fn message_body(payload: &MessagePart) -> String {
    let content = extract_email_content(payload);
    if content.text.is_empty() {
        content.html
    } else {
        content.text
    }
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Truncate to at most `max` characters, on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Parameters of an outgoing plain-text message
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub from: Option<String>,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub in_reply_to: Option<String>,
}

impl OutgoingMessage {
    /// RFC 822 text with CRLF line endings
    pub fn to_rfc822(&self) -> String {
        let mut lines = Vec::new();

        if let Some(from) = self.from.as_deref().filter(|f| !f.is_empty()) {
            lines.push(format!("From: {}", from));
        }
        lines.push(format!("To: {}", self.to));
        if let Some(cc) = self.cc.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("Cc: {}", cc));
        }
        if let Some(bcc) = self.bcc.as_deref().filter(|b| !b.is_empty()) {
            lines.push(format!("Bcc: {}", bcc));
        }
        lines.push(format!("Subject: {}", encode_mime_header(&self.subject)));
        if let Some(reply) = self.in_reply_to.as_deref().filter(|r| !r.is_empty()) {
            lines.push(format!("In-Reply-To: {}", reply));
            lines.push(format!("References: {}", reply));
        }
        lines.push("MIME-Version: 1.0".to_string());
        lines.push("Content-Type: text/plain; charset=utf-8".to_string());
        lines.push(String::new());
        lines.push(self.body.clone());

        lines.join("\r\n")
    }

    /// base64url form expected in the Gmail `raw` field
    ///
    /// Header fields are written verbatim, so any of them carrying a line
    /// break is refused. The subject is RFC 2047 encoded instead.
    pub fn encode(&self) -> Result<String> {
        validate_header_value("from", self.from.as_deref().unwrap_or(""))?;
        validate_header_value("to", &self.to)?;
        validate_header_value("cc", self.cc.as_deref().unwrap_or(""))?;
        validate_header_value("bcc", self.bcc.as_deref().unwrap_or(""))?;
        validate_header_value("inReplyTo", self.in_reply_to.as_deref().unwrap_or(""))?;
        Ok(encode_raw_message(&self.to_rfc822()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::types::{Header, MessagePartBody};

    fn part(mime: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: Some(mime.to_string()),
            body: Some(MessagePartBody {
                size: text.len() as i64,
                data: Some(URL_SAFE_NO_PAD.encode(text)),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com"));
        assert!(validate_email("user.name@domain.co.uk"));
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("user@.com"));
    }

    #[test]
    fn test_validate_recipients() {
        assert!(validate_recipients("a@example.com, Bob <bob@example.com>").is_ok());
        assert!(validate_recipients("a@example.com, nope").is_err());
    }

    #[test]
    fn test_encode_mime_header_unicode() {
        let encoded = encode_mime_header("Grüße");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert_eq!(encode_mime_header("Hello"), "Hello");
    }

    #[test]
    fn test_decode_base64url() {
        assert_eq!(decode_base64url_string("SGVsbG8gV29ybGQ").unwrap(), "Hello World");
    }

    #[test]
    fn test_body_prefers_text() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![part("text/plain", "plain"), part("text/html", "<p>rich</p>")],
            ..Default::default()
        };
        assert_eq!(message_body(&payload), "plain");
    }

    #[test]
    fn test_body_falls_back_to_html() {
        let payload = MessagePart {
            mime_type: Some("multipart/alternative".to_string()),
            parts: vec![part("text/html", "<p>rich</p>")],
            ..Default::default()
        };
        assert_eq!(message_body(&payload), "<p>rich</p>");
    }

    #[test]
    fn test_find_header_case_insensitive() {
        let payload = MessagePart {
            headers: vec![Header {
                name: "Subject".to_string(),
                value: "Hi".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(find_header(&payload, "subject"), Some("Hi"));
        assert_eq!(find_header(&payload, "From"), None);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_outgoing_message() {
        let message = OutgoingMessage {
            from: Some("me@example.com".to_string()),
            to: "you@example.com".to_string(),
            subject: "Re: Plan".to_string(),
            body: "Sounds good".to_string(),
            in_reply_to: Some("<abc@mail>".to_string()),
            ..Default::default()
        };
        let text = message.to_rfc822();
        assert!(text.starts_with("From: me@example.com\r\nTo: you@example.com\r\n"));
        assert!(text.contains("In-Reply-To: <abc@mail>\r\nReferences: <abc@mail>"));
        assert!(!text.contains("Cc:"));
        assert!(text.ends_with("\r\n\r\nSounds good"));
        assert_eq!(decode_base64url_string(&message.encode().unwrap()).unwrap(), text);
    }

    #[test]
    fn test_recipient_with_line_break_rejected() {
        assert!(!validate_email("x\r\nBcc:evil@attacker.com"));
        assert!(validate_recipients("x\r\nBcc:evil@attacker.com").is_err());
        assert!(validate_recipients("a@example.com,\nCc: spy@attacker.com").is_err());
        assert!(validate_header_value("inReplyTo", "<abc@mail>\r\nBcc: x@y.z").is_err());
        assert!(validate_header_value("inReplyTo", "<abc@mail>").is_ok());
    }

    #[test]
    fn test_encode_refuses_injected_headers() {
        let message = OutgoingMessage {
            to: "you@example.com".to_string(),
            subject: "Hi\r\nBcc: evil@attacker.com".to_string(),
            body: "body".to_string(),
            in_reply_to: Some("<abc@mail>\r\nCc: spy@attacker.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            message.encode(),
            Err(WorkspaceMcpError::Validation(ValidationError::InvalidParameter { .. }))
        ));

        let message = OutgoingMessage {
            in_reply_to: None,
            ..message
        };
        let text = decode_base64url_string(&message.encode().unwrap()).unwrap();
        assert!(!text.contains("\r\nBcc:"));
        assert!(text.contains("Subject: =?UTF-8?B?"));
    }
}
