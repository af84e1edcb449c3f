use regex::Regex;
use tracing::debug;

/// Extraction patterns in precedence order: site-specific markup first, the
/// bare six-digit fallback last. The first pattern whose capture is exactly
/// six digits wins, so a generic match can never shadow the marked-up code.
const CODE_PATTERNS: &[&str] = &[
    // Dedicated code element in the service's own mail markup
    r#"(?i)class="code"[^>]*>(\d{6})</h1>"#,
    r#"(?i)class="code"[^>]*>(\d{6})</[^>]*>"#,
    // Starred separators around the code
    r"\*{3,}\s*(\d{6})\s*\*{3,}",
    // "6 digit code" phrasing
    r"(?i)6\s+digit\s+code[^0-9]*(\d{6})",
    r"(?i)6\s+digit\s+code[^0-9]*<[^>]*>(\d{6})</[^>]*>",
    // "verification code is" phrasing
    r"(?i)Your verification code is:\s*<b>(\d{6})</b>",
    r"(?i)Your verification code is:\s*(\d{6})",
    r"(?i)verification code is:\s*<b>(\d{6})</b>",
    r"(?i)verification code is:\s*(\d{6})",
    r"(?i)code[：:]\s*<b>(\d{6})</b>",
    r"(?i)code[：:]\s*(\d{6})",
    // Chinese phrasing
    r"验证码[：:]\s*<b>(\d{6})</b>",
    r"验证码[：:]\s*(\d{6})",
    // Bare markup tags
    r"(?i)<b>(\d{6})</b>",
    r"(?i)<strong>(\d{6})</strong>",
    r"(?i)<span[^>]*>(\d{6})</span>",
    r"(?i)<h1[^>]*>(\d{6})</h1>",
    // Last resort: any standalone six digits
    r"\b(\d{6})\b",
];

/// Scan a message body (plain text or HTML) for a six-digit verification code.
pub fn extract_verification_code(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    for pattern in CODE_PATTERNS {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(captures) = re.captures(body) {
                if let Some(code) = captures.get(1) {
                    if code.as_str().len() == 6 {
                        return Some(code.as_str().to_string());
                    }
                }
            }
        }
    }

    let preview: String = body.chars().take(200).collect();
    debug!(preview = %preview, "no verification code found in body");
    None
}
