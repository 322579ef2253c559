//! Input sanitization and structural validation.
//!
//! Pure helpers shared by every resource family: text sanitization,
//! email/URL/date format checks, required-field checks and sort-spec
//! resolution. Non-string input never reaches `sanitize` because request
//! bodies deserialize into typed structs at the handler boundary.

use chrono::NaiveDate;

/// Trim, strip markup tags, and escape characters with special meaning in
/// HTML output. Applied to every free-text field before it reaches SQL.
pub fn sanitize(input: &str) -> String {
    let stripped = strip_tags(input.trim());
    let mut out = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove complete `<...>` tag sequences. An unterminated `<` survives and
/// gets escaped by the caller.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Structural email check: one `@`, non-empty local part, domain with a dot.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Structural URL check: parseable, http(s) scheme, non-empty host.
pub fn is_valid_url(link: &str) -> bool {
    match url::Url::parse(link) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Strict `YYYY-MM-DD` check: parses and round-trips to the same string, so
/// unpadded forms like `2024-1-1` are rejected.
pub fn is_valid_date(date: &str) -> bool {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string() == date,
        Err(_) => false,
    }
}

/// Returns the names of required fields that are absent or empty/whitespace.
/// Non-empty result means a 400 listing the names.
pub fn missing_fields(fields: &[(&'static str, Option<&str>)]) -> Vec<String> {
    fields
        .iter()
        .filter(|(_, value)| match value {
            None => true,
            Some(s) => s.trim().is_empty(),
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A resolved `(column, direction)` pair, guaranteed to be inside the
/// family's allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Resolve caller-supplied sort/order against an allowlist.
    ///
    /// Unrecognized input silently falls back to `default` rather than
    /// failing - a deliberate permissive policy carried over from the
    /// original endpoints, in contrast to the strict 400s elsewhere.
    pub fn resolve(
        sort: Option<&str>,
        order: Option<&str>,
        allowlist: &[&'static str],
        default: SortSpec,
    ) -> SortSpec {
        let field = sort
            .and_then(|s| allowlist.iter().find(|allowed| **allowed == s))
            .copied()
            .unwrap_or(default.field);

        let direction = match order.map(|o| o.to_ascii_lowercase()) {
            Some(ref o) if o == "asc" => SortDirection::Asc,
            Some(ref o) if o == "desc" => SortDirection::Desc,
            _ => default.direction,
        };

        SortSpec { field, direction }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trims_strips_and_escapes() {
        assert_eq!(sanitize("  hello  "), "hello");
        assert_eq!(sanitize("<b>bold</b> move"), "bold move");
        assert_eq!(sanitize("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(sanitize(r#"say "hi" & 'bye'"#), "say &quot;hi&quot; &amp; &#039;bye&#039;");
        assert_eq!(sanitize("<script>alert(1)</script>"), "alert(1)");
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ann@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("ann"));
        assert!(!is_valid_email("ann@"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("ann@nodot"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(is_valid_url("http://localhost:8080/x"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn date_validation_is_strict() {
        assert!(is_valid_date("2026-08-27"));
        assert!(!is_valid_date("2026-8-27"));
        assert!(!is_valid_date("2026-13-01"));
        assert!(!is_valid_date("2026-02-30"));
        assert!(!is_valid_date("27/08/2026"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn missing_fields_catches_absent_and_empty() {
        let missing = missing_fields(&[
            ("name", Some("Ann")),
            ("email", Some("")),
            ("note", Some("   ")),
            ("other", None),
        ]);
        assert_eq!(missing, vec!["email", "note", "other"]);
    }

    #[test]
    fn sort_spec_falls_back_silently() {
        let default = SortSpec { field: "name", direction: SortDirection::Asc };
        let allow = &["name", "student_id", "email"];

        let spec = SortSpec::resolve(Some("email"), Some("desc"), allow, default);
        assert_eq!(spec.field, "email");
        assert_eq!(spec.direction, SortDirection::Desc);

        // Unknown field and direction fall back to the default, no error
        let spec = SortSpec::resolve(Some("password"), Some("sideways"), allow, default);
        assert_eq!(spec.field, "name");
        assert_eq!(spec.direction, SortDirection::Asc);

        let spec = SortSpec::resolve(None, None, allow, default);
        assert_eq!(spec, default);

        // Case-insensitive direction
        let spec = SortSpec::resolve(None, Some("DESC"), allow, default);
        assert_eq!(spec.direction, SortDirection::Desc);
    }
}
