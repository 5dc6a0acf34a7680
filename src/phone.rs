/// Brazilian country calling code. The gateway serves a single market;
/// numbers without it are assumed local.
pub const COUNTRY_CODE: &str = "55";

/// Normalize a user-entered phone string into the digits-only form the
/// chat network addresses: strip everything that is not a digit, then
/// prepend the country code unless it is already there.
///
/// Returns `None` when nothing is left after stripping (caller treats
/// that as invalid input).
pub fn normalize(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.starts_with(COUNTRY_CODE) {
        Some(digits)
    } else {
        Some(format!("{COUNTRY_CODE}{digits}"))
    }
}

/// Canonical WhatsApp address for a normalized number.
pub fn to_jid(normalized: &str) -> String {
    format!("{normalized}@s.whatsapp.net")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting_and_prefixes_country_code() {
        assert_eq!(normalize("(11) 99988-7766"), Some("5511999887766".into()));
        assert_eq!(normalize("11 3322-1100"), Some("551133221100".into()));
    }

    #[test]
    fn already_prefixed_is_untouched() {
        assert_eq!(normalize("5511999887766"), Some("5511999887766".into()));
        assert_eq!(normalize("+55 11 99988-7766"), Some("5511999887766".into()));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize("(11) 99988-7766").unwrap();
        assert_eq!(normalize(&once), Some(once.clone()));
    }

    #[test]
    fn empty_after_stripping_is_invalid() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("  ()-+ "), None);
        assert_eq!(normalize("abc"), None);
    }

    #[test]
    fn jid_format() {
        assert_eq!(to_jid("5511999887766"), "5511999887766@s.whatsapp.net");
    }
}
