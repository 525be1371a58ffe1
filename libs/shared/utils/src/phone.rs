use regex::Regex;

/// Result of normalizing a caller-supplied phone number.
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneValidation {
    pub is_valid: bool,
    pub formatted: String,
    pub error: Option<String>,
}

impl PhoneValidation {
    fn invalid(error: &str) -> Self {
        Self {
            is_valid: false,
            formatted: String::new(),
            error: Some(error.to_string()),
        }
    }

    fn valid(formatted: String) -> Self {
        Self {
            is_valid: true,
            formatted,
            error: None,
        }
    }
}

// Default country calling codes for numbers supplied without a prefix.
fn country_calling_code(country: &str) -> Option<&'static str> {
    match country {
        "CD" => Some("243"),
        "CG" => Some("242"),
        "FR" => Some("33"),
        "BE" => Some("32"),
        "US" | "CA" => Some("1"),
        _ => None,
    }
}

/// Normalize a phone number to E.164. Accepts an international form
/// (`+243810000001`) or a national form, resolved against `country`.
pub fn format_phone_number(phone: &str, country: &str) -> PhoneValidation {
    let cleaned: String = phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if cleaned.is_empty() {
        return PhoneValidation::invalid("Phone number is required");
    }

    let e164 = Regex::new(r"^\+[1-9]\d{7,14}$").expect("static regex");

    if cleaned.starts_with('+') {
        return if e164.is_match(&cleaned) {
            PhoneValidation::valid(cleaned)
        } else {
            PhoneValidation::invalid("Invalid phone number. Expected format: +XXX XXXXXXXXX")
        };
    }

    let Some(code) = country_calling_code(country) else {
        return PhoneValidation::invalid("Unsupported country code");
    };

    // National forms commonly carry a leading trunk zero.
    let national = cleaned.trim_start_matches('0');
    let candidate = format!("+{}{}", code, national);

    if e164.is_match(&candidate) {
        PhoneValidation::valid(candidate)
    } else {
        PhoneValidation::invalid("Invalid phone number. Expected format: +XXX XXXXXXXXX")
    }
}
