use super::model::GeoPoint;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const MESSAGE_MAX_CHARS: usize = 1000;
pub const ADDRESS_MIN_CHARS: usize = 5;
/// Reasons must be strictly longer than this.
pub const REASON_MIN_EXCLUSIVE_CHARS: usize = 5;

/// Normalizes a Russian mobile number to `+7XXXXXXXXXX`.
pub fn normalize_phone(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let allowed_noise = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if !allowed_noise {
        return Err("phone may contain only digits, spaces, '+', '-' and brackets".to_string());
    }

    let national = match (has_plus, digits.len()) {
        (true, 11) if digits.starts_with('7') => &digits[1..],
        (false, 11) if digits.starts_with('7') || digits.starts_with('8') => &digits[1..],
        (false, 10) => digits.as_str(),
        _ => {
            return Err(
                "phone must look like +7XXXXXXXXXX, 8XXXXXXXXXX or XXXXXXXXXX".to_string(),
            )
        }
    };
    Ok(format!("+7{national}"))
}

pub fn validate_name(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
        return Err(format!(
            "name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("description must not be empty; use skip instead".to_string());
    }
    if trimmed.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(format!(
            "description must be at most {DESCRIPTION_MAX_CHARS} characters"
        ));
    }
    Ok(trimmed.to_string())
}

/// Free text a customer relays to the operators.
pub fn validate_message(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("message must not be empty".to_string());
    }
    if trimmed.chars().count() > MESSAGE_MAX_CHARS {
        return Err(format!("message must be at most {MESSAGE_MAX_CHARS} characters"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_address(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < ADDRESS_MIN_CHARS {
        return Err(format!(
            "address must be at least {ADDRESS_MIN_CHARS} characters"
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<GeoPoint, String> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude {latitude} is outside [-90, 90]"));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude {longitude} is outside [-180, 180]"));
    }
    Ok(GeoPoint {
        latitude,
        longitude,
    })
}

/// Parses an amount typed by staff; a decimal comma is accepted.
pub fn parse_cost(raw: &str) -> Result<f64, String> {
    let normalized = raw.trim().replace(',', ".").replace(' ', "");
    let value = normalized
        .parse::<f64>()
        .map_err(|_| format!("`{}` is not a number", raw.trim()))?;
    validate_cost(value)
}

pub fn validate_cost(value: f64) -> Result<f64, String> {
    if !value.is_finite() || value <= 0.0 {
        return Err("cost must be a positive number".to_string());
    }
    Ok(value)
}

pub fn validate_reason(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= REASON_MIN_EXCLUSIVE_CHARS {
        return Err(format!(
            "reason must be longer than {REASON_MIN_EXCLUSIVE_CHARS} characters"
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_variants_normalize_to_plus_seven() {
        assert_eq!(normalize_phone("+79991234567"), Ok("+79991234567".to_string()));
        assert_eq!(normalize_phone("89991234567"), Ok("+79991234567".to_string()));
        assert_eq!(normalize_phone("79991234567"), Ok("+79991234567".to_string()));
        assert_eq!(normalize_phone("9991234567"), Ok("+79991234567".to_string()));
        assert_eq!(
            normalize_phone("+7 (999) 123-45-67"),
            Ok("+79991234567".to_string())
        );
    }

    #[test]
    fn phone_rejects_foreign_and_garbage_input() {
        assert!(normalize_phone("+19991234567").is_err());
        assert!(normalize_phone("+89991234567").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("call me").is_err());
    }

    #[test]
    fn name_bounds_count_characters_not_bytes() {
        assert!(validate_name("Я").is_err());
        assert_eq!(validate_name("  Иван  "), Ok("Иван".to_string()));
        assert!(validate_name(&"a".repeat(50)).is_ok());
        assert!(validate_name(&"a".repeat(51)).is_err());
    }

    #[test]
    fn description_and_address_limits() {
        assert!(validate_description(&"x".repeat(1000)).is_ok());
        assert!(validate_description(&"x".repeat(1001)).is_err());
        assert!(validate_description("   ").is_err());
        assert!(validate_address("Ul.1").is_err());
        assert_eq!(validate_address(" Lenina 1 "), Ok("Lenina 1".to_string()));
    }

    #[test]
    fn relayed_messages_are_trimmed_and_bounded() {
        assert_eq!(
            validate_message("  where is my driver? "),
            Ok("where is my driver?".to_string())
        );
        assert!(validate_message("\n ").is_err());
        assert!(validate_message(&"я".repeat(1001)).is_err());
    }

    #[test]
    fn coordinates_are_bounded() {
        assert!(validate_coordinates(55.75, 37.61).is_ok());
        assert!(validate_coordinates(90.5, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn cost_accepts_decimal_comma_and_rejects_non_positive() {
        assert_eq!(parse_cost("1500"), Ok(1500.0));
        assert_eq!(parse_cost("1 500,50"), Ok(1500.5));
        assert!(parse_cost("0").is_err());
        assert!(parse_cost("-10").is_err());
        assert!(parse_cost("cheap").is_err());
    }

    #[test]
    fn reason_must_be_longer_than_five_characters() {
        assert!(validate_reason("short").is_err());
        assert!(validate_reason("   12345   ").is_err());
        assert_eq!(validate_reason("too late"), Ok("too late".to_string()));
    }
}
