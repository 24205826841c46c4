use serde::Serialize;

/// Trait for types that can be exported to CSV
pub trait CsvRecord: Serialize {
    /// Get CSV headers for this type
    fn headers() -> Vec<&'static str>;

    /// Convert to CSV row, one value per header
    fn to_csv(&self) -> Vec<String>;
}

// Helper for optional values
pub fn csv_optional_to_string<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_values() {
        assert_eq!(csv_optional_to_string(&Some("Amsterdam")), "Amsterdam");
        assert_eq!(csv_optional_to_string::<String>(&None), "");
        assert_eq!(csv_optional_to_string(&Some(42)), "42");
    }
}
