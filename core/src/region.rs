use serde::{Deserialize, Serialize};

/// Geographic deployment zone of a Personalize tenant. Decides which API
/// endpoint the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "APJ")]
    Apj,
}

impl Region {
    /// Map a raw region header value onto the closed region set.
    ///
    /// Total over all inputs: "EU", "US" and "AP"/"APJ" (case-insensitive,
    /// surrounding whitespace ignored) map to their zone; absent, empty or
    /// unrecognized values fall back to EU.
    pub fn from_header(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Region::Eu;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "EU" => Region::Eu,
            "US" => Region::Us,
            "AP" | "APJ" => Region::Apj,
            _ => Region::Eu,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Eu => "EU",
            Region::Us => "US",
            Region::Apj => "APJ",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Region;

    #[test]
    fn recognized_tokens_map_case_insensitively() {
        assert_eq!(Region::from_header(Some("EU")), Region::Eu);
        assert_eq!(Region::from_header(Some("us")), Region::Us);
        assert_eq!(Region::from_header(Some("Ap")), Region::Apj);
        assert_eq!(Region::from_header(Some("apj")), Region::Apj);
        assert_eq!(Region::from_header(Some("  eu  ")), Region::Eu);
    }

    #[test]
    fn absent_empty_or_unrecognized_input_defaults_to_eu() {
        assert_eq!(Region::from_header(None), Region::Eu);
        assert_eq!(Region::from_header(Some("")), Region::Eu);
        assert_eq!(Region::from_header(Some("   ")), Region::Eu);
        assert_eq!(Region::from_header(Some("mars")), Region::Eu);
        assert_eq!(Region::from_header(Some("US-EAST")), Region::Eu);
    }

    #[test]
    fn serializes_as_upper_case_token() {
        assert_eq!(serde_json::to_string(&Region::Apj).unwrap(), "\"APJ\"");
    }
}
