//! Helpers for using the figment config parsing library

use figment::providers::Format;
use json5 as json;

/// A figment provider that can parse JSON5.
///
/// Config files are written by hand, so we accept comments, trailing commas and unquoted keys.
pub struct JsonProvider;

impl Format for JsonProvider {
    type Error = json::Error;

    const NAME: &'static str = "JSON5";

    fn from_str<'de, T: serde::de::DeserializeOwned>(string: &'de str) -> Result<T, Self::Error> {
        json::from_str(string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        width: usize,
    }

    #[test]
    fn test_parses_json5() {
        let sample: Sample = Figment::from(JsonProvider::string(
            "{\n  // comment\n  name: 'romdiff',\n  width: 16,\n}",
        ))
        .extract()
        .unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "romdiff".into(),
                width: 16,
            }
        );
    }

    #[test]
    fn test_reports_syntax_errors() {
        let result = Figment::from(JsonProvider::string("{ name: ")).extract::<Sample>();
        assert!(result.is_err());
    }
}
