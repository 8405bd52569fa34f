use serde_json::Value;
use thiserror::Error;

/// Distance reading extracted from a raw transport payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReport {
    /// `None` when the anchor reports it lost the signal (`"distance": null`)
    pub distance: Option<f64>,
}

/// Errors that can occur while parsing a payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid JSON: {details}")]
    InvalidJson { details: String },
    #[error("payload is not an object")]
    NotAnObject,
    #[error("payload has no distance field")]
    MissingDistance,
    #[error("distance is not a number: {found}")]
    NonNumericDistance { found: String },
    #[error("distance out of range: {value}")]
    InvalidDistance { value: f64 },
}

/// Parser for anchor distance payloads.
///
/// Payloads are JSON objects with a numeric `distance` field in the same unit as
/// the anchor coordinates. Any other fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct PayloadParser {
    /// Accept numeric strings such as `"2.5"` in addition to JSON numbers
    lenient_numbers: bool,
}

impl PayloadParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self {
            lenient_numbers: true,
        }
    }

    pub fn parse_str(&self, raw: &str) -> Result<DistanceReport, ParseError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| ParseError::InvalidJson {
            details: e.to_string(),
        })?;
        self.parse(&value)
    }

    pub fn parse(&self, payload: &Value) -> Result<DistanceReport, ParseError> {
        let object = payload.as_object().ok_or(ParseError::NotAnObject)?;
        let field = object.get("distance").ok_or(ParseError::MissingDistance)?;

        let distance = match field {
            Value::Null => return Ok(DistanceReport { distance: None }),
            Value::Number(number) => number.as_f64(),
            Value::String(text) if self.lenient_numbers => text.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| ParseError::NonNumericDistance {
            found: field.to_string(),
        })?;

        if !distance.is_finite() || distance < 0.0 {
            return Err(ParseError::InvalidDistance { value: distance });
        }

        Ok(DistanceReport {
            distance: Some(distance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_numeric_distance() {
        let parser = PayloadParser::new();
        let report = parser.parse(&json!({"distance": 2.75, "rssi": -70})).unwrap();
        assert_eq!(report.distance, Some(2.75));

        let report = parser.parse(&json!({"distance": 3})).unwrap();
        assert_eq!(report.distance, Some(3.0));
    }

    #[test]
    fn test_null_distance_is_lost_signal() {
        let report = PayloadParser::new().parse(&json!({"distance": null})).unwrap();
        assert_eq!(report.distance, None);
    }

    #[test]
    fn test_malformed_payloads() {
        let parser = PayloadParser::new();
        assert_eq!(parser.parse(&json!([1, 2])), Err(ParseError::NotAnObject));
        assert_eq!(parser.parse(&json!({"rssi": -70})), Err(ParseError::MissingDistance));
        assert!(matches!(
            parser.parse(&json!({"distance": "near"})),
            Err(ParseError::NonNumericDistance { .. })
        ));
        assert!(matches!(
            parser.parse(&json!({"distance": "2.5"})),
            Err(ParseError::NonNumericDistance { .. })
        ));
        assert_eq!(
            parser.parse(&json!({"distance": -1.0})),
            Err(ParseError::InvalidDistance { value: -1.0 })
        );
        assert!(matches!(
            parser.parse_str("{distance: 1"),
            Err(ParseError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_lenient_parser_accepts_numeric_strings() {
        let parser = PayloadParser::lenient();
        assert_eq!(
            parser.parse(&json!({"distance": " 2.5 "})).unwrap().distance,
            Some(2.5)
        );
        assert!(parser.parse(&json!({"distance": "near"})).is_err());
    }

    #[test]
    fn test_parse_str() {
        let report = PayloadParser::new().parse_str(r#"{"distance": 1.5}"#).unwrap();
        assert_eq!(report.distance, Some(1.5));
    }
}
