use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Decimal value exactly as the backend reported it.
///
/// The backend serializes decimal fields (balances, prices, payments) as
/// strings such as `"120.00"`, but older endpoints send bare numbers. The
/// dashboard never does arithmetic on these, it only displays them, so the
/// textual form is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match JsonValue::deserialize(deserializer)? {
            JsonValue::String(s) => Ok(Amount(s)),
            JsonValue::Number(n) => Ok(Amount(n.to_string())),
            JsonValue::Null => Ok(Amount::default()),
            other => Err(serde::de::Error::custom(format!(
                "expected a decimal string or number, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_string_and_number() {
        let a: Amount = serde_json::from_str("\"120.50\"").unwrap();
        let b: Amount = serde_json::from_str("42").unwrap();
        let c: Amount = serde_json::from_str("null").unwrap();

        assert_eq!(a.as_str(), "120.50");
        assert_eq!(b.to_string(), "42");
        assert!(c.is_empty());
    }

    #[test]
    fn test_rejects_objects() {
        let result: Result<Amount, _> = serde_json::from_str("{\"value\": 1}");
        assert!(result.is_err());
    }
}
