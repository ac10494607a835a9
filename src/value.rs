use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// A scalar as seen by scripts. Every conversion is total: text that does
/// not look like a number reads as `0`, and numbers always render as text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Value {
  Bool(bool),
  Number(f64),
  Text(String),
}

impl Default for Value {
  fn default() -> Self {
    Value::Number(0.)
  }
}

impl Value {
  /// Numeric form of the value. Text parses as a number, `"true"` and
  /// `"false"` read as `1` and `0`, anything else (and `NaN`) reads as `0`.
  pub fn as_number(&self) -> f64 {
    match self {
      Value::Number(number) if number.is_nan() => 0.,
      Value::Number(number) => *number,
      Value::Bool(bool) => *bool as u8 as f64,
      Value::Text(text) => match text.as_str() {
        "true" => 1.,
        "false" => 0.,
        text => parse_number(text).unwrap_or(0.),
      },
    }
  }

  /// The numeric form if the value is numeric-like, used by comparisons to
  /// decide between numeric and textual ordering.
  pub fn try_number(&self) -> Option<f64> {
    match self {
      Value::Number(number) if number.is_nan() => None,
      Value::Number(number) => Some(*number),
      Value::Bool(bool) => Some(*bool as u8 as f64),
      Value::Text(text) => parse_number(text),
    }
  }

  pub fn as_bool(&self) -> bool {
    match self {
      Value::Bool(bool) => *bool,
      Value::Number(number) => *number == 1.,
      Value::Text(text) => match text.as_str() {
        "true" => true,
        "false" => false,
        _ => self.as_number() == 1.,
      },
    }
  }

  pub fn as_text(&self) -> String {
    match self {
      Value::Bool(bool) => bool.to_string(),
      Value::Number(number) => format_number(*number),
      Value::Text(text) => text.clone(),
    }
  }

  /// `true` when the value would be treated as an integer by `pick random`.
  pub fn is_whole(&self) -> bool {
    match self {
      Value::Bool(_) => true,
      Value::Number(number) => number.fract() == 0.,
      Value::Text(text) => !text.contains('.'),
    }
  }

  /// Equality as the `=` block sees it: numeric when both sides are
  /// numeric-like, otherwise case-sensitive text comparison.
  pub fn equals(&self, other: &Value) -> bool {
    match (self.try_number(), other.try_number()) {
      (Some(left), Some(right)) => left == right,
      _ => self.as_text() == other.as_text(),
    }
  }

  /// Ordering as `<` and `>` see it: numeric when both sides are
  /// numeric-like, otherwise case-insensitive text comparison.
  pub fn compare(&self, other: &Value) -> Ordering {
    match (self.try_number(), other.try_number()) {
      (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
      _ => self
        .as_text()
        .to_lowercase()
        .cmp(&other.as_text().to_lowercase()),
    }
  }
}

fn parse_number(text: &str) -> Option<f64> {
  let text = text.trim();
  match text {
    "" => return None,
    "Infinity" | "+Infinity" => return Some(f64::INFINITY),
    "-Infinity" => return Some(f64::NEG_INFINITY),
    _ => {}
  }
  let with_radix = |prefix: &str, radix: u32| {
    text
      .strip_prefix(prefix)
      .and_then(|digits| i64::from_str_radix(digits, radix).ok())
      .map(|number| number as f64)
  };
  if let Some(number) = with_radix("0x", 16)
    .or_else(|| with_radix("0o", 8))
    .or_else(|| with_radix("0b", 2))
  {
    return Some(number);
  }
  // f64::from_str would also accept "inf" and "nan"
  if text
    .chars()
    .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
  {
    return None;
  }
  text.parse::<f64>().ok().filter(|number| !number.is_nan())
}

fn format_number(number: f64) -> String {
  if number == 0. {
    "0".to_string()
  } else if number.is_nan() {
    "NaN".to_string()
  } else if number.is_infinite() {
    if number > 0. { "Infinity" } else { "-Infinity" }.to_string()
  } else {
    number.to_string()
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.as_text())
  }
}

impl From<f64> for Value {
  fn from(number: f64) -> Self {
    Value::Number(number)
  }
}

impl From<i32> for Value {
  fn from(number: i32) -> Self {
    Value::Number(number as f64)
  }
}

impl From<usize> for Value {
  fn from(number: usize) -> Self {
    Value::Number(number as f64)
  }
}

impl From<bool> for Value {
  fn from(bool: bool) -> Self {
    Value::Bool(bool)
  }
}

impl From<&str> for Value {
  fn from(text: &str) -> Self {
    Value::Text(text.to_string())
  }
}

impl From<String> for Value {
  fn from(text: String) -> Self {
    Value::Text(text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use proptest::prelude::*;

  #[test]
  fn test_as_number() {
    assert_eq!(Value::from("42").as_number(), 42.);
    assert_eq!(Value::from(" -3.5 ").as_number(), -3.5);
    assert_eq!(Value::from("1e3").as_number(), 1000.);
    assert_eq!(Value::from("0x1A").as_number(), 26.);
    assert_eq!(Value::from("true").as_number(), 1.);
    assert_eq!(Value::from("false").as_number(), 0.);
    assert_eq!(Value::from("banana").as_number(), 0.);
    assert_eq!(Value::from("inf").as_number(), 0.);
    assert_eq!(Value::from("").as_number(), 0.);
    assert_eq!(Value::Number(f64::NAN).as_number(), 0.);
    assert_eq!(Value::from("Infinity").as_number(), f64::INFINITY);
    assert_eq!(Value::from(true).as_number(), 1.);
  }

  #[test]
  fn test_as_bool() {
    assert!(Value::from("true").as_bool());
    assert!(!Value::from("false").as_bool());
    assert!(Value::from(1.).as_bool());
    assert!(Value::from("1").as_bool());
    assert!(!Value::from(2.).as_bool());
    assert!(!Value::from("hello").as_bool());
    assert!(!Value::from(0.).as_bool());
  }

  #[test]
  fn test_as_text() {
    assert_eq!(Value::from(3.).as_text(), "3");
    assert_eq!(Value::from(-0.).as_text(), "0");
    assert_eq!(Value::from(0.1 + 0.2).as_text(), "0.30000000000000004");
    assert_eq!(Value::from(f64::INFINITY).as_text(), "Infinity");
    assert_eq!(Value::from(f64::NEG_INFINITY).as_text(), "-Infinity");
    assert_eq!(Value::from(f64::NAN).as_text(), "NaN");
    assert_eq!(Value::from(false).as_text(), "false");
  }

  #[test]
  fn test_equals() {
    assert!(Value::from("10").equals(&Value::from(10.)));
    assert!(Value::from("1.0").equals(&Value::from("1")));
    assert!(Value::from(true).equals(&Value::from(1.)));
    assert!(!Value::from("Apple").equals(&Value::from("apple")));
    assert!(Value::from("apple").equals(&Value::from("apple")));
    assert!(!Value::from("").equals(&Value::from(0.)));
  }

  #[test]
  fn test_compare() {
    assert_eq!(Value::from("9").compare(&Value::from("10")), Ordering::Less);
    assert_eq!(Value::from("b").compare(&Value::from("A")), Ordering::Greater);
    assert_eq!(Value::from("abc").compare(&Value::from("ABC")), Ordering::Equal);
  }

  #[test]
  fn test_deserialize() {
    let values: Vec<Value> = serde_json::from_str(r#"[1.5, "x", true]"#).unwrap();
    assert_eq!(
      values,
      vec![Value::from(1.5), Value::from("x"), Value::from(true)]
    );
  }

  proptest! {
    #[test]
    fn number_survives_text(number in prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO) {
      let text = Value::from(number).as_text();
      prop_assert_eq!(Value::from(text).as_number(), number);
    }
  }
}
