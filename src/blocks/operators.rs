use std::cmp::Ordering;

use rand::Rng;

use super::{reporter, Env, HandlerResult, HandlerSpec};
use crate::{error::RuntimeError, value::Value};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  reporter("operator_add", &["NUM1", "NUM2"], add),
  reporter("operator_subtract", &["NUM1", "NUM2"], subtract),
  reporter("operator_multiply", &["NUM1", "NUM2"], multiply),
  reporter("operator_divide", &["NUM1", "NUM2"], divide),
  reporter("operator_mod", &["NUM1", "NUM2"], modulo),
  reporter("operator_round", &["NUM"], round),
  reporter("operator_mathop", &["OPERATOR", "NUM"], mathop),
  reporter("operator_random", &["FROM", "TO"], random),
  reporter("operator_lt", &["OPERAND1", "OPERAND2"], lt),
  reporter("operator_gt", &["OPERAND1", "OPERAND2"], gt),
  reporter("operator_equals", &["OPERAND1", "OPERAND2"], equals),
  reporter("operator_and", &["OPERAND1", "OPERAND2"], and),
  reporter("operator_or", &["OPERAND1", "OPERAND2"], or),
  reporter("operator_not", &["OPERAND"], not),
  reporter("operator_join", &["STRING1", "STRING2"], join),
  reporter("operator_letter_of", &["LETTER", "STRING"], letter_of),
  reporter("operator_length", &["STRING"], length),
  reporter("operator_contains", &["STRING1", "STRING2"], contains),
];

fn report(value: impl Into<Value>) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(value.into()))
}

fn add(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_number() + args[1].as_number())
}

fn subtract(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_number() - args[1].as_number())
}

fn multiply(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_number() * args[1].as_number())
}

fn divide(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_number() / args[1].as_number())
}

fn modulo(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(floored_mod(args[0].as_number(), args[1].as_number()))
}

/// Remainder with the sign of the divisor.
pub(crate) fn floored_mod(n: f64, modulus: f64) -> f64 {
  let mut result = n % modulus;
  if result / modulus < 0. {
    result += modulus;
  }
  result
}

fn round(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_number().round())
}

fn mathop(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(apply_mathop(&args[0].as_text(), args[1].as_number()))
}

pub(crate) fn apply_mathop(operator: &str, value: f64) -> f64 {
  match operator {
    "abs" => value.abs(),
    "floor" => value.floor(),
    "ceiling" => value.ceil(),
    "sqrt" => value.sqrt(),
    "sin" => truncate_float(value.to_radians().sin()),
    "cos" => truncate_float(value.to_radians().cos()),
    "tan" => {
      let angle = value % 360.;
      if angle == -270. || angle == 90. {
        f64::INFINITY
      } else if angle == -90. || angle == 270. {
        f64::NEG_INFINITY
      } else {
        truncate_float(angle.to_radians().tan())
      }
    }
    "asin" => value.asin().to_degrees(),
    "acos" => value.acos().to_degrees(),
    "atan" => value.atan().to_degrees(),
    "ln" => value.ln(),
    "log" => value.log10(),
    "e ^" => value.exp(),
    "10 ^" => 10f64.powf(value),
    _ => 0.,
  }
}

/// Rounds to 10 decimal places so that e.g. `cos 90` reports exactly 0.
fn truncate_float(value: f64) -> f64 {
  (value * 1e10).round() / 1e10
}

fn random(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let (from, to) = (args[0].as_number(), args[1].as_number());
  let (low, high) = if from <= to { (from, to) } else { (to, from) };
  let number = if low == high {
    low
  } else if args[0].is_whole() && args[1].is_whole() {
    env.rng().gen_range(low as i64..=high as i64) as f64
  } else {
    low + env.rng().gen::<f64>() * (high - low)
  };
  report(number)
}

fn lt(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].compare(&args[1]) == Ordering::Less)
}

fn gt(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].compare(&args[1]) == Ordering::Greater)
}

fn equals(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].equals(&args[1]))
}

fn and(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_bool() && args[1].as_bool())
}

fn or(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_bool() || args[1].as_bool())
}

fn not(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(!args[0].as_bool())
}

fn join(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(format!("{}{}", args[0], args[1]))
}

fn letter_of(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let index = args[0].as_number().floor();
  let letter = if index < 1. {
    String::new()
  } else {
    args[1]
      .as_text()
      .chars()
      .nth(index as usize - 1)
      .map(String::from)
      .unwrap_or_default()
  };
  report(letter)
}

fn length(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  report(args[0].as_text().chars().count())
}

fn contains(_: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let haystack = args[0].as_text().to_lowercase();
  report(haystack.contains(&args[1].as_text().to_lowercase()))
}
