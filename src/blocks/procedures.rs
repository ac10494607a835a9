use super::{reporter, Env, HandlerResult, HandlerSpec, Shape};
use crate::{error::RuntimeError, thread::FrameKind, value::Value};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  HandlerSpec {
    opcode: "procedures_call",
    shape: Shape::Command,
    inputs: &["PROCCODE"],
    variadic: true,
    run: call,
  },
  reporter("argument_reporter_string_number", &["VALUE"], argument),
  reporter("argument_reporter_boolean", &["VALUE"], boolean_argument),
];

/// Binds the arguments after the proccode as a new parameter window and
/// enters the body, returning to the block after the call.
fn call(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let name = args[0].as_text();
  let procedure = env
    .sprite()
    .procedure(&name)
    .cloned()
    .ok_or(RuntimeError::UnknownProcedure { name })?;
  let limit = env.config.max_call_depth;
  if env.thread.call_depth() >= limit {
    return Err(RuntimeError::CallDepthExceeded { limit });
  }
  let mut params = args[1..].to_vec();
  params.resize(procedure.params, Value::Text(String::new()));
  let return_to = env.next();
  env.thread.push_frame(return_to, FrameKind::Procedure);
  env.thread.push_parameters(params);
  Ok(HandlerResult::Advance(procedure.body))
}

fn parameter(env: &Env, index: &Value) -> Option<Value> {
  let index = index.as_number();
  if index < 0. {
    return None;
  }
  env.thread.parameter(index as usize).cloned()
}

fn argument(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let value = parameter(env, &args[0]).unwrap_or_default();
  Ok(HandlerResult::Report(value))
}

fn boolean_argument(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let value = parameter(env, &args[0]).unwrap_or(Value::Bool(false));
  Ok(HandlerResult::Report(value))
}
