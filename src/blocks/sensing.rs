use super::{command, reporter, Env, HandlerResult, HandlerSpec};
use crate::{error::RuntimeError, value::Value};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  command("sensing_askandwait", &["QUESTION"], ask_and_wait),
  reporter("sensing_answer", &[], answer),
  reporter("sensing_timer", &[], timer),
  command("sensing_resettimer", &[], reset_timer),
  command("sensing_setdragmode", &["DRAG_MODE"], set_drag_mode),
];

fn ask_and_wait(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let name = env.sprite().name.clone();
  env.peripherals.ask(&name, &args[0].as_text());
  Ok(env.advance())
}

fn answer(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.peripherals.read_prompt_answer().into()))
}

fn timer(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.registry.timer(env.now()).into()))
}

fn reset_timer(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let now = env.now();
  env.registry.reset_timer(now);
  Ok(env.advance())
}

fn set_drag_mode(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  env.sprite_mut().state.draggable = args[0].as_text() == "draggable";
  Ok(env.advance())
}
