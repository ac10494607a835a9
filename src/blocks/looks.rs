use super::{command, reporter, Env, HandlerResult, HandlerSpec};
use crate::{
  error::RuntimeError,
  sprite::{Speech, SpeechStyle},
  thread::TempData,
  value::Value,
};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  command("looks_say", &["MESSAGE"], say),
  command("looks_think", &["MESSAGE"], think),
  command("looks_sayforsecs", &["MESSAGE", "SECS"], say_for_secs),
  command("looks_thinkforsecs", &["MESSAGE", "SECS"], think_for_secs),
  command("looks_show", &[], show),
  command("looks_hide", &[], hide),
  command("looks_setsizeto", &["SIZE"], set_size_to),
  command("looks_changesizeby", &["CHANGE"], change_size_by),
  reporter("looks_size", &[], size),
];

fn speak(env: &mut Env, style: SpeechStyle, text: String) {
  let speech = (!text.is_empty()).then_some(Speech { style, text });
  let name = env.sprite().name.clone();
  env.peripherals.say(&name, speech.as_ref());
  env.sprite_mut().state.speech = speech;
  env.request_redraw();
}

fn say(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  speak(env, SpeechStyle::Say, args[0].as_text());
  Ok(env.advance())
}

fn think(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  speak(env, SpeechStyle::Think, args[0].as_text());
  Ok(env.advance())
}

/// Shows speech, waits, then clears it again.
fn speak_for(env: &mut Env, args: &[Value], style: SpeechStyle) -> Result<HandlerResult, RuntimeError> {
  let remaining = match env.thread.temp(env.block) {
    Some(TempData::Timer(remaining)) => remaining - env.thread.elapsed().as_secs_f64(),
    _ => {
      speak(env, style, args[0].as_text());
      env
        .thread
        .set_temp(env.block, TempData::Timer(args[1].as_number()));
      return Ok(HandlerResult::Repeat);
    }
  };
  if remaining > 0. {
    env.thread.set_temp(env.block, TempData::Timer(remaining));
    return Ok(HandlerResult::Repeat);
  }
  env.thread.clear_temp(env.block);
  speak(env, style, String::new());
  Ok(env.advance())
}

fn say_for_secs(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  speak_for(env, args, SpeechStyle::Say)
}

fn think_for_secs(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  speak_for(env, args, SpeechStyle::Think)
}

fn set_visible(env: &mut Env, visible: bool) -> Result<HandlerResult, RuntimeError> {
  env.sprite_mut().state.visible = visible;
  env.request_redraw();
  Ok(env.advance())
}

fn show(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  set_visible(env, true)
}

fn hide(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  set_visible(env, false)
}

fn set_size(env: &mut Env, size: f64) -> Result<HandlerResult, RuntimeError> {
  env.sprite_mut().state.size = size.max(0.);
  env.request_redraw();
  Ok(env.advance())
}

fn set_size_to(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  set_size(env, args[0].as_number())
}

fn change_size_by(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let size = env.sprite().state.size + args[0].as_number();
  set_size(env, size)
}

fn size(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.sprite().state.size.round().into()))
}
