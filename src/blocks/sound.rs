use super::{command, reporter, Env, HandlerResult, HandlerSpec};
use crate::{error::RuntimeError, value::Value};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  command("sound_setvolumeto", &["VOLUME"], set_volume_to),
  command("sound_changevolumeby", &["VOLUME"], change_volume_by),
  reporter("sound_volume", &[], volume),
  command("music_setTempo", &["TEMPO"], set_tempo),
  command("music_changeTempo", &["TEMPO"], change_tempo),
  reporter("music_getTempo", &[], tempo),
];

pub(crate) fn clamp_volume(volume: f64) -> f64 {
  volume.clamp(0., 100.)
}

pub(crate) fn clamp_tempo(tempo: f64) -> f64 {
  tempo.clamp(20., 500.)
}

fn set_volume_to(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  env.sprite_mut().state.volume = clamp_volume(args[0].as_number());
  Ok(env.advance())
}

fn change_volume_by(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let state = &mut env.sprite_mut().state;
  state.volume = clamp_volume(state.volume + args[0].as_number());
  Ok(env.advance())
}

fn volume(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.sprite().state.volume.into()))
}

// tempo belongs to the stage
fn set_tempo(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let stage = env.registry.stage_id();
  env.registry.sprite_mut(stage).state.tempo = clamp_tempo(args[0].as_number());
  Ok(env.advance())
}

fn change_tempo(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let stage = env.registry.stage_id();
  let state = &mut env.registry.sprite_mut(stage).state;
  state.tempo = clamp_tempo(state.tempo + args[0].as_number());
  Ok(env.advance())
}

fn tempo(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.registry.stage().state.tempo.into()))
}
