use log::{debug, warn};

use super::{branch, command, Env, HandlerResult, HandlerSpec};
use crate::{error::RuntimeError, registry::ThreadRef, thread::TempData, value::Value};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  branch("control_if", &["CONDITION"], 1, true, if_then),
  branch("control_if_else", &["CONDITION"], 2, true, if_else),
  branch("control_repeat", &["TIMES"], 1, true, repeat),
  branch("control_forever", &[], 1, false, forever),
  branch("control_repeat_until", &["CONDITION"], 1, true, repeat_until),
  command("control_wait", &["DURATION"], wait),
  command("control_wait_until", &["CONDITION"], wait_until),
  command("control_stop", &["STOP_OPTION"], stop),
  command("control_create_clone_of", &["CLONE_OPTION"], create_clone_of),
  command("control_delete_this_clone", &[], delete_this_clone),
];

fn if_then(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  if args[0].as_bool() {
    Ok(env.enter(env.substack(0), env.next()))
  } else {
    Ok(env.advance())
  }
}

fn if_else(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let body = if args[0].as_bool() {
    env.substack(0)
  } else {
    env.substack(1)
  };
  Ok(env.enter(body, env.next()))
}

fn repeat(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let remaining = match env.thread.temp(env.block) {
    Some(TempData::Counter(remaining)) => *remaining,
    _ => {
      let times = args[0].as_number().round();
      if times < 1. {
        return Ok(env.advance());
      }
      times as u64
    }
  };
  if remaining == 0 {
    env.thread.clear_temp(env.block);
    return Ok(env.advance());
  }
  env.thread.set_temp(env.block, TempData::Counter(remaining - 1));
  env.request_yield();
  Ok(env.enter(env.substack(0), Some(env.block)))
}

fn forever(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  env.request_yield();
  Ok(env.enter(env.substack(0), Some(env.block)))
}

fn repeat_until(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  if args[0].as_bool() {
    return Ok(env.advance());
  }
  env.request_yield();
  Ok(env.enter(env.substack(0), Some(env.block)))
}

fn wait(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let remaining = match env.thread.temp(env.block) {
    Some(TempData::Timer(remaining)) => remaining - env.thread.elapsed().as_secs_f64(),
    _ => {
      env
        .thread
        .set_temp(env.block, TempData::Timer(args[0].as_number()));
      return Ok(HandlerResult::Repeat);
    }
  };
  if remaining <= 0. {
    env.thread.clear_temp(env.block);
    Ok(env.advance())
  } else {
    env.thread.set_temp(env.block, TempData::Timer(remaining));
    Ok(HandlerResult::Repeat)
  }
}

fn wait_until(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  if args[0].as_bool() {
    Ok(env.advance())
  } else {
    Ok(HandlerResult::Repeat)
  }
}

fn stop(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  match args[0].as_text().as_str() {
    "all" => {
      env.scheduler.stop_all(Some(env.me));
      env.registry.mark_all_clones_for_destroy();
      Ok(HandlerResult::Stop)
    }
    "this script" => Ok(HandlerResult::Stop),
    "other scripts in sprite" | "other scripts in stage" => {
      env.scheduler.stop_others_in_sprite(env.me.sprite, Some(env.me));
      Ok(env.advance())
    }
    option => {
      warn!("unknown stop option {option:?}");
      Ok(env.advance())
    }
  }
}

fn create_clone_of(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let target = args[0].as_text();
  let source = if target == "_myself_" {
    Some(env.me.sprite)
  } else {
    env.registry.find(&target)
  };
  let Some(source) = source else {
    debug!("no sprite called {target:?} to clone");
    return Ok(env.advance());
  };
  match env.registry.clone_sprite(source) {
    Ok(clone) => {
      let scripts = env.registry.sprite(clone).when_cloned.clone();
      for script in scripts {
        env
          .scheduler
          .start(env.registry, ThreadRef { sprite: clone, script });
      }
    }
    Err(error) => warn!("cannot clone {target:?}: {error}"),
  }
  Ok(env.advance())
}

fn delete_this_clone(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  if !env.sprite().is_clone() {
    return Ok(env.advance());
  }
  env.scheduler.stop_others_in_sprite(env.me.sprite, Some(env.me));
  env.registry.mark_for_destroy(env.me.sprite);
  Ok(HandlerResult::Stop)
}
