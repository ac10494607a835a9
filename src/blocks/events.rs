use log::debug;

use super::{command, Env, HandlerResult, HandlerSpec};
use crate::{error::RuntimeError, thread::TempData, value::Value};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  command("event_broadcast", &["BROADCAST_INPUT"], broadcast),
  command("event_broadcastandwait", &["BROADCAST_INPUT"], broadcast_and_wait),
];

/// Starts every listener of `message`. Returns whether the calling thread
/// was one of them, and the generation of this broadcast.
fn start_listeners(env: &mut Env, message: &str) -> (bool, u64) {
  let (threads, generation) = env.registry.broadcast(message);
  let mut restarted_self = false;
  for thread in threads {
    restarted_self |= env.start_thread(thread);
  }
  (restarted_self, generation)
}

fn broadcast(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  start_listeners(env, &args[0].as_text());
  Ok(env.advance())
}

fn broadcast_and_wait(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let (message, generation) = match env.thread.temp(env.block) {
    Some(TempData::BroadcastWait { message, generation }) => (message.clone(), *generation),
    _ => {
      let message = args[0].as_text();
      let (restarted_self, generation) = start_listeners(env, &message);
      if !restarted_self {
        env
          .thread
          .set_temp(env.block, TempData::BroadcastWait { message, generation });
      }
      return Ok(HandlerResult::Repeat);
    }
  };
  if env.registry.broadcast_generation(&message) != generation {
    debug!("{message:?} was broadcast again, no longer waiting");
    env.thread.clear_temp(env.block);
    return Ok(env.advance());
  }
  let scheduler = &*env.scheduler;
  let waiting = env
    .registry
    .listeners(&message)
    .iter()
    .any(|thread| scheduler.is_running(*thread));
  if waiting {
    Ok(HandlerResult::Repeat)
  } else {
    env.thread.clear_temp(env.block);
    Ok(env.advance())
  }
}
