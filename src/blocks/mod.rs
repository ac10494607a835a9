//! The block handler library: one function per opcode, looked up once at
//! load time and dispatched by id.

use std::{collections::HashMap, time::Duration};

use rand::rngs::StdRng;

use crate::{
  block::{BlockHandlerId, BlockRef},
  error::RuntimeError,
  peripherals::Peripherals,
  project::Config,
  registry::{SpriteId, SpriteRegistry, ThreadRef},
  scheduler::Scheduler,
  sprite::SpriteContext,
  thread::{FrameKind, ThreadContext},
  value::Value,
};

mod control;
mod data;
mod events;
mod looks;
mod motion;
mod operators;
mod procedures;
mod sensing;
mod sound;

pub(crate) use sound::{clamp_tempo, clamp_volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
  Reporter,
  Command,
  /// A C-shaped block with `inner` substacks, followed by a stack after it
  /// unless it is a cap like `forever`.
  Branch { inner: usize, after: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
  Report(Value),
  /// Continue at the given block. `None` ends the current stack, which pops
  /// a frame or finishes the script.
  Advance(Option<BlockRef>),
  /// Run this block again on the next turn.
  Repeat,
  /// End the script regardless of frames.
  Stop,
}

pub type BlockFn = fn(&mut Env, &[Value]) -> Result<HandlerResult, RuntimeError>;

#[derive(Debug, Clone, Copy)]
pub struct HandlerSpec {
  pub opcode: &'static str,
  pub shape: Shape,
  /// Input and field names in argument order.
  pub inputs: &'static [&'static str],
  /// Accepts extra arguments after `inputs`.
  pub variadic: bool,
  pub run: BlockFn,
}

const fn reporter(opcode: &'static str, inputs: &'static [&'static str], run: BlockFn) -> HandlerSpec {
  HandlerSpec {
    opcode,
    shape: Shape::Reporter,
    inputs,
    variadic: false,
    run,
  }
}

const fn command(opcode: &'static str, inputs: &'static [&'static str], run: BlockFn) -> HandlerSpec {
  HandlerSpec {
    opcode,
    shape: Shape::Command,
    inputs,
    variadic: false,
    run,
  }
}

const fn branch(
  opcode: &'static str,
  inputs: &'static [&'static str],
  inner: usize,
  after: bool,
  run: BlockFn,
) -> HandlerSpec {
  HandlerSpec {
    opcode,
    shape: Shape::Branch { inner, after },
    inputs,
    variadic: false,
    run,
  }
}

fn noop(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(env.advance())
}

const MISC: &[HandlerSpec] = &[HandlerSpec {
  opcode: "noop",
  shape: Shape::Command,
  inputs: &[],
  variadic: true,
  run: noop,
}];

/// Maps opcodes to handlers.
#[derive(Debug)]
pub struct HandlerTable {
  specs: Vec<HandlerSpec>,
  by_opcode: HashMap<&'static str, BlockHandlerId>,
}

impl HandlerTable {
  pub fn new() -> Self {
    let groups: [&[HandlerSpec]; 10] = [
      control::HANDLERS,
      data::HANDLERS,
      events::HANDLERS,
      looks::HANDLERS,
      motion::HANDLERS,
      operators::HANDLERS,
      procedures::HANDLERS,
      sensing::HANDLERS,
      sound::HANDLERS,
      MISC,
    ];
    let specs: Vec<HandlerSpec> = groups.concat();
    let by_opcode = specs
      .iter()
      .enumerate()
      .map(|(i, spec)| (spec.opcode, BlockHandlerId(i as u16)))
      .collect();
    HandlerTable { specs, by_opcode }
  }

  pub fn lookup(&self, opcode: &str) -> Option<BlockHandlerId> {
    self.by_opcode.get(opcode).copied()
  }

  pub fn get(&self, id: BlockHandlerId) -> Option<&HandlerSpec> {
    self.specs.get(id.index())
  }

  /// The handler entry for an id handed out by [`HandlerTable::lookup`].
  pub fn spec(&self, id: BlockHandlerId) -> &HandlerSpec {
    &self.specs[id.index()]
  }
}

impl Default for HandlerTable {
  fn default() -> Self {
    HandlerTable::new()
  }
}

/// What a handler can see and touch while it runs.
pub struct Env<'a> {
  pub thread: &'a mut ThreadContext,
  pub me: ThreadRef,
  /// The block being run.
  pub block: BlockRef,
  pub registry: &'a mut SpriteRegistry,
  pub scheduler: &'a mut Scheduler,
  pub peripherals: &'a mut dyn Peripherals,
  pub config: &'a Config,
  pub(crate) next: Option<BlockRef>,
  pub(crate) substacks: &'a [Option<BlockRef>],
}

impl<'a> Env<'a> {
  pub fn sprite_id(&self) -> SpriteId {
    self.me.sprite
  }

  pub fn sprite(&self) -> &SpriteContext {
    self.registry.sprite(self.me.sprite)
  }

  pub fn sprite_mut(&mut self) -> &mut SpriteContext {
    self.registry.sprite_mut(self.me.sprite)
  }

  pub fn next(&self) -> Option<BlockRef> {
    self.next
  }

  pub fn substack(&self, index: usize) -> Option<BlockRef> {
    self.substacks.get(index).copied().flatten()
  }

  /// Moves on to the block after this one.
  pub fn advance(&self) -> HandlerResult {
    HandlerResult::Advance(self.next)
  }

  /// Enters `body`, coming back to `return_to` once it runs off its end.
  pub fn enter(&mut self, body: Option<BlockRef>, return_to: Option<BlockRef>) -> HandlerResult {
    match body {
      Some(body) => {
        self.thread.push_frame(return_to, FrameKind::Block);
        HandlerResult::Advance(Some(body))
      }
      None => HandlerResult::Advance(return_to),
    }
  }

  pub fn request_yield(&mut self) {
    self.thread.request_yield();
  }

  pub fn request_redraw(&mut self) {
    self.scheduler.request_redraw();
  }

  /// Time on the scheduler's clock.
  pub fn now(&self) -> Duration {
    self.scheduler.clock()
  }

  pub fn rng(&mut self) -> &mut StdRng {
    &mut self.registry.rng
  }

  /// Starts or restarts `thread`. Returns `true` when that is the thread
  /// running this block, which then restarts once the block returns.
  pub fn start_thread(&mut self, thread: ThreadRef) -> bool {
    if thread == self.me {
      self.thread.request_restart();
      true
    } else {
      self.scheduler.start(self.registry, thread);
      false
    }
  }

  pub fn variable(&mut self, name: &str) -> Value {
    self.registry.variable_mut(self.me.sprite, name).clone()
  }

  pub fn variable_mut(&mut self, name: &str) -> &mut Value {
    self.registry.variable_mut(self.me.sprite, name)
  }

  pub fn list_mut(&mut self, name: &str) -> &mut Vec<Value> {
    self.registry.list_mut(self.me.sprite, name)
  }
}
