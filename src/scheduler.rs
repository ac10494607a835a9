use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::{
  blocks::HandlerTable,
  evaluator::{Evaluator, StepResult},
  peripherals::Peripherals,
  project::Config,
  registry::{SpriteId, SpriteRegistry, ThreadRef},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
  Idle,
  Stepping,
}

/// Round-robins the running threads cooperatively. A thread runs until it
/// yields, finishes or fails; whole passes over the run list repeat until
/// the frame's work time is used up or a redraw is requested.
#[derive(Debug)]
pub struct Scheduler {
  run_list: Vec<ThreadRef>,
  state: SchedulerState,
  redraw_requested: bool,
  clock: Duration,
}

impl Default for Scheduler {
  fn default() -> Self {
    Scheduler::new()
  }
}

impl Scheduler {
  pub fn new() -> Self {
    Scheduler {
      run_list: Vec::new(),
      state: SchedulerState::Idle,
      redraw_requested: false,
      clock: Duration::ZERO,
    }
  }

  pub fn state(&self) -> SchedulerState {
    self.state
  }

  /// Total time reported by the peripherals since the runtime started.
  pub fn clock(&self) -> Duration {
    self.clock
  }

  pub fn run_list(&self) -> &[ThreadRef] {
    &self.run_list
  }

  pub fn is_running(&self, thread: ThreadRef) -> bool {
    self.run_list.contains(&thread)
  }

  pub fn is_sprite_running(&self, sprite: SpriteId) -> bool {
    self.run_list.iter().any(|thread| thread.sprite == sprite)
  }

  pub fn request_redraw(&mut self) {
    self.redraw_requested = true;
  }

  pub fn redraw_requested(&self) -> bool {
    self.redraw_requested
  }

  /// Rewinds `thread` to its top and links it into the run list unless it
  /// is already there.
  pub fn start(&mut self, registry: &mut SpriteRegistry, thread: ThreadRef) {
    let Some(context) = registry.thread_mut(thread) else {
      return;
    };
    context.reset();
    context.set_last_tick_time(self.clock);
    if self.is_running(thread) {
      debug!("restarted {thread:?}");
    } else {
      debug!("started {thread:?}");
      self.run_list.push(thread);
    }
  }

  pub fn stop(&mut self, thread: ThreadRef) {
    self.run_list.retain(|other| *other != thread);
  }

  /// Unlinks every thread except `keep`.
  pub fn stop_all(&mut self, keep: Option<ThreadRef>) {
    self.run_list.retain(|thread| Some(*thread) == keep);
  }

  pub fn stop_others_in_sprite(&mut self, sprite: SpriteId, keep: Option<ThreadRef>) {
    self
      .run_list
      .retain(|thread| thread.sprite != sprite || Some(*thread) == keep);
  }

  /// Runs one frame's worth of work. Returns whether any thread is still
  /// running afterwards.
  pub fn run_tick(
    &mut self,
    registry: &mut SpriteRegistry,
    handlers: &HandlerTable,
    peripherals: &mut dyn Peripherals,
    config: &Config,
  ) -> bool {
    let deadline = Instant::now() + config.work_time();
    self.redraw_requested = false;
    self.state = SchedulerState::Stepping;
    while !self.run_list.is_empty() {
      self.clock += peripherals.elapsed_time();
      // threads started during this pass wait for the next one
      let pass = self.run_list.clone();
      for thread in pass {
        if self.is_running(thread) {
          self.step_thread(thread, registry, handlers, peripherals, config, deadline);
        }
      }
      if self.redraw_requested || Instant::now() >= deadline {
        break;
      }
    }
    self.state = SchedulerState::Idle;
    !self.run_list.is_empty()
  }

  fn step_thread(
    &mut self,
    thread: ThreadRef,
    registry: &mut SpriteRegistry,
    handlers: &HandlerTable,
    peripherals: &mut dyn Peripherals,
    config: &Config,
    deadline: Instant,
  ) {
    let Some(mut context) = registry.take_thread(thread) else {
      self.stop(thread);
      return;
    };
    context.begin_tick(self.clock);
    let outcome = loop {
      let mut evaluator = Evaluator {
        handlers,
        registry: &mut *registry,
        scheduler: &mut *self,
        peripherals: &mut *peripherals,
        config,
      };
      match evaluator.step(&mut context, thread) {
        StepResult::Continuing if Instant::now() < deadline => continue,
        outcome => break outcome,
      }
    };
    registry.restore_thread(thread, context);
    match outcome {
      StepResult::Finished => {
        debug!("{thread:?} finished");
        self.stop(thread);
      }
      StepResult::Error(error) => {
        warn!("{thread:?} stopped: {error}");
        self.stop(thread);
      }
      StepResult::Yielded | StepResult::Continuing => {}
    }
    registry.reap(|sprite| self.is_sprite_running(sprite));
  }
}
