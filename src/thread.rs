use std::{mem, rc::Rc, time::Duration};

use derivative::Derivative;

use crate::{
  block::{BlockRef, BlockTree},
  value::Value,
};

/// Private state of the one block currently polling in a thread.
#[derive(Debug, Clone, PartialEq)]
pub enum TempData {
  Counter(u64),
  /// Seconds left to wait.
  Timer(f64),
  BroadcastWait { message: String, generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
  Block,
  Procedure,
}

#[derive(Debug, Clone)]
pub struct Frame {
  pub nesting_level: usize,
  pub return_block: Option<BlockRef>,
  pub kind: FrameKind,
  /// The temp slot of the block that pushed this frame, put back when the
  /// frame is popped.
  saved_temp: Option<(BlockRef, TempData)>,
}

/// Execution state of one script.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ThreadContext {
  #[derivative(Debug = "ignore")]
  tree: Rc<BlockTree>,
  top: Option<BlockRef>,
  program_counter: Option<BlockRef>,
  frames: Vec<Frame>,
  pub(crate) operand_stack: Vec<Value>,
  temp_slot: Option<(BlockRef, TempData)>,
  parameters: Vec<Value>,
  parameter_frames: Vec<usize>,
  last_tick_time: Duration,
  elapsed: Duration,
  yield_requested: bool,
  restart_requested: bool,
}

impl ThreadContext {
  pub fn new(tree: Rc<BlockTree>, top: Option<BlockRef>) -> Self {
    ThreadContext {
      tree,
      top,
      program_counter: top,
      frames: Vec::new(),
      operand_stack: Vec::new(),
      temp_slot: None,
      parameters: Vec::new(),
      parameter_frames: Vec::new(),
      last_tick_time: Duration::ZERO,
      elapsed: Duration::ZERO,
      yield_requested: false,
      restart_requested: false,
    }
  }

  /// A context with nothing to run that shares this one's tree. Stands in
  /// for a thread while the scheduler is stepping it.
  pub(crate) fn placeholder(&self) -> Self {
    ThreadContext::new(self.tree.clone(), None)
  }

  /// Rewinds to the top of the script and drops all transient state.
  pub fn reset(&mut self) {
    self.program_counter = self.top;
    self.frames.clear();
    self.operand_stack.clear();
    self.temp_slot = None;
    self.parameters.clear();
    self.parameter_frames.clear();
    self.yield_requested = false;
    self.restart_requested = false;
  }

  pub fn tree(&self) -> &Rc<BlockTree> {
    &self.tree
  }

  pub fn top(&self) -> Option<BlockRef> {
    self.top
  }

  pub fn program_counter(&self) -> Option<BlockRef> {
    self.program_counter
  }

  pub(crate) fn jump(&mut self, to: Option<BlockRef>) {
    self.program_counter = to;
  }

  pub fn frames(&self) -> &[Frame] {
    &self.frames
  }

  pub(crate) fn push_frame(&mut self, return_block: Option<BlockRef>, kind: FrameKind) {
    self.frames.push(Frame {
      nesting_level: self.frames.len() + 1,
      return_block,
      kind,
      saved_temp: self.temp_slot.take(),
    });
  }

  /// Pops the innermost frame, restoring the temp slot it saved and, for a
  /// procedure frame, discarding that call's parameters.
  pub(crate) fn pop_frame(&mut self) -> Option<Frame> {
    let mut frame = self.frames.pop()?;
    self.temp_slot = frame.saved_temp.take();
    if frame.kind == FrameKind::Procedure {
      let count = self.parameter_frames.pop().unwrap_or(0);
      let keep = self.parameters.len().saturating_sub(count);
      self.parameters.truncate(keep);
    }
    Some(frame)
  }

  pub fn temp(&self, owner: BlockRef) -> Option<&TempData> {
    match &self.temp_slot {
      Some((block, data)) if *block == owner => Some(data),
      _ => None,
    }
  }

  pub fn set_temp(&mut self, owner: BlockRef, data: TempData) {
    self.temp_slot = Some((owner, data));
  }

  pub fn clear_temp(&mut self, owner: BlockRef) {
    if matches!(self.temp_slot, Some((block, _)) if block == owner) {
      self.temp_slot = None;
    }
  }

  /// Binds a new window of procedure parameters.
  pub(crate) fn push_parameters(&mut self, values: Vec<Value>) {
    self.parameter_frames.push(values.len());
    self.parameters.extend(values);
  }

  /// Parameter `index` of the innermost procedure call.
  pub fn parameter(&self, index: usize) -> Option<&Value> {
    let count = *self.parameter_frames.last()?;
    if index >= count {
      return None;
    }
    self.parameters.get(self.parameters.len() - count + index)
  }

  /// Frames open above the script's top level, counting loop bodies as well
  /// as procedure calls.
  pub fn nesting_level(&self) -> usize {
    self.frames.last().map_or(0, |frame| frame.nesting_level)
  }

  pub fn call_depth(&self) -> usize {
    self.parameter_frames.len()
  }

  /// Ends this thread's turn after the current block.
  pub fn request_yield(&mut self) {
    self.yield_requested = true;
  }

  pub(crate) fn take_yield(&mut self) -> bool {
    mem::take(&mut self.yield_requested)
  }

  /// Restarts this thread from the top once the current block returns.
  pub fn request_restart(&mut self) {
    self.restart_requested = true;
  }

  pub(crate) fn take_restart(&mut self) -> bool {
    mem::take(&mut self.restart_requested)
  }

  /// Time since the scheduler last visited this thread.
  pub fn elapsed(&self) -> Duration {
    self.elapsed
  }

  pub(crate) fn begin_tick(&mut self, now: Duration) {
    self.elapsed = now.saturating_sub(self.last_tick_time);
    self.last_tick_time = now;
  }

  pub(crate) fn set_last_tick_time(&mut self, now: Duration) {
    self.last_tick_time = now;
  }
}
