use std::mem;

use log::trace;

use crate::{
  block::{BlockHandlerId, BlockNode, BlockRef, FlatBlock},
  blocks::{Env, HandlerResult, HandlerSpec, HandlerTable, Shape},
  error::RuntimeError,
  peripherals::Peripherals,
  project::Config,
  registry::{SpriteRegistry, ThreadRef},
  scheduler::Scheduler,
  thread::ThreadContext,
  value::Value,
};

#[derive(Debug)]
pub enum StepResult {
  /// Pause until the next pass.
  Yielded,
  /// More work is ready this pass.
  Continuing,
  Finished,
  Error(RuntimeError),
}

fn malformed(block: BlockRef, reason: &'static str) -> RuntimeError {
  RuntimeError::MalformedTree { block, reason }
}

/// Runs threads one command at a time against the shared runtime state.
pub struct Evaluator<'a> {
  pub handlers: &'a HandlerTable,
  pub registry: &'a mut SpriteRegistry,
  pub scheduler: &'a mut Scheduler,
  pub peripherals: &'a mut dyn Peripherals,
  pub config: &'a Config,
}

impl<'a> Evaluator<'a> {
  /// Executes the command at the thread's program counter, first popping
  /// frames whose stacks have run out.
  pub fn step(&mut self, thread: &mut ThreadContext, me: ThreadRef) -> StepResult {
    match self.try_step(thread, me) {
      Ok(result) => result,
      Err(error) => StepResult::Error(error),
    }
  }

  fn try_step(&mut self, thread: &mut ThreadContext, me: ThreadRef) -> Result<StepResult, RuntimeError> {
    while thread.program_counter().is_none() {
      match thread.pop_frame() {
        Some(frame) => {
          trace!("{me:?} leaves nesting level {}", frame.nesting_level);
          thread.jump(frame.return_block);
        }
        None => return Ok(StepResult::Finished),
      }
    }
    let Some(at) = thread.program_counter() else {
      return Ok(StepResult::Finished);
    };
    let tree = thread.tree().clone();
    let segment = tree
      .segment(at)
      .ok_or_else(|| malformed(at, "segment runs past the end of the tree"))?;
    let Some((command, arguments)) = segment.split_last() else {
      return Err(malformed(at, "empty segment"));
    };
    let command_ref = BlockRef(at.0 + arguments.len() as u32);
    let (handler, next, substacks) = match &command.node {
      BlockNode::Stacked { handler, next } => (*handler, *next, &[][..]),
      BlockNode::Branching { handler, substacks } => (*handler, None, &substacks[..]),
      _ => return Err(malformed(command_ref, "segment does not end in a command")),
    };
    let spec = *self
      .handlers
      .get(handler)
      .ok_or_else(|| malformed(command_ref, "unknown handler"))?;
    let next = match spec.shape {
      Shape::Branch { inner, after: true } => substacks.get(inner).copied().flatten(),
      Shape::Branch { .. } => None,
      Shape::Command => next,
      Shape::Reporter => return Err(malformed(command_ref, "reporter in command position")),
    };

    self.evaluate_arguments(thread, me, at, arguments)?;
    let args = mem::take(&mut thread.operand_stack);
    check_arity(&spec, command_ref, args.len())?;
    trace!("{me:?} runs {}", spec.opcode);
    let result = {
      let mut env = Env {
        thread: &mut *thread,
        me,
        block: at,
        registry: &mut *self.registry,
        scheduler: &mut *self.scheduler,
        peripherals: &mut *self.peripherals,
        config: self.config,
        next,
        substacks,
      };
      (spec.run)(&mut env, &args)?
    };
    thread.operand_stack = args;
    thread.operand_stack.clear();

    if thread.take_restart() {
      trace!("{me:?} restarts");
      thread.reset();
      return Ok(StepResult::Yielded);
    }
    match result {
      HandlerResult::Report(_) => return Err(malformed(command_ref, "command reported a value")),
      HandlerResult::Advance(to) => thread.jump(to),
      HandlerResult::Repeat => {
        thread.take_yield();
        return Ok(StepResult::Yielded);
      }
      HandlerResult::Stop => return Ok(StepResult::Finished),
    }
    if thread.program_counter().is_none() && thread.frames().is_empty() {
      Ok(StepResult::Finished)
    } else if thread.take_yield() {
      Ok(StepResult::Yielded)
    } else {
      Ok(StepResult::Continuing)
    }
  }

  /// Evaluates the argument nodes of a segment in one pass, leaving the
  /// command's arguments on the operand stack. Reporters run when the walk
  /// climbs back to their level, taking the values gathered one level
  /// deeper.
  fn evaluate_arguments(
    &mut self,
    thread: &mut ThreadContext,
    me: ThreadRef,
    start: BlockRef,
    nodes: &[FlatBlock],
  ) -> Result<(), RuntimeError> {
    thread.operand_stack.clear();
    // operand stack heights where each open level's values begin
    let mut marks: Vec<usize> = Vec::new();
    let mut level: u8 = 1;
    for (offset, node) in nodes.iter().enumerate() {
      let block = BlockRef(start.0 + offset as u32);
      while level < node.level {
        marks.push(thread.operand_stack.len());
        level += 1;
      }
      match &node.node {
        BlockNode::Constant(value) => {
          if node.level != level {
            return Err(malformed(block, "constant below its level"));
          }
          thread.operand_stack.push(value.clone());
        }
        BlockNode::Call(handler) => {
          let args = if level == node.level + 1 {
            let mark = marks
              .pop()
              .ok_or_else(|| malformed(block, "reporter without an open level"))?;
            level -= 1;
            thread.operand_stack.split_off(mark)
          } else if level == node.level {
            Vec::new()
          } else {
            return Err(malformed(block, "reporter closes more than one level"));
          };
          let value = self.report(thread, me, block, *handler, args)?;
          thread.operand_stack.push(value);
        }
        _ => return Err(malformed(block, "command inside an argument list")),
      }
    }
    if level != 1 {
      return Err(malformed(start, "argument level left open"));
    }
    Ok(())
  }

  fn report(
    &mut self,
    thread: &mut ThreadContext,
    me: ThreadRef,
    block: BlockRef,
    handler: BlockHandlerId,
    args: Vec<Value>,
  ) -> Result<Value, RuntimeError> {
    let spec = *self
      .handlers
      .get(handler)
      .ok_or_else(|| malformed(block, "unknown handler"))?;
    if spec.shape != Shape::Reporter {
      return Err(malformed(block, "command in reporter position"));
    }
    check_arity(&spec, block, args.len())?;
    let mut env = Env {
      thread,
      me,
      block,
      registry: &mut *self.registry,
      scheduler: &mut *self.scheduler,
      peripherals: &mut *self.peripherals,
      config: self.config,
      next: None,
      substacks: &[],
    };
    match (spec.run)(&mut env, &args)? {
      HandlerResult::Report(value) => Ok(value),
      _ => Err(malformed(block, "reporter did not report a value")),
    }
  }
}

fn check_arity(spec: &HandlerSpec, block: BlockRef, found: usize) -> Result<(), RuntimeError> {
  let expected = spec.inputs.len();
  if found == expected || (spec.variadic && found > expected) {
    Ok(())
  } else {
    Err(malformed(block, "wrong number of arguments"))
  }
}
