use crate::{
  blocks::{HandlerTable, Shape},
  error::LoadError,
  value::Value,
};

/// Position of a segment start inside a [`BlockTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(pub(crate) u32);

impl BlockRef {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandlerId(pub(crate) u16);

impl BlockHandlerId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockNode {
  Constant(Value),
  /// A reporter taking its arguments from the nodes one level deeper
  /// immediately before it.
  Call(BlockHandlerId),
  Stacked {
    handler: BlockHandlerId,
    next: Option<BlockRef>,
  },
  /// Substacks are the inner stacks in order followed, for blocks that
  /// have one, by the stack after the block.
  Branching {
    handler: BlockHandlerId,
    substacks: Box<[Option<BlockRef>]>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatBlock {
  pub level: u8,
  pub node: BlockNode,
}

/// All scripts and procedure bodies of one sprite, flattened into postfix
/// segments. Each command is stored as its argument nodes followed by the
/// command node itself at level 0; a reporter at level `n` consumes the
/// nodes at level `n + 1` that precede it.
#[derive(Debug, Default)]
pub struct BlockTree {
  blocks: Vec<FlatBlock>,
}

impl BlockTree {
  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  pub fn get(&self, at: BlockRef) -> Option<&FlatBlock> {
    self.blocks.get(at.index())
  }

  /// The argument nodes and command node making up the segment at `at`.
  pub fn segment(&self, at: BlockRef) -> Option<&[FlatBlock]> {
    let rest = self.blocks.get(at.index()..)?;
    let end = rest.iter().position(|block| block.level == 0)?;
    Some(&rest[..=end])
  }
}

/// An argument expression before flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Const(Value),
  Call { opcode: String, args: Vec<Expr> },
}

impl Expr {
  pub fn call(opcode: &str, args: impl IntoIterator<Item = Expr>) -> Self {
    Expr::Call {
      opcode: opcode.to_string(),
      args: args.into_iter().collect(),
    }
  }
}

impl From<Value> for Expr {
  fn from(value: Value) -> Self {
    Expr::Const(value)
  }
}

impl From<f64> for Expr {
  fn from(number: f64) -> Self {
    Expr::Const(number.into())
  }
}

impl From<i32> for Expr {
  fn from(number: i32) -> Self {
    Expr::Const(number.into())
  }
}

impl From<bool> for Expr {
  fn from(bool: bool) -> Self {
    Expr::Const(bool.into())
  }
}

impl From<&str> for Expr {
  fn from(text: &str) -> Self {
    Expr::Const(text.into())
  }
}

/// A command block before flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
  pub opcode: String,
  pub args: Vec<Expr>,
  pub substacks: Vec<Vec<Command>>,
}

impl Command {
  pub fn new(opcode: &str) -> Self {
    Command {
      opcode: opcode.to_string(),
      args: Vec::new(),
      substacks: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<Expr>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn substack(mut self, body: Vec<Command>) -> Self {
    self.substacks.push(body);
    self
  }
}

#[derive(Clone, Copy)]
struct Head {
  start: BlockRef,
  node: usize,
  handler: BlockHandlerId,
}

/// Flattens nested [`Command`]s into a [`BlockTree`], checking every block
/// against the shape and arity its handler declares.
pub struct TreeBuilder<'a> {
  handlers: &'a HandlerTable,
  blocks: Vec<FlatBlock>,
}

impl<'a> TreeBuilder<'a> {
  pub fn new(handlers: &'a HandlerTable) -> Self {
    TreeBuilder {
      handlers,
      blocks: Vec::new(),
    }
  }

  /// Adds a stack of commands and returns its first block, or `None` for an
  /// empty stack.
  pub fn add_stack(&mut self, stack: &[Command]) -> Result<Option<BlockRef>, LoadError> {
    let mut heads = Vec::with_capacity(stack.len());
    for command in stack {
      heads.push(self.emit_head(command)?);
    }
    for (i, command) in stack.iter().enumerate() {
      let next = heads.get(i + 1).map(|head| head.start);
      let head = heads[i];
      let node = match self.handlers.spec(head.handler).shape {
        Shape::Branch { inner, after } => {
          let mut substacks = Vec::with_capacity(inner + 1);
          for body in &command.substacks {
            substacks.push(self.add_stack(body)?);
          }
          substacks.resize(inner, None);
          if after {
            substacks.push(next);
          }
          BlockNode::Branching {
            handler: head.handler,
            substacks: substacks.into_boxed_slice(),
          }
        }
        _ => BlockNode::Stacked {
          handler: head.handler,
          next,
        },
      };
      self.blocks[head.node].node = node;
    }
    Ok(heads.first().map(|head| head.start))
  }

  pub fn finish(self) -> BlockTree {
    BlockTree {
      blocks: self.blocks,
    }
  }

  fn check_arity(&self, opcode: &str, handler: BlockHandlerId, found: usize) -> Result<(), LoadError> {
    let spec = self.handlers.spec(handler);
    let expected = spec.inputs.len();
    if found == expected || (spec.variadic && found > expected) {
      Ok(())
    } else {
      Err(LoadError::Arity {
        opcode: opcode.to_string(),
        expected,
        found,
      })
    }
  }

  /// Emits the arguments and the command node with placeholder links.
  fn emit_head(&mut self, command: &Command) -> Result<Head, LoadError> {
    let handler = self
      .handlers
      .lookup(&command.opcode)
      .ok_or_else(|| LoadError::UnknownOpcode {
        opcode: command.opcode.clone(),
      })?;
    self.check_arity(&command.opcode, handler, command.args.len())?;
    let start = self.next_ref()?;
    for arg in &command.args {
      self.emit_expr(arg, 1)?;
    }
    let node = match self.handlers.spec(handler).shape {
      Shape::Reporter => {
        return Err(LoadError::Shape {
          opcode: command.opcode.clone(),
          reason: "reporter used as a command",
        })
      }
      Shape::Command => {
        if !command.substacks.is_empty() {
          return Err(LoadError::Shape {
            opcode: command.opcode.clone(),
            reason: "command block given substacks",
          });
        }
        BlockNode::Stacked {
          handler,
          next: None,
        }
      }
      Shape::Branch { inner, .. } => {
        if command.substacks.len() > inner {
          return Err(LoadError::Shape {
            opcode: command.opcode.clone(),
            reason: "too many substacks",
          });
        }
        BlockNode::Branching {
          handler,
          substacks: Box::new([]),
        }
      }
    };
    self.blocks.push(FlatBlock { level: 0, node });
    Ok(Head {
      start,
      node: self.blocks.len() - 1,
      handler,
    })
  }

  fn emit_expr(&mut self, expr: &Expr, level: usize) -> Result<(), LoadError> {
    let level = u8::try_from(level).map_err(|_| LoadError::NestingTooDeep)?;
    match expr {
      Expr::Const(value) => self.blocks.push(FlatBlock {
        level,
        node: BlockNode::Constant(value.clone()),
      }),
      Expr::Call { opcode, args } => {
        let handler = self
          .handlers
          .lookup(opcode)
          .ok_or_else(|| LoadError::UnknownOpcode {
            opcode: opcode.clone(),
          })?;
        if self.handlers.spec(handler).shape != Shape::Reporter {
          return Err(LoadError::Shape {
            opcode: opcode.clone(),
            reason: "command used as a reporter",
          });
        }
        self.check_arity(opcode, handler, args.len())?;
        for arg in args {
          self.emit_expr(arg, level as usize + 1)?;
        }
        self.blocks.push(FlatBlock {
          level,
          node: BlockNode::Call(handler),
        });
      }
    }
    Ok(())
  }

  fn next_ref(&self) -> Result<BlockRef, LoadError> {
    u32::try_from(self.blocks.len())
      .map(BlockRef)
      .map_err(|_| LoadError::NestingTooDeep)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_flatten_levels() {
    let handlers = HandlerTable::new();
    let mut builder = TreeBuilder::new(&handlers);
    let top = builder
      .add_stack(&[Command::new("data_setvariableto").arg("x").arg(Expr::call(
        "operator_add",
        [Expr::from(1), Expr::call("operator_multiply", [Expr::from(2), Expr::from(3)])],
      ))])
      .unwrap()
      .unwrap();
    let tree = builder.finish();
    let levels: Vec<u8> = tree
      .segment(top)
      .unwrap()
      .iter()
      .map(|block| block.level)
      .collect();
    assert_eq!(levels, vec![1, 2, 3, 3, 2, 1, 0]);
  }

  #[test]
  fn test_links() {
    let handlers = HandlerTable::new();
    let mut builder = TreeBuilder::new(&handlers);
    let top = builder
      .add_stack(&[
        Command::new("control_repeat")
          .arg(3)
          .substack(vec![Command::new("data_changevariableby").arg("x").arg(1)]),
        Command::new("data_setvariableto").arg("y").arg(2),
      ])
      .unwrap()
      .unwrap();
    let tree = builder.finish();
    let repeat = tree.segment(top).unwrap().last().unwrap();
    let substacks = match &repeat.node {
      BlockNode::Branching { substacks, .. } => substacks.clone(),
      node => panic!("expected a branching block, got {node:?}"),
    };
    assert_eq!(substacks.len(), 2);
    let body = substacks[0].unwrap();
    let after = substacks[1].unwrap();
    assert!(matches!(
      tree.segment(body).unwrap().last().unwrap().node,
      BlockNode::Stacked { next: None, .. }
    ));
    assert_eq!(tree.segment(after).unwrap().len(), 3);
  }

  #[test]
  fn test_rejects_bad_arity() {
    let handlers = HandlerTable::new();
    let mut builder = TreeBuilder::new(&handlers);
    let error = builder
      .add_stack(&[Command::new("data_setvariableto").arg("x")])
      .unwrap_err();
    assert!(matches!(error, LoadError::Arity { expected: 2, found: 1, .. }));
  }

  #[test]
  fn test_rejects_reporter_as_command() {
    let handlers = HandlerTable::new();
    let mut builder = TreeBuilder::new(&handlers);
    let error = builder
      .add_stack(&[Command::new("operator_add").arg(1).arg(2)])
      .unwrap_err();
    assert!(matches!(error, LoadError::Shape { .. }));
  }

  #[test]
  fn test_empty_stack() {
    let handlers = HandlerTable::new();
    let mut builder = TreeBuilder::new(&handlers);
    assert_eq!(builder.add_stack(&[]).unwrap(), None);
  }
}
