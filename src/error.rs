use std::io;

use thiserror::Error;

use crate::block::BlockRef;

/// Failure of a single script. The scheduler logs it and stops only the
/// thread that raised it.
#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("malformed block tree at {block:?}: {reason}")]
  MalformedTree {
    block: BlockRef,
    reason: &'static str,
  },
  #[error("call to undefined procedure {name:?}")]
  UnknownProcedure { name: String },
  #[error("procedure calls nested deeper than {limit}")]
  CallDepthExceeded { limit: usize },
  #[error("clone limit of {limit} reached")]
  ResourceExhaustion { limit: usize },
  #[error("the stage cannot be cloned")]
  StageClone,
  #[error("sprite no longer exists")]
  MissingSprite,
}

#[derive(Debug, Error)]
pub enum LoadError {
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error("invalid project.json: {0}")]
  Json(#[from] serde_json::Error),
  #[error("invalid project archive: {0}")]
  Archive(#[from] zip::result::ZipError),
  #[error("no handler for opcode {opcode:?}")]
  UnknownOpcode { opcode: String },
  #[error("{opcode} takes {expected} inputs but was given {found}")]
  Arity {
    opcode: String,
    expected: usize,
    found: usize,
  },
  #[error("{opcode}: {reason}")]
  Shape {
    opcode: String,
    reason: &'static str,
  },
  #[error("project has no stage")]
  MissingStage,
  #[error("project has more than one stage")]
  DuplicateStage,
  #[error("blocks are nested too deeply")]
  NestingTooDeep,
  #[error("block {id:?} is referenced but not defined")]
  MissingBlock { id: String },
  #[error("block {id:?} follows itself")]
  BlockCycle { id: String },
}
