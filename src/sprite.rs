use std::{collections::HashMap, rc::Rc};

use derivative::Derivative;
use serde::Deserialize;

use crate::{
  block::{BlockRef, BlockTree},
  loader::Hat,
  registry::SpriteId,
  thread::ThreadContext,
  value::Value,
  variables::VariableStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
  Stage,
  Sprite,
  Clone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RotationStyle {
  #[serde(rename = "all around")]
  AllAround,
  #[serde(rename = "left-right")]
  LeftRight,
  #[serde(rename = "don't rotate")]
  DontRotate,
}

impl RotationStyle {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "all around" => Some(RotationStyle::AllAround),
      "left-right" => Some(RotationStyle::LeftRight),
      "don't rotate" => Some(RotationStyle::DontRotate),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStyle {
  Say,
  Think,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Speech {
  pub style: SpeechStyle,
  pub text: String,
}

/// Motion, looks and sound properties.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteState {
  pub visible: bool,
  pub x: f64,
  pub y: f64,
  pub size: f64,
  pub direction: f64,
  pub draggable: bool,
  pub current_costume: usize,
  pub rotation_style: RotationStyle,
  pub volume: f64,
  pub tempo: f64,
  pub speech: Option<Speech>,
}

impl Default for SpriteState {
  fn default() -> Self {
    SpriteState {
      visible: true,
      x: 0.,
      y: 0.,
      size: 100.,
      direction: 90.,
      draggable: false,
      current_costume: 0,
      rotation_style: RotationStyle::AllAround,
      volume: 100.,
      tempo: 60.,
      speech: None,
    }
  }
}

impl SpriteState {
  pub fn set_direction(&mut self, direction: f64) {
    if direction.is_finite() {
      self.direction = wrap_direction(direction);
    }
  }

  pub fn move_steps(&mut self, steps: f64) {
    let radians = (90. - self.direction).to_radians();
    self.x += steps * radians.cos();
    self.y += steps * radians.sin();
  }
}

/// Wraps a direction in degrees into (-180, 180].
fn wrap_direction(direction: f64) -> f64 {
  180. - (180. - direction).rem_euclid(360.)
}

#[derive(Debug, Clone)]
pub struct Script {
  pub hat: Hat,
  pub top: Option<BlockRef>,
}

#[derive(Debug, Clone)]
pub struct Procedure {
  pub body: Option<BlockRef>,
  pub params: usize,
}

/// The stage, a sprite or a clone, together with one thread per script.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SpriteContext {
  pub name: String,
  pub kind: SpriteKind,
  /// The sprite a clone was made from.
  pub parent: Option<SpriteId>,
  pub store: VariableStore,
  pub state: SpriteState,
  #[derivative(Debug = "ignore")]
  pub(crate) tree: Rc<BlockTree>,
  pub(crate) scripts: Rc<[Script]>,
  pub(crate) threads: Vec<ThreadContext>,
  #[derivative(Debug = "ignore")]
  pub(crate) procedures: Rc<HashMap<String, Procedure>>,
  pub(crate) when_cloned: Vec<usize>,
  pub(crate) pending_destroy: bool,
}

impl SpriteContext {
  pub fn new(
    name: String,
    kind: SpriteKind,
    store: VariableStore,
    state: SpriteState,
    tree: Rc<BlockTree>,
    scripts: Rc<[Script]>,
    procedures: Rc<HashMap<String, Procedure>>,
  ) -> Self {
    let threads = scripts
      .iter()
      .map(|script| ThreadContext::new(tree.clone(), script.top))
      .collect();
    let when_cloned = scripts
      .iter()
      .enumerate()
      .filter(|(_, script)| script.hat == Hat::WhenCloned)
      .map(|(i, _)| i)
      .collect();
    SpriteContext {
      name,
      kind,
      parent: None,
      store,
      state,
      tree,
      scripts,
      threads,
      procedures,
      when_cloned,
      pending_destroy: false,
    }
  }

  /// A clone sharing this sprite's block tree, with its own copy of every
  /// variable, list and property and fresh threads.
  pub(crate) fn make_clone(&self, parent: SpriteId) -> SpriteContext {
    let mut clone = SpriteContext::new(
      self.name.clone(),
      SpriteKind::Clone,
      self.store.clone(),
      self.state.clone(),
      self.tree.clone(),
      self.scripts.clone(),
      self.procedures.clone(),
    );
    clone.parent = Some(self.parent.unwrap_or(parent));
    clone.state.speech = None;
    clone
  }

  pub fn is_clone(&self) -> bool {
    self.kind == SpriteKind::Clone
  }

  pub fn scripts(&self) -> &[Script] {
    &self.scripts
  }

  pub fn threads(&self) -> &[ThreadContext] {
    &self.threads
  }

  pub fn tree(&self) -> &Rc<BlockTree> {
    &self.tree
  }

  pub fn procedure(&self, name: &str) -> Option<&Procedure> {
    self.procedures.get(name)
  }

  /// A variable owned by this sprite, without falling back to the stage.
  pub fn variable(&self, name: &str) -> Option<&Value> {
    self.store.variable(name)
  }

  pub fn list(&self, name: &str) -> Option<&[Value]> {
    self.store.list(name)
  }
}
