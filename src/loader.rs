use crate::{
  block::Command,
  sprite::{SpriteKind, SpriteState},
  value::Value,
};

/// What starts a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hat {
  GreenFlag,
  Broadcast(String),
  WhenCloned,
  /// A hat this runtime never fires, such as key presses.
  Other(String),
}

#[derive(Debug, Clone)]
pub struct ScriptDef {
  pub hat: Hat,
  pub body: Vec<Command>,
}

impl ScriptDef {
  pub fn new(hat: Hat, body: Vec<Command>) -> Self {
    ScriptDef { hat, body }
  }
}

/// A custom block. Its body reads arguments by position through the
/// argument reporters.
#[derive(Debug, Clone)]
pub struct ProcedureDef {
  pub proccode: String,
  pub params: Vec<String>,
  pub body: Vec<Command>,
}

/// A stage or sprite as loaded, before its scripts are flattened.
#[derive(Debug, Clone)]
pub struct SpriteDef {
  pub name: String,
  pub kind: SpriteKind,
  pub state: SpriteState,
  pub variables: Vec<(String, Value)>,
  pub lists: Vec<(String, Vec<Value>)>,
  pub scripts: Vec<ScriptDef>,
  pub procedures: Vec<ProcedureDef>,
}

impl SpriteDef {
  pub fn stage() -> Self {
    SpriteDef::new("Stage", SpriteKind::Stage)
  }

  pub fn sprite(name: &str) -> Self {
    SpriteDef::new(name, SpriteKind::Sprite)
  }

  fn new(name: &str, kind: SpriteKind) -> Self {
    SpriteDef {
      name: name.to_string(),
      kind,
      state: SpriteState::default(),
      variables: Vec::new(),
      lists: Vec::new(),
      scripts: Vec::new(),
      procedures: Vec::new(),
    }
  }

  pub fn variable(mut self, name: &str, value: impl Into<Value>) -> Self {
    self.variables.push((name.to_string(), value.into()));
    self
  }

  pub fn list(mut self, name: &str, items: Vec<Value>) -> Self {
    self.lists.push((name.to_string(), items));
    self
  }

  pub fn script(mut self, hat: Hat, body: Vec<Command>) -> Self {
    self.scripts.push(ScriptDef::new(hat, body));
    self
  }

  pub fn procedure(mut self, proccode: &str, params: &[&str], body: Vec<Command>) -> Self {
    self.procedures.push(ProcedureDef {
      proccode: proccode.to_string(),
      params: params.iter().map(|param| param.to_string()).collect(),
      body,
    });
    self
  }
}
