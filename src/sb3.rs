//! Reading Scratch 3 projects: the `project.json` model and its conversion
//! into [`SpriteDef`]s.

use std::{
  collections::{HashMap, HashSet},
  fmt::{self, Formatter},
  fs::{self, File},
  io::Read,
  marker::PhantomData,
  path::Path,
};

use log::{debug, warn};
use serde::{
  de::{MapAccess, SeqAccess, Visitor},
  Deserialize, Deserializer,
};
use zip::ZipArchive;

use crate::{
  block::{Command, Expr},
  blocks::{HandlerTable, Shape},
  error::LoadError,
  loader::{Hat, ProcedureDef, ScriptDef, SpriteDef},
  sprite::{RotationStyle, SpriteKind, SpriteState},
  value::Value,
};

#[derive(Debug, Deserialize)]
pub struct Project {
  pub targets: Vec<Target>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
  pub is_stage: bool,
  pub name: String,
  #[serde(default)]
  pub variables: HashMap<String, Variable>,
  #[serde(default)]
  pub lists: HashMap<String, List>,
  /// Kept in file order, which is the order scripts start in.
  #[serde(default, deserialize_with = "ordered")]
  pub blocks: Vec<(String, BlockEntry)>,
  #[serde(default)]
  pub current_costume: usize,
  #[serde(default)]
  pub layer_order: i32,
  #[serde(default = "default_volume")]
  pub volume: f64,
  #[serde(default = "default_tempo")]
  pub tempo: f64,
  #[serde(default = "default_true")]
  pub visible: bool,
  #[serde(default)]
  pub x: f64,
  #[serde(default)]
  pub y: f64,
  #[serde(default = "default_size")]
  pub size: f64,
  #[serde(default = "default_direction")]
  pub direction: f64,
  #[serde(default)]
  pub draggable: bool,
  #[serde(default = "default_rotation_style")]
  pub rotation_style: RotationStyle,
}

fn default_true() -> bool {
  true
}

fn default_volume() -> f64 {
  100.
}

fn default_tempo() -> f64 {
  60.
}

fn default_size() -> f64 {
  100.
}

fn default_direction() -> f64 {
  90.
}

fn default_rotation_style() -> RotationStyle {
  RotationStyle::AllAround
}

/// A map read into a list of entries, keeping the order of the file.
fn ordered<'de, D, T>(de: D) -> Result<Vec<(String, T)>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  struct MapVisitor<T>(PhantomData<T>);
  impl<'de, T: Deserialize<'de>> Visitor<'de> for MapVisitor<T> {
    type Value = Vec<(String, T)>;
    fn expecting(&self, f: &mut Formatter) -> fmt::Result {
      write!(f, "a map")
    }
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
      let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
      while let Some(entry) = map.next_entry()? {
        entries.push(entry);
      }
      Ok(entries)
    }
  }
  de.deserialize_map(MapVisitor(PhantomData))
}

/// Converts a JSON scalar the way the editor stores it. Anything else
/// reads as empty text.
fn scalar(json: &serde_json::Value) -> Value {
  match json {
    serde_json::Value::Bool(bool) => Value::Bool(*bool),
    serde_json::Value::Number(number) => Value::Number(number.as_f64().unwrap_or(0.)),
    serde_json::Value::String(text) => Value::Text(text.clone()),
    _ => Value::Text(String::new()),
  }
}

fn text_at(values: &[serde_json::Value], index: usize) -> String {
  scalar(values.get(index).unwrap_or(&serde_json::Value::Null)).as_text()
}

#[derive(Debug)]
pub struct Variable {
  pub name: String,
  pub value: Value,
}

// cloud variables carry a trailing flag
impl<'de> Deserialize<'de> for Variable {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    let values: Vec<serde_json::Value> = Deserialize::deserialize(de)?;
    Ok(Variable {
      name: text_at(&values, 0),
      value: values.get(1).map(scalar).unwrap_or_default(),
    })
  }
}

#[derive(Debug)]
pub struct List {
  pub name: String,
  pub value: Vec<Value>,
}

impl<'de> Deserialize<'de> for List {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    let (name, items): (String, Vec<serde_json::Value>) = Deserialize::deserialize(de)?;
    Ok(List {
      name,
      value: items.iter().map(scalar).collect(),
    })
  }
}

/// A field is `[value, id]`; only the value matters here.
#[derive(Debug)]
pub struct Field(pub Value);

impl<'de> Deserialize<'de> for Field {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    let values: Vec<serde_json::Value> = Deserialize::deserialize(de)?;
    Ok(Field(values.first().map(scalar).unwrap_or_default()))
  }
}

/// An inline literal or reference, written as `[code, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
  Literal(Value),
  Broadcast(String),
  Variable(String),
  List(String),
}

impl Primitive {
  fn from_array(values: &[serde_json::Value]) -> Option<Self> {
    let code = values.first()?.as_u64()?;
    match code {
      4..=10 => Some(Primitive::Literal(values.get(1).map(scalar).unwrap_or_default())),
      11 => Some(Primitive::Broadcast(text_at(values, 1))),
      12 => Some(Primitive::Variable(text_at(values, 1))),
      13 => Some(Primitive::List(text_at(values, 1))),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
  Empty,
  Block(String),
  Primitive(Primitive),
}

impl<'de> Deserialize<'de> for Input {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    struct SeqVisitor;
    impl<'de> Visitor<'de> for SeqVisitor {
      type Value = Input;
      fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Input")
      }
      fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        #[derive(Debug, Deserialize)]
        #[serde(untagged)]
        enum T {
          String(String),
          Values(Vec<serde_json::Value>),
        }
        let _shadow = seq.next_element::<serde_json::Value>()?;
        // the obscured shadow after a block is not needed
        let input = match seq.next_element::<Option<T>>()? {
          Some(Some(T::String(id))) => Input::Block(id),
          Some(Some(T::Values(values))) => Primitive::from_array(&values)
            .map(Input::Primitive)
            .unwrap_or(Input::Empty),
          Some(None) | None => Input::Empty,
        };
        while seq.next_element::<serde_json::Value>()?.is_some() {}
        Ok(input)
      }
    }
    de.deserialize_seq(SeqVisitor)
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct Mutation {
  #[serde(default)]
  pub proccode: String,
  /// JSON-encoded list of input ids.
  #[serde(default)]
  pub argumentids: Option<String>,
  /// JSON-encoded list of parameter names.
  #[serde(default)]
  pub argumentnames: Option<String>,
}

impl Mutation {
  fn argument_ids(&self) -> Result<Vec<String>, LoadError> {
    decode_list(self.argumentids.as_deref())
  }

  fn argument_names(&self) -> Result<Vec<String>, LoadError> {
    decode_list(self.argumentnames.as_deref())
  }
}

fn decode_list(list: Option<&str>) -> Result<Vec<String>, LoadError> {
  match list {
    Some(list) => Ok(serde_json::from_str(list)?),
    None => Ok(Vec::new()),
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
  pub opcode: String,
  #[serde(default)]
  pub next: Option<String>,
  #[serde(default)]
  pub inputs: HashMap<String, Input>,
  #[serde(default)]
  pub fields: HashMap<String, Field>,
  #[serde(default)]
  pub mutation: Option<Mutation>,
  #[serde(default)]
  pub shadow: bool,
  #[serde(default)]
  pub top_level: bool,
}

/// Loose variable and list reporters are stored as bare primitives.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BlockEntry {
  Block(Block),
  Primitive(Vec<serde_json::Value>),
}

pub fn parse(json: &str) -> Result<Project, LoadError> {
  Ok(serde_json::from_str(json)?)
}

/// Reads `project.json` from a `.sb3` archive, or directly when the path
/// names a `.json` file.
pub fn read_project(path: &Path) -> Result<Project, LoadError> {
  if path.extension().is_some_and(|extension| extension == "json") {
    return parse(&fs::read_to_string(path)?);
  }
  let mut archive = ZipArchive::new(File::open(path)?)?;
  let mut json = String::new();
  archive.by_name("project.json")?.read_to_string(&mut json)?;
  parse(&json)
}

pub fn load(path: &Path, handlers: &HandlerTable) -> Result<Vec<SpriteDef>, LoadError> {
  convert(read_project(path)?, handlers)
}

/// Converts every target, stage first and sprites in layer order.
pub fn convert(project: Project, handlers: &HandlerTable) -> Result<Vec<SpriteDef>, LoadError> {
  let mut targets = project.targets;
  targets.sort_by_key(|target| (!target.is_stage, target.layer_order));
  targets
    .iter()
    .map(|target| convert_target(target, handlers))
    .collect()
}

fn convert_target(target: &Target, handlers: &HandlerTable) -> Result<SpriteDef, LoadError> {
  let blocks: HashMap<&str, &BlockEntry> = target
    .blocks
    .iter()
    .map(|(id, entry)| (id.as_str(), entry))
    .collect();
  let converter = Converter {
    handlers,
    blocks: &blocks,
  };
  let mut def = SpriteDef {
    name: target.name.clone(),
    kind: if target.is_stage {
      SpriteKind::Stage
    } else {
      SpriteKind::Sprite
    },
    state: SpriteState {
      visible: target.visible,
      x: target.x,
      y: target.y,
      size: target.size,
      direction: target.direction,
      draggable: target.draggable,
      current_costume: target.current_costume,
      rotation_style: target.rotation_style,
      volume: target.volume,
      tempo: target.tempo,
      speech: None,
    },
    variables: target
      .variables
      .values()
      .map(|variable| (variable.name.clone(), variable.value.clone()))
      .collect(),
    lists: target
      .lists
      .values()
      .map(|list| (list.name.clone(), list.value.clone()))
      .collect(),
    scripts: Vec::new(),
    procedures: Vec::new(),
  };
  for (id, entry) in &target.blocks {
    let BlockEntry::Block(block) = entry else {
      continue;
    };
    if !block.top_level || block.shadow {
      continue;
    }
    let hat = match block.opcode.as_str() {
      "event_whenflagclicked" => Hat::GreenFlag,
      "event_whenbroadcastreceived" => Hat::Broadcast(field_text(block, "BROADCAST_OPTION")),
      "control_start_as_clone" => Hat::WhenCloned,
      "procedures_definition" => {
        def.procedures.push(converter.procedure(id, block)?);
        continue;
      }
      opcode if handlers.lookup(opcode).is_some() => {
        debug!("{}: skipping loose stack at {id}", target.name);
        continue;
      }
      opcode => Hat::Other(opcode.to_string()),
    };
    let body = converter.stack(block.next.as_deref(), &[], 0)?;
    def.scripts.push(ScriptDef::new(hat, body));
  }
  Ok(def)
}

fn field_text(block: &Block, name: &str) -> String {
  block
    .fields
    .get(name)
    .map(|field| field.0.as_text())
    .unwrap_or_default()
}

/// How deeply stacks and reporters may nest before loading gives up.
const MAX_DEPTH: usize = u8::MAX as usize;

fn nested(depth: usize) -> Result<usize, LoadError> {
  if depth >= MAX_DEPTH {
    Err(LoadError::NestingTooDeep)
  } else {
    Ok(depth + 1)
  }
}

struct Converter<'a> {
  handlers: &'a HandlerTable,
  blocks: &'a HashMap<&'a str, &'a BlockEntry>,
}

impl<'a> Converter<'a> {
  fn block(&self, id: &str) -> Result<&'a BlockEntry, LoadError> {
    self
      .blocks
      .get(id)
      .copied()
      .ok_or_else(|| LoadError::MissingBlock { id: id.to_string() })
  }

  fn procedure(&self, id: &str, definition: &Block) -> Result<ProcedureDef, LoadError> {
    let prototype = match definition.inputs.get("custom_block") {
      Some(Input::Block(prototype)) => match self.block(prototype)? {
        BlockEntry::Block(prototype) => prototype,
        BlockEntry::Primitive(_) => return Err(missing_prototype(id)),
      },
      _ => return Err(missing_prototype(id)),
    };
    let mutation = prototype.mutation.as_ref().ok_or_else(|| missing_prototype(id))?;
    let params = mutation.argument_names()?;
    let body = self.stack(definition.next.as_deref(), &params, 0)?;
    Ok(ProcedureDef {
      proccode: mutation.proccode.clone(),
      params,
      body,
    })
  }

  /// Follows `next` links from `first`. `params` names the arguments of the
  /// enclosing definition.
  fn stack(&self, first: Option<&str>, params: &[String], depth: usize) -> Result<Vec<Command>, LoadError> {
    let depth = nested(depth)?;
    let mut stack = Vec::new();
    let mut seen = HashSet::new();
    let mut at = first;
    while let Some(id) = at {
      if !seen.insert(id) {
        return Err(LoadError::BlockCycle { id: id.to_string() });
      }
      let BlockEntry::Block(block) = self.block(id)? else {
        break;
      };
      stack.push(self.command(block, params, depth)?);
      at = block.next.as_deref();
    }
    Ok(stack)
  }

  fn command(&self, block: &Block, params: &[String], depth: usize) -> Result<Command, LoadError> {
    if block.opcode == "procedures_call" {
      let mutation = block.mutation.as_ref();
      let mut command = Command::new("procedures_call").arg(
        mutation
          .map(|mutation| mutation.proccode.as_str())
          .unwrap_or_default(),
      );
      for id in mutation.map(Mutation::argument_ids).transpose()?.unwrap_or_default() {
        command = command.arg(self.input(block, &id, params, depth)?);
      }
      return Ok(command);
    }
    let spec = match self.handlers.lookup(&block.opcode).map(|id| self.handlers.spec(id)) {
      Some(spec) if spec.shape != Shape::Reporter => spec,
      _ => {
        warn!("unsupported command {:?}, loading as noop", block.opcode);
        return Ok(Command::new("noop"));
      }
    };
    let mut command = Command::new(&block.opcode);
    for name in spec.inputs {
      command = command.arg(self.input(block, name, params, depth)?);
    }
    if let Shape::Branch { inner, .. } = spec.shape {
      for i in 0..inner {
        let name = match i {
          0 => "SUBSTACK".to_string(),
          i => format!("SUBSTACK{}", i + 1),
        };
        let first = match block.inputs.get(&name) {
          Some(Input::Block(id)) => Some(id.as_str()),
          _ => None,
        };
        command = command.substack(self.stack(first, params, depth)?);
      }
    }
    Ok(command)
  }

  /// An input by name, falling back to a field of the same name.
  fn input(&self, block: &Block, name: &str, params: &[String], depth: usize) -> Result<Expr, LoadError> {
    match block.inputs.get(name) {
      Some(Input::Block(id)) => self.expr(id, params, depth),
      Some(Input::Primitive(primitive)) => Ok(primitive_expr(primitive)),
      Some(Input::Empty) => Ok(Expr::Const(Value::Text(String::new()))),
      None => Ok(Expr::Const(
        block
          .fields
          .get(name)
          .map(|field| field.0.clone())
          .unwrap_or_else(|| Value::Text(String::new())),
      )),
    }
  }

  fn expr(&self, id: &str, params: &[String], depth: usize) -> Result<Expr, LoadError> {
    let depth = nested(depth)?;
    let block = match self.block(id)? {
      BlockEntry::Block(block) => block,
      BlockEntry::Primitive(values) => {
        return Ok(
          Primitive::from_array(values)
            .map(|primitive| primitive_expr(&primitive))
            .unwrap_or_else(|| Expr::Const(Value::Text(String::new()))),
        )
      }
    };
    // menus
    if block.shadow && block.inputs.is_empty() && block.fields.len() == 1 {
      if let Some(field) = block.fields.values().next() {
        return Ok(Expr::Const(field.0.clone()));
      }
    }
    if let opcode @ ("argument_reporter_string_number" | "argument_reporter_boolean") = block.opcode.as_str() {
      let name = field_text(block, "VALUE");
      return Ok(match params.iter().position(|param| *param == name) {
        Some(index) => Expr::call(opcode, [Expr::from(index as i32)]),
        None if opcode == "argument_reporter_boolean" => Expr::from(false),
        None => Expr::from(0),
      });
    }
    let spec = match self.handlers.lookup(&block.opcode).map(|id| self.handlers.spec(id)) {
      Some(spec) if spec.shape == Shape::Reporter => spec,
      _ => {
        warn!("unsupported reporter {:?}, loading as empty text", block.opcode);
        return Ok(Expr::Const(Value::Text(String::new())));
      }
    };
    let args = spec
      .inputs
      .iter()
      .map(|name| self.input(block, name, params, depth))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::call(&block.opcode, args))
  }
}

fn missing_prototype(id: &str) -> LoadError {
  warn!("procedure definition {id} has no prototype");
  LoadError::Shape {
    opcode: "procedures_definition".to_string(),
    reason: "definition without a prototype",
  }
}

fn primitive_expr(primitive: &Primitive) -> Expr {
  match primitive {
    Primitive::Literal(value) => Expr::Const(value.clone()),
    Primitive::Broadcast(name) => Expr::from(name.as_str()),
    Primitive::Variable(name) => Expr::call("data_variable", [Expr::from(name.as_str())]),
    Primitive::List(name) => Expr::call("data_listcontents", [Expr::from(name.as_str())]),
  }
}
