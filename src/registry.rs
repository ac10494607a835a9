use std::{collections::HashMap, rc::Rc, time::Duration};

use derivative::Derivative;
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use slotmap::{new_key_type, SlotMap};

use crate::{
  block::TreeBuilder,
  blocks::HandlerTable,
  error::{LoadError, RuntimeError},
  loader::{Hat, SpriteDef},
  project::Config,
  sprite::{Procedure, Script, SpriteContext, SpriteKind},
  thread::ThreadContext,
  value::Value,
  variables::VariableStore,
};

new_key_type! {
  pub struct SpriteId;
}

/// One script of one sprite or clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadRef {
  pub sprite: SpriteId,
  pub script: usize,
}

#[derive(Debug, Default)]
struct BroadcastSet {
  threads: Vec<ThreadRef>,
  /// Bumped on every broadcast so waiters can tell their broadcast from a
  /// later one.
  generation: u64,
}

/// Owns every sprite, clone and the stage, and the hat sets that decide
/// which of their threads start when.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SpriteRegistry {
  sprites: SlotMap<SpriteId, SpriteContext>,
  order: Vec<SpriteId>,
  stage: SpriteId,
  green_flag: Vec<ThreadRef>,
  broadcasts: HashMap<String, BroadcastSet>,
  max_clones: usize,
  #[derivative(Debug = "ignore")]
  pub(crate) rng: StdRng,
  timer_origin: Duration,
}

impl SpriteRegistry {
  /// Flattens every sprite's scripts and procedures and links their hats.
  pub fn from_defs(defs: Vec<SpriteDef>, handlers: &HandlerTable, config: &Config) -> Result<Self, LoadError> {
    let mut sprites = SlotMap::with_key();
    let mut order = Vec::with_capacity(defs.len());
    let mut stage = None;
    for def in defs {
      let is_stage = def.kind == SpriteKind::Stage;
      if is_stage && stage.is_some() {
        return Err(LoadError::DuplicateStage);
      }
      let sprite = build_sprite(def, handlers)?;
      let id = sprites.insert(sprite);
      if is_stage {
        stage = Some(id);
        order.insert(0, id);
      } else {
        order.push(id);
      }
    }
    let stage = stage.ok_or(LoadError::MissingStage)?;
    let rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let mut registry = SpriteRegistry {
      sprites,
      order,
      stage,
      green_flag: Vec::new(),
      broadcasts: HashMap::new(),
      max_clones: config.max_clones,
      rng,
      timer_origin: Duration::ZERO,
    };
    for id in registry.order.clone() {
      registry.link_hats(id);
    }
    info!(
      "loaded {} sprites, {} green flag scripts, {} messages",
      registry.order.len(),
      registry.green_flag.len(),
      registry.broadcasts.len()
    );
    Ok(registry)
  }

  fn link_hats(&mut self, id: SpriteId) {
    let Some(sprite) = self.sprites.get(id) else {
      return;
    };
    for (script, entry) in sprite.scripts.iter().enumerate() {
      let thread = ThreadRef { sprite: id, script };
      match &entry.hat {
        Hat::GreenFlag if sprite.kind != SpriteKind::Clone => self.green_flag.push(thread),
        Hat::Broadcast(message) => self
          .broadcasts
          .entry(message.clone())
          .or_default()
          .threads
          .push(thread),
        _ => {}
      }
    }
  }

  pub fn stage_id(&self) -> SpriteId {
    self.stage
  }

  pub fn stage(&self) -> &SpriteContext {
    &self.sprites[self.stage]
  }

  pub fn get(&self, id: SpriteId) -> Option<&SpriteContext> {
    self.sprites.get(id)
  }

  pub fn get_mut(&mut self, id: SpriteId) -> Option<&mut SpriteContext> {
    self.sprites.get_mut(id)
  }

  /// The sprite of a thread being stepped, which is never freed mid-step.
  pub(crate) fn sprite(&self, id: SpriteId) -> &SpriteContext {
    &self.sprites[id]
  }

  pub(crate) fn sprite_mut(&mut self, id: SpriteId) -> &mut SpriteContext {
    &mut self.sprites[id]
  }

  /// The original (non-clone) sprite called `name`.
  pub fn find(&self, name: &str) -> Option<SpriteId> {
    self
      .order
      .iter()
      .copied()
      .find(|id| self.sprites[*id].name == name && !self.sprites[*id].is_clone())
  }

  /// Every sprite, clone and the stage, stage first.
  pub fn iter(&self) -> impl Iterator<Item = (SpriteId, &SpriteContext)> + '_ {
    self.order.iter().map(|id| (*id, &self.sprites[*id]))
  }

  pub fn clones_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SpriteContext> + 'a {
    self
      .iter()
      .map(|(_, sprite)| sprite)
      .filter(move |sprite| sprite.is_clone() && !sprite.pending_destroy && sprite.name == name)
  }

  pub fn clone_count(&self) -> usize {
    self
      .sprites
      .values()
      .filter(|sprite| sprite.is_clone() && !sprite.pending_destroy)
      .count()
  }

  pub fn green_flag(&self) -> &[ThreadRef] {
    &self.green_flag
  }

  pub fn thread(&self, thread: ThreadRef) -> Option<&ThreadContext> {
    self.sprites.get(thread.sprite)?.threads.get(thread.script)
  }

  pub fn thread_mut(&mut self, thread: ThreadRef) -> Option<&mut ThreadContext> {
    self.sprites.get_mut(thread.sprite)?.threads.get_mut(thread.script)
  }

  /// Moves a thread out of its sprite for stepping, leaving an empty
  /// stand-in behind.
  pub(crate) fn take_thread(&mut self, thread: ThreadRef) -> Option<ThreadContext> {
    let slot = self.thread_mut(thread)?;
    let placeholder = slot.placeholder();
    Some(std::mem::replace(slot, placeholder))
  }

  pub(crate) fn restore_thread(&mut self, thread: ThreadRef, context: ThreadContext) {
    if let Some(slot) = self.thread_mut(thread) {
      *slot = context;
    }
  }

  /// Threads listening for `message`, after starting a new broadcast of it.
  pub(crate) fn broadcast(&mut self, message: &str) -> (Vec<ThreadRef>, u64) {
    match self.broadcasts.get_mut(message) {
      Some(set) => {
        set.generation += 1;
        debug!("broadcast {message:?} to {} threads", set.threads.len());
        (set.threads.clone(), set.generation)
      }
      None => {
        debug!("broadcast {message:?} has no listeners");
        (Vec::new(), 0)
      }
    }
  }

  pub(crate) fn broadcast_generation(&self, message: &str) -> u64 {
    self.broadcasts.get(message).map_or(0, |set| set.generation)
  }

  pub(crate) fn listeners(&self, message: &str) -> &[ThreadRef] {
    self
      .broadcasts
      .get(message)
      .map(|set| set.threads.as_slice())
      .unwrap_or(&[])
  }

  /// Clones `source`, links the clone's hats and returns its id. The
  /// caller starts the clone's when-cloned scripts.
  pub fn clone_sprite(&mut self, source: SpriteId) -> Result<SpriteId, RuntimeError> {
    let original = self
      .sprites
      .get(source)
      .filter(|sprite| !sprite.pending_destroy)
      .ok_or(RuntimeError::MissingSprite)?;
    if original.kind == SpriteKind::Stage {
      return Err(RuntimeError::StageClone);
    }
    if self.clone_count() >= self.max_clones {
      return Err(RuntimeError::ResourceExhaustion {
        limit: self.max_clones,
      });
    }
    let clone = original.make_clone(source);
    let id = self.sprites.insert(clone);
    let position = self
      .order
      .iter()
      .position(|other| *other == source)
      .unwrap_or(self.order.len());
    self.order.insert(position, id);
    self.link_hats(id);
    debug!("cloned {:?} as {id:?}", self.sprites[id].name);
    Ok(id)
  }

  /// Unlinks a clone from every broadcast set and flags it for removal once
  /// none of its threads are running.
  pub(crate) fn mark_for_destroy(&mut self, id: SpriteId) {
    let Some(sprite) = self.sprites.get_mut(id) else {
      return;
    };
    if sprite.kind != SpriteKind::Clone {
      return;
    }
    sprite.pending_destroy = true;
    for set in self.broadcasts.values_mut() {
      set.threads.retain(|thread| thread.sprite != id);
    }
  }

  pub(crate) fn mark_all_clones_for_destroy(&mut self) {
    let clones: Vec<SpriteId> = self
      .sprites
      .iter()
      .filter(|(_, sprite)| sprite.is_clone())
      .map(|(id, _)| id)
      .collect();
    for id in clones {
      self.mark_for_destroy(id);
    }
  }

  /// Frees clones flagged for removal whose threads have all stopped.
  pub(crate) fn reap(&mut self, is_running: impl Fn(SpriteId) -> bool) -> usize {
    let doomed: Vec<SpriteId> = self
      .sprites
      .iter()
      .filter(|(id, sprite)| sprite.pending_destroy && !is_running(*id))
      .map(|(id, _)| id)
      .collect();
    for id in &doomed {
      self.sprites.remove(*id);
      self.order.retain(|other| other != id);
      debug!("destroyed clone {id:?}");
    }
    doomed.len()
  }

  fn owner_of_variable(&self, sprite: SpriteId, name: &str) -> SpriteId {
    if self.sprites[sprite].store.has_variable(name) || !self.sprites[self.stage].store.has_variable(name) {
      sprite
    } else {
      self.stage
    }
  }

  fn owner_of_list(&self, sprite: SpriteId, name: &str) -> SpriteId {
    if self.sprites[sprite].store.has_list(name) || !self.sprites[self.stage].store.has_list(name) {
      sprite
    } else {
      self.stage
    }
  }

  /// The variable `name` as seen from `sprite`: its own first, then the
  /// stage's, otherwise a new one on `sprite`.
  pub fn variable_mut(&mut self, sprite: SpriteId, name: &str) -> &mut Value {
    let owner = self.owner_of_variable(sprite, name);
    self.sprites[owner].store.variable_entry(name)
  }

  pub fn list_mut(&mut self, sprite: SpriteId, name: &str) -> &mut Vec<Value> {
    let owner = self.owner_of_list(sprite, name);
    self.sprites[owner].store.list_entry(name)
  }

  pub(crate) fn reset_timer(&mut self, now: Duration) {
    self.timer_origin = now;
  }

  pub(crate) fn timer(&self, now: Duration) -> f64 {
    now.saturating_sub(self.timer_origin).as_secs_f64()
  }
}

fn build_sprite(def: SpriteDef, handlers: &HandlerTable) -> Result<SpriteContext, LoadError> {
  let mut builder = TreeBuilder::new(handlers);
  let mut tops = Vec::with_capacity(def.scripts.len());
  for script in &def.scripts {
    tops.push(builder.add_stack(&script.body)?);
  }
  let mut procedures = HashMap::with_capacity(def.procedures.len());
  for procedure in &def.procedures {
    let body = builder.add_stack(&procedure.body)?;
    procedures.insert(
      procedure.proccode.clone(),
      Procedure {
        body,
        params: procedure.params.len(),
      },
    );
  }
  let tree = Rc::new(builder.finish());
  let scripts: Rc<[Script]> = def
    .scripts
    .into_iter()
    .zip(tops)
    .map(|(script, top)| Script {
      hat: script.hat,
      top,
    })
    .collect();
  let mut store = VariableStore::new();
  for (name, value) in def.variables {
    store.set_variable(name, value);
  }
  for (name, items) in def.lists {
    store.set_list(name, items);
  }
  let kind = match def.kind {
    SpriteKind::Stage => SpriteKind::Stage,
    _ => SpriteKind::Sprite,
  };
  debug!(
    "built {:?}: {} blocks, {} scripts, {} procedures",
    def.name,
    tree.len(),
    scripts.len(),
    procedures.len()
  );
  Ok(SpriteContext::new(
    def.name,
    kind,
    store,
    def.state,
    tree,
    scripts,
    Rc::new(procedures),
  ))
}
