use std::{path::Path, time::Duration};

use derivative::Derivative;
use log::info;

use crate::{
  blocks::{clamp_tempo, clamp_volume, HandlerTable},
  error::LoadError,
  loader::SpriteDef,
  peripherals::Peripherals,
  registry::SpriteRegistry,
  sb3,
  scheduler::Scheduler,
  sprite::SpriteContext,
  value::Value,
};

#[derive(Debug, Clone)]
pub struct Config {
  pub stage_width: u32,
  pub stage_height: u32,
  pub frame_rate: u32,
  /// Share of each frame the scheduler may spend running scripts.
  pub work_ratio: f64,
  pub max_clones: usize,
  pub max_call_depth: usize,
  /// Seeds `pick random`; entropy is used when unset.
  pub seed: Option<u64>,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      stage_width: 480,
      stage_height: 360,
      frame_rate: 30,
      work_ratio: 0.75,
      max_clones: 300,
      max_call_depth: 1024,
      seed: None,
    }
  }
}

impl Config {
  pub fn frame_time(&self) -> Duration {
    Duration::from_secs_f64(1. / self.frame_rate.max(1) as f64)
  }

  pub fn work_time(&self) -> Duration {
    self.frame_time().mul_f64(self.work_ratio.clamp(0., 1.))
  }
}

/// A loaded program and everything needed to run it, driven one frame at a
/// time by a host loop.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Project<P: Peripherals> {
  config: Config,
  #[derivative(Debug = "ignore")]
  handlers: HandlerTable,
  registry: SpriteRegistry,
  scheduler: Scheduler,
  #[derivative(Debug = "ignore")]
  peripherals: P,
}

impl<P: Peripherals> Project<P> {
  pub fn new(sprites: Vec<SpriteDef>, config: Config, peripherals: P) -> Result<Self, LoadError> {
    let handlers = HandlerTable::new();
    let registry = SpriteRegistry::from_defs(sprites, &handlers, &config)?;
    Ok(Project {
      config,
      handlers,
      registry,
      scheduler: Scheduler::new(),
      peripherals,
    })
  }

  /// Loads a `.sb3` archive or a bare `project.json`.
  pub fn load(path: impl AsRef<Path>, config: Config, peripherals: P) -> Result<Self, LoadError> {
    let path = path.as_ref();
    info!("loading {}", path.display());
    let handlers = HandlerTable::new();
    let sprites = sb3::load(path, &handlers)?;
    let registry = SpriteRegistry::from_defs(sprites, &handlers, &config)?;
    Ok(Project {
      config,
      handlers,
      registry,
      scheduler: Scheduler::new(),
      peripherals,
    })
  }

  /// Stops everything, deletes all clones and starts the green flag
  /// scripts.
  pub fn restart_green_flag(&mut self) {
    self.scheduler.stop_all(None);
    self.registry.mark_all_clones_for_destroy();
    self.registry.reap(|_| false);
    self.registry.reset_timer(self.scheduler.clock());
    for thread in self.registry.green_flag().to_vec() {
      self.scheduler.start(&mut self.registry, thread);
    }
  }

  pub fn run_tick(&mut self) -> bool {
    self.scheduler.run_tick(
      &mut self.registry,
      &self.handlers,
      &mut self.peripherals,
      &self.config,
    )
  }

  pub fn stop_all(&mut self) {
    self.scheduler.stop_all(None);
    self.registry.mark_all_clones_for_destroy();
    self.registry.reap(|_| false);
  }

  pub fn set_volume(&mut self, volume: f64) {
    let stage = self.registry.stage_id();
    if let Some(stage) = self.registry.get_mut(stage) {
      stage.state.volume = clamp_volume(volume);
    }
  }

  pub fn set_tempo(&mut self, tempo: f64) {
    let stage = self.registry.stage_id();
    if let Some(stage) = self.registry.get_mut(stage) {
      stage.state.tempo = clamp_tempo(tempo);
    }
  }

  pub fn stage(&self) -> &SpriteContext {
    self.registry.stage()
  }

  pub fn sprite(&self, name: &str) -> Option<&SpriteContext> {
    self.registry.find(name).and_then(|id| self.registry.get(id))
  }

  /// A variable as `sprite` sees it: its own, else the stage's.
  pub fn variable(&self, sprite: &str, name: &str) -> Option<&Value> {
    self
      .sprite(sprite)
      .and_then(|sprite| sprite.variable(name))
      .or_else(|| self.stage().variable(name))
  }

  pub fn list(&self, sprite: &str, name: &str) -> Option<&[Value]> {
    self
      .sprite(sprite)
      .and_then(|sprite| sprite.list(name))
      .or_else(|| self.stage().list(name))
  }

  pub fn clones_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SpriteContext> + 'a {
    self.registry.clones_of(name)
  }

  pub fn running_threads(&self) -> usize {
    self.scheduler.run_list().len()
  }

  pub fn registry(&self) -> &SpriteRegistry {
    &self.registry
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn peripherals(&self) -> &P {
    &self.peripherals
  }

  pub fn peripherals_mut(&mut self) -> &mut P {
    &mut self.peripherals
  }
}
