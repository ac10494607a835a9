use std::time::Duration;

use crate::{
  block::{Command, Expr},
  loader::{Hat, SpriteDef},
  peripherals::Headless,
  project::{Config, Project},
  sprite::SpriteKind,
  value::Value,
};

mod control;
mod events;
mod procedures;
mod project;

/// Simulated time per scheduler pass.
const STEP: Duration = Duration::from_millis(10);

fn config() -> Config {
  Config {
    seed: Some(1),
    ..Config::default()
  }
}

/// Adds an empty stage unless `sprites` has one.
fn project_with(config: Config, mut sprites: Vec<SpriteDef>) -> Project<Headless> {
  if !sprites.iter().any(|sprite| sprite.kind == SpriteKind::Stage) {
    sprites.insert(0, SpriteDef::stage());
  }
  let mut project = Project::new(sprites, config, Headless::with_fixed_step(STEP)).unwrap();
  project.restart_green_flag();
  project
}

/// Loads `sprites` with the default config and clicks the green flag.
fn project(sprites: Vec<SpriteDef>) -> Project<Headless> {
  project_with(config(), sprites)
}

fn run_until_idle(project: &mut Project<Headless>) -> usize {
  for tick in 1..=500 {
    if !project.run_tick() {
      return tick;
    }
  }
  panic!("scripts still running after 500 ticks");
}

/// Runs ticks until `done` holds, failing after a bounded number.
fn run_until(project: &mut Project<Headless>, done: impl Fn(&Project<Headless>) -> bool) {
  for _ in 0..500 {
    if done(project) {
      return;
    }
    project.run_tick();
  }
  panic!("condition not reached after 500 ticks");
}

fn green_flag(name: &str, body: Vec<Command>) -> SpriteDef {
  SpriteDef::sprite(name).script(Hat::GreenFlag, body)
}

fn var(name: &str) -> Expr {
  Expr::call("data_variable", [Expr::from(name)])
}

fn op(opcode: &str, a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
  Expr::call(opcode, [a.into(), b.into()])
}

fn arg(index: i32) -> Expr {
  Expr::call("argument_reporter_string_number", [Expr::from(index)])
}

fn set(name: &str, value: impl Into<Expr>) -> Command {
  Command::new("data_setvariableto").arg(name).arg(value)
}

fn change(name: &str, by: impl Into<Expr>) -> Command {
  Command::new("data_changevariableby").arg(name).arg(by)
}

fn repeat(times: impl Into<Expr>, body: Vec<Command>) -> Command {
  Command::new("control_repeat").arg(times).substack(body)
}

fn forever(body: Vec<Command>) -> Command {
  Command::new("control_forever").substack(body)
}

fn if_then(condition: Expr, body: Vec<Command>) -> Command {
  Command::new("control_if").arg(condition).substack(body)
}

fn wait(seconds: f64) -> Command {
  Command::new("control_wait").arg(seconds)
}

fn stop(option: &str) -> Command {
  Command::new("control_stop").arg(option)
}

fn call(proccode: &str, args: Vec<Expr>) -> Command {
  args
    .into_iter()
    .fold(Command::new("procedures_call").arg(proccode), |command, arg| {
      command.arg(arg)
    })
}

fn broadcast(message: &str) -> Command {
  Command::new("event_broadcast").arg(message)
}

fn value(project: &Project<Headless>, sprite: &str, name: &str) -> Value {
  project
    .variable(sprite, name)
    .cloned()
    .unwrap_or_else(|| panic!("{sprite} has no variable {name:?}"))
}
