use log::warn;

use super::{command, reporter, Env, HandlerResult, HandlerSpec};
use crate::{
  error::RuntimeError,
  sprite::{RotationStyle, SpriteKind, SpriteState},
  value::Value,
};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  command("motion_movesteps", &["STEPS"], move_steps),
  command("motion_turnright", &["DEGREES"], turn_right),
  command("motion_turnleft", &["DEGREES"], turn_left),
  command("motion_gotoxy", &["X", "Y"], go_to_xy),
  command("motion_setx", &["X"], set_x),
  command("motion_sety", &["Y"], set_y),
  command("motion_changexby", &["DX"], change_x_by),
  command("motion_changeyby", &["DY"], change_y_by),
  command("motion_pointindirection", &["DIRECTION"], point_in_direction),
  command("motion_setrotationstyle", &["STYLE"], set_rotation_style),
  command("motion_ifonedgebounce", &[], if_on_edge_bounce),
  reporter("motion_xposition", &[], x_position),
  reporter("motion_yposition", &[], y_position),
  reporter("motion_direction", &[], direction),
];

/// Applies `change` to a sprite's state and asks for a redraw. The stage
/// does not move.
fn moving(env: &mut Env, change: impl FnOnce(&mut SpriteState)) -> Result<HandlerResult, RuntimeError> {
  if env.sprite().kind != SpriteKind::Stage {
    change(&mut env.sprite_mut().state);
    env.request_redraw();
  }
  Ok(env.advance())
}

fn move_steps(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let steps = args[0].as_number();
  moving(env, |state| state.move_steps(steps))
}

fn turn_right(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let degrees = args[0].as_number();
  moving(env, |state| state.set_direction(state.direction + degrees))
}

fn turn_left(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let degrees = args[0].as_number();
  moving(env, |state| state.set_direction(state.direction - degrees))
}

fn go_to_xy(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let (x, y) = (args[0].as_number(), args[1].as_number());
  moving(env, |state| {
    state.x = x;
    state.y = y;
  })
}

fn set_x(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let x = args[0].as_number();
  moving(env, |state| state.x = x)
}

fn set_y(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let y = args[0].as_number();
  moving(env, |state| state.y = y)
}

fn change_x_by(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let dx = args[0].as_number();
  moving(env, |state| state.x += dx)
}

fn change_y_by(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let dy = args[0].as_number();
  moving(env, |state| state.y += dy)
}

fn point_in_direction(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let direction = args[0].as_number();
  moving(env, |state| state.set_direction(direction))
}

fn set_rotation_style(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let name = args[0].as_text();
  match RotationStyle::from_name(&name) {
    Some(style) => moving(env, |state| state.rotation_style = style),
    None => {
      warn!("unknown rotation style {name:?}");
      Ok(env.advance())
    }
  }
}

/// Turns the sprite away from any stage edge its position has crossed and
/// pulls it back inside. Sprites have no costume bounds here, so only the
/// position is tested.
fn if_on_edge_bounce(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let half_width = f64::from(env.config.stage_width) / 2.;
  let half_height = f64::from(env.config.stage_height) / 2.;
  moving(env, |state| {
    let mut direction = state.direction;
    if state.x.abs() > half_width {
      direction = -direction;
      state.x = state.x.clamp(-half_width, half_width);
    }
    if state.y.abs() > half_height {
      direction = 180. - direction;
      state.y = state.y.clamp(-half_height, half_height);
    }
    state.set_direction(direction);
  })
}

/// Snaps values within 1e-9 of an integer, hiding drift from trigonometry.
fn limit_precision(value: f64) -> f64 {
  let rounded = value.round();
  if (value - rounded).abs() < 1e-9 {
    rounded
  } else {
    value
  }
}

fn x_position(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(limit_precision(env.sprite().state.x).into()))
}

fn y_position(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(limit_precision(env.sprite().state.y).into()))
}

fn direction(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.sprite().state.direction.into()))
}
