use pretty_assertions::assert_eq;

use super::*;

fn broadcast_and_wait(message: &str) -> Command {
  Command::new("event_broadcastandwait").arg(message)
}

#[test]
fn test_broadcast_without_listeners() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      broadcast("nobody"),
      broadcast_and_wait("nobody"),
      set("after", 1),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "after"), Value::from(1));
}

#[test]
fn test_broadcast_starts_every_listener() {
  let mut project = project(vec![
    SpriteDef::stage()
      .variable("heard", 0)
      .script(Hat::Broadcast("ping".to_string()), vec![change("heard", 1)]),
    SpriteDef::sprite("Cat")
      .script(Hat::GreenFlag, vec![broadcast("ping")])
      .script(Hat::Broadcast("ping".to_string()), vec![change("heard", 10)])
      .script(Hat::Broadcast("Ping".to_string()), vec![change("heard", 100)]),
  ]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Stage", "heard"), Value::from(11));
}

#[test]
fn test_broadcast_and_wait() {
  let mut project = project(vec![
    SpriteDef::stage().variable("work", 0),
    SpriteDef::sprite("Cat")
      .script(
        Hat::GreenFlag,
        vec![broadcast_and_wait("go"), set("seen", var("work"))],
      )
      .script(
        Hat::Broadcast("go".to_string()),
        vec![repeat(3, vec![change("work", 1)])],
      ),
    SpriteDef::sprite("Dog").script(
      Hat::Broadcast("go".to_string()),
      vec![wait(0.1), change("work", 1)],
    ),
  ]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "seen"), Value::from(4));
}

#[test]
fn test_rebroadcast_releases_waiter() {
  let mut project = project(vec![
    SpriteDef::stage()
      .variable("resumed", 0)
      .variable("n", 0)
      .script(Hat::Broadcast("m".to_string()), vec![forever(vec![change("n", 1)])]),
    SpriteDef::sprite("Cat")
      .script(Hat::GreenFlag, vec![broadcast_and_wait("m"), set("resumed", 1)])
      .script(Hat::GreenFlag, vec![wait(0.05), broadcast("m")]),
  ]);
  run_until(&mut project, |project| {
    value(project, "Stage", "resumed") == Value::from(1)
  });
  // the listener never finishes on its own
  assert_eq!(project.running_threads(), 1);
}

#[test]
fn test_broadcast_restarts_sender() {
  let mut project = project(vec![
    SpriteDef::stage().variable("count", 0),
    SpriteDef::sprite("Cat")
      .script(Hat::GreenFlag, vec![broadcast("again")])
      .script(
        Hat::Broadcast("again".to_string()),
        vec![
          change("count", 1),
          if_then(
            op("operator_lt", var("count"), 3),
            vec![broadcast("again"), set("unreachable", 1)],
          ),
        ],
      ),
  ]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Stage", "count"), Value::from(3));
  assert_eq!(project.sprite("Cat").and_then(|cat| cat.variable("unreachable")), None);
}

#[test]
fn test_broadcast_restarts_running_listener() {
  let mut project = project(vec![
    SpriteDef::stage().variable("starts", 0),
    SpriteDef::sprite("Cat")
      .script(
        Hat::GreenFlag,
        vec![broadcast("tick"), wait(0.05), broadcast("tick")],
      )
      .script(
        Hat::Broadcast("tick".to_string()),
        vec![change("starts", 1), wait(1.)],
      ),
  ]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Stage", "starts"), Value::from(2));
}

#[test]
fn test_restarted_listener_runs_once() {
  let mut project = project(vec![
    SpriteDef::stage().variable("starts", 0),
    SpriteDef::sprite("Cat")
      .script(
        Hat::GreenFlag,
        vec![broadcast("tick"), wait(0.05), broadcast("tick"), wait(1.)],
      )
      .script(
        Hat::Broadcast("tick".to_string()),
        vec![change("starts", 1), wait(1.)],
      ),
  ]);
  run_until(&mut project, |project| {
    value(project, "Stage", "starts") == Value::from(2)
  });
  assert_eq!(project.running_threads(), 2);
  project.run_tick();
  assert_eq!(project.running_threads(), 2);
  assert_eq!(value(&project, "Stage", "starts"), Value::from(2));
}
