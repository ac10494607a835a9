use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_repeat() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![set("x", 0), repeat(3, vec![change("x", 1)])],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "x"), Value::from(3));
}

#[test]
fn test_repeat_without_iterations() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      set("x", 0),
      repeat(0, vec![change("x", 1)]),
      repeat(-2, vec![change("x", 1)]),
      repeat("lots", vec![change("x", 1)]),
      set("done", true),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "x"), Value::from(0));
  assert_eq!(value(&project, "Cat", "done"), Value::from(true));
}

#[test]
fn test_repeat_rounds_its_count() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      set("a", 0),
      set("b", 0),
      repeat(2.5, vec![change("a", 1)]),
      repeat("2.4", vec![change("b", 1)]),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "a"), Value::from(3));
  assert_eq!(value(&project, "Cat", "b"), Value::from(2));
}

#[test]
fn test_nested_repeats() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      set("x", 0),
      repeat(3, vec![repeat(4, vec![change("x", 1)]), change("x", 100)]),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "x"), Value::from(312));
}

#[test]
fn test_if_else() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      Command::new("control_if_else")
        .arg(op("operator_lt", 1, 2))
        .substack(vec![set("a", "yes")])
        .substack(vec![set("a", "no")]),
      Command::new("control_if_else")
        .arg(op("operator_gt", 1, 2))
        .substack(vec![set("b", "yes")])
        .substack(vec![set("b", "no")]),
      if_then(Expr::from("true"), vec![set("c", "yes")]),
      set("after", 1),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "a"), Value::from("yes"));
  assert_eq!(value(&project, "Cat", "b"), Value::from("no"));
  assert_eq!(value(&project, "Cat", "c"), Value::from("yes"));
  assert_eq!(value(&project, "Cat", "after"), Value::from(1));
}

#[test]
fn test_if_with_empty_body() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      if_then(Expr::from(true), vec![]),
      Command::new("control_if_else").arg(false).substack(vec![]),
      set("after", 1),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "after"), Value::from(1));
}

#[test]
fn test_repeat_until() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      set("x", 0),
      Command::new("control_repeat_until")
        .arg(op("operator_gt", var("x"), 4))
        .substack(vec![change("x", 1)]),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "x"), Value::from(5));
}

#[test]
fn test_wait_uses_the_clock() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      wait(0.5),
      Command::new("data_setvariableto")
        .arg("t")
        .arg(Expr::call("sensing_timer", vec![])),
    ],
  )]);
  run_until_idle(&mut project);
  let t = value(&project, "Cat", "t").as_number();
  assert!((0.5..0.6).contains(&t), "waited {t}s");
}

#[test]
fn test_wait_until() {
  let mut project = project(vec![
    SpriteDef::stage().variable("go", 0),
    green_flag(
      "Cat",
      vec![
        Command::new("control_wait_until").arg(op("operator_equals", var("go"), 1)),
        set("done", 1),
      ],
    ),
    green_flag("Dog", vec![wait(0.1), set("go", 1)]),
  ]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "done"), Value::from(1));
  assert_eq!(project.stage().variable("go"), Some(&Value::from(1)));
  assert_eq!(project.sprite("Dog").and_then(|dog| dog.variable("go")), None);
}

#[test]
fn test_forever_until_stop_all() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      set("x", 0),
      forever(vec![
        change("x", 1),
        if_then(op("operator_equals", var("x"), 10), vec![stop("all")]),
      ]),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "x"), Value::from(10));
  assert_eq!(project.running_threads(), 0);
}

#[test]
fn test_forever_keeps_running() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![set("x", 0), forever(vec![change("x", 1)])],
  )]);
  for _ in 0..3 {
    assert!(project.run_tick());
  }
  assert!(value(&project, "Cat", "x").as_number() >= 3.);
  project.stop_all();
  assert!(!project.run_tick());
}

#[test]
fn test_redraw_ends_the_tick() {
  let mut project = project(vec![
    green_flag("Cat", vec![forever(vec![Command::new("motion_movesteps").arg(1)])]),
    SpriteDef::sprite("Dog")
      .variable("n", 0)
      .script(Hat::GreenFlag, vec![forever(vec![change("n", 1)])]),
  ]);
  assert!(project.run_tick());
  assert_eq!(value(&project, "Dog", "n"), Value::from(1));
  assert_eq!(project.sprite("Cat").unwrap().state.x, 1.);
  assert!(project.run_tick());
  assert_eq!(value(&project, "Dog", "n"), Value::from(2));
}

#[test]
fn test_stop_this_script_inside_loops() {
  let mut project = project(vec![green_flag(
    "Cat",
    vec![
      set("x", 0),
      set("after", 0),
      repeat(
        5,
        vec![
          change("x", 1),
          if_then(op("operator_equals", var("x"), 2), vec![stop("this script")]),
        ],
      ),
      set("after", 1),
    ],
  )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "x"), Value::from(2));
  assert_eq!(value(&project, "Cat", "after"), Value::from(0));
}

#[test]
fn test_stop_other_scripts_in_sprite() {
  let mut project = project(vec![
    SpriteDef::sprite("Cat")
      .variable("a", 0)
      .variable("stopped", 0)
      .script(Hat::GreenFlag, vec![forever(vec![change("a", 1)])])
      .script(
        Hat::GreenFlag,
        vec![wait(0.05), stop("other scripts in sprite"), set("stopped", 1)],
      ),
    green_flag("Dog", vec![set("b", 0), forever(vec![change("b", 1)])]),
  ]);
  run_until(&mut project, |project| {
    value(project, "Cat", "stopped") == Value::from(1)
  });
  assert_eq!(project.running_threads(), 1);
  let a = value(&project, "Cat", "a");
  let b = value(&project, "Dog", "b").as_number();
  project.run_tick();
  assert_eq!(value(&project, "Cat", "a"), a);
  assert!(value(&project, "Dog", "b").as_number() > b);
}

#[test]
fn test_error_stops_only_its_thread() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .variable("after", 0)
    .variable("x", 0)
    .script(
      Hat::GreenFlag,
      vec![call("nowhere %s", vec![Expr::from(1)]), set("after", 1)],
    )
    .script(Hat::GreenFlag, vec![repeat(3, vec![change("x", 1)])])]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "after"), Value::from(0));
  assert_eq!(value(&project, "Cat", "x"), Value::from(3));
}

#[test]
fn test_restart_green_flag() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .variable("runs", 0)
    .script(Hat::GreenFlag, vec![change("runs", 1), forever(vec![])])]);
  project.run_tick();
  project.restart_green_flag();
  project.run_tick();
  assert_eq!(value(&project, "Cat", "runs"), Value::from(2));
  assert_eq!(project.running_threads(), 1);
}
