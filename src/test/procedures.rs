use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_nested_calls_keep_their_arguments() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .procedure(
      "outer %s %s",
      &["a", "b"],
      vec![
        set("r1", op("operator_join", arg(0), arg(1))),
        call("inner %s %s", vec![arg(1), arg(0)]),
        set("r3", op("operator_join", arg(0), arg(1))),
      ],
    )
    .procedure(
      "inner %s %s",
      &["a", "b"],
      vec![set("r2", op("operator_join", arg(0), arg(1)))],
    )
    .script(
      Hat::GreenFlag,
      vec![call("outer %s %s", vec![Expr::from("x"), Expr::from("y")]), set("after", 1)],
    )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "r1"), Value::from("xy"));
  assert_eq!(value(&project, "Cat", "r2"), Value::from("yx"));
  assert_eq!(value(&project, "Cat", "r3"), Value::from("xy"));
  assert_eq!(value(&project, "Cat", "after"), Value::from(1));
}

#[test]
fn test_recursion() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .variable("n", 0)
    .procedure(
      "count %s",
      &["left"],
      vec![if_then(
        op("operator_gt", arg(0), 0),
        vec![
          change("n", 1),
          call("count %s", vec![op("operator_subtract", arg(0), 1)]),
        ],
      )],
    )
    .script(Hat::GreenFlag, vec![call("count %s", vec![Expr::from(5)])])]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "n"), Value::from(5));
}

#[test]
fn test_call_inside_a_loop() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .variable("total", 0)
    .procedure("add %s", &["amount"], vec![change("total", arg(0))])
    .script(
      Hat::GreenFlag,
      vec![repeat(4, vec![call("add %s", vec![Expr::from(10)])])],
    )]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "total"), Value::from(40));
}

#[test]
fn test_missing_arguments_are_empty() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .procedure(
      "wrap %s %s",
      &["a", "b"],
      vec![set(
        "result",
        op("operator_join", op("operator_join", "[", arg(1)), "]"),
      )],
    )
    .script(Hat::GreenFlag, vec![call("wrap %s %s", vec![Expr::from("only")])])]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "result"), Value::from("[]"));
}

#[test]
fn test_empty_procedure() {
  let mut project = project(vec![SpriteDef::sprite("Cat")
    .procedure("nothing", &[], vec![])
    .script(Hat::GreenFlag, vec![call("nothing", vec![]), set("after", 1)])]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "after"), Value::from(1));
}

#[test]
fn test_call_depth_limit() {
  let config = Config {
    max_call_depth: 16,
    ..config()
  };
  let mut project = project_with(
    config,
    vec![
      SpriteDef::sprite("Cat")
        .variable("depth", 0)
        .procedure("dive", &[], vec![change("depth", 1), call("dive", vec![])])
        .script(Hat::GreenFlag, vec![call("dive", vec![])]),
      green_flag("Dog", vec![repeat(2, vec![change("laps", 1)])]),
    ],
  );
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Cat", "depth"), Value::from(16));
  assert_eq!(value(&project, "Dog", "laps"), Value::from(2));
}

#[test]
fn test_procedures_belong_to_their_sprite() {
  let mut project = project(vec![
    SpriteDef::sprite("Cat").procedure("meow", &[], vec![set("said", "meow")]),
    SpriteDef::sprite("Dog")
      .variable("after", 0)
      .script(Hat::GreenFlag, vec![call("meow", vec![]), set("after", 1)]),
  ]);
  run_until_idle(&mut project);
  assert_eq!(value(&project, "Dog", "after"), Value::from(0));
}
