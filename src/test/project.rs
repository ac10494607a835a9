use std::{fs::File, io::Write};

use pretty_assertions::assert_eq;
use zip::{write::SimpleFileOptions, ZipWriter};

use super::*;
use crate::{blocks::HandlerTable, error::LoadError, sb3, sprite::RotationStyle};

const BASIC: &str = include_str!("projects/basic.json");

fn check_basic(project: &mut Project<Headless>) {
  project.restart_green_flag();
  run_until_idle(project);
  assert_eq!(project.variable("Cat", "score"), Some(&Value::from(16)));
  assert_eq!(project.variable("Stage", "flag"), Some(&Value::from("yes")));
  let clones: Vec<_> = project.clones_of("Cat").collect();
  assert_eq!(clones.len(), 1);
  assert!(!clones[0].state.visible);
  assert!(project.sprite("Cat").unwrap().state.visible);
  assert!(project.peripherals().transcript().is_empty());
}

#[test]
fn test_convert_basic_project() {
  let defs = sb3::convert(sb3::parse(BASIC).unwrap(), &HandlerTable::new()).unwrap();
  assert_eq!(defs[0].kind, SpriteKind::Stage);
  let cat = &defs[1];
  assert_eq!(cat.name, "Cat");
  assert_eq!((cat.state.x, cat.state.y), (12., -34.));
  assert_eq!(cat.state.rotation_style, RotationStyle::LeftRight);
  assert_eq!(cat.state.volume, 80.);
  assert_eq!(
    cat.lists,
    vec![("bag".to_string(), vec![Value::from("x"), Value::from(2)])]
  );
  let hats: Vec<&Hat> = cat.scripts.iter().map(|script| &script.hat).collect();
  assert_eq!(
    hats,
    [
      &Hat::GreenFlag,
      &Hat::WhenCloned,
      &Hat::Other("event_whenkeypressed".to_string())
    ]
  );
  assert_eq!(cat.procedures[0].proccode, "double %s");
  assert_eq!(cat.procedures[0].params, ["n"]);
  assert_eq!(
    cat.procedures[0].body,
    vec![set("score", op("operator_multiply", arg(0), "2"))]
  );
  assert_eq!(cat.scripts[0].body[2], call("double %s", vec![var("score")]));
  assert_eq!(cat.scripts[0].body[5], Command::new("noop"));
}

#[test]
fn test_run_basic_project() {
  let defs = sb3::convert(sb3::parse(BASIC).unwrap(), &HandlerTable::new()).unwrap();
  let mut project = Project::new(defs, config(), Headless::with_fixed_step(STEP)).unwrap();
  check_basic(&mut project);
}

#[test]
fn test_load_json_file() {
  let path = concat!(env!("CARGO_MANIFEST_DIR"), "/src/test/projects/basic.json");
  let mut project = Project::load(path, config(), Headless::with_fixed_step(STEP)).unwrap();
  check_basic(&mut project);
}

#[test]
fn test_load_sb3_archive() {
  let path = std::env::temp_dir().join(format!("basic-{}.sb3", std::process::id()));
  let mut writer = ZipWriter::new(File::create(&path).unwrap());
  writer
    .start_file("project.json", SimpleFileOptions::default())
    .unwrap();
  writer.write_all(BASIC.as_bytes()).unwrap();
  writer.finish().unwrap();
  let loaded = Project::load(&path, config(), Headless::with_fixed_step(STEP));
  std::fs::remove_file(&path).unwrap();
  check_basic(&mut loaded.unwrap());
}

#[test]
fn test_load_errors() {
  let missing = Project::load("no/such/project.sb3", config(), Headless::new());
  assert!(matches!(missing, Err(LoadError::Io(_))));
  assert!(matches!(sb3::parse("{\"targets\": 3}"), Err(LoadError::Json(_))));
  let no_stage = sb3::parse(r#"{"targets": [{"isStage": false, "name": "Cat"}]}"#).unwrap();
  let defs = sb3::convert(no_stage, &HandlerTable::new()).unwrap();
  assert!(matches!(
    Project::new(defs, config(), Headless::new()),
    Err(LoadError::MissingStage)
  ));
}
