use super::{command, reporter, Env, HandlerResult, HandlerSpec};
use crate::{
  error::RuntimeError,
  value::Value,
  variables::{item_number, join_list, resolve_index, ListIndex},
};

pub(super) const HANDLERS: &[HandlerSpec] = &[
  reporter("data_variable", &["VARIABLE"], variable),
  command("data_setvariableto", &["VARIABLE", "VALUE"], set_variable),
  command("data_changevariableby", &["VARIABLE", "VALUE"], change_variable),
  command("data_showvariable", &["VARIABLE"], show_or_hide),
  command("data_hidevariable", &["VARIABLE"], show_or_hide),
  reporter("data_listcontents", &["LIST"], list_contents),
  command("data_addtolist", &["ITEM", "LIST"], add_to_list),
  command("data_deleteoflist", &["INDEX", "LIST"], delete_of_list),
  command("data_deletealloflist", &["LIST"], delete_all_of_list),
  command("data_insertatlist", &["ITEM", "INDEX", "LIST"], insert_at_list),
  command("data_replaceitemoflist", &["INDEX", "LIST", "ITEM"], replace_item_of_list),
  reporter("data_itemoflist", &["INDEX", "LIST"], item_of_list),
  reporter("data_itemnumoflist", &["ITEM", "LIST"], item_num_of_list),
  reporter("data_lengthoflist", &["LIST"], length_of_list),
  reporter("data_listcontainsitem", &["LIST", "ITEM"], list_contains_item),
  command("data_showlist", &["LIST"], show_or_hide),
  command("data_hidelist", &["LIST"], show_or_hide),
];

fn variable(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(HandlerResult::Report(env.variable(&args[0].as_text())))
}

fn set_variable(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  *env.variable_mut(&args[0].as_text()) = args[1].clone();
  Ok(env.advance())
}

fn change_variable(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let variable = env.variable_mut(&args[0].as_text());
  *variable = Value::Number(variable.as_number() + args[1].as_number());
  Ok(env.advance())
}

// monitors are not drawn
fn show_or_hide(env: &mut Env, _: &[Value]) -> Result<HandlerResult, RuntimeError> {
  Ok(env.advance())
}

fn list_contents(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let text = join_list(env.list_mut(&args[0].as_text()));
  Ok(HandlerResult::Report(Value::Text(text)))
}

fn add_to_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  env.list_mut(&args[1].as_text()).push(args[0].clone());
  Ok(env.advance())
}

fn delete_of_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let len = env.list_mut(&args[1].as_text()).len();
  let index = resolve_index(&args[0], len, true, env.rng());
  let list = env.list_mut(&args[1].as_text());
  match index {
    ListIndex::All => list.clear(),
    ListIndex::At(i) => {
      list.remove(i);
    }
    ListIndex::Invalid => {}
  }
  Ok(env.advance())
}

fn delete_all_of_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  env.list_mut(&args[0].as_text()).clear();
  Ok(env.advance())
}

fn insert_at_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let len = env.list_mut(&args[2].as_text()).len();
  // one past the end appends
  let index = resolve_index(&args[1], len + 1, false, env.rng());
  if let ListIndex::At(i) = index {
    env.list_mut(&args[2].as_text()).insert(i, args[0].clone());
  }
  Ok(env.advance())
}

fn replace_item_of_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let len = env.list_mut(&args[1].as_text()).len();
  let index = resolve_index(&args[0], len, false, env.rng());
  if let ListIndex::At(i) = index {
    env.list_mut(&args[1].as_text())[i] = args[2].clone();
  }
  Ok(env.advance())
}

fn item_of_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let len = env.list_mut(&args[1].as_text()).len();
  let index = resolve_index(&args[0], len, false, env.rng());
  let item = match index {
    ListIndex::At(i) => env.list_mut(&args[1].as_text())[i].clone(),
    _ => Value::Text(String::new()),
  };
  Ok(HandlerResult::Report(item))
}

fn item_num_of_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let position = item_number(env.list_mut(&args[1].as_text()), &args[0]);
  Ok(HandlerResult::Report(position.into()))
}

fn length_of_list(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let len = env.list_mut(&args[0].as_text()).len();
  Ok(HandlerResult::Report(len.into()))
}

fn list_contains_item(env: &mut Env, args: &[Value]) -> Result<HandlerResult, RuntimeError> {
  let found = item_number(env.list_mut(&args[0].as_text()), &args[1]) > 0;
  Ok(HandlerResult::Report(found.into()))
}
