use std::{cmp::Ordering, collections::HashMap};

use rand::Rng;

use crate::value::Value;

/// Named variables and lists owned by one sprite, clone or the stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
  variables: HashMap<String, Value>,
  lists: HashMap<String, Vec<Value>>,
}

impl VariableStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn has_variable(&self, name: &str) -> bool {
    self.variables.contains_key(name)
  }

  pub fn has_list(&self, name: &str) -> bool {
    self.lists.contains_key(name)
  }

  pub fn variable(&self, name: &str) -> Option<&Value> {
    self.variables.get(name)
  }

  pub fn list(&self, name: &str) -> Option<&[Value]> {
    self.lists.get(name).map(Vec::as_slice)
  }

  pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
    self.variables.insert(name.into(), value);
  }

  pub fn set_list(&mut self, name: impl Into<String>, items: Vec<Value>) {
    self.lists.insert(name.into(), items);
  }

  /// The variable called `name`, created as `0` if it does not exist yet.
  pub fn variable_entry(&mut self, name: &str) -> &mut Value {
    self.variables.entry(name.to_string()).or_default()
  }

  /// The list called `name`, created empty if it does not exist yet.
  pub fn list_entry(&mut self, name: &str) -> &mut Vec<Value> {
    self.lists.entry(name.to_string()).or_default()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListIndex {
  /// Zero-based position.
  At(usize),
  All,
  Invalid,
}

/// Resolves a 1-based list index argument against a list of `len` items.
/// Besides numbers this accepts `"last"`, `"random"`/`"any"` and, when
/// `accept_all` is set, `"all"`.
pub fn resolve_index(index: &Value, len: usize, accept_all: bool, rng: &mut impl Rng) -> ListIndex {
  if let Value::Text(text) = index {
    match text.as_str() {
      "all" if accept_all => return ListIndex::All,
      "all" => return ListIndex::Invalid,
      "last" if len > 0 => return ListIndex::At(len - 1),
      "last" => return ListIndex::Invalid,
      "random" | "any" if len > 0 => return ListIndex::At(rng.gen_range(0..len)),
      "random" | "any" => return ListIndex::Invalid,
      _ => {}
    }
  }
  let index = index.as_number().floor();
  if index < 1. || index > len as f64 {
    ListIndex::Invalid
  } else {
    ListIndex::At(index as usize - 1)
  }
}

/// The text a list reports as a whole: items joined by spaces, or with no
/// separator when every item is a single character.
pub fn join_list(items: &[Value]) -> String {
  let texts: Vec<String> = items.iter().map(Value::as_text).collect();
  if texts.iter().all(|text| text.chars().count() == 1) {
    texts.concat()
  } else {
    texts.join(" ")
  }
}

/// 1-based position of the first item matching `item`, or 0.
pub fn item_number(items: &[Value], item: &Value) -> usize {
  items
    .iter()
    .position(|candidate| candidate.compare(item) == Ordering::Equal)
    .map_or(0, |i| i + 1)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rand::{rngs::StdRng, SeedableRng};

  #[test]
  fn test_auto_vivify() {
    let mut store = VariableStore::new();
    assert!(!store.has_variable("x"));
    assert_eq!(*store.variable_entry("x"), Value::from(0.));
    assert!(store.has_variable("x"));
    assert!(store.list_entry("items").is_empty());
    assert!(store.has_list("items"));
  }

  #[test]
  fn test_resolve_index() {
    let mut rng = StdRng::seed_from_u64(7);
    assert_eq!(resolve_index(&Value::from(1.), 3, false, &mut rng), ListIndex::At(0));
    assert_eq!(resolve_index(&Value::from("2.9"), 3, false, &mut rng), ListIndex::At(1));
    assert_eq!(resolve_index(&Value::from(0.), 3, false, &mut rng), ListIndex::Invalid);
    assert_eq!(resolve_index(&Value::from(4.), 3, false, &mut rng), ListIndex::Invalid);
    assert_eq!(resolve_index(&Value::from("last"), 3, false, &mut rng), ListIndex::At(2));
    assert_eq!(resolve_index(&Value::from("last"), 0, false, &mut rng), ListIndex::Invalid);
    assert_eq!(resolve_index(&Value::from("all"), 3, true, &mut rng), ListIndex::All);
    assert_eq!(resolve_index(&Value::from("all"), 3, false, &mut rng), ListIndex::Invalid);
    match resolve_index(&Value::from("random"), 3, false, &mut rng) {
      ListIndex::At(i) => assert!(i < 3),
      index => panic!("expected a position, got {index:?}"),
    }
  }

  #[test]
  fn test_join_list() {
    assert_eq!(join_list(&["a".into(), "b".into(), "c".into()]), "abc");
    assert_eq!(join_list(&["ab".into(), "c".into()]), "ab c");
    assert_eq!(join_list(&[1.into(), 2.5.into()]), "1 2.5");
    assert_eq!(join_list(&[]), "");
  }

  #[test]
  fn test_item_number() {
    let items: Vec<Value> = vec!["Apple".into(), 10.into(), "pear".into()];
    assert_eq!(item_number(&items, &"apple".into()), 1);
    assert_eq!(item_number(&items, &"10.0".into()), 2);
    assert_eq!(item_number(&items, &"plum".into()), 0);
  }
}
