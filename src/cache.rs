// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Run-scoped memo of actor id -> display attributes, filled lazily or by bulk preload
// role: cache/identity
// inputs: ActorDirectory (platform member lookups)
// outputs: Actor values
// side_effects: One remote lookup per distinct unknown id
// invariants:
// - Entries are permanent for the run; preload never overwrites an existing entry
// - Unresolvable ids are remembered too (fall back to the id as display name)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::Result;
use crate::item::Actor;

pub trait ActorDirectory {
  fn lookup_actor(&self, id: &str) -> Result<Option<Actor>>;
}

pub struct IdentityCache<'a> {
  directory: Option<&'a dyn ActorDirectory>,
  entries: RefCell<HashMap<String, Actor>>,
  lookups: Cell<usize>,
}

impl<'a> IdentityCache<'a> {
  pub fn new(directory: Option<&'a dyn ActorDirectory>) -> Self {
    Self {
      directory,
      entries: RefCell::new(HashMap::new()),
      lookups: Cell::new(0),
    }
  }

  /// Merge bulk-listed actors; existing entries win.
  pub fn preload(&self, actors: impl IntoIterator<Item = Actor>) {
    let mut entries = self.entries.borrow_mut();
    for actor in actors {
      entries.entry(actor.id.clone()).or_insert(actor);
    }
  }

  pub fn resolve_actor(&self, id: &str) -> Result<Actor> {
    if let Some(hit) = self.entries.borrow().get(id) {
      return Ok(hit.clone());
    }

    let resolved = match self.directory {
      Some(dir) => {
        self.lookups.set(self.lookups.get() + 1);
        dir.lookup_actor(id)?
      }
      None => None,
    };

    let actor = resolved.unwrap_or_else(|| {
      log::debug!("actor {id} unresolved; using id as display name");
      Actor::new(id, id)
    });
    self.entries.borrow_mut().insert(id.to_string(), actor.clone());

    Ok(actor)
  }

  pub fn lookups(&self) -> usize {
    self.lookups.get()
  }

  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Dir {
    calls: Cell<usize>,
  }

  impl ActorDirectory for Dir {
    fn lookup_actor(&self, id: &str) -> Result<Option<Actor>> {
      self.calls.set(self.calls.get() + 1);
      Ok((id != "ghost").then(|| Actor::new(id, format!("user-{id}"))))
    }
  }

  #[test]
  fn lazy_lookup_is_memoized() {
    let dir = Dir { calls: Cell::new(0) };
    let cache = IdentityCache::new(Some(&dir));

    assert_eq!(cache.resolve_actor("7").unwrap().login, "user-7");
    assert_eq!(cache.resolve_actor("7").unwrap().login, "user-7");
    assert_eq!(cache.resolve_actor("ghost").unwrap().login, "ghost");
    assert_eq!(cache.resolve_actor("ghost").unwrap().login, "ghost");

    assert_eq!(dir.calls.get(), 2);
    assert_eq!(cache.lookups(), 2);
  }

  #[test]
  fn preload_avoids_lookups_and_never_overwrites() {
    let dir = Dir { calls: Cell::new(0) };
    let cache = IdentityCache::new(Some(&dir));

    let lazily = cache.resolve_actor("1").unwrap();
    cache.preload(vec![Actor::new("1", "stale"), Actor::new("2", "bob")]);

    assert_eq!(cache.resolve_actor("1").unwrap(), lazily);
    assert_eq!(cache.resolve_actor("2").unwrap().login, "bob");
    assert_eq!(dir.calls.get(), 1);
    assert_eq!(cache.len(), 2);
  }
}
