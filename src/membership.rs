// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Decide whether an item's project belongs to the configured group and passes the name rules
// role: resolver/membership
// inputs: ProjectDirectory (platform lookups), group name, ProjectMatcher (include + optional exclude)
// outputs: Group snapshot; is_member decisions
// side_effects: Remote lookups through the directory; memoized per project id for the run
// invariants:
// - Each distinct project id triggers at most one remote lookup per run
// - Reachable = listed by the group, parent id == group id, or path under group path
// - Membership = reachable AND include matches AND exclude (if any) does not match
// errors: GroupNotFound when the group name cannot be resolved; lookup errors propagate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, StatsError};
use crate::item::ProjectRef;

static RE_ANY: Lazy<Regex> = Lazy::new(|| Regex::new("^(?:.+)").unwrap());

/// Name include/exclude rules. Patterns anchor at the start of the name and
/// may match a prefix, so `acme` also accepts `acme-tools`.
#[derive(Debug, Clone)]
pub struct ProjectMatcher {
  include: Regex,
  exclude: Option<Regex>,
}

impl ProjectMatcher {
  pub fn new(include: &str, exclude: Option<&str>) -> Result<Self> {
    let compile = |flag: &str, pat: &str| {
      Regex::new(&format!("^(?:{pat})"))
        .map_err(|e| StatsError::config(format!("invalid {flag} pattern '{pat}': {e}")))
    };

    Ok(Self {
      include: compile("--repo-matcher", include)?,
      exclude: exclude.map(|p| compile("--repo-excluder", p)).transpose()?,
    })
  }

  /// Accept every non-empty name.
  pub fn any() -> Self {
    Self {
      include: RE_ANY.clone(),
      exclude: None,
    }
  }

  pub fn accepts(&self, name: &str) -> bool {
    self.include.is_match(name) && !self.exclude.as_ref().is_some_and(|x| x.is_match(name))
  }
}

/// Resolved group (organization, namespace group, workspace).
#[derive(Debug, Clone)]
pub struct Group {
  pub id: String,
  pub name: String,
  pub full_path: String,
  /// Eagerly listed member projects keyed by id; empty under lazy resolution.
  pub projects: BTreeMap<String, ProjectRef>,
}

impl Group {
  /// Directly listed, owned by the group, or nested under its namespace path.
  pub fn reaches(&self, project: &ProjectRef) -> bool {
    if self.projects.contains_key(&project.id) {
      return true;
    }

    if project.parent.as_deref() == Some(self.id.as_str()) {
      return true;
    }

    match &project.path {
      Some(path) if !self.full_path.is_empty() => path.starts_with(&format!("{}/", self.full_path)),
      _ => false,
    }
  }
}

/// Platform lookups the resolver needs.
pub trait ProjectDirectory {
  /// `None` when the platform reports the group as absent.
  fn find_group(&self, name: &str) -> Result<Option<Group>>;

  /// Bulk listing of member projects; `None` when the platform has no such listing.
  fn group_projects(&self, group: &Group) -> Result<Option<Vec<ProjectRef>>>;

  /// Single project by id, for lazy resolution.
  fn project(&self, id: &str) -> Result<Option<ProjectRef>>;
}

pub struct MembershipResolver<'a> {
  directory: &'a dyn ProjectDirectory,
  group: Group,
  matcher: ProjectMatcher,
  lookups: RefCell<HashMap<String, Option<ProjectRef>>>,
  remote_calls: Cell<usize>,
}

/// Resolve the group and, where the platform allows it, list its projects eagerly.
pub fn resolve_group(directory: &dyn ProjectDirectory, name: &str) -> Result<Group> {
  let Some(mut group) = directory.find_group(name)? else {
    return Err(StatsError::GroupNotFound(name.to_string()));
  };

  if let Some(projects) = directory.group_projects(&group)? {
    log::info!("group '{}' lists {} projects", group.name, projects.len());
    group.projects = projects.into_iter().map(|p| (p.id.clone(), p)).collect();
  }

  Ok(group)
}

impl<'a> MembershipResolver<'a> {
  pub fn new(directory: &'a dyn ProjectDirectory, group: Group, matcher: ProjectMatcher) -> Self {
    Self {
      directory,
      group,
      matcher,
      lookups: RefCell::new(HashMap::new()),
      remote_calls: Cell::new(0),
    }
  }

  pub fn group(&self) -> &Group {
    &self.group
  }

  /// Number of single-project lookups issued so far.
  pub fn remote_calls(&self) -> usize {
    self.remote_calls.get()
  }

  /// Complete `project` from the group listing or a memoized remote lookup.
  pub fn lookup(&self, project: &ProjectRef) -> Result<Option<ProjectRef>> {
    if let Some(listed) = self.group.projects.get(&project.id) {
      return Ok(Some(listed.clone()));
    }

    if !self.group.projects.is_empty() || project.parent.is_some() || project.path.is_some() {
      return Ok(Some(project.clone()));
    }

    if let Some(hit) = self.lookups.borrow().get(&project.id) {
      return Ok(hit.clone());
    }

    self.remote_calls.set(self.remote_calls.get() + 1);
    let fetched = self.directory.project(&project.id)?;
    log::debug!("resolved project {} => {:?}", project.id, fetched.as_ref().map(|p| &p.name));
    self.lookups.borrow_mut().insert(project.id.clone(), fetched.clone());

    Ok(fetched)
  }

  pub fn is_member(&self, project: &ProjectRef) -> Result<bool> {
    let Some(resolved) = self.lookup(project)? else {
      return Ok(false);
    };

    Ok(self.group.reaches(&resolved) && self.matcher.accepts(&resolved.name))
  }
}

#[cfg(test)]
pub(crate) mod fake {
  use super::*;

  /// In-memory directory counting lookups.
  #[derive(Default)]
  pub struct FakeDirectory {
    pub group: Option<Group>,
    pub listing: Option<Vec<ProjectRef>>,
    pub singles: HashMap<String, ProjectRef>,
    pub single_calls: Cell<usize>,
  }

  impl ProjectDirectory for FakeDirectory {
    fn find_group(&self, _name: &str) -> Result<Option<Group>> {
      Ok(self.group.clone())
    }

    fn group_projects(&self, _group: &Group) -> Result<Option<Vec<ProjectRef>>> {
      Ok(self.listing.clone())
    }

    fn project(&self, id: &str) -> Result<Option<ProjectRef>> {
      self.single_calls.set(self.single_calls.get() + 1);
      Ok(self.singles.get(id).cloned())
    }
  }

  pub fn acme() -> Group {
    Group {
      id: "10".into(),
      name: "acme".into(),
      full_path: "acme".into(),
      projects: BTreeMap::new(),
    }
  }
}
