// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Ordered eligibility predicates deciding whether an (item, role, actor) earns credit
// role: filter/eligibility
// inputs: RawItem, credited Actor, Role, FilterContext, optional ProjectScope
// outputs: Verdict (Eligible or the first failing Exclusion)
// invariants:
// - Fixed order: lifecycle -> window -> membership -> actor filter -> self-action -> labels
// - Self-action applies to merger/reviewer/closer roles regardless of any actor filter
// - The approval override is opt-in per platform, lifts merger exclusion only, and needs an approver other than the actor
// - Items without labels are judged as carrying the single label "Unlabeled"
// errors: Only membership lookups can fail (propagated)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::item::{Actor, ProjectRef, RawItem, Role};
use crate::membership::MembershipResolver;

pub const UNLABELED: &str = "Unlabeled";

/// Allow/deny label sets parsed from `bug,docs,wip-` (trailing `-` denies).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRules {
  pub allow: BTreeSet<String>,
  pub deny: BTreeSet<String>,
}

impl LabelRules {
  pub fn parse(spec: &str) -> Self {
    let mut rules = LabelRules::default();

    for raw in spec.split(',') {
      let entry = raw.trim();
      if entry.is_empty() {
        continue;
      }
      match entry.strip_suffix('-') {
        Some(denied) if !denied.is_empty() => {
          rules.deny.insert(denied.to_string());
        }
        _ => {
          rules.allow.insert(entry.to_string());
        }
      }
    }

    rules
  }

  pub fn is_empty(&self) -> bool {
    self.allow.is_empty() && self.deny.is_empty()
  }

  pub fn admits(&self, labels: &[String]) -> bool {
    let sentinel = [UNLABELED.to_string()];
    let labels = if labels.is_empty() { &sentinel[..] } else { labels };

    if !self.allow.is_empty() && !labels.iter().any(|l| self.allow.contains(l)) {
      return false;
    }

    !labels.iter().any(|l| self.deny.contains(l))
  }
}

/// Immutable run-wide filter configuration.
#[derive(Debug, Clone)]
pub struct FilterContext {
  /// Inclusive lower bound; "now" is the implicit upper bound.
  pub since: DateTime<Utc>,
  /// Login or id of the only actor to credit.
  pub only_actor: Option<String>,
  pub labels: LabelRules,
  /// Whether the platform's approval signal can lift self-action exclusion.
  pub approval_override: bool,
}

impl FilterContext {
  pub fn new(since: DateTime<Utc>) -> Self {
    Self {
      since,
      only_actor: None,
      labels: LabelRules::default(),
      approval_override: false,
    }
  }
}

/// Membership test used by the chain; implemented by the resolver.
pub trait ProjectScope {
  fn contains(&self, project: &ProjectRef) -> Result<bool>;
}

impl ProjectScope for MembershipResolver<'_> {
  fn contains(&self, project: &ProjectRef) -> Result<bool> {
    self.is_member(project)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
  Incomplete,
  BeforeWindow,
  OutsideGroup,
  ActorFiltered,
  SelfAction,
  LabelFiltered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Eligible,
  Excluded(Exclusion),
}

fn same_actor(a: &Actor, b: &Actor) -> bool {
  a.id == b.id
}

/// Run the chain for one credited actor; the first failing predicate wins.
pub fn check(
  item: &RawItem,
  role: Role,
  actor: &Actor,
  ctx: &FilterContext,
  scope: Option<&dyn ProjectScope>,
) -> Result<Verdict> {
  use Exclusion::*;

  let Some(done_at) = item.completed_at(role) else {
    return Ok(Verdict::Excluded(Incomplete));
  };

  if done_at < ctx.since {
    return Ok(Verdict::Excluded(BeforeWindow));
  }

  if let Some(scope) = scope {
    if !scope.contains(item.project())? {
      return Ok(Verdict::Excluded(OutsideGroup));
    }
  }

  if let Some(only) = &ctx.only_actor {
    if actor.login != *only && actor.id != *only {
      return Ok(Verdict::Excluded(ActorFiltered));
    }
  }

  if role.acts_on_others() {
    if let Some(author) = item.author().filter(|a| same_actor(a, actor)) {
      let approved_elsewhere = role == Role::Merger
        && ctx.approval_override
        && item.approved_by().is_some_and(|ap| !same_actor(ap, author));

      if !approved_elsewhere {
        log::info!("{} {:?} excluded: {} acted on own item", item.id(), role, actor.login);
        return Ok(Verdict::Excluded(SelfAction));
      }
    }
  }

  if !ctx.labels.admits(item.labels()) {
    return Ok(Verdict::Excluded(LabelFiltered));
  }

  Ok(Verdict::Eligible)
}

pub fn is_eligible(
  item: &RawItem,
  role: Role,
  actor: &Actor,
  ctx: &FilterContext,
  scope: Option<&dyn ProjectScope>,
) -> Result<bool> {
  Ok(check(item, role, actor, ctx, scope)? == Verdict::Eligible)
}
