// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Platform-neutral item shapes that flow from adapters into the filter chain and aggregator
// role: model/types
// inputs: Adapter-built values (one variant per platform concept)
// outputs: RawItem tagged union, Actor, ProjectRef, Role and role-aware accessors
// invariants:
// - Items are immutable once built; adapters own all JSON translation
// - completed_at(role) is None exactly when the item has not reached the role's terminal state
// - trace() order is the ledger metadata order
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};

/// Ledger traceability pairs, emitted in this order.
pub type Trace = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Actor {
  /// Stable opaque id.
  pub id: String,
  /// Display name (login/username).
  pub login: String,
}

impl Actor {
  pub fn new(id: impl Into<String>, login: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      login: login.into(),
    }
  }
}

/// Repository, board, space or sheet pool an item belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRef {
  pub id: String,
  pub name: String,
  /// Full namespace path (`acme/sub/webapp`) where the platform has one.
  pub path: Option<String>,
  /// Owning group/org id where the platform reports it inline.
  pub parent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChangeRequest {
  pub id: String,
  pub title: String,
  pub project: ProjectRef,
  pub author: Actor,
  pub merged_by: Option<Actor>,
  /// Independent approval signal, only on platforms that separate it from merging.
  pub approved_by: Option<Actor>,
  pub reviewers: Vec<Actor>,
  pub labels: Vec<String>,
  pub created_at: Option<DateTime<Utc>>,
  pub merged_at: Option<DateTime<Utc>>,
  pub trace: Trace,
}

#[derive(Debug, Clone)]
pub struct Issue {
  pub id: String,
  pub title: String,
  pub project: ProjectRef,
  pub author: Actor,
  pub closed_by: Option<Actor>,
  pub assignee: Option<Actor>,
  pub labels: Vec<String>,
  pub closed_at: Option<DateTime<Utc>>,
  pub trace: Trace,
}

#[derive(Debug, Clone)]
pub struct Card {
  pub id: String,
  pub title: String,
  pub board: ProjectRef,
  pub members: Vec<Actor>,
  pub labels: Vec<String>,
  /// Cards are fetched from the done list; last activity is when they got there.
  pub done_at: Option<DateTime<Utc>>,
  pub trace: Trace,
}

#[derive(Debug, Clone)]
pub struct Message {
  pub id: String,
  pub text: String,
  pub space: ProjectRef,
  pub sender: Actor,
  pub created_at: Option<DateTime<Utc>>,
  pub trace: Trace,
}

#[derive(Debug, Clone)]
pub struct SheetRow {
  pub id: String,
  pub program: String,
  pub pool: ProjectRef,
  pub recipient: Actor,
  pub approved: bool,
  pub decided_at: Option<DateTime<Utc>>,
  pub points: Option<u32>,
  pub trace: Trace,
}

#[derive(Debug, Clone)]
pub enum RawItem {
  ChangeRequest(ChangeRequest),
  Issue(Issue),
  Card(Card),
  Message(Message),
  SheetRow(SheetRow),
}

/// Which actor(s) of an item a credit lane pays out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
  Author,
  Merger,
  Reviewer,
  Closer,
  Member,
  Poster,
  Recipient,
}

impl Role {
  /// Roles acting on someone else's item; these are subject to self-action exclusion.
  pub fn acts_on_others(self) -> bool {
    matches!(self, Role::Merger | Role::Reviewer | Role::Closer)
  }
}

impl RawItem {
  pub fn id(&self) -> &str {
    match self {
      RawItem::ChangeRequest(c) => &c.id,
      RawItem::Issue(i) => &i.id,
      RawItem::Card(c) => &c.id,
      RawItem::Message(m) => &m.id,
      RawItem::SheetRow(r) => &r.id,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      RawItem::ChangeRequest(c) => &c.title,
      RawItem::Issue(i) => &i.title,
      RawItem::Card(c) => &c.title,
      RawItem::Message(m) => &m.text,
      RawItem::SheetRow(r) => &r.program,
    }
  }

  pub fn project(&self) -> &ProjectRef {
    match self {
      RawItem::ChangeRequest(c) => &c.project,
      RawItem::Issue(i) => &i.project,
      RawItem::Card(c) => &c.board,
      RawItem::Message(m) => &m.space,
      RawItem::SheetRow(r) => &r.pool,
    }
  }

  /// Original author, when the platform records one.
  pub fn author(&self) -> Option<&Actor> {
    match self {
      RawItem::ChangeRequest(c) => Some(&c.author),
      RawItem::Issue(i) => Some(&i.author),
      RawItem::Message(m) => Some(&m.sender),
      RawItem::Card(_) | RawItem::SheetRow(_) => None,
    }
  }

  pub fn labels(&self) -> &[String] {
    match self {
      RawItem::ChangeRequest(c) => &c.labels,
      RawItem::Issue(i) => &i.labels,
      RawItem::Card(c) => &c.labels,
      RawItem::Message(_) | RawItem::SheetRow(_) => &[],
    }
  }

  pub fn trace(&self) -> &[(String, String)] {
    match self {
      RawItem::ChangeRequest(c) => &c.trace,
      RawItem::Issue(i) => &i.trace,
      RawItem::Card(c) => &c.trace,
      RawItem::Message(m) => &m.trace,
      RawItem::SheetRow(r) => &r.trace,
    }
  }

  /// Lifecycle timestamp for `role`; `None` when the item has not reached the
  /// role's terminal state or the role does not apply to this kind of item.
  pub fn completed_at(&self, role: Role) -> Option<DateTime<Utc>> {
    match (self, role) {
      (RawItem::ChangeRequest(c), Role::Author | Role::Merger | Role::Reviewer) => c.merged_at,
      (RawItem::Issue(i), Role::Author | Role::Closer) => i.closed_at,
      (RawItem::Card(c), Role::Member) => c.done_at,
      (RawItem::Message(m), Role::Poster) => m.created_at,
      (RawItem::SheetRow(r), Role::Recipient) if r.approved => r.decided_at,
      _ => None,
    }
  }

  /// Actors a lane with `role` would credit, before filtering.
  pub fn credited(&self, role: Role) -> Vec<Actor> {
    match (self, role) {
      (RawItem::ChangeRequest(c), Role::Author) => vec![c.author.clone()],
      (RawItem::ChangeRequest(c), Role::Merger) => c.merged_by.iter().cloned().collect(),
      (RawItem::ChangeRequest(c), Role::Reviewer) => c.reviewers.clone(),
      (RawItem::Issue(i), Role::Author) => vec![i.author.clone()],
      (RawItem::Issue(i), Role::Closer) => i.closed_by.as_ref().or(i.assignee.as_ref()).cloned().into_iter().collect(),
      (RawItem::Card(c), Role::Member) => c.members.clone(),
      (RawItem::Message(m), Role::Poster) => vec![m.sender.clone()],
      (RawItem::SheetRow(r), Role::Recipient) => vec![r.recipient.clone()],
      _ => Vec::new(),
    }
  }

  pub fn approved_by(&self) -> Option<&Actor> {
    match self {
      RawItem::ChangeRequest(c) => c.approved_by.as_ref(),
      _ => None,
    }
  }

  /// Point value carried as data rather than parsed from the title.
  pub fn explicit_points(&self) -> Option<u32> {
    match self {
      RawItem::SheetRow(r) => r.points,
      _ => None,
    }
  }

  pub fn is_change_request(&self) -> bool {
    matches!(self, RawItem::ChangeRequest(_))
  }

  pub fn is_issue(&self) -> bool {
    matches!(self, RawItem::Issue(_))
  }
}
