// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fold eligible (item, actor) credits into per-dimension, per-key aggregates
// role: aggregation/fold
// inputs: Dimension name, shared RawItem, credited Actor; GroupBy; max points
// outputs: Ordered dimensions of AggregateEntry (credits, count, points)
// invariants:
// - fold is idempotent per (dimension, item id, key, actor id); repeats are ignored
// - entry.count() == distinct items credited; entry.points == sum of those items' points
// - Dimensions keep registration order; entries iterate in key order
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::filter::UNLABELED;
use crate::item::{Actor, RawItem};
use crate::points::parse_points;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
  #[default]
  Actor,
  Label,
}

#[derive(Debug, Clone)]
pub struct Credit {
  pub item: Rc<RawItem>,
  pub actor: Actor,
  pub points: u32,
}

#[derive(Debug, Clone)]
pub struct AggregateEntry {
  /// Actor id or label.
  pub key: String,
  pub display: String,
  pub credits: Vec<Credit>,
  pub points: u64,
}

impl AggregateEntry {
  /// Distinct items; a label entry holds one credit per (item, actor).
  pub fn count(&self) -> usize {
    self.credits.iter().map(|c| c.item.id()).collect::<HashSet<_>>().len()
  }

  fn holds(&self, item_id: &str) -> bool {
    self.credits.iter().any(|c| c.item.id() == item_id)
  }
}

#[derive(Debug, Clone)]
pub struct Dimension {
  pub name: String,
  pub entries: BTreeMap<String, AggregateEntry>,
}

impl Dimension {
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[derive(Debug)]
pub struct Aggregator {
  group_by: GroupBy,
  max_points: u32,
  dimensions: Vec<Dimension>,
  seen: HashSet<(String, String, String, String)>,
}

impl Aggregator {
  pub fn new(group_by: GroupBy, max_points: u32) -> Self {
    Self {
      group_by,
      max_points,
      dimensions: Vec::new(),
      seen: HashSet::new(),
    }
  }

  /// Register a dimension so it appears (possibly empty) in reports.
  pub fn ensure_dimension(&mut self, name: &str) -> &mut Dimension {
    let idx = match self.dimensions.iter().position(|d| d.name == name) {
      Some(i) => i,
      None => {
        self.dimensions.push(Dimension {
          name: name.to_string(),
          entries: BTreeMap::new(),
        });
        self.dimensions.len() - 1
      }
    };
    &mut self.dimensions[idx]
  }

  /// Point value of an item: explicit value when the platform carries one,
  /// otherwise the title annotation clamped to the configured maximum.
  pub fn points_for(&self, item: &RawItem) -> u32 {
    item
      .explicit_points()
      .unwrap_or_else(|| parse_points(item.title(), self.max_points))
  }

  /// Credit `actor` for `item` in `dimension`. Returns how many entries grew.
  pub fn fold(&mut self, dimension: &str, item: &Rc<RawItem>, actor: &Actor) -> usize {
    let points = self.points_for(item);
    let keys: Vec<(String, String)> = match self.group_by {
      GroupBy::Actor => vec![(actor.id.clone(), actor.login.clone())],
      GroupBy::Label if item.labels().is_empty() => vec![(UNLABELED.to_string(), UNLABELED.to_string())],
      GroupBy::Label => item.labels().iter().map(|l| (l.clone(), l.clone())).collect(),
    };

    let mut grew = 0;
    for (key, display) in keys {
      let seen_key = (dimension.to_string(), item.id().to_string(), key.clone(), actor.id.clone());
      if !self.seen.insert(seen_key) {
        log::debug!("{dimension}: {} already credited to {key}", item.id());
        continue;
      }

      let entry = self
        .ensure_dimension(dimension)
        .entries
        .entry(key.clone())
        .or_insert_with(|| AggregateEntry {
          key,
          display,
          credits: Vec::new(),
          points: 0,
        });
      if !entry.holds(item.id()) {
        entry.points += u64::from(points);
      }
      entry.credits.push(Credit {
        item: Rc::clone(item),
        actor: actor.clone(),
        points,
      });
      grew += 1;
    }

    grew
  }

  pub fn dimensions(&self) -> &[Dimension] {
    &self.dimensions
  }

  pub fn is_empty(&self) -> bool {
    self.dimensions.iter().all(Dimension::is_empty)
  }

  pub fn group_by(&self) -> GroupBy {
    self.group_by
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::item::fixtures::*;
  use crate::item::ChangeRequest;

  #[test]
  fn fold_is_idempotent_per_dimension_item_actor() {
    let mut agg = Aggregator::new(GroupBy::Actor, 5);
    let item = Rc::new(merged("1", "Implement caching layer (7)", "alice", "bob", at(2024, 4, 1)));
    let bob = Actor::new("bob", "bob");

    assert_eq!(agg.fold("Merged PRs", &item, &bob), 1);
    assert_eq!(agg.fold("Merged PRs", &item, &bob), 0);
    assert_eq!(agg.fold("Reviewed PRs", &item, &bob), 1);

    let merged_dim = &agg.dimensions()[0];
    let entry = &merged_dim.entries["bob"];
    assert_eq!(entry.count(), 1);
    assert_eq!(entry.points, 5);
  }

  #[test]
  fn totals_track_credits() {
    let mut agg = Aggregator::new(GroupBy::Actor, 5);
    let alice = Actor::new("alice", "alice");
    for (id, title) in [("1", "Fix typo"), ("2", "Refactor (3)"), ("3", "Big (9)")] {
      let item = Rc::new(merged(id, title, "alice", "bob", at(2024, 4, 1)));
      agg.fold("Bugfix PRs", &item, &alice);
    }

    let entry = &agg.dimensions()[0].entries["alice"];
    assert_eq!(entry.count(), 3);
    assert_eq!(entry.points, 1 + 3 + 5);
    assert_eq!(entry.points, entry.credits.iter().map(|c| u64::from(c.points)).sum::<u64>());
  }

  #[test]
  fn label_grouping_uses_sentinel_for_unlabeled() {
    let mut agg = Aggregator::new(GroupBy::Label, 5);
    let alice = Actor::new("alice", "alice");
    let plain = Rc::new(merged("1", "a", "alice", "bob", at(2024, 4, 1)));
    let labelled = Rc::new(match merged("2", "b", "alice", "bob", at(2024, 4, 1)) {
      RawItem::ChangeRequest(c) => RawItem::ChangeRequest(ChangeRequest {
        labels: vec!["bug".into(), "ui".into()],
        ..c
      }),
      _ => unreachable!(),
    });

    agg.fold("Merged PRs", &plain, &alice);
    agg.fold("Merged PRs", &labelled, &alice);

    let keys: Vec<&str> = agg.dimensions()[0].entries.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Unlabeled", "bug", "ui"]);
  }

  #[test]
  fn label_grouping_keeps_every_member_but_counts_the_item_once() {
    let mut agg = Aggregator::new(GroupBy::Label, 5);
    let card = Rc::new(match merged("c1", "Write runbook (2)", "alice", "bob", at(2024, 4, 1)) {
      RawItem::ChangeRequest(c) => RawItem::ChangeRequest(ChangeRequest {
        labels: vec!["docs".into()],
        ..c
      }),
      _ => unreachable!(),
    });

    assert_eq!(agg.fold("Cards Closed", &card, &Actor::new("m1", "alice")), 1);
    assert_eq!(agg.fold("Cards Closed", &card, &Actor::new("m2", "bob")), 1);
    assert_eq!(agg.fold("Cards Closed", &card, &Actor::new("m2", "bob")), 0);

    let entry = &agg.dimensions()[0].entries["docs"];
    let logins: Vec<&str> = entry.credits.iter().map(|c| c.actor.login.as_str()).collect();
    assert_eq!(logins, vec!["alice", "bob"]);
    assert_eq!(entry.count(), 1);
    assert_eq!(entry.points, 2);
  }

  #[test]
  fn registered_dimensions_keep_order_and_may_stay_empty() {
    let mut agg = Aggregator::new(GroupBy::Actor, 5);
    agg.ensure_dimension("B");
    agg.ensure_dimension("A");
    agg.ensure_dimension("B");

    let names: Vec<&str> = agg.dimensions().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A"]);
    assert!(agg.is_empty());
  }
}
