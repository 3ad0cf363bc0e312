// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Platform-agnostic driver: items x lanes -> filter chain -> aggregator
// role: orchestration/pipeline
// inputs: Adapted RawItems (server order), credit lanes, FilterContext, optional ProjectScope
// outputs: Aggregator mutated in place
// invariants:
// - Every lane's dimension is registered even when nothing qualifies
// - Items are folded in input order; roles are evaluated independently per lane
// errors: Membership lookup failures abort the run
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::rc::Rc;

use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::filter::{check, FilterContext, ProjectScope, Verdict};
use crate::item::{RawItem, Role};

/// One credit dimension: which items it looks at and whom it credits.
pub struct Lane {
  pub dimension: String,
  pub role: Role,
  pub select: Box<dyn Fn(&RawItem) -> bool>,
}

impl Lane {
  pub fn new(dimension: &str, role: Role, select: impl Fn(&RawItem) -> bool + 'static) -> Self {
    Self {
      dimension: dimension.to_string(),
      role,
      select: Box::new(select),
    }
  }

  /// Lane accepting every item.
  pub fn all(dimension: &str, role: Role) -> Self {
    Self::new(dimension, role, |_| true)
  }
}

pub fn run_lanes(
  items: Vec<RawItem>,
  lanes: &[Lane],
  ctx: &FilterContext,
  scope: Option<&dyn ProjectScope>,
  agg: &mut Aggregator,
) -> Result<()> {
  for lane in lanes {
    agg.ensure_dimension(&lane.dimension);
  }

  let mut folded = 0usize;
  let total = items.len();

  for item in items.into_iter().map(Rc::new) {
    for lane in lanes.iter().filter(|l| (l.select)(&item)) {
      for actor in item.credited(lane.role) {
        match check(&item, lane.role, &actor, ctx, scope)? {
          Verdict::Eligible => folded += agg.fold(&lane.dimension, &item, &actor),
          Verdict::Excluded(why) => {
            log::debug!("{}: {} for {} excluded ({why:?})", lane.dimension, item.id(), actor.login)
          }
        }
      }
    }
  }

  log::info!("{total} items fetched, {folded} credits folded");

  Ok(())
}
