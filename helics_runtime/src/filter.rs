//! The Core's internal "filter federate" (§4.6): executes filters attached
//! to endpoints in-flight, and tracks the `TIME_BLOCK`/`TIME_UNBLOCK`
//! obligations a filter-with-return imposes on its federate's grant.
//!
//! A filter's operator is modeled as `dyn Fn(ActionMessage) ->
//! Option<ActionMessage>` for a non-cloning filter (drop on `None`) and
//! `dyn Fn(ActionMessage) -> Vec<ActionMessage>` for a cloning one, per
//! Design Notes' "dynamic typing on values" / operator-as-closure pattern
//! and the airlock idiom used to hand such closures from a registering
//! thread to the owning worker thread.

use std::collections::HashMap;

use helics_core::{GlobalFederateId, InterfaceHandle};
use helics_message::{ActionCode, ActionMessage};

/// A non-cloning filter transforms or drops a message in place.
pub type FilterOp = dyn Fn(ActionMessage) -> Option<ActionMessage> + Send + Sync;
/// A cloning filter produces zero or more independently-delivered copies,
/// never replacing the original.
pub type CloningFilterOp = dyn Fn(&ActionMessage) -> Vec<ActionMessage> + Send + Sync;

pub enum FilterKind {
    NonCloning(Box<FilterOp>),
    Cloning(Box<CloningFilterOp>),
}

/// One registered filter: its identity, the in/out type it advertises for
/// greedy type-chaining, and its operator.
pub struct FilterInfo {
    pub core_id: GlobalFederateId,
    pub handle: InterfaceHandle,
    pub key: String,
    pub in_type: String,
    pub out_type: String,
    pub op: FilterKind,
    pub source_targets: Vec<String>,
    pub dest_targets: Vec<String>,
    pub disconnected: bool,
}

impl FilterInfo {
    pub fn is_cloning(&self) -> bool {
        matches!(self.op, FilterKind::Cloning(_))
    }
}

/// Per-filtered-endpoint ordering: cloning filters run first (each
/// producing independent copies), then non-cloning filters in greedy
/// type-chained order, and at most one non-cloning destination filter.
#[derive(Default)]
pub struct FilterCoordinator {
    /// Ordered: cloning filters first, then type-chained non-cloning ones.
    pub source_filters: Vec<InterfaceHandle>,
    pub dest_filter: Option<InterfaceHandle>,
    pub cloning_dest_filters: Vec<InterfaceHandle>,
}

impl FilterCoordinator {
    /// Orders `filters` as §4.6 requires: every cloning filter first (in
    /// registration order, since each is independent), then non-cloning
    /// filters chained so each stage's `out_type` matches the next stage's
    /// `in_type` (greedy; a filter with no matching successor is left
    /// where greedy selection places it and the caller should warn).
    pub fn order_source_filters(filters: &[(InterfaceHandle, &FilterInfo)]) -> Vec<InterfaceHandle> {
        let (cloning, non_cloning): (Vec<_>, Vec<_>) =
            filters.iter().partition(|(_, f)| f.is_cloning());

        let mut ordered: Vec<InterfaceHandle> = cloning.iter().map(|(h, _)| *h).collect();

        let mut remaining = non_cloning;
        let mut out_type = String::new();
        while !remaining.is_empty() {
            let next_idx = remaining
                .iter()
                .position(|(_, f)| f.in_type == out_type)
                .unwrap_or(0);
            let (handle, info) = *remaining.remove(next_idx);
            out_type = info.out_type.clone();
            ordered.push(handle);
        }
        ordered
    }
}

/// The Core's filter-processing engine: owns every [`FilterInfo`] and
/// [`FilterCoordinator`] registered on this Core, and the in-flight
/// filter-with-return bookkeeping that drives `TIME_BLOCK`/`TIME_UNBLOCK`.
#[derive(Default)]
pub struct FilterFederate {
    filters: HashMap<InterfaceHandle, FilterInfo>,
    coordinators: HashMap<InterfaceHandle, FilterCoordinator>,
    /// Federate -> outstanding `sequence_id`s awaiting a filter return.
    ongoing: HashMap<GlobalFederateId, Vec<i32>>,
    next_sequence_id: i32,
}

impl FilterFederate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_filter(&mut self, handle: InterfaceHandle, info: FilterInfo) {
        self.filters.insert(handle, info);
    }

    pub fn coordinator_for(&mut self, endpoint: InterfaceHandle) -> &mut FilterCoordinator {
        self.coordinators.entry(endpoint).or_default()
    }

    /// Applies every source filter on `endpoint`, in `FilterCoordinator`
    /// order, to an outbound `SEND_MESSAGE`. Cloning filters append their
    /// outputs without consuming the in-flight message; a non-cloning
    /// filter that returns `None` drops it; a non-cloning filter
    /// requesting a return allocates a `sequence_id`, remembers it against
    /// the sending federate, and the caller is told to emit a `TIME_BLOCK`.
    pub fn apply_source_filters(&mut self, endpoint: InterfaceHandle, msg: ActionMessage) -> FilterOutcome {
        let Some(coord) = self.coordinators.get(&endpoint) else {
            return FilterOutcome { delivered: vec![msg], blocked_sequence: None };
        };

        let mut delivered = Vec::new();
        let mut current = Some(msg.clone());

        for &filter_handle in &coord.source_filters {
            let Some(info) = self.filters.get(&filter_handle) else { continue };
            if info.disconnected {
                continue;
            }
            match &info.op {
                FilterKind::Cloning(op) => {
                    // Cloning filters never consume `current`; each clone is
                    // delivered independently alongside the original chain.
                    if let Some(ref m) = current {
                        delivered.extend(op(m));
                    }
                }
                FilterKind::NonCloning(op) => {
                    current = current.and_then(op);
                    if current.is_none() {
                        break;
                    }
                }
            }
        }

        let mut blocked_sequence = None;
        if let Some(final_msg) = current {
            if final_msg.action == ActionCode::SendForFilterAndReturn {
                let seq = self.next_sequence_id;
                self.next_sequence_id += 1;
                self.ongoing.entry(msg.source.fed_id).or_default().push(seq);
                blocked_sequence = Some(seq);
            }
            delivered.push(final_msg);
        }

        FilterOutcome { delivered, blocked_sequence }
    }

    /// Destination-side filtering: runs on receive. A non-cloning
    /// destination filter that alters `dest` reroutes the message (the
    /// caller must re-send rather than deliver locally).
    pub fn apply_dest_filter(&self, endpoint: InterfaceHandle, msg: ActionMessage) -> DestFilterOutcome {
        let Some(coord) = self.coordinators.get(&endpoint) else {
            return DestFilterOutcome::Deliver(msg);
        };
        let mut out = Vec::new();
        for &handle in &coord.cloning_dest_filters {
            if let Some(FilterInfo { op: FilterKind::Cloning(op), .. }) = self.filters.get(&handle) {
                out.extend(op(&msg));
            }
        }
        if let Some(handle) = coord.dest_filter {
            if let Some(info) = self.filters.get(&handle) {
                if let FilterKind::NonCloning(op) = &info.op {
                    let original_dest = msg.dest;
                    return match op(msg) {
                        Some(transformed) if transformed.dest != original_dest => {
                            DestFilterOutcome::Reroute(transformed)
                        }
                        Some(transformed) => DestFilterOutcome::Deliver(transformed),
                        None => DestFilterOutcome::Dropped,
                    };
                }
            }
        }
        if out.is_empty() {
            DestFilterOutcome::Deliver(msg)
        } else {
            out.push(msg);
            DestFilterOutcome::Cloned(out)
        }
    }

    /// Records a filter return for `fed`'s `sequence_id`, clearing it from
    /// the outstanding set. Once the set empties, the caller should emit
    /// `TIME_UNBLOCK` carrying `sequence_id`.
    pub fn resolve_filter_return(&mut self, fed: GlobalFederateId, sequence_id: i32) -> bool {
        if let Some(pending) = self.ongoing.get_mut(&fed) {
            pending.retain(|&s| s != sequence_id);
            if pending.is_empty() {
                self.ongoing.remove(&fed);
                return true;
            }
        }
        false
    }

    /// True while any filter-with-return is outstanding for `fed`: its
    /// grant may not advance beyond the earliest outstanding return.
    pub fn is_blocked(&self, fed: GlobalFederateId) -> bool {
        self.ongoing.get(&fed).is_some_and(|v| !v.is_empty())
    }
}

pub struct FilterOutcome {
    pub delivered: Vec<ActionMessage>,
    pub blocked_sequence: Option<i32>,
}

pub enum DestFilterOutcome {
    Deliver(ActionMessage),
    Reroute(ActionMessage),
    Cloned(Vec<ActionMessage>),
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::Time;

    fn make_filter(in_type: &str, out_type: &str, cloning: bool) -> FilterInfo {
        FilterInfo {
            core_id: GlobalFederateId::new(1),
            handle: InterfaceHandle::from(0usize),
            key: "f".into(),
            in_type: in_type.into(),
            out_type: out_type.into(),
            op: if cloning {
                FilterKind::Cloning(Box::new(|m: &ActionMessage| vec![m.clone()]))
            } else {
                FilterKind::NonCloning(Box::new(Some))
            },
            source_targets: vec![],
            dest_targets: vec![],
            disconnected: false,
        }
    }

    #[test]
    fn non_cloning_filter_dropping_a_message_yields_no_delivery() {
        let mut ff = FilterFederate::new();
        let endpoint = InterfaceHandle::from(0usize);
        let filter_handle = InterfaceHandle::from(1usize);
        ff.register_filter(filter_handle, FilterInfo {
            op: FilterKind::NonCloning(Box::new(|_| None)),
            ..make_filter("", "", false)
        });
        ff.coordinator_for(endpoint).source_filters.push(filter_handle);

        let mut msg = ActionMessage::new(ActionCode::SendMessage);
        msg.action_time = Time::ZERO;
        let outcome = ff.apply_source_filters(endpoint, msg);
        assert!(outcome.delivered.is_empty());
    }

    #[test]
    fn cloning_filter_preserves_original_and_adds_clone() {
        let mut ff = FilterFederate::new();
        let endpoint = InterfaceHandle::from(0usize);
        let filter_handle = InterfaceHandle::from(1usize);
        ff.register_filter(filter_handle, make_filter("a", "a", true));
        ff.coordinator_for(endpoint).source_filters.push(filter_handle);

        let msg = ActionMessage::new(ActionCode::SendMessage);
        let outcome = ff.apply_source_filters(endpoint, msg);
        assert_eq!(outcome.delivered.len(), 2);
    }

    #[test]
    fn filter_with_return_blocks_until_resolved() {
        let mut ff = FilterFederate::new();
        let endpoint = InterfaceHandle::from(0usize);
        let filter_handle = InterfaceHandle::from(1usize);
        ff.register_filter(filter_handle, FilterInfo {
            op: FilterKind::NonCloning(Box::new(|mut m| {
                m.action = ActionCode::SendForFilterAndReturn;
                Some(m)
            })),
            ..make_filter("", "", false)
        });
        ff.coordinator_for(endpoint).source_filters.push(filter_handle);

        let mut msg = ActionMessage::new(ActionCode::SendMessage);
        msg.source.fed_id = GlobalFederateId::new(5);
        let outcome = ff.apply_source_filters(endpoint, msg);
        let seq = outcome.blocked_sequence.unwrap();
        assert!(ff.is_blocked(GlobalFederateId::new(5)));
        assert!(ff.resolve_filter_return(GlobalFederateId::new(5), seq));
        assert!(!ff.is_blocked(GlobalFederateId::new(5)));
    }
}
