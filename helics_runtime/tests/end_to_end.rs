//! End-to-end scenarios spanning the handle registry, Core routing, the
//! filter engine, and federate lifecycle together rather than any one
//! module in isolation.

use helics_core::{GlobalFederateId, GlobalHandle, InterfaceHandle, Time};
use helics_coordinator::{CoordinatorVariant, FederateLifecycle};
use helics_message::{flags, ActionCode, ActionMessage, Flags};
use helics_runtime::fed_state::ProcessResult;
use helics_runtime::filter::{FilterFederate, FilterInfo, FilterKind};
use helics_runtime::handle::InterfaceKind;
use helics_runtime::{ActionBus, Core};

fn core() -> Core {
    Core::new(GlobalFederateId::new(GlobalFederateId::BROKER_ID_OFFSET), "core1", ActionBus::new())
}

/// A publisher and a subscriber linked by name deliver a published value to
/// every resolved target, independent of the order the two interfaces were
/// registered in.
#[test]
fn e1_published_value_is_delivered_to_its_linked_subscriber() {
    let mut c = core();
    let fed_a = c.register_federate("fedA", CoordinatorVariant::Distributed { restrictive_time_policy: false });
    let fed_b = c.register_federate("fedB", CoordinatorVariant::Distributed { restrictive_time_policy: false });

    let pub_handle = c.register_interface(fed_a, InterfaceKind::Publication, "pub1", "double", "", Flags::empty()).unwrap();
    let sub_handle = c.register_interface(fed_b, InterfaceKind::Input, "sub1", "double", "", Flags::empty()).unwrap();
    c.handles.add_target("pub1", "sub1", true);
    assert!(c.enter_initializing_mode().is_ok());

    let payload = 27.0_f64.to_be_bytes().to_vec();
    let out = c.publish(GlobalHandle::new(fed_a, pub_handle), payload.clone()).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].dest, GlobalHandle::new(fed_b, sub_handle));
    assert_eq!(out[0].payload, payload);
}

/// A federate that requests iteration during initializing mode stays in
/// `Created` until a grant without the iteration flag arrives, at which
/// point it proceeds into `Initializing` and is marked granted.
#[test]
fn e2_iteration_request_during_init_holds_until_a_plain_grant_arrives() {
    let mut c = core();
    let fed = c.register_federate("f", CoordinatorVariant::Distributed { restrictive_time_policy: false });
    let handle = c.register_interface(fed, InterfaceKind::Publication, "pub1", "double", "", Flags::empty()).unwrap();

    // The federate publishes its initial value before its init round closes.
    let published = c.publish(GlobalHandle::new(fed, handle), 27.0_f64.to_be_bytes().to_vec()).unwrap();
    assert!(published.is_empty(), "no subscriber linked yet, nothing to deliver");

    let mut iterate = ActionMessage::new(ActionCode::InitGrant);
    iterate.flags.set(flags::ITERATION_REQUESTED_FLAG);
    let (result, _) = c.federate_mut(fed).unwrap().state.process(&iterate);
    assert_eq!(result, ProcessResult::Iterating);
    assert_eq!(c.federate(fed).unwrap().state.lifecycle, FederateLifecycle::Created);

    let (result, _) = c.federate_mut(fed).unwrap().state.process(&ActionMessage::new(ActionCode::InitGrant));
    assert_eq!(result, ProcessResult::ContinueProcessing);
    assert_eq!(c.federate(fed).unwrap().state.lifecycle, FederateLifecycle::Initializing);
    assert!(c.federate(fed).unwrap().state.granted);
}

/// A source filter that adds a fixed 1.25s delay to a message sent at
/// 1.25s delivers it effectively at 2.5s, matching a one-period delay on
/// top of a filter-imposed offset.
#[test]
fn e3_source_filter_delay_shifts_the_messages_effective_time() {
    let mut ff = FilterFederate::new();
    let endpoint = InterfaceHandle::from(0usize);
    let filter_handle = InterfaceHandle::from(1usize);

    ff.register_filter(
        filter_handle,
        FilterInfo {
            core_id: GlobalFederateId::new(1),
            handle: filter_handle,
            key: "delay_1_25s".into(),
            in_type: String::new(),
            out_type: String::new(),
            op: FilterKind::NonCloning(Box::new(|mut m: ActionMessage| {
                m.action_time = m.action_time.saturating_add(Time::from_seconds(1.25));
                Some(m)
            })),
            source_targets: vec![],
            dest_targets: vec![],
            disconnected: false,
        },
    );
    ff.coordinator_for(endpoint).source_filters.push(filter_handle);

    let mut msg = ActionMessage::new(ActionCode::SendMessage);
    msg.action_time = Time::from_seconds(1.25);

    let outcome = ff.apply_source_filters(endpoint, msg);
    assert_eq!(outcome.delivered.len(), 1);
    assert_eq!(outcome.delivered[0].action_time, Time::from_seconds(2.5));
}

/// A `REGEX:` target on one endpoint expands to every currently registered
/// endpoint name, so a single publish reaches each matching target exactly
/// once, regardless of registration order.
#[test]
fn e6_regex_linked_endpoint_delivers_once_to_every_matching_target() {
    let mut c = core();
    let fed_pub = c.register_federate("broadcaster", CoordinatorVariant::Distributed { restrictive_time_policy: false });
    let fed_a = c.register_federate("subA", CoordinatorVariant::Distributed { restrictive_time_policy: false });
    let fed_b = c.register_federate("subB", CoordinatorVariant::Distributed { restrictive_time_policy: false });
    let fed_c = c.register_federate("subC", CoordinatorVariant::Distributed { restrictive_time_policy: false });

    let pub_handle = c.register_interface(fed_pub, InterfaceKind::Publication, "bcast", "double", "", Flags::empty()).unwrap();
    c.handles.add_target("bcast", "REGEX:sub.*", false);

    let sub_a = c.register_interface(fed_a, InterfaceKind::Input, "subA", "double", "", Flags::empty()).unwrap();
    let sub_b = c.register_interface(fed_b, InterfaceKind::Input, "subB", "double", "", Flags::empty()).unwrap();
    let sub_c = c.register_interface(fed_c, InterfaceKind::Input, "subC", "double", "", Flags::empty()).unwrap();

    let payload = 1.0_f64.to_be_bytes().to_vec();
    let mut out = c.publish(GlobalHandle::new(fed_pub, pub_handle), payload.clone()).unwrap();
    out.sort_by_key(|m| m.dest.handle);

    assert_eq!(out.len(), 3);
    let delivered_handles: Vec<InterfaceHandle> = out.iter().map(|m| m.dest.handle).collect();
    assert!(delivered_handles.contains(&sub_a));
    assert!(delivered_handles.contains(&sub_b));
    assert!(delivered_handles.contains(&sub_c));
    for m in &out {
        assert_eq!(m.payload, payload);
    }
}
