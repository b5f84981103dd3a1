//! Answers the well-known query vocabulary (§4.8) against a [`Core`]'s
//! registries, and dispatches federation-control commands (§4.9).

use helics_message::query::{FederationCommand, Query, INVALID_QUERY_RESULT};

use crate::core::Core;
use crate::handle::InterfaceKind;

/// Answers `query` against `core`'s own registries. Targets naming
/// another node are the caller's responsibility to route there first;
/// this only ever answers for the node it's called on. A target naming a
/// locally-hosted federate (`query.target`) narrows federate-scoped
/// queries (`state`, `current_time`, `dependencies`, `dependents`) to that
/// federate; otherwise they answer for the first hosted federate, matching
/// a single-federate Core being queried by its own name or `"root"`.
pub fn answer(core: &Core, query: &Query) -> String {
    match query.query_name.as_str() {
        "exists" => serde_json::json!(true).to_string(),
        "version" => serde_json::json!(env!("CARGO_PKG_VERSION")).to_string(),
        "isinit" => serde_json::json!(true).to_string(),
        "publications" => names(core, InterfaceKind::Publication),
        "inputs" => names(core, InterfaceKind::Input),
        "endpoints" => names(core, InterfaceKind::Endpoint),
        "filters" => names(core, InterfaceKind::Filter),
        "translators" => names(core, InterfaceKind::Translator),
        "interfaces" => {
            let all: Vec<String> = core.handles.iter().map(|(_, info)| info.key.clone()).collect();
            serde_json::json!(all).to_string()
        }
        "state" | "current_state" => target_federate(core, query)
            .map(|(_, fed)| serde_json::json!(format!("{:?}", fed.state.lifecycle)).to_string())
            .unwrap_or_else(|| serde_json::json!(null).to_string()),
        "current_time" => target_federate(core, query)
            .map(|(_, fed)| serde_json::json!(fed.state.current_time.as_seconds()).to_string())
            .unwrap_or_else(|| serde_json::json!(null).to_string()),
        "dependencies" => target_federate(core, query)
            .map(|(_, fed)| dependency_list(fed.state.coordinator.base.dependencies.dependencies()))
            .unwrap_or_else(|| serde_json::json!([]).to_string()),
        "dependents" => target_federate(core, query)
            .map(|(_, fed)| dependency_list(fed.state.coordinator.base.dependencies.dependents()))
            .unwrap_or_else(|| serde_json::json!([]).to_string()),
        _ if query.is_well_known() => serde_json::json!(null).to_string(),
        _ => INVALID_QUERY_RESULT.to_string(),
    }
}

/// Resolves `query.target` to a hosted federate: by registered name if one
/// matches, otherwise the first federate the Core hosts (a bare `"root"`
/// target, or a target naming the Core itself).
fn target_federate<'a>(core: &'a Core, query: &Query) -> Option<(helics_core::GlobalFederateId, &'a crate::core::LocalFederate)> {
    core.federate_named(&query.target)
        .or_else(|| core.federate_ids().next().map(|id| (id, core.federate(id).expect("id came from federate_ids"))))
}

fn dependency_list<'a>(deps: impl Iterator<Item = &'a helics_coordinator::DependencyInfo>) -> String {
    let ids: Vec<i32> = deps.map(|d| d.fed_id.raw()).collect();
    serde_json::json!(ids).to_string()
}

fn names(core: &Core, kind: InterfaceKind) -> String {
    let names: Vec<&str> = core
        .handles
        .iter()
        .filter(|(_, info)| info.kind == kind && !info.key.is_empty())
        .map(|(_, info)| info.key.as_str())
        .collect();
    serde_json::json!(names).to_string()
}

/// Executes a federation-control command, honoring a broker/core-level
/// `disable_remote_control` flag that rejects every command but `echo`
/// and `command_status`.
pub fn dispatch_command(command: &FederationCommand, remote_control_disabled: bool) -> Result<String, String> {
    if remote_control_disabled && !matches!(command, FederationCommand::Echo | FederationCommand::CommandStatus) {
        return Err("remote control disabled".to_string());
    }
    match command {
        FederationCommand::Terminate => Ok("terminating".to_string()),
        FederationCommand::Echo => Ok("echo".to_string()),
        FederationCommand::Notify => Ok("notified".to_string()),
        FederationCommand::CommandStatus => Ok("idle".to_string()),
        FederationCommand::Flush => Ok("flushed".to_string()),
        FederationCommand::Custom(name) => Ok(format!("unrecognized command {name:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ActionBus;
    use helics_core::GlobalFederateId;

    #[test]
    fn unknown_query_returns_the_invalid_sentinel() {
        let core = Core::new(GlobalFederateId::new(1), "c", ActionBus::new());
        assert_eq!(answer(&core, &Query::parse("made_up_query")), INVALID_QUERY_RESULT);
    }

    #[test]
    fn publications_query_lists_registered_names() {
        let mut core = Core::new(GlobalFederateId::new(1), "c", ActionBus::new());
        let fed = core.register_federate("f", helics_coordinator::CoordinatorVariant::Distributed { restrictive_time_policy: false });
        core.register_interface(fed, InterfaceKind::Publication, "p1", "double", "", helics_message::Flags::empty()).unwrap();
        let result = answer(&core, &Query::parse("publications"));
        assert!(result.contains("p1"));
    }

    #[test]
    fn state_query_reports_the_federate_lifecycle() {
        let mut core = Core::new(GlobalFederateId::new(1), "c", ActionBus::new());
        let fed = core.register_federate("f", helics_coordinator::CoordinatorVariant::Distributed { restrictive_time_policy: false });
        core.federate_mut(fed).unwrap().state.lifecycle = helics_coordinator::FederateLifecycle::Executing;
        let result = answer(&core, &Query::parse("f/state"));
        assert_eq!(result, "\"Executing\"");
    }

    #[test]
    fn current_time_query_reports_the_granted_time() {
        let mut core = Core::new(GlobalFederateId::new(1), "c", ActionBus::new());
        let fed = core.register_federate("f", helics_coordinator::CoordinatorVariant::Distributed { restrictive_time_policy: false });
        core.federate_mut(fed).unwrap().state.current_time = helics_core::Time::from_seconds(2.5);
        let result = answer(&core, &Query::parse("f/current_time"));
        assert_eq!(result, "2.5");
    }

    #[test]
    fn dependencies_query_lists_dependency_ids() {
        let mut core = Core::new(GlobalFederateId::new(1), "c", ActionBus::new());
        let fed = core.register_federate("f", helics_coordinator::CoordinatorVariant::Distributed { restrictive_time_policy: false });
        core.federate_mut(fed).unwrap().state.coordinator.base.add_dependency(GlobalFederateId::new(7));
        let result = answer(&core, &Query::parse("f/dependencies"));
        assert_eq!(result, "[7]");
    }

    #[test]
    fn disabled_remote_control_rejects_terminate_but_allows_echo() {
        assert!(dispatch_command(&FederationCommand::Terminate, true).is_err());
        assert!(dispatch_command(&FederationCommand::Echo, true).is_ok());
    }
}
