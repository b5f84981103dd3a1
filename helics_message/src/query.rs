//! Query string parsing and the well-known query vocabulary.
//!
//! A query on the wire is a single string `target/query_name` (or bare
//! `query_name`, implicitly targeting the receiving node). This module only
//! parses the string and names the vocabulary; walking the tree to answer a
//! query lives with the registries that own the data, in `helics_runtime`.

/// The literal result returned for any query name this node does not
/// recognize.
pub const INVALID_QUERY_RESULT: &str = "#invalid";

/// Query names with fixed, documented meaning. A name outside this list is
/// still parsed and dispatched — federates can register custom queries —
/// but has no built-in answer.
pub const WELL_KNOWN_QUERIES: &[&str] = &[
    "exists",
    "version",
    "isinit",
    "state",
    "publications",
    "inputs",
    "endpoints",
    "filters",
    "translators",
    "interfaces",
    "dependencies",
    "dependents",
    "current_time",
    "current_state",
    "global_state",
    "global_time",
    "global_time_debugging",
    "timeconfig",
    "config",
    "data_flow_graph",
    "dependency_graph",
    "global_flush",
];

/// A parsed query string: which node it targets, and which question is
/// being asked of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub target: String,
    pub query_name: String,
}

impl Query {
    /// Parses `"target/query_name"`. A string with no `/` is treated as a
    /// bare query name targeting `"root"`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('/') {
            Some((target, query_name)) => Query {
                target: target.to_string(),
                query_name: query_name.to_string(),
            },
            None => Query {
                target: "root".to_string(),
                query_name: raw.to_string(),
            },
        }
    }

    pub fn is_well_known(&self) -> bool {
        WELL_KNOWN_QUERIES.contains(&self.query_name.as_str())
    }
}

/// A federation-control command sent via `sendCommand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederationCommand {
    Terminate,
    Echo,
    Notify,
    CommandStatus,
    Flush,
    Custom(String),
}

impl FederationCommand {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "terminate" => FederationCommand::Terminate,
            "echo" => FederationCommand::Echo,
            "notify" => FederationCommand::Notify,
            "command_status" => FederationCommand::CommandStatus,
            "flush" => FederationCommand::Flush,
            other => FederationCommand::Custom(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_targeted_query() {
        let q = Query::parse("fed1/current_time");
        assert_eq!(q.target, "fed1");
        assert_eq!(q.query_name, "current_time");
        assert!(q.is_well_known());
    }

    #[test]
    fn bare_query_targets_root() {
        let q = Query::parse("version");
        assert_eq!(q.target, "root");
        assert_eq!(q.query_name, "version");
    }

    #[test]
    fn unknown_query_is_not_well_known() {
        let q = Query::parse("fed1/made_up_query");
        assert!(!q.is_well_known());
    }

    #[test]
    fn federation_wide_terminate_parses() {
        assert_eq!(FederationCommand::parse("terminate"), FederationCommand::Terminate);
        assert_eq!(
            FederationCommand::parse("do_a_thing"),
            FederationCommand::Custom("do_a_thing".into())
        );
    }
}
