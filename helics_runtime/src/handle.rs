//! The Core-level handle registry: one [`HandleInfo`] per published,
//! subscribed, endpoint, filter, or translator interface, plus alias and
//! target-name resolution.
//!
//! Registration order must not affect final connectivity, so every
//! `add_target` is remembered as a pending link keyed by
//! `(source_name, target_name)` rather than resolved eagerly; it is
//! satisfied the moment either name is registered.

use std::collections::{HashMap, HashSet};

use helics_core::{GlobalHandle, HelicsError, InterfaceHandle, Result};
use helics_message::Flags;
use helics_tinymap::{Key, TinyMap};

/// The kind of interface a [`HandleInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    Publication,
    Input,
    Endpoint,
    Filter,
    Translator,
}

/// One registered interface: a publication, input, endpoint, filter, or
/// translator. Created once, at registration, before `enterInitializing`;
/// never re-keyed. On owner finalize it is marked `disconnected`, not
/// removed, unless the owner is `reentrant`.
#[derive(Debug, Clone)]
pub struct HandleInfo {
    pub owner: GlobalHandle,
    pub kind: InterfaceKind,
    pub key: String,
    pub type_: String,
    pub units: String,
    pub flags: Flags,
    pub targets: Vec<String>,
    pub disconnected: bool,
}

impl HandleInfo {
    fn new(owner: GlobalHandle, kind: InterfaceKind, key: String, type_: String, units: String, flags: Flags) -> Self {
        HandleInfo {
            owner,
            kind,
            key,
            type_,
            units,
            flags,
            targets: Vec::new(),
            disconnected: false,
        }
    }
}

/// A target link named before both of its endpoints existed. Satisfied the
/// moment the missing name is registered; unresolved required links fail
/// `enterInitializing` with [`HelicsError::ConnectionFailure`].
#[derive(Debug, Clone)]
struct PendingLink {
    source: String,
    target: String,
    required: bool,
}

/// The Core-level mapping from [`InterfaceHandle`] to [`HandleInfo`], and
/// from interface key to handle, including transitive alias resolution and
/// deferred (order-independent) target linking.
#[derive(Debug, Default)]
pub struct HandleManager {
    handles: TinyMap<InterfaceHandle, HandleInfo>,
    by_key: HashMap<String, InterfaceHandle>,
    /// key -> key, resolved transitively by [`HandleManager::resolve`].
    aliases: HashMap<String, String>,
    pending: Vec<PendingLink>,
}

impl HandleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        owner: GlobalHandle,
        kind: InterfaceKind,
        key: impl Into<String>,
        type_: impl Into<String>,
        units: impl Into<String>,
        flags: Flags,
    ) -> Result<InterfaceHandle> {
        let key = key.into();
        if !key.is_empty() && self.by_key.contains_key(&key) {
            return Err(HelicsError::RegistrationFailure(format!("duplicate interface name {key:?}")));
        }
        let handle = self.handles.insert(HandleInfo::new(owner, kind, key.clone(), type_.into(), units.into(), flags));
        if !key.is_empty() {
            self.by_key.insert(key.clone(), handle);
            self.resolve_pending_for(&key);
        }
        Ok(handle)
    }

    pub fn get(&self, handle: InterfaceHandle) -> Option<&HandleInfo> {
        (handle.index() < self.handles.len()).then(|| &self.handles[handle])
    }

    pub fn get_mut(&mut self, handle: InterfaceHandle) -> Option<&mut HandleInfo> {
        (handle.index() < self.handles.len()).then(move || &mut self.handles[handle])
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceHandle, &HandleInfo)> {
        self.handles.iter()
    }

    /// Looks up a handle by its registered name, following aliases
    /// transitively.
    pub fn lookup(&self, name: &str) -> Option<InterfaceHandle> {
        self.by_key.get(&self.resolve_alias(name)).copied()
    }

    /// Marks every handle owned by `owner` disconnected. Idempotent;
    /// disconnected handles remain in the registry, marked rather than
    /// removed, so late queries still see them.
    pub fn disconnect_owner(&mut self, owner: GlobalHandle) {
        for info in self.handles.values_mut() {
            if info.owner == owner {
                info.disconnected = true;
            }
        }
    }

    /// Registers `from -> to` as an alias. Cycles (`a -> b -> ... -> a`) are
    /// rejected rather than silently looping forever at resolution time.
    pub fn add_alias(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<()> {
        let from = from.into();
        let to = to.into();
        self.aliases.insert(from.clone(), to);
        // Walk the chain starting from `from`; a cycle revisits a name.
        let mut seen = HashSet::new();
        let mut cur = from.clone();
        loop {
            if !seen.insert(cur.clone()) {
                self.aliases.remove(&from);
                return Err(HelicsError::RegistrationFailure(format!("alias cycle detected starting at {from:?}")));
            }
            match self.aliases.get(&cur) {
                Some(next) => cur = next.clone(),
                None => return Ok(()),
            }
        }
    }

    /// Resolves `name` through the alias chain to its final target name.
    /// Does not detect cycles here: cycles are rejected at
    /// [`HandleManager::add_alias`] time, so none can exist by
    /// construction.
    pub fn resolve_alias(&self, name: &str) -> String {
        let mut cur = name.to_string();
        let mut hops = 0usize;
        while let Some(next) = self.aliases.get(&cur) {
            cur = next.clone();
            hops += 1;
            if hops > self.aliases.len() + 1 {
                // Defensive: should be unreachable given add_alias's cycle
                // check, but never loop forever on a corrupted map.
                break;
            }
        }
        cur
    }

    /// Records a target link from `source` to `target`, resolving it
    /// immediately if both endpoints already exist (including expanding a
    /// `REGEX:<pattern>` target against every currently-registered name).
    pub fn add_target(&mut self, source: impl Into<String>, target: impl Into<String>, required: bool) {
        let source = source.into();
        let target = target.into();
        self.pending.push(PendingLink { source: source.clone(), target, required });
        self.resolve_pending_for(&source);
    }

    /// Re-evaluates every pending link mentioning `registered_name` against
    /// the current name registry, resolving those that can now be
    /// satisfied (including `REGEX:` expansion).
    fn resolve_pending_for(&mut self, registered_name: &str) {
        let matches: Vec<usize> = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, link)| {
                link.source == registered_name
                    || link.target == registered_name
                    || link.target.starts_with("REGEX:")
            })
            .map(|(i, _)| i)
            .collect();

        for idx in matches {
            let link = self.pending[idx].clone();
            let Some(source_handle) = self.lookup(&link.source) else { continue };

            if let Some(pattern) = link.target.strip_prefix("REGEX:") {
                let targets = self.expand_regex(pattern);
                if !targets.is_empty() {
                    if let Some(info) = self.get_mut(source_handle) {
                        for t in targets {
                            if !info.targets.contains(&t) {
                                info.targets.push(t);
                            }
                        }
                    }
                }
                // REGEX targets are re-evaluated every time a new interface
                // appears, so never removed from `pending` before init ends.
                continue;
            }

            if let Some(_target_handle) = self.lookup(&link.target) {
                if let Some(info) = self.get_mut(source_handle) {
                    if !info.targets.contains(&link.target) {
                        info.targets.push(link.target.clone());
                    }
                }
                self.pending.retain(|p| !(p.source == link.source && p.target == link.target));
            }
        }
    }

    /// Expands a `REGEX:<pattern>` target against every currently
    /// registered interface name.
    fn expand_regex(&self, pattern: &str) -> Vec<String> {
        match regex::Regex::new(pattern) {
            Ok(re) => self.by_key.keys().filter(|k| re.is_match(k)).cloned().collect(),
            // `*` alone is not a valid regex on its own; HELICS configs use
            // it as a literal "match everything" shorthand.
            Err(_) if pattern == "*" => self.by_key.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Called at `enterInitializing`: every unresolved *required* pending
    /// link fails with [`HelicsError::ConnectionFailure`]; unresolved
    /// optional links are left for the caller to log.
    pub fn check_required_links(&self) -> Result<Vec<String>> {
        let mut unresolved_optional = Vec::new();
        for link in &self.pending {
            if link.target.starts_with("REGEX:") {
                continue;
            }
            if self.lookup(&link.target).is_none() {
                if link.required {
                    return Err(HelicsError::ConnectionFailure(format!(
                        "required target {:?} for {:?} never registered",
                        link.target, link.source
                    )));
                }
                unresolved_optional.push(format!("{} -> {}", link.source, link.target));
            }
        }
        Ok(unresolved_optional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::GlobalFederateId;

    fn owner(id: i32) -> GlobalHandle {
        GlobalHandle::new(GlobalFederateId::new(id), InterfaceHandle::from(0usize))
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut mgr = HandleManager::new();
        mgr.register(owner(1), InterfaceKind::Publication, "x", "double", "", Flags::empty()).unwrap();
        assert!(mgr.register(owner(2), InterfaceKind::Input, "x", "double", "", Flags::empty()).is_err());
    }

    #[test]
    fn alias_resolves_transitively() {
        let mut mgr = HandleManager::new();
        mgr.register(owner(1), InterfaceKind::Endpoint, "c", "", "", Flags::empty()).unwrap();
        mgr.add_alias("a", "b").unwrap();
        mgr.add_alias("b", "c").unwrap();
        assert_eq!(mgr.resolve_alias("a"), "c");
        assert!(mgr.lookup("a").is_some());
    }

    #[test]
    fn alias_cycle_is_rejected() {
        let mut mgr = HandleManager::new();
        mgr.add_alias("a", "b").unwrap();
        assert!(mgr.add_alias("b", "a").is_err());
    }

    #[test]
    fn target_registration_order_does_not_matter() {
        let mut mgr = HandleManager::new();
        // Target named before the target interface exists.
        mgr.add_target("ep1", "ep2", true);
        mgr.register(owner(1), InterfaceKind::Endpoint, "ep1", "", "", Flags::empty()).unwrap();
        mgr.register(owner(2), InterfaceKind::Endpoint, "ep2", "", "", Flags::empty()).unwrap();
        assert!(mgr.check_required_links().unwrap().is_empty());
        let h = mgr.lookup("ep1").unwrap();
        assert_eq!(mgr.get(h).unwrap().targets, vec!["ep2".to_string()]);
    }

    #[test]
    fn unresolved_required_link_fails_at_init() {
        let mut mgr = HandleManager::new();
        mgr.add_target("ep1", "never_registered", true);
        mgr.register(owner(1), InterfaceKind::Endpoint, "ep1", "", "", Flags::empty()).unwrap();
        assert!(mgr.check_required_links().is_err());
    }

    #[test]
    fn unresolved_optional_link_is_only_reported() {
        let mut mgr = HandleManager::new();
        mgr.add_target("ep1", "never_registered", false);
        mgr.register(owner(1), InterfaceKind::Endpoint, "ep1", "", "", Flags::empty()).unwrap();
        let unresolved = mgr.check_required_links().unwrap();
        assert_eq!(unresolved.len(), 1);
    }

    #[test]
    fn regex_target_expands_to_every_registered_name() {
        let mut mgr = HandleManager::new();
        mgr.register(owner(1), InterfaceKind::Endpoint, "ep1", "", "", Flags::empty()).unwrap();
        mgr.register(owner(2), InterfaceKind::Endpoint, "ep2", "", "", Flags::empty()).unwrap();
        mgr.register(owner(3), InterfaceKind::Endpoint, "ep3", "", "", Flags::empty()).unwrap();
        mgr.add_target("ep1", "REGEX:ep.*", false);
        let h = mgr.lookup("ep1").unwrap();
        let mut targets = mgr.get(h).unwrap().targets.clone();
        targets.sort();
        assert_eq!(targets, vec!["ep1".to_string(), "ep2".to_string(), "ep3".to_string()]);
    }
}
