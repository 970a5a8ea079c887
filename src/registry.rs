use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::keys::{KeyCombo, KeyParseError, Platform};

/// Where a binding is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Registered with the OS; fires while the window is unfocused
    Global,
    /// Matched against in-window key events; fires only while focused
    Local,
}

impl Scope {
    pub fn other(self) -> Scope {
        match self {
            Scope::Global => Scope::Local,
            Scope::Local => Scope::Global,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Local => f.write_str("local"),
        }
    }
}

/// Opaque identifier of the action a binding fires (a button id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What happens when a key is bound in one scope while live in the other.
///
/// Either way a physical key is live in at most one scope, so a single press
/// can never reach the dispatcher twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// The new binding wins; the old one is removed from the other scope.
    #[default]
    Demote,
    /// The new binding is refused with [`BindError::BindingConflict`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key: KeyCombo,
    pub action: ActionId,
    pub scope: Scope,
}

/// Errors that can occur while binding a key
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("invalid key combination '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: KeyParseError,
    },

    #[error("'{key}' is already bound in {scope} scope")]
    BindingConflict { key: KeyCombo, scope: Scope },

    #[error("the OS refused to register '{0}'")]
    OsRegistrationDenied(KeyCombo),
}

/// Result of a successful bind
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BindOutcome {
    /// Action previously bound to the same key in the same scope
    pub replaced: Option<ActionId>,
    /// Binding removed from the other scope under [`ConflictPolicy::Demote`]
    pub demoted: Option<Binding>,
}

/// In-memory table of live bindings, one map per scope.
#[derive(Debug)]
pub struct KeyBindingRegistry {
    platform: Platform,
    policy: ConflictPolicy,
    global: HashMap<KeyCombo, ActionId>,
    local: HashMap<KeyCombo, ActionId>,
}

impl Default for KeyBindingRegistry {
    fn default() -> Self {
        Self::new(Platform::current(), ConflictPolicy::default())
    }
}

impl KeyBindingRegistry {
    pub fn new(platform: Platform, policy: ConflictPolicy) -> Self {
        Self {
            platform,
            policy,
            global: HashMap::new(),
            local: HashMap::new(),
        }
    }

    pub fn set_policy(&mut self, policy: ConflictPolicy) {
        self.policy = policy;
    }

    fn table(&self, scope: Scope) -> &HashMap<KeyCombo, ActionId> {
        match scope {
            Scope::Global => &self.global,
            Scope::Local => &self.local,
        }
    }

    fn table_mut(&mut self, scope: Scope) -> &mut HashMap<KeyCombo, ActionId> {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Local => &mut self.local,
        }
    }

    /// Parse a user-supplied key into its canonical form, translating
    /// generic modifiers for this registry's platform.
    pub fn normalize(&self, key: &str) -> Result<KeyCombo, BindError> {
        KeyCombo::parse_for(key, self.platform).map_err(|source| BindError::InvalidKey {
            key: key.to_string(),
            source,
        })
    }

    /// Check whether `key` may be bound in `scope` without mutating anything.
    pub fn check(&self, key: &KeyCombo, scope: Scope) -> Result<(), BindError> {
        if self.policy == ConflictPolicy::Reject && self.table(scope.other()).contains_key(key) {
            return Err(BindError::BindingConflict {
                key: key.clone(),
                scope: scope.other(),
            });
        }
        Ok(())
    }

    pub fn bind(
        &mut self,
        key: &str,
        action: ActionId,
        scope: Scope,
    ) -> Result<BindOutcome, BindError> {
        let combo = self.normalize(key)?;
        self.bind_combo(combo, action, scope)
    }

    /// Bind an already-normalized combo. Re-binding the same key in the same
    /// scope replaces the previous action.
    pub fn bind_combo(
        &mut self,
        key: KeyCombo,
        action: ActionId,
        scope: Scope,
    ) -> Result<BindOutcome, BindError> {
        self.check(&key, scope)?;

        let demoted = self
            .table_mut(scope.other())
            .remove(&key)
            .map(|demoted_action| Binding {
                key: key.clone(),
                action: demoted_action,
                scope: scope.other(),
            });
        if let Some(d) = &demoted {
            log::info!("Demoted {} binding for {} ({})", d.scope, d.key, d.action);
        }

        let replaced = self.table_mut(scope).insert(key, action);
        Ok(BindOutcome { replaced, demoted })
    }

    /// Remove the binding for `key` in `scope`. Unbinding an unbound key is
    /// a successful no-op.
    pub fn unbind(&mut self, key: &str, scope: Scope) -> Result<Option<ActionId>, BindError> {
        let combo = self.normalize(key)?;
        Ok(self.unbind_combo(&combo, scope))
    }

    pub fn unbind_combo(&mut self, key: &KeyCombo, scope: Scope) -> Option<ActionId> {
        self.table_mut(scope).remove(key)
    }

    /// Clear one scope, or both when `scope` is `None`. Returns the bindings
    /// that were removed so the caller can tear down their listeners.
    pub fn unbind_all(&mut self, scope: Option<Scope>) -> Vec<Binding> {
        let scopes: &[Scope] = match scope {
            Some(Scope::Global) => &[Scope::Global],
            Some(Scope::Local) => &[Scope::Local],
            None => &[Scope::Global, Scope::Local],
        };

        let mut removed = Vec::new();
        for &scope in scopes {
            removed.extend(self.table_mut(scope).drain().map(|(key, action)| Binding {
                key,
                action,
                scope,
            }));
        }
        removed
    }

    pub fn lookup(&self, key: &KeyCombo, scope: Scope) -> Option<&ActionId> {
        self.table(scope).get(key)
    }

    /// Scope in which `key` is currently live, if any.
    pub fn scope_of(&self, key: &KeyCombo) -> Option<Scope> {
        if self.global.contains_key(key) {
            Some(Scope::Global)
        } else if self.local.contains_key(key) {
            Some(Scope::Local)
        } else {
            None
        }
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.table(scope).len()
    }
}
