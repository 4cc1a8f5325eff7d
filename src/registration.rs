// src/registration.rs
//! Registration lifecycle of a context with a management server.
//! The server itself (how a registered context becomes remotely visible) lives
//! outside this crate; contexts only record the handle and their identity.

use crate::config::CONFIGURED_DOMAIN;
use crate::error::{ManagementError, ManagementResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle to the server a context is registered with.
pub trait ManagementServer: Send + Sync {
    /// Domain used for identities the context has to generate itself.
    fn default_domain(&self) -> &str;
}

/// Minimal in-process server handle.
#[derive(Clone, Debug)]
pub struct LocalServer {
    domain: String,
}

impl LocalServer {
    pub fn new(domain: impl Into<String>) -> Self {
        Self { domain: domain.into() }
    }
}

impl ManagementServer for LocalServer {
    fn default_domain(&self) -> &str {
        &self.domain
    }
}

/// Identity of a registered context: a domain plus key properties.
/// Properties are kept in canonical (sorted) order, so two names with the
/// same properties in a different order compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectName {
    domain: String,
    properties: BTreeMap<String, String>,
}

fn invalid(name: &str, reason: impl Into<String>) -> ManagementError {
    ManagementError::InvalidObjectName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn check_token(full: &str, what: &str, token: &str) -> ManagementResult<()> {
    if token.is_empty() {
        return Err(invalid(full, format!("empty {what}")));
    }
    if token.contains([':', ',', '=', '*', '?']) {
        return Err(invalid(full, format!("illegal character in {what} [{token}]")));
    }
    Ok(())
}

impl ObjectName {
    /// Build a name from a domain and key/value pairs.
    pub fn new(domain: &str, pairs: &[(&str, &str)]) -> ManagementResult<Self> {
        let display = format!("{domain}:{pairs:?}");
        if domain.is_empty() || domain.contains(':') {
            return Err(invalid(&display, "null or zero length domain name"));
        }
        if pairs.is_empty() {
            return Err(invalid(&display, "no key properties"));
        }
        let mut name = Self {
            domain: domain.to_string(),
            properties: BTreeMap::new(),
        };
        for (k, v) in pairs {
            name = name.with_property(k, v)?;
        }
        Ok(name)
    }

    /// Append a key property, failing on duplicate keys.
    pub fn with_property(mut self, key: &str, value: &str) -> ManagementResult<Self> {
        let display = format!("{self},{key}={value}");
        check_token(&display, "key", key)?;
        check_token(&display, "value", value)?;
        if self.properties.contains_key(key) {
            return Err(invalid(&display, format!("duplicate key [{key}]")));
        }
        self.properties.insert(key.to_string(), value.to_string());
        Ok(self)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectName {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, props) = s.split_once(':').ok_or_else(|| invalid(s, "missing domain separator"))?;
        if domain.is_empty() {
            return Err(invalid(s, "null or zero length domain name"));
        }
        if props.is_empty() {
            return Err(invalid(s, "no key properties"));
        }
        let mut name = Self {
            domain: domain.to_string(),
            properties: BTreeMap::new(),
        };
        for pair in props.split(',') {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| invalid(s, format!("malformed key property [{pair}]")))?;
            name = name.with_property(k, v).map_err(|_| invalid(s, format!("bad key property [{pair}]")))?;
        }
        Ok(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    /// `pre_register` accepted, awaiting `post_register`.
    Pending,
    Registered,
    /// `pre_unregister` accepted, awaiting `post_unregister`.
    Unregistering,
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

struct Record {
    state: RegistrationState,
    server: Option<Arc<dyn ManagementServer>>,
    identity: Option<ObjectName>,
}

/// Registration record of one context.
pub struct Registration {
    record: RwLock<Record>,
    type_key: String,
}

impl Registration {
    pub fn new(type_key: impl Into<String>) -> Self {
        Self {
            record: RwLock::new(Record {
                state: RegistrationState::Unregistered,
                server: None,
                identity: None,
            }),
            type_key: type_key.into(),
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.record.read().state
    }

    /// Identity once registration has been accepted.
    pub fn identity(&self) -> Option<ObjectName> {
        self.record.read().identity.clone()
    }

    pub fn server(&self) -> Option<Arc<dyn ManagementServer>> {
        self.record.read().server.clone()
    }

    fn generate(&self, server: &dyn ManagementServer) -> ManagementResult<ObjectName> {
        let domain = CONFIGURED_DOMAIN.as_deref().unwrap_or_else(|| server.default_domain());
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed).to_string();
        ObjectName::new(domain, &[("type", self.type_key.as_str()), ("id", id.as_str())])
    }

    pub fn pre_register(
        &self,
        server: Arc<dyn ManagementServer>,
        proposed: Option<ObjectName>,
    ) -> ManagementResult<ObjectName> {
        let mut rec = self.record.write();
        if rec.state != RegistrationState::Unregistered {
            return Err(ManagementError::RegistrationRejected(format!(
                "context is {:?}",
                rec.state
            )));
        }
        let identity = match proposed {
            Some(name) => name,
            None => self.generate(server.as_ref())?,
        };
        rec.state = RegistrationState::Pending;
        rec.server = Some(server);
        rec.identity = Some(identity.clone());
        tracing::debug!(identity = %identity, "pre-register accepted");
        Ok(identity)
    }

    /// Completes or rolls back a pending registration. Returns the identity
    /// that was rolled back, if any.
    pub fn post_register(&self, done: bool) -> Option<ObjectName> {
        let mut rec = self.record.write();
        if rec.state != RegistrationState::Pending {
            tracing::warn!(state = ?rec.state, "post-register without pending registration");
            return None;
        }
        if done {
            rec.state = RegistrationState::Registered;
            tracing::info!(identity = ?rec.identity.as_ref().map(ToString::to_string), "context registered");
            None
        } else {
            rec.state = RegistrationState::Unregistered;
            rec.server = None;
            let identity = rec.identity.take();
            tracing::warn!(identity = ?identity.as_ref().map(ToString::to_string), "context registration failed");
            identity
        }
    }

    pub fn pre_unregister(&self) -> ManagementResult<()> {
        let mut rec = self.record.write();
        if rec.state != RegistrationState::Registered {
            return Err(ManagementError::RegistrationRejected(format!(
                "cannot unregister a context that is {:?}",
                rec.state
            )));
        }
        rec.state = RegistrationState::Unregistering;
        Ok(())
    }

    pub fn post_unregister(&self) {
        let mut rec = self.record.write();
        let identity = rec.identity.take();
        rec.server = None;
        rec.state = RegistrationState::Unregistered;
        tracing::info!(identity = ?identity.map(|i| i.to_string()), "context unregistered");
    }
}
