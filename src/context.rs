// src/context.rs
//! Binding Context
//! One naming context exposed as a dynamic management bean: every binding is
//! an attribute, and the naming operations are invocable by signature.
//!
//! Attributes are a view over existing bindings. `set_attribute` never
//! creates a binding; use `bind` or `rebind` for that.

use crate::config::ContextConfig;
use crate::error::{ManagementError, ManagementResult, NamingError, NamingResult};
use crate::features::{
    AttributeInfo, ConstructorInfo, ContextFeatures, ContextInfo, NotificationInfo, OperationInfo, CONTEXT_CLASS,
};
use crate::notification::Notification;
use crate::registration::{ManagementServer, ObjectName, Registration, RegistrationState};
use crate::registry::BindingRegistry;
use crate::value::{BindingState, Value};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// A named attribute value, as passed to and returned by the batch calls.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

pub struct BindingContext {
    registry: BindingRegistry,
    features: ContextFeatures,
    registration: Registration,
}

impl BindingContext {
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            registry: BindingRegistry::with_environment(config.name_in_namespace, config.environment),
            features: ContextFeatures::new(),
            registration: Registration::new(config.type_key),
        }
    }

    /// Create a context through the constructor registered for `signature`.
    pub fn construct(signature: &[&str], args: &[Value]) -> ManagementResult<Self> {
        let features = ContextFeatures::new();
        let environment = features.construct(signature, args)?;
        let config = ContextConfig::default();
        Ok(Self {
            registry: BindingRegistry::with_environment(config.name_in_namespace, environment),
            features,
            registration: Registration::new(config.type_key),
        })
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    // --- Naming operations ---

    pub fn bind(&self, name: &str, value: Option<Value>) -> NamingResult<()> {
        self.registry.bind(name, value)
    }

    pub fn lookup(&self, name: &str) -> NamingResult<Value> {
        self.registry.lookup(name)
    }

    pub fn rebind(&self, name: &str, value: Option<Value>) -> NamingResult<()> {
        self.registry.rebind(name, value)
    }

    pub fn unbind(&self, name: &str) -> NamingResult<()> {
        self.registry.unbind(name)
    }

    pub fn rename(&self, old: &str, new: &str) -> NamingResult<()> {
        self.registry.rename(old, new)
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.registry.subscribe()
    }

    // --- Attributes ---

    /// One descriptor per current binding, sorted by name. Built fresh on
    /// every call.
    pub fn describe_attributes(&self) -> Vec<AttributeInfo> {
        self.registry
            .list_bindings()
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| AttributeInfo {
                description: format!("Bound name [{name}]"),
                type_name: value.type_name().to_string(),
                name,
                readable: true,
                writable: true,
            })
            .collect()
    }

    pub fn get_attribute(&self, name: &str) -> ManagementResult<Value> {
        match self.registry.state(name) {
            BindingState::Bound(v) => Ok(v),
            BindingState::BoundNull => Ok(Value::Null),
            BindingState::Unbound => Err(ManagementError::AttributeNotFound(name.to_string())),
        }
    }

    /// Replace the value of an existing binding.
    ///
    /// A binding currently holding a non-null value only accepts values of
    /// the same type, or `Null`.
    pub fn set_attribute(&self, attribute: Attribute) -> ManagementResult<()> {
        let Attribute { name, value } = attribute;
        let replaced = self.registry.replace_existing(&name, value, |current, proposed| {
            if !current.is_null() && !proposed.is_null() && current.type_name() != proposed.type_name() {
                return Err((current.type_name(), proposed.type_name()));
            }
            Ok(())
        });
        match replaced {
            Ok(Ok(_)) => Ok(()),
            Ok(Err((expected, got))) => Err(ManagementError::InvalidValue {
                name,
                expected: expected.to_string(),
                got: got.to_string(),
            }),
            Err(NamingError::NotFound(_)) => Err(ManagementError::AttributeNotFound(name)),
            Err(e) => Err(ManagementError::invocation("setAttribute", e)),
        }
    }

    /// Values of the named attributes. Unknown names are left out.
    pub fn get_attributes(&self, names: &[&str]) -> Vec<Attribute> {
        names
            .iter()
            .filter_map(|name| {
                self.get_attribute(name)
                    .map(|value| Attribute::new(*name, value))
                    .map_err(|e| tracing::debug!(name, error = %e, "attribute skipped"))
                    .ok()
            })
            .collect()
    }

    /// Apply each assignment; returns the attributes that were set.
    pub fn set_attributes(&self, attributes: Vec<Attribute>) -> Vec<Attribute> {
        attributes
            .into_iter()
            .filter_map(|attr| {
                let applied = attr.clone();
                match self.set_attribute(attr) {
                    Ok(()) => Some(applied),
                    Err(e) => {
                        tracing::debug!(name = %applied.name, error = %e, "attribute not set");
                        None
                    }
                }
            })
            .collect()
    }

    // --- Operations ---

    pub fn invoke(&self, operation: &str, args: &[Value], signature: &[&str]) -> ManagementResult<Value> {
        self.features.invoke(&self.registry, operation, args, signature)
    }

    pub fn describe_operations(&self) -> Vec<OperationInfo> {
        self.features.operations()
    }

    pub fn describe_constructors(&self) -> Vec<ConstructorInfo> {
        self.features.constructors()
    }

    pub fn describe_notifications(&self) -> Vec<NotificationInfo> {
        self.features.notifications().to_vec()
    }

    pub fn context_info(&self) -> ContextInfo {
        let identity = self
            .registration
            .identity()
            .map(|i| i.to_string())
            .unwrap_or_else(|| "unregistered".to_string());
        ContextInfo {
            class_name: CONTEXT_CLASS.to_string(),
            description: format!("A naming context [{identity}]"),
            attributes: self.describe_attributes(),
            constructors: self.describe_constructors(),
            operations: self.describe_operations(),
            notifications: self.describe_notifications(),
        }
    }

    // --- Registration lifecycle ---

    pub fn pre_register(
        &self,
        server: Arc<dyn ManagementServer>,
        proposed: Option<ObjectName>,
    ) -> ManagementResult<ObjectName> {
        let identity = self.registration.pre_register(server, proposed)?;
        self.registry.set_label(Some(identity.to_string()));
        Ok(identity)
    }

    pub fn post_register(&self, done: bool) {
        if self.registration.post_register(done).is_some() {
            self.registry.set_label(None);
        }
    }

    pub fn pre_unregister(&self) -> ManagementResult<()> {
        self.registration.pre_unregister()
    }

    pub fn post_unregister(&self) {
        self.registration.post_unregister();
        self.registry.set_label(None);
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.registration.state()
    }

    pub fn identity(&self) -> Option<ObjectName> {
        self.registration.identity()
    }

    pub fn server(&self) -> Option<Arc<dyn ManagementServer>> {
        self.registration.server()
    }
}

impl Default for BindingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvocationCause;
    use std::sync::Barrier;
    use std::thread;
    use crate::registration::LocalServer;
    use crate::signature::{OBJECT_TYPE, STRING_TYPE};

    #[test]
    fn attributes_track_bindings() {
        let ctx = BindingContext::new();
        assert!(ctx.describe_attributes().is_empty());
        ctx.bind("b", Some(Value::Int(1))).unwrap();
        ctx.bind("a", None).unwrap();
        let attrs = ctx.describe_attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "a");
        assert_eq!(attrs[0].type_name, "java.lang.Object");
        assert_eq!(attrs[1].type_name, "java.lang.Integer");

        ctx.unbind("b").unwrap();
        assert_eq!(ctx.describe_attributes().len(), 1);
    }

    #[test]
    fn get_attribute_distinguishes_null_from_missing() {
        let ctx = BindingContext::new();
        ctx.bind("n", None).unwrap();
        assert_eq!(ctx.get_attribute("n"), Ok(Value::Null));
        assert_eq!(
            ctx.get_attribute("missing"),
            Err(ManagementError::AttributeNotFound("missing".into()))
        );
    }

    #[test]
    fn set_attribute_requires_existing_binding() {
        let ctx = BindingContext::new();
        assert_eq!(
            ctx.set_attribute(Attribute::new("x", 1)),
            Err(ManagementError::AttributeNotFound("x".into()))
        );
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn set_attribute_checks_type() {
        let ctx = BindingContext::new();
        ctx.bind("x", Some(Value::Int(1))).unwrap();
        ctx.set_attribute(Attribute::new("x", 2)).unwrap();
        assert_eq!(ctx.lookup("x"), Ok(Value::Int(2)));

        let err = ctx.set_attribute(Attribute::new("x", "two")).unwrap_err();
        assert!(matches!(err, ManagementError::InvalidValue { ref expected, .. } if expected == "java.lang.Integer"));

        ctx.set_attribute(Attribute::new("x", Value::Null)).unwrap();
        ctx.set_attribute(Attribute::new("x", "now a string")).unwrap();
        assert_eq!(ctx.lookup("x"), Ok(Value::from("now a string")));
    }

    #[test]
    fn set_attribute_never_revives_an_unbound_name() {
        for round in 0..2000 {
            let ctx = Arc::new(BindingContext::new());
            ctx.bind("x", Some(Value::Int(1))).unwrap();
            let barrier = Arc::new(Barrier::new(2));

            let remover = {
                let ctx = ctx.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ctx.unbind("x")
                })
            };
            barrier.wait();
            let set = ctx.set_attribute(Attribute::new("x", 2));
            let unbound = remover.join().unwrap();

            assert!(unbound.is_ok(), "round {round}");
            assert!(ctx.lookup("x").is_err(), "round {round}: set {set:?} brought x back");
            if let Err(e) = set {
                assert_eq!(e, ManagementError::AttributeNotFound("x".into()), "round {round}");
            }
        }
    }

    #[test]
    fn batch_calls_drop_failures() {
        let ctx = BindingContext::new();
        ctx.bind("a", Some(Value::Int(1))).unwrap();
        ctx.bind("b", None).unwrap();

        let got = ctx.get_attributes(&["a", "missing", "b"]);
        assert_eq!(got, vec![Attribute::new("a", 1), Attribute::new("b", Value::Null)]);

        let set = ctx.set_attributes(vec![
            Attribute::new("a", 5),
            Attribute::new("missing", 1),
            Attribute::new("a", "wrong type"),
            Attribute::new("b", true),
        ]);
        assert_eq!(set, vec![Attribute::new("a", 5), Attribute::new("b", true)]);
        assert_eq!(ctx.lookup("a"), Ok(Value::Int(5)));
    }

    #[test]
    fn invoke_round_trip() {
        let ctx = BindingContext::new();
        ctx.invoke("bind", &[Value::from("C"), Value::Int(5)], &[STRING_TYPE, OBJECT_TYPE])
            .unwrap();
        assert_eq!(ctx.get_attribute("C"), Ok(Value::Int(5)));
        let err = ctx
            .invoke("bind", &[Value::from("C"), Value::Int(6)], &[STRING_TYPE, OBJECT_TYPE])
            .unwrap_err();
        assert!(matches!(
            err,
            ManagementError::InvocationFailed {
                cause: InvocationCause::Naming(NamingError::NameAlreadyBound { .. }),
                ..
            }
        ));
    }

    #[test]
    fn registration_identity_appears_in_errors_and_info() {
        let ctx = BindingContext::new();
        let name: ObjectName = "naming:type=NamingContext,name=root".parse().unwrap();
        ctx.pre_register(Arc::new(LocalServer::new("naming")), Some(name.clone()))
            .unwrap();
        ctx.post_register(true);
        assert_eq!(ctx.registration_state(), RegistrationState::Registered);
        assert!(ctx.context_info().description.contains(&name.to_string()));

        ctx.bind("a", None).unwrap();
        match ctx.bind("a", None) {
            Err(NamingError::NameAlreadyBound { context, .. }) => assert_eq!(context, name.to_string()),
            other => panic!("unexpected {other:?}"),
        }

        ctx.pre_unregister().unwrap();
        ctx.post_unregister();
        assert!(ctx.identity().is_none());
    }

    #[test]
    fn construct_by_signature() {
        let mut env = std::collections::BTreeMap::new();
        env.insert("k".to_string(), Value::from("v"));
        let ctx = BindingContext::construct(&["java.util.Map"], &[Value::Map(env)]).unwrap();
        let got = ctx.invoke("getEnvironment", &[], &[]).unwrap();
        assert_eq!(got.as_map().and_then(|m| m.get("k")), Some(&Value::from("v")));
    }
}
