// src/features.rs
//! Management features shared by every binding context: the fixed operation
//! and constructor tables, keyed by signature hash, and the notification
//! catalog.

use crate::error::{InvocationCause, ManagementError, ManagementResult, NamingError, NamingResult};
use crate::notification::NotificationKind;
use crate::registry::BindingRegistry;
use crate::signature::{
    hash_constructor, hash_operation, CONTEXT_INTERFACE, MAP_TYPE, OBJECT_TYPE, STRING_TYPE, VOID_TYPE,
};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Type name the context advertises for itself and its constructors.
pub const CONTEXT_CLASS: &str = "naming_context.BindingContext";

pub type OperationHandler = fn(&BindingRegistry, &[Value]) -> NamingResult<Value>;
pub type ConstructorHandler = fn(&[Value]) -> NamingResult<BTreeMap<String, Value>>;

/// Effect of an operation on the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Impact {
    /// Read-only
    Info,
    /// Mutates, returns nothing useful
    Action,
    /// Mutates and returns a value
    ActionInfo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
    pub signature: Vec<ParameterInfo>,
    pub return_type: String,
    pub impact: Impact,
    pub hash: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorInfo {
    pub name: String,
    pub description: String,
    pub signature: Vec<ParameterInfo>,
    pub hash: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    pub type_name: String,
    pub description: String,
    pub readable: bool,
    pub writable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationInfo {
    pub types: Vec<String>,
    pub description: String,
}

/// Full metadata snapshot of one context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextInfo {
    pub class_name: String,
    pub description: String,
    pub attributes: Vec<AttributeInfo>,
    pub constructors: Vec<ConstructorInfo>,
    pub operations: Vec<OperationInfo>,
    pub notifications: Vec<NotificationInfo>,
}

/// A hand-authored operation table row.
pub struct OperationSpec {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub returns: &'static str,
    pub impact: Impact,
    pub handler: OperationHandler,
}

pub struct ConstructorSpec {
    pub params: &'static [&'static str],
    pub handler: ConstructorHandler,
}

pub const CONTEXT_OPERATIONS: &[OperationSpec] = &[
    OperationSpec { name: "lookup", params: &[STRING_TYPE], returns: OBJECT_TYPE, impact: Impact::Info, handler: op_lookup },
    OperationSpec { name: "lookupLink", params: &[STRING_TYPE], returns: OBJECT_TYPE, impact: Impact::Info, handler: op_lookup },
    OperationSpec { name: "bind", params: &[STRING_TYPE, OBJECT_TYPE], returns: VOID_TYPE, impact: Impact::Action, handler: op_bind },
    OperationSpec { name: "rebind", params: &[STRING_TYPE, OBJECT_TYPE], returns: VOID_TYPE, impact: Impact::Action, handler: op_rebind },
    OperationSpec { name: "unbind", params: &[STRING_TYPE], returns: VOID_TYPE, impact: Impact::Action, handler: op_unbind },
    OperationSpec { name: "rename", params: &[STRING_TYPE, STRING_TYPE], returns: VOID_TYPE, impact: Impact::Action, handler: op_rename },
    OperationSpec { name: "list", params: &[STRING_TYPE], returns: "javax.naming.NamingEnumeration", impact: Impact::Info, handler: op_list },
    OperationSpec { name: "listBindings", params: &[STRING_TYPE], returns: "javax.naming.NamingEnumeration", impact: Impact::Info, handler: op_list_bindings },
    OperationSpec { name: "composeName", params: &[STRING_TYPE, STRING_TYPE], returns: STRING_TYPE, impact: Impact::Info, handler: op_compose_name },
    OperationSpec { name: "addToEnvironment", params: &[STRING_TYPE, OBJECT_TYPE], returns: OBJECT_TYPE, impact: Impact::ActionInfo, handler: op_add_to_environment },
    OperationSpec { name: "removeFromEnvironment", params: &[STRING_TYPE], returns: OBJECT_TYPE, impact: Impact::ActionInfo, handler: op_remove_from_environment },
    OperationSpec { name: "getEnvironment", params: &[], returns: "java.util.Hashtable", impact: Impact::Info, handler: op_get_environment },
    OperationSpec { name: "getNameInNamespace", params: &[], returns: STRING_TYPE, impact: Impact::Info, handler: op_name_in_namespace },
    OperationSpec { name: "close", params: &[], returns: VOID_TYPE, impact: Impact::Action, handler: op_close },
];

pub const CONTEXT_CONSTRUCTORS: &[ConstructorSpec] = &[
    ConstructorSpec { params: &[], handler: ctor_default },
    ConstructorSpec { params: &[MAP_TYPE], handler: ctor_with_environment },
];

struct OperationEntry {
    info: OperationInfo,
    handler: OperationHandler,
}

struct ConstructorEntry {
    info: ConstructorInfo,
    handler: ConstructorHandler,
}

fn params_info(params: &[&str]) -> Vec<ParameterInfo> {
    params
        .iter()
        .enumerate()
        .map(|(i, t)| ParameterInfo { name: format!("p{i}"), type_name: t.to_string() })
        .collect()
}

fn matches_signature(sig: &[ParameterInfo], requested: &[&str]) -> bool {
    sig.len() == requested.len() && sig.iter().zip(requested).all(|(p, r)| p.type_name == *r)
}

/// Operation and constructor tables for one context, built once and immutable.
pub struct ContextFeatures {
    operations: HashMap<i32, Vec<OperationEntry>>,
    constructors: HashMap<i32, Vec<ConstructorEntry>>,
    notifications: Vec<NotificationInfo>,
}

impl ContextFeatures {
    /// Tables for the standard naming operations.
    pub fn new() -> Self {
        Self::from_specs(CONTEXT_INTERFACE, CONTEXT_OPERATIONS, CONTEXT_CONSTRUCTORS)
    }

    pub fn from_specs(declaring: &str, ops: &[OperationSpec], ctors: &[ConstructorSpec]) -> Self {
        let mut operations: HashMap<i32, Vec<OperationEntry>> = HashMap::new();
        for spec in ops {
            let hash = hash_operation(declaring, spec.name, spec.params);
            let info = OperationInfo {
                name: spec.name.to_string(),
                description: format!("{declaring} operation"),
                signature: params_info(spec.params),
                return_type: spec.returns.to_string(),
                impact: spec.impact,
                hash,
            };
            let entries = operations.entry(hash).or_default();
            if !entries.is_empty() {
                tracing::warn!(hash, operation = spec.name, "signature hash collision in operation table");
            }
            entries.push(OperationEntry { info, handler: spec.handler });
        }

        let mut constructors: HashMap<i32, Vec<ConstructorEntry>> = HashMap::new();
        for spec in ctors {
            let hash = hash_constructor(CONTEXT_CLASS, spec.params);
            let info = ConstructorInfo {
                name: CONTEXT_CLASS.to_string(),
                description: format!("{CONTEXT_CLASS} constructor"),
                signature: params_info(spec.params),
                hash,
            };
            constructors
                .entry(hash)
                .or_default()
                .push(ConstructorEntry { info, handler: spec.handler });
        }

        let notifications = NotificationKind::ALL
            .iter()
            .map(|k| NotificationInfo {
                types: vec![k.type_name().to_string()],
                description: k.description().to_string(),
            })
            .collect();

        Self { operations, constructors, notifications }
    }

    /// Operation metadata, ordered by name then hash.
    pub fn operations(&self) -> Vec<OperationInfo> {
        let mut out: Vec<_> = self
            .operations
            .values()
            .flatten()
            .map(|e| e.info.clone())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.hash.cmp(&b.hash)));
        out
    }

    pub fn constructors(&self) -> Vec<ConstructorInfo> {
        let mut out: Vec<_> = self
            .constructors
            .values()
            .flatten()
            .map(|e| e.info.clone())
            .collect();
        out.sort_by(|a, b| a.signature.len().cmp(&b.signature.len()).then(a.hash.cmp(&b.hash)));
        out
    }

    pub fn notifications(&self) -> &[NotificationInfo] {
        &self.notifications
    }

    fn resolve_operation(&self, declaring: &str, name: &str, signature: &[&str]) -> ManagementResult<&OperationEntry> {
        let hash = hash_operation(declaring, name, signature);
        let not_found = || ManagementError::OperationNotFound {
            name: name.to_string(),
            signature: signature.iter().map(|s| s.to_string()).collect(),
            hash,
        };
        match self.operations.get(&hash).map(Vec::as_slice) {
            None | Some([]) => Err(not_found()),
            Some([entry]) => {
                if entry.info.name == name && matches_signature(&entry.info.signature, signature) {
                    Ok(entry)
                } else {
                    Err(not_found())
                }
            }
            Some(entries) => {
                tracing::warn!(hash, operation = name, candidates = entries.len(), "ambiguous operation dispatch");
                Err(ManagementError::invocation(
                    name,
                    InvocationCause::AmbiguousSignature { hash, candidates: entries.len() },
                ))
            }
        }
    }

    /// Run the operation registered for `(name, signature)` against `registry`.
    pub fn invoke(
        &self,
        registry: &BindingRegistry,
        name: &str,
        args: &[Value],
        signature: &[&str],
    ) -> ManagementResult<Value> {
        self.invoke_declared(CONTEXT_INTERFACE, registry, name, args, signature)
    }

    pub fn invoke_declared(
        &self,
        declaring: &str,
        registry: &BindingRegistry,
        name: &str,
        args: &[Value],
        signature: &[&str],
    ) -> ManagementResult<Value> {
        let entry = self.resolve_operation(declaring, name, signature)?;
        check_arity(args, entry.info.signature.len()).map_err(|e| ManagementError::invocation(name, e))?;
        tracing::trace!(operation = name, hash = entry.info.hash, "dispatching operation");
        (entry.handler)(registry, args).map_err(|e| ManagementError::invocation(name, e))
    }

    /// Build a context environment with the constructor registered for `signature`.
    pub fn construct(&self, signature: &[&str], args: &[Value]) -> ManagementResult<BTreeMap<String, Value>> {
        let hash = hash_constructor(CONTEXT_CLASS, signature);
        let not_found = || ManagementError::ConstructorNotFound {
            signature: signature.iter().map(|s| s.to_string()).collect(),
            hash,
        };
        let entry = match self.constructors.get(&hash).map(Vec::as_slice) {
            Some([entry]) if matches_signature(&entry.info.signature, signature) => entry,
            Some([_, _, ..]) => {
                return Err(ManagementError::invocation(
                    CONTEXT_CLASS,
                    InvocationCause::AmbiguousSignature { hash, candidates: self.constructors[&hash].len() },
                ))
            }
            _ => return Err(not_found()),
        };
        check_arity(args, entry.info.signature.len()).map_err(|e| ManagementError::invocation(CONTEXT_CLASS, e))?;
        (entry.handler)(args).map_err(|e| ManagementError::invocation(CONTEXT_CLASS, e))
    }
}

impl Default for ContextFeatures {
    fn default() -> Self {
        Self::new()
    }
}

fn check_arity(args: &[Value], expected: usize) -> NamingResult<()> {
    if args.len() != expected {
        return Err(NamingError::IllegalArgument(format!(
            "expected {expected} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

fn name_arg(args: &[Value], idx: usize) -> NamingResult<&str> {
    match &args[idx] {
        Value::Str(s) => Ok(s),
        Value::Null => Err(NamingError::InvalidName(String::new())),
        other => Err(NamingError::IllegalArgument(format!(
            "p{idx} must be a {STRING_TYPE}, got {}",
            other.type_name()
        ))),
    }
}

/// Like [`name_arg`], but a null argument stands for the empty name.
fn optional_name_arg(args: &[Value], idx: usize) -> NamingResult<&str> {
    match &args[idx] {
        Value::Null => Ok(""),
        _ => name_arg(args, idx),
    }
}

fn void(r: NamingResult<()>) -> NamingResult<Value> {
    r.map(|_| Value::Null)
}

// Only the context itself can be listed; there are no subcontexts.
fn ensure_self(reg: &BindingRegistry, name: &str) -> NamingResult<()> {
    if name.is_empty() {
        Ok(())
    } else if reg.contains(name) {
        Err(NamingError::NotContext(name.to_string()))
    } else {
        Err(NamingError::NotFound(name.to_string()))
    }
}

fn op_lookup(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    reg.lookup(name_arg(args, 0)?)
}

fn op_bind(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    void(reg.bind(name_arg(args, 0)?, Some(args[1].clone())))
}

fn op_rebind(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    void(reg.rebind(name_arg(args, 0)?, Some(args[1].clone())))
}

fn op_unbind(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    void(reg.unbind(name_arg(args, 0)?))
}

fn op_rename(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    void(reg.rename(name_arg(args, 0)?, name_arg(args, 1)?))
}

fn op_list(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    ensure_self(reg, optional_name_arg(args, 0)?)?;
    let pairs = reg
        .list()?
        .into_iter()
        .map(|(name, class)| {
            let mut m = BTreeMap::new();
            m.insert("name".to_string(), Value::Str(name));
            m.insert("className".to_string(), Value::from(class));
            Value::Map(m)
        })
        .collect();
    Ok(Value::List(pairs))
}

fn op_list_bindings(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    ensure_self(reg, optional_name_arg(args, 0)?)?;
    let bindings = reg
        .list_bindings()?
        .into_iter()
        .map(|(name, value)| {
            let mut m = BTreeMap::new();
            m.insert("name".to_string(), Value::Str(name));
            m.insert("className".to_string(), Value::from(value.type_name()));
            m.insert("object".to_string(), value);
            Value::Map(m)
        })
        .collect();
    Ok(Value::List(bindings))
}

fn op_compose_name(_reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    let name = optional_name_arg(args, 0)?;
    let prefix = optional_name_arg(args, 1)?;
    let composed = match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix.trim_end_matches('/'), name),
    };
    Ok(Value::Str(composed))
}

fn op_add_to_environment(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    let prev = reg.add_to_environment(name_arg(args, 0)?, args[1].clone())?;
    Ok(Value::from(prev))
}

fn op_remove_from_environment(reg: &BindingRegistry, args: &[Value]) -> NamingResult<Value> {
    let prev = reg.remove_from_environment(name_arg(args, 0)?)?;
    Ok(Value::from(prev))
}

fn op_get_environment(reg: &BindingRegistry, _args: &[Value]) -> NamingResult<Value> {
    Ok(Value::Map(reg.environment()?))
}

fn op_name_in_namespace(reg: &BindingRegistry, _args: &[Value]) -> NamingResult<Value> {
    Ok(Value::from(reg.name_in_namespace()))
}

fn op_close(reg: &BindingRegistry, _args: &[Value]) -> NamingResult<Value> {
    reg.close();
    Ok(Value::Null)
}

fn ctor_default(_args: &[Value]) -> NamingResult<BTreeMap<String, Value>> {
    Ok(BTreeMap::new())
}

fn ctor_with_environment(args: &[Value]) -> NamingResult<BTreeMap<String, Value>> {
    match &args[0] {
        Value::Map(env) => Ok(env.clone()),
        Value::Null => Ok(BTreeMap::new()),
        other => Err(NamingError::IllegalArgument(format!(
            "environment must be a {MAP_TYPE}, got {}",
            other.type_name()
        ))),
    }
}
