//! End-to-end behaviour of a binding context through its public surface.

use naming_context::signature::{hash_operation, CONTEXT_INTERFACE, OBJECT_TYPE, STRING_TYPE};
use naming_context::{
    Attribute, BindingContext, InvocationCause, LocalServer, ManagementError, NamingError, NotificationKind,
    RegistrationState, Value,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn second_bind_of_same_name_fails() {
    init_tracing();
    let ctx = BindingContext::new();
    ctx.bind("A", Some(Value::Int(1))).unwrap();
    let err = ctx.bind("A", Some(Value::Int(2))).unwrap_err();
    assert!(matches!(err, NamingError::NameAlreadyBound { .. }));
    assert_eq!(ctx.lookup("A"), Ok(Value::Int(1)));
}

#[test]
fn null_binding_then_double_unbind() {
    init_tracing();
    let ctx = BindingContext::new();
    ctx.bind("B", None).unwrap();
    let v = ctx.lookup("B").unwrap();
    assert_eq!(v, Value::Null);
    assert_eq!(v.to_string(), "null");
    ctx.unbind("B").unwrap();
    assert_eq!(ctx.unbind("B"), Err(NamingError::NotFound("B".into())));
}

#[test]
fn rebind_always_succeeds() {
    let ctx = BindingContext::new();
    ctx.rebind("r", Some(Value::Long(7))).unwrap();
    ctx.rebind("r", Some(Value::Long(8))).unwrap();
    assert_eq!(ctx.lookup("r"), Ok(Value::Long(8)));
}

#[test]
fn invoke_with_unknown_signature_is_not_found() {
    init_tracing();
    let ctx = BindingContext::new();
    let err = ctx
        .invoke("bind", &[Value::from("C"), Value::Int(5)], &["String", "int"])
        .unwrap_err();
    match err {
        ManagementError::OperationNotFound { name, hash, .. } => {
            assert_eq!(name, "bind");
            assert_eq!(hash, hash_operation(CONTEXT_INTERFACE, "bind", &["String", "int"]));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(ctx.get_attribute("C").is_err());
}

#[test]
fn signature_hash_is_reproducible() {
    let a = hash_operation(CONTEXT_INTERFACE, "rebind", &[STRING_TYPE, OBJECT_TYPE]);
    let b = hash_operation(CONTEXT_INTERFACE, "rebind", &[STRING_TYPE.to_string(), OBJECT_TYPE.to_string()]);
    assert_eq!(a, b);
    let advertised = BindingContext::new()
        .describe_operations()
        .into_iter()
        .find(|op| op.name == "rebind")
        .map(|op| op.hash);
    assert_eq!(advertised, Some(a));
}

#[test]
fn concurrent_binds_through_context() {
    init_tracing();
    for round in 0..100 {
        let ctx = Arc::new(BindingContext::new());
        let threads = 4;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads as i32)
            .map(|i| {
                let ctx = ctx.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ctx.bind("shared", Some(Value::Int(i)))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let already = results
            .iter()
            .filter(|r| matches!(r, Err(NamingError::NameAlreadyBound { .. })))
            .count();
        assert_eq!((ok, already), (1, threads - 1), "round {round}");
        let winner = results.iter().position(|r| r.is_ok()).unwrap() as i32;
        assert_eq!(ctx.lookup("shared"), Ok(Value::Int(winner)));
    }
}

#[test]
fn full_operation_surface() {
    let ctx = BindingContext::new();
    let s = STRING_TYPE;
    let o = OBJECT_TYPE;

    ctx.invoke("bind", &[Value::from("x"), Value::Null], &[s, o]).unwrap();
    assert_eq!(ctx.invoke("lookup", &[Value::from("x")], &[s]), Ok(Value::Null));
    ctx.invoke("rebind", &[Value::from("x"), Value::Int(3)], &[s, o]).unwrap();
    ctx.invoke("rename", &[Value::from("x"), Value::from("y")], &[s, s]).unwrap();
    assert_eq!(ctx.invoke("lookupLink", &[Value::from("y")], &[s]), Ok(Value::Int(3)));

    let listed = ctx.invoke("listBindings", &[Value::from("")], &[s]).unwrap();
    match listed {
        Value::List(items) => {
            assert_eq!(items.len(), 1);
            let entry = items[0].as_map().unwrap();
            assert_eq!(entry.get("name"), Some(&Value::from("y")));
            assert_eq!(entry.get("object"), Some(&Value::Int(3)));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(
        ctx.invoke("addToEnvironment", &[Value::from("k"), Value::from("v")], &[s, o]),
        Ok(Value::Null)
    );
    assert_eq!(
        ctx.invoke("removeFromEnvironment", &[Value::from("k")], &[s]),
        Ok(Value::from("v"))
    );
    assert_eq!(ctx.invoke("getNameInNamespace", &[], &[]), Ok(Value::from("")));

    ctx.invoke("unbind", &[Value::from("y")], &[s]).unwrap();
    let err = ctx.invoke("unbind", &[Value::from("y")], &[s]).unwrap_err();
    assert!(matches!(
        err,
        ManagementError::InvocationFailed { cause: InvocationCause::Naming(NamingError::NotFound(_)), .. }
    ));

    ctx.invoke("close", &[], &[]).unwrap();
    let err = ctx.invoke("lookup", &[Value::from("y")], &[s]).unwrap_err();
    assert!(matches!(
        err,
        ManagementError::InvocationFailed { cause: InvocationCause::Naming(NamingError::Closed), .. }
    ));
}

#[test]
fn notifications_follow_mutations() {
    let ctx = BindingContext::new();
    let rx = ctx.subscribe();
    ctx.bind("a", None).unwrap();
    ctx.set_attribute(Attribute::new("a", 1)).unwrap();
    ctx.rename("a", "b").unwrap();
    ctx.unbind("b").unwrap();

    let events: Vec<_> = rx.try_iter().collect();
    let kinds: Vec<_> = events.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::BindingAdded,
            NotificationKind::BindingRenamed,
            NotificationKind::BindingRemoved
        ]
    );
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(events[1].old_name.as_deref(), Some("a"));
}

#[test]
fn metadata_snapshot() {
    let ctx = BindingContext::new();
    ctx.bind("alpha", Some(Value::from("a"))).unwrap();
    let info = ctx.context_info();
    assert_eq!(info.attributes.len(), 1);
    assert_eq!(info.attributes[0].type_name, "java.lang.String");
    assert_eq!(info.operations.len(), 14);
    assert_eq!(info.constructors.len(), 2);
    assert_eq!(info.notifications.len(), 3);
    assert!(info.description.contains("unregistered"));

    ctx.bind("beta", None).unwrap();
    assert_eq!(ctx.context_info().attributes.len(), 2);
    assert_eq!(ctx.context_info().operations, info.operations);
}

#[test]
fn generated_identity_uses_server_domain() {
    let ctx = BindingContext::new();
    let id = ctx
        .pre_register(Arc::new(LocalServer::new("unit")), None)
        .unwrap();
    assert_eq!(ctx.registration_state(), RegistrationState::Pending);
    if std::env::var("NAMING_CONTEXT_DOMAIN").is_err() {
        assert_eq!(id.domain(), "unit");
    }
    assert_eq!(id.property("type"), Some("NamingContext"));
    assert!(id.property("id").is_some());
    assert!(ctx.server().is_some());

    ctx.post_register(false);
    assert_eq!(ctx.registration_state(), RegistrationState::Unregistered);
    assert!(ctx.identity().is_none());
}
