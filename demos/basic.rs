use naming_context::signature::{OBJECT_TYPE, STRING_TYPE};
use naming_context::{BindingContext, LocalServer, Value};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let ctx = BindingContext::new();
    let events = ctx.subscribe();

    let identity = ctx
        .pre_register(Arc::new(LocalServer::new("naming")), None)
        .expect("pre-register");
    ctx.post_register(true);
    println!("registered as {identity}");

    ctx.bind("greeting", Some(Value::from("hello"))).unwrap();
    ctx.bind("nothing", None).unwrap();
    ctx.invoke("bind", &[Value::from("answer"), Value::Int(42)], &[STRING_TYPE, OBJECT_TYPE])
        .unwrap();

    for attr in ctx.describe_attributes() {
        println!("{} : {} = {}", attr.name, attr.type_name, ctx.get_attribute(&attr.name).unwrap());
    }
    for event in events.try_iter() {
        println!("event #{} {:?} {}", event.sequence, event.kind, event.name);
    }
}
