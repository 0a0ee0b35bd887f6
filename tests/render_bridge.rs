use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use weave::render::{write_draw_tree, OutputFormat, RenderBridge};
use weave::{Interpreter, Value};

#[test]
fn callbacks_run_in_registration_order() {
    let interp = Interpreter::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let log = log.clone();
        interp.on_render(move |v: &Value| log.borrow_mut().push(format!("{}:{}", label, v)));
    }
    assert_eq!(interp.env().render_callback_count(), 3);

    interp.publish(&Value::Number(1.0));
    assert_eq!(*log.borrow(), vec!["first:1", "second:1", "third:1"]);
}

#[test]
fn evaluation_never_publishes_on_its_own() {
    let interp = Interpreter::new().unwrap();
    let count = Rc::new(RefCell::new(0));
    let c = count.clone();
    interp.on_render(move |_| *c.borrow_mut() += 1);

    interp.run_source("($ a 1) ($ b [a] (add a 1)) [b]").unwrap();
    interp.redeclare_state("a", "2").unwrap();
    assert_eq!(*count.borrow(), 0);

    let tree = interp.run_and_publish("[(Vector b b)]").unwrap();
    assert_eq!(*count.borrow(), 1);
    assert_eq!(
        tree,
        Value::List(vec![Value::Vector(
            Box::new(Value::Number(3.0)),
            Box::new(Value::Number(3.0))
        )])
    );
}

#[test]
fn callbacks_registered_on_a_child_reach_the_root_list() {
    let interp = Interpreter::new().unwrap();
    let hits = Rc::new(RefCell::new(0));
    let h = hits.clone();
    interp
        .env()
        .child()
        .register_render_callback(Box::new(move |_: &Value| *h.borrow_mut() += 1));
    interp.publish(&Value::Nil);
    assert_eq!(*hits.borrow(), 1);
}

#[test]
fn callback_may_register_another_while_publishing() {
    let interp = Interpreter::new().unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let env = interp.env().clone();
    let outer_log = log.clone();
    interp.on_render(move |v: &Value| {
        outer_log.borrow_mut().push(format!("outer:{}", v));
        if env.render_callback_count() == 1 {
            let inner_log = outer_log.clone();
            env.register_render_callback(Box::new(move |v: &Value| {
                inner_log.borrow_mut().push(format!("inner:{}", v))
            }));
        }
    });

    interp.publish(&Value::Number(1.0));
    assert_eq!(*log.borrow(), vec!["outer:1"]);
    assert_eq!(interp.env().render_callback_count(), 2);

    interp.publish(&Value::Number(2.0));
    assert_eq!(*log.borrow(), vec!["outer:1", "outer:2", "inner:2"]);
}

#[test]
fn empty_bridge_publish_is_a_no_op() {
    let bridge = RenderBridge::new();
    assert!(bridge.is_empty());
    bridge.publish(&Value::Nil);
}

#[test]
fn draw_tree_json_shape() {
    let interp = Interpreter::new().unwrap();
    let tree = interp
        .run_source("[{:shape :circle :at (Vector 10 20) :fill #ff0000 :r 5}]")
        .unwrap();
    let mut out = Vec::new();
    write_draw_tree(&mut out, &tree, OutputFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!([{
            "at": {"x": 10.0, "y": 20.0},
            "fill": "#ff0000ff",
            "r": 5.0,
            "shape": "circle"
        }])
    );
}

#[test]
fn draw_tree_text_shape() {
    let tree = Interpreter::new().unwrap().run_source("[1 {:k :v}]").unwrap();
    let mut out = Vec::new();
    write_draw_tree(&mut out, &tree, OutputFormat::Text).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "[1 {:k v}]\n");
}
