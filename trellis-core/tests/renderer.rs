//! Integration Tests for the Renderer
//!
//! These tests mount trees onto the in-memory host and check both the
//! resulting node tree and the host operations the renderer issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::error::{take_diagnostics, RuntimeError};
use trellis_core::reactive::{reactive, Object, Ref, Value};
use trellis_core::render::{
    create_element_block, create_element_vnode, inject_or, keep_alive, on_before_mount,
    on_before_unmount, on_before_update, on_mounted, on_unmounted, on_updated, open_block,
    provide, to_display_string, Component, ComponentInstance, DataOption, HArg, Handler, HostOp,
    MemoryHost, NodeId, PatchFlags, Renderer, SetupResult, VNode, VNodeType,
};
use trellis_core::scheduler::flush_pending;
use trellis_core::{h, props};

type Log = Arc<Mutex<Vec<String>>>;

fn setup() -> (Renderer<MemoryHost>, NodeId) {
    let host = MemoryHost::new();
    let root = host.root();
    (Renderer::new(host), root)
}

fn list(keys: &[&str]) -> VNode {
    let items: Vec<VNode> = keys
        .iter()
        .map(|k| h!("li", props! { "key" => *k }, *k))
        .collect();
    h!("ul", items)
}

fn texts(host: &MemoryHost, el: NodeId) -> Vec<String> {
    host.children(el)
        .into_iter()
        .map(|id| host.text_content(id))
        .collect()
}

fn root_instance(renderer: &Renderer<MemoryHost>, root: NodeId) -> ComponentInstance {
    renderer
        .root(root)
        .and_then(|vnode| vnode.component())
        .expect("root is a mounted component")
}

/// Reordering keeps host nodes for surviving keys, removes dropped keys
/// once, and moves only nodes outside the longest stable run.
#[test]
fn keyed_diff_reuses_nodes_and_moves_minimally() {
    let (renderer, root) = setup();
    renderer.render(Some(list(&["a", "b", "c", "d", "e", "f", "g"])), root);

    let host = renderer.host();
    let ul = host.children(root)[0];
    let before: HashMap<String, NodeId> = host
        .children(ul)
        .into_iter()
        .map(|id| (host.text_content(id), id))
        .collect();
    host.clear_ops();

    renderer.render(Some(list(&["a", "b", "e", "c", "d", "h", "i", "g"])), root);

    assert_eq!(texts(host, ul), ["a", "b", "e", "c", "d", "h", "i", "g"]);
    let after = host.children(ul);
    for key in ["a", "b", "c", "d", "e", "g"] {
        assert!(after.contains(&before[key]), "node for {key} was recreated");
    }

    let ops = host.ops();
    let removed: Vec<NodeId> = ops
        .iter()
        .filter_map(|op| match op {
            HostOp::Remove { id } => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(removed, vec![before["f"]]);

    let created = ops
        .iter()
        .filter(|op| matches!(op, HostOp::CreateElement { .. }))
        .count();
    assert_eq!(created, 2);

    // e moves; h and i are inserted
    assert_eq!(host.insert_count(), 3);
}

#[test]
fn keyed_fragment_between_siblings() {
    fn view(items: &[&str]) -> VNode {
        let children: Vec<VNode> = items
            .iter()
            .map(|k| h!("li", props! { "key" => *k }, *k))
            .collect();
        h!("div", props! {}, h!("header"), VNode::fragment(children), h!("footer"))
    }

    let (renderer, root) = setup();

    renderer.render(Some(view(&["a", "b"])), root);
    renderer.render(Some(view(&["b", "c", "a"])), root);

    assert_eq!(
        renderer.host().inner_html(root),
        "<div><header></header><li>b</li><li>c</li><li>a</li><footer></footer></div>"
    );

    renderer.render(Some(view(&[])), root);
    assert_eq!(
        renderer.host().inner_html(root),
        "<div><header></header><footer></footer></div>"
    );
}

/// Only dynamic descendants of a block are visited on update.
#[test]
fn block_patches_only_dynamic_children() {
    let (renderer, root) = setup();
    let view = |msg: &str| {
        open_block();
        let children = vec![
            create_element_vnode("span", None, "static".into(), PatchFlags::empty(), vec![]),
            create_element_vnode("p", None, msg.into(), PatchFlags::TEXT, vec![]),
        ];
        create_element_block("div", None, children.into(), PatchFlags::empty(), vec![])
    };

    renderer.render(Some(view("a")), root);
    let host = renderer.host();
    let div = host.children(root)[0];
    let p = host.children(div)[1];
    host.clear_ops();

    renderer.render(Some(view("b")), root);
    assert_eq!(
        host.ops(),
        vec![HostOp::SetElementText {
            id: p,
            text: "b".into()
        }]
    );
    assert_eq!(host.inner_html(root), "<div><span>static</span><p>b</p></div>");
}

#[test]
fn hoisted_nodes_are_never_patched() {
    let (renderer, root) = setup();
    let view = |n: i64| {
        h!(
            "div",
            props! {},
            VNode::hoisted("footer", None, "static".into()),
            h!("p", n.to_string())
        )
    };

    renderer.render(Some(view(1)), root);
    renderer.host().clear_ops();
    renderer.render(Some(view(2)), root);

    let ops = renderer.host().ops();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], HostOp::SetElementText { text, .. } if text == "2"));
}

/// Several state writes in one tick re-render a component once.
#[test]
fn component_rerenders_once_per_batch() {
    let (renderer, root) = setup();
    let state = reactive(&Object::from_iter([("a", 1), ("b", 2)]));
    let renders = Arc::new(AtomicI32::new(0));

    let sum = {
        let state = state.clone();
        let renders = renders.clone();
        Component::builder("Sum")
            .render(move |_| {
                renders.fetch_add(1, Ordering::SeqCst);
                let total = state.get("a").as_int().unwrap_or(0) + state.get("b").as_int().unwrap_or(0);
                h!("p", total.to_string())
            })
            .build()
    };

    renderer.render(Some(h!(&sum)), root);
    assert_eq!(renderer.host().text_content(root), "3");

    state.set("a", 10);
    state.set("b", 20);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.host().text_content(root), "3");

    flush_pending();
    assert_eq!(renders.load(Ordering::SeqCst), 2);
    assert_eq!(renderer.host().text_content(root), "30");
}

/// A component unmounted before the flush does not render again.
#[test]
fn unmounted_component_skips_queued_update() {
    let (renderer, root) = setup();
    let count = Ref::new(0i64);
    let renders = Arc::new(AtomicI32::new(0));

    let view = {
        let count = count.clone();
        let renders = renders.clone();
        Component::builder("View")
            .render(move |_| {
                renders.fetch_add(1, Ordering::SeqCst);
                h!("p", count.get().to_string())
            })
            .build()
    };

    renderer.render(Some(h!(&view)), root);
    count.set(1);
    renderer.render(None, root);
    flush_pending();

    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert!(renderer.host().children(root).is_empty());
}

#[test]
fn props_flow_down_and_are_readonly() {
    take_diagnostics();
    let (renderer, root) = setup();
    let state = reactive(&Object::from_iter([
        ("msg", Value::from("hello")),
        ("other", Value::from(0)),
    ]));
    let child_renders = Arc::new(AtomicI32::new(0));

    let child = {
        let child_renders = child_renders.clone();
        Component::builder("Child")
            .props(["msg"])
            .setup(|props, _| {
                assert!(props.set("msg", "changed").is_err());
                SetupResult::Empty
            })
            .render(move |ctx| {
                child_renders.fetch_add(1, Ordering::SeqCst);
                h!("span", to_display_string(&ctx.get("msg")))
            })
            .build()
    };
    let parent = {
        let state = state.clone();
        Component::builder("Parent")
            .render(move |_| {
                state.get("other");
                h!(&child, props! { "msg" => state.get("msg"), "id" => "c1" })
            })
            .build()
    };

    renderer.render(Some(h!(&parent)), root);
    assert_eq!(renderer.host().inner_html(root), "<span>hello</span>");
    assert_eq!(
        take_diagnostics(),
        vec![RuntimeError::ReadonlyProp { key: "msg".into() }]
    );

    let instance = root_instance(&renderer, root)
        .sub_tree()
        .and_then(|tree| tree.component())
        .expect("child instance");
    assert!(instance.props().contains_key("msg"));
    assert!(!instance.props().contains_key("id"));
    assert!(instance.attrs().contains_key("id"));

    state.set("msg", "bye");
    flush_pending();
    assert_eq!(renderer.host().inner_html(root), "<span>bye</span>");
    assert_eq!(child_renders.load(Ordering::SeqCst), 2);

    // Parent re-renders with identical props; the child is left alone
    state.set("other", 1);
    flush_pending();
    assert_eq!(child_renders.load(Ordering::SeqCst), 2);
}

#[test]
fn emit_reaches_parent_handler() {
    let (renderer, root) = setup();
    let total = Arc::new(AtomicI32::new(0));

    let button = Component::builder("Button")
        .render(|ctx| {
            let ctx = ctx.clone();
            h!(
                "button",
                props! { "onClick" => Handler::new(move |_| ctx.emit("increment", &[Value::from(2)])) },
                "+"
            )
        })
        .build();

    let on_increment = {
        let total = total.clone();
        Handler::new(move |args| {
            let by = args.first().and_then(Value::as_int).unwrap_or(1);
            total.fetch_add(by as i32, Ordering::SeqCst);
        })
    };
    renderer.render(Some(h!(&button, props! { "onIncrement" => on_increment })), root);

    let el = renderer.host().children(root)[0];
    assert!(renderer.host().dispatch(el, "click", &[]));
    assert!(renderer.host().dispatch(el, "click", &[]));
    assert_eq!(total.load(Ordering::SeqCst), 4);
}

#[test]
fn inject_finds_nearest_ancestor() {
    let (renderer, root) = setup();

    let leaf = Component::builder("Leaf")
        .setup(|_, _| {
            let theme: String = inject_or("theme", "none".to_string());
            SetupResult::render(move |_| h!("i", theme.clone()))
        })
        .build();
    let middle = {
        let leaf = leaf.clone();
        Component::builder("Middle").render(move |_| h!(&leaf)).build()
    };
    let app = {
        let leaf = leaf.clone();
        Component::builder("App")
            .setup(|_, _| {
                provide("theme", "dark".to_string());
                // Own provides are not visible to self
                let own: String = inject_or("theme", "none".to_string());
                assert_eq!(own, "none");
                SetupResult::Empty
            })
            .render(move |_| h!("div", props! {}, h!(&middle), h!(&leaf)))
            .build()
    };

    renderer.render(Some(h!(&app)), root);
    assert_eq!(renderer.host().inner_html(root), "<div><i>dark</i><i>dark</i></div>");

    let (lonely, lonely_root) = setup();
    lonely.render(Some(h!(&leaf)), lonely_root);
    assert_eq!(lonely.host().inner_html(lonely_root), "<i>none</i>");
}

fn logged(name: &'static str, log: &Log, child: Option<Component>) -> Component {
    let log = log.clone();
    Component::builder(name)
        .setup(move |_, _| {
            let push = |label: &'static str| {
                let log = log.clone();
                move || log.lock().push(format!("{name}:{label}"))
            };
            on_before_mount(push("before_mount"));
            on_mounted(push("mounted"));
            on_before_update(push("before_update"));
            on_updated(push("updated"));
            on_before_unmount(push("before_unmount"));
            on_unmounted(push("unmounted"));
            SetupResult::Empty
        })
        .render(move |_| match &child {
            Some(child) => h!("section", h!(child)),
            None => h!("span", name),
        })
        .build()
}

#[test]
fn lifecycle_hooks_run_in_order() {
    let (renderer, root) = setup();
    let log: Log = Arc::default();

    let child = logged("child", &log, None);
    let parent = logged("parent", &log, Some(child));

    renderer.render(Some(h!(&parent)), root);
    assert_eq!(
        *log.lock(),
        [
            "parent:before_mount",
            "child:before_mount",
            "child:mounted",
            "parent:mounted",
        ]
    );
    log.lock().clear();

    root_instance(&renderer, root).update();
    assert_eq!(*log.lock(), ["parent:before_update", "parent:updated"]);
    log.lock().clear();

    renderer.render(None, root);
    assert_eq!(
        *log.lock(),
        [
            "parent:before_unmount",
            "child:before_unmount",
            "child:unmounted",
            "parent:unmounted",
        ]
    );
    assert!(renderer.host().children(root).is_empty());
}

#[test]
fn keep_alive_caches_and_evicts_least_recent() {
    let (renderer, root) = setup();
    let log: Log = Arc::default();
    let view = Ref::new(Value::from("A"));

    let a = logged("A", &log, None);
    let b = logged("B", &log, None);
    let c = logged("C", &log, None);

    let app = {
        let view = view.clone();
        Component::builder("App")
            .render(move |_| {
                let child = match view.get().as_str() {
                    Some("B") => &b,
                    Some("C") => &c,
                    _ => &a,
                };
                h!(keep_alive(), props! { "max" => 2 }, h!(child))
            })
            .build()
    };
    let mounts = |log: &Log| -> Vec<String> {
        log.lock()
            .iter()
            .filter(|l| l.ends_with(":mounted") || l.ends_with(":unmounted"))
            .cloned()
            .collect()
    };

    renderer.render(Some(h!(&app)), root);
    assert_eq!(renderer.host().inner_html(root), "<span>A</span>");

    view.set(Value::from("B"));
    flush_pending();
    assert_eq!(renderer.host().inner_html(root), "<span>B</span>");

    // A comes back from the cache without remounting
    view.set(Value::from("A"));
    flush_pending();
    assert_eq!(renderer.host().inner_html(root), "<span>A</span>");
    assert_eq!(mounts(&log), ["A:mounted", "B:mounted"]);

    // C pushes B, the least recently used entry, out
    view.set(Value::from("C"));
    flush_pending();
    assert_eq!(renderer.host().inner_html(root), "<span>C</span>");
    assert_eq!(
        mounts(&log),
        ["A:mounted", "B:mounted", "B:unmounted", "C:mounted"]
    );

    renderer.render(None, root);
    assert_eq!(
        mounts(&log)[4..],
        ["A:unmounted".to_string(), "C:unmounted".to_string()]
    );
    assert!(renderer.host().children(root).is_empty());
}

#[test]
fn teleport_renders_into_target_and_follows_it() {
    take_diagnostics();
    let host = MemoryHost::new();
    let root = host.root();
    let modal = host.add_target("modal");
    let other = host.add_target("other");
    let renderer = Renderer::new(host);

    let view = |to: &str, text: &str| {
        let teleport = h(
            VNodeType::Teleport,
            Some(HArg::Props(props! { "to" => to })),
            Some(vec![h!("p", text)].into()),
        );
        h!("div", teleport)
    };

    renderer.render(Some(view("#modal", "hi")), root);
    let host = renderer.host();
    assert_eq!(host.inner_html(modal), "<p>hi</p>");
    assert_eq!(host.inner_html(root), "<div></div>");

    renderer.render(Some(view("#modal", "bye")), root);
    assert_eq!(host.inner_html(modal), "<p>bye</p>");

    renderer.render(Some(view("#other", "bye")), root);
    assert_eq!(host.inner_html(modal), "");
    assert_eq!(host.inner_html(other), "<p>bye</p>");
    assert!(take_diagnostics().is_empty());

    renderer.render(Some(view("#missing", "bye")), root);
    assert_eq!(
        take_diagnostics(),
        vec![RuntimeError::TeleportTargetMissing {
            selector: "#missing".into()
        }]
    );
    assert_eq!(host.inner_html(other), "<p>bye</p>");

    renderer.render(None, root);
    assert_eq!(host.inner_html(other), "");
    assert_eq!(host.inner_html(root), "");
}

#[test]
fn functional_component_renders_from_attrs() {
    let (renderer, root) = setup();
    let label = Component::functional("Label", |attrs, _| {
        let text = attrs
            .get("text")
            .and_then(|p| p.as_value())
            .map(to_display_string)
            .unwrap_or_default();
        h!("b", text)
    });

    renderer.render(Some(h!(&label, props! { "text" => "one" })), root);
    assert_eq!(renderer.host().inner_html(root), "<b>one</b>");

    renderer.render(Some(h!(&label, props! { "text" => "two" })), root);
    assert_eq!(renderer.host().inner_html(root), "<b>two</b>");
}

#[test]
fn data_option_must_be_a_factory() {
    take_diagnostics();
    let (renderer, root) = setup();

    let counter = Component::builder("Counter")
        .data(|_| Object::from_iter([("n", 5)]))
        .render(|ctx| h!("p", to_display_string(&ctx.get("n"))))
        .build();
    renderer.render(Some(h!(&counter)), root);
    assert_eq!(renderer.host().inner_html(root), "<p>5</p>");

    let data = root_instance(&renderer, root).data().expect("data is set up");
    data.set("n", 6);
    flush_pending();
    assert_eq!(renderer.host().inner_html(root), "<p>6</p>");

    let shared = Component::builder("Shared")
        .data_option(DataOption::Value(Object::from_iter([("n", 1)])))
        .render(|ctx| h!("p", to_display_string(&ctx.get("n"))))
        .build();
    renderer.render(Some(h!(&shared)), root);
    assert_eq!(
        take_diagnostics(),
        vec![RuntimeError::DataNotFunction {
            component: "Shared".into()
        }]
    );
    assert_eq!(renderer.host().inner_html(root), "<p></p>");
}

#[test]
fn slots_render_parent_content() {
    let (renderer, root) = setup();
    let card = Component::builder("Card")
        .render(|ctx| {
            let mut children = vec![h!("h1", "title")];
            children.extend(ctx.render_slot("default"));
            h!("article", children)
        })
        .build();

    renderer.render(Some(h(&card, None, Some(vec![h!("p", "body")].into()))), root);
    assert_eq!(
        renderer.host().inner_html(root),
        "<article><h1>title</h1><p>body</p></article>"
    );
}

/// Rendering the same slot twice mounts two independent copies.
#[test]
fn slot_rendered_twice_gets_separate_nodes() {
    let (renderer, root) = setup();
    let twice = Component::builder("Twice")
        .render(|ctx| {
            let mut children = ctx.render_slot("default");
            children.extend(ctx.render_slot("default"));
            h!("div", children)
        })
        .build();

    renderer.render(Some(h(&twice, None, Some(vec![h!("p", "x")].into()))), root);

    let host = renderer.host();
    let div = host.children(root)[0];
    let paragraphs = host.children(div);
    assert_eq!(paragraphs.len(), 2);
    assert_ne!(paragraphs[0], paragraphs[1]);
    assert_eq!(host.inner_html(root), "<div><p>x</p><p>x</p></div>");

    let outer = renderer.root(root).expect("mounted");
    let subtree = outer
        .component()
        .and_then(|instance| instance.sub_tree())
        .expect("rendered subtree");
    let rendered = subtree.children().as_nodes().expect("element children").to_vec();
    assert_eq!(rendered[0].el(), Some(paragraphs[0]));
    assert_eq!(rendered[1].el(), Some(paragraphs[1]));
}
