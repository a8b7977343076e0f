use serde_json::json;

use super::*;

fn key(value: &str) -> EntityKey {
    EntityKey::new(value)
}

fn field(name: &str) -> FieldKey {
    FieldKey::new(name, None)
}

fn op(key: u64) -> OperationKey {
    OperationKey(key)
}

#[test]
fn writes_to_base_without_layers() {
    let mut store = Store::new("Query");
    let dependency = store.write_record(WriteTarget::Base, &key("Todo:1"), &field("text"), json!("x"));

    assert_eq!(dependency.as_str(), "Todo:1");
    assert_eq!(store.read_record(&key("Todo:1"), &field("text")), Some(&json!("x")));
    assert!(store.layer_owners().is_empty());
}

#[test]
fn root_fields_have_their_own_dependency() {
    let store = Store::new("Query");

    assert_eq!(store.dependency_key(&key("Query"), &field("todos")).as_str(), "Query.todos");
    assert_eq!(store.dependency_key(&key("Todo:1"), &field("text")).as_str(), "Todo:1");
}

#[test]
fn layers_shadow_the_base() {
    let mut store = Store::new("Query");
    store.write_record(WriteTarget::Base, &key("Todo:1"), &field("text"), json!("base"));

    store.reserve_layer(op(1));
    let (target, _) = store.begin_result(op(1), false);
    store.write_record(target, &key("Todo:1"), &field("text"), json!("layer"));

    assert_eq!(store.read_record(&key("Todo:1"), &field("text")), Some(&json!("layer")));
}

#[test]
fn removed_markers_hide_lower_values() {
    let mut store = Store::new("Query");
    store.write_link(WriteTarget::Base, &key("Query"), &field("todo"), Link::Entity(key("Todo:1")));

    store.reserve_layer(op(1));
    let (target, _) = store.begin_result(op(1), false);
    store.remove_field(target, &key("Query"), &field("todo"));
    assert_eq!(store.read_link(&key("Query"), &field("todo")), None);
    assert!(store.inspect_fields(&key("Query")).is_empty());

    store.settle(op(1));
    assert_eq!(store.read_link(&key("Query"), &field("todo")), None);
    assert!(store.layer_owners().is_empty());
}

#[test]
fn squashes_only_from_the_bottom() {
    let mut store = Store::new("Query");
    store.reserve_layer(op(1));
    store.reserve_layer(op(2));

    let (target, _) = store.begin_result(op(2), false);
    store.write_record(target, &key("Query"), &field("index"), json!(2));
    store.settle(op(2));
    assert_eq!(store.layer_owners(), vec![op(1), op(2)]);
    assert_eq!(store.layer_state(op(2)), Some(LayerState::Settled));

    let (target, _) = store.begin_result(op(1), false);
    store.write_record(target, &key("Query"), &field("index"), json!(1));
    store.settle(op(1));

    assert!(store.layer_owners().is_empty());
    assert_eq!(store.read_record(&key("Query"), &field("index")), Some(&json!(2)));
}

#[test]
fn teardown_of_pending_layer_unblocks_squashing() {
    let mut store = Store::new("Query");
    store.reserve_layer(op(1));
    store.reserve_layer(op(2));

    let (target, _) = store.begin_result(op(2), false);
    store.write_record(target, &key("Query"), &field("index"), json!(2));
    store.settle(op(2));

    let touched = store.teardown(op(1));

    assert!(touched.is_empty());
    assert!(store.layer_owners().is_empty());
    assert_eq!(store.read_record(&key("Query"), &field("index")), Some(&json!(2)));
}

#[test]
fn optimistic_layers_never_squash() {
    let mut store = Store::new("Query");
    store.reserve_layer(op(1));
    let (target, _) = store.begin_optimistic(op(1));
    store.write_record(target, &key("Todo:1"), &field("text"), json!("optimistic"));

    store.reserve_layer(op(2));
    let (target, _) = store.begin_result(op(2), false);
    store.write_record(target, &key("Todo:2"), &field("text"), json!("real"));
    store.settle(op(2));

    assert_eq!(store.layer_owners(), vec![op(1), op(2)]);
    assert_eq!(store.layer_state(op(1)), Some(LayerState::Optimistic));

    let touched = store.teardown(op(1));
    assert_eq!(touched.iter().map(DependencyKey::as_str).collect::<Vec<_>>(), vec!["Todo:1"]);
    assert_eq!(store.read_record(&key("Todo:1"), &field("text")), None);
    assert_eq!(store.read_record(&key("Todo:2"), &field("text")), Some(&json!("real")));
    assert!(store.layer_owners().is_empty());
}

#[test]
fn real_results_replace_optimistic_content() {
    let mut store = Store::new("Query");
    store.write_record(WriteTarget::Base, &key("Author:1"), &field("name"), json!("A"));

    store.reserve_layer(op(1));
    let (target, _) = store.begin_optimistic(op(1));
    store.write_record(target, &key("Author:1"), &field("name"), json!("B"));

    let mut dependencies = Dependencies::default();
    dependencies.insert(DependencyKey::from("Author:1"));
    assert!(store.depends_on_optimistic(&dependencies));

    let (target, touched) = store.begin_result(op(1), false);
    assert!(touched.contains(&DependencyKey::from("Author:1")));
    assert_eq!(store.read_record(&key("Author:1"), &field("name")), Some(&json!("A")));

    store.write_record(target, &key("Author:1"), &field("name"), json!("C"));
    store.settle(op(1));

    assert!(!store.depends_on_optimistic(&dependencies));
    assert_eq!(store.read_record(&key("Author:1"), &field("name")), Some(&json!("C")));
}

#[test]
fn results_without_a_layer_go_on_top() {
    let mut store = Store::new("Query");
    store.reserve_layer(op(1));

    let (target, _) = store.begin_result(op(2), false);
    assert_eq!(target, WriteTarget::Layer(op(2)));
    assert_eq!(store.layer_owners(), vec![op(1), op(2)]);
}

#[test]
fn subscription_payloads_move_to_the_top() {
    let mut store = Store::new("Query");
    store.reserve_layer(op(1));
    store.reserve_layer(op(2));
    store.reserve_layer(op(3));

    let (target, _) = store.begin_result(op(1), true);
    store.write_record(target, &key("Query"), &field("value"), json!("subscription"));
    store.settle(op(1));

    assert_eq!(store.layer_owners(), vec![op(2), op(3), op(1)]);

    let (target, _) = store.begin_result(op(3), false);
    store.write_record(target, &key("Query"), &field("value"), json!("query"));
    store.settle(op(3));

    assert_eq!(store.read_record(&key("Query"), &field("value")), Some(&json!("subscription")));
}

#[test]
fn inspects_fields_across_layers() {
    let mut store = Store::new("Query");
    let arguments = json!({"skip": 0, "limit": 2});
    let paged = FieldKey::new("todos", arguments.as_object());
    store.write_link(WriteTarget::Base, &key("Query"), &paged, Link::List(vec![]));

    store.reserve_layer(op(1));
    let (target, _) = store.begin_result(op(1), false);
    store.write_record(target, &key("Query"), &field("count"), json!(3));

    let fields = store.inspect_fields(&key("Query"));
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].field_name, "todos");
    assert_eq!(fields[0].arguments.as_ref(), arguments.as_object());
    assert_eq!(fields[1].field_key, field("count"));
}

#[test]
fn inspects_records_and_links_in_every_layer() {
    let mut store = Store::new("Query");
    store.write_record(WriteTarget::Base, &key("Todo:1"), &field("text"), json!("x"));
    store.write_link(WriteTarget::Base, &key("Todo:1"), &field("author"), Link::Entity(key("Author:1")));

    store.reserve_layer(op(1));
    let (target, _) = store.begin_result(op(1), false);
    store.write_link(target, &key("Todo:1"), &field("tags"), Link::List(vec![]));
    store.write_record(target, &key("Todo:1"), &field("complete"), json!(false));
    store.remove_field(target, &key("Todo:1"), &field("text"));

    let names = store
        .inspect_fields(&key("Todo:1"))
        .into_iter()
        .map(|info| info.field_name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["author", "complete", "tags"]);
}
