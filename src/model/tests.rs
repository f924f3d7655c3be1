//! Tests for Model.

use super::*;

fn customers() -> Cube {
    Cube::new("customers", ["id", "name", "email"]).unwrap()
}

fn orders() -> Cube {
    Cube::new("orders", ["id", "customer_id", "total"]).unwrap()
}

/// customers, orders, and orders.customer_id → customers.id
fn shop() -> Model {
    let mut model = Model::new("shop");
    model.add_cube(customers()).unwrap();
    model.add_cube(orders()).unwrap();
    let rel = Relation::new(&orders(), &customers(), "customer_id", "id").unwrap();
    model.add_relation(rel).unwrap();
    model
}

fn relation(model: &Model, left: &str, right: &str, lc: &str, rc: &str) -> Relation {
    Relation::new(
        model.get_cube(left).unwrap(),
        model.get_cube(right).unwrap(),
        lc,
        rc,
    )
    .unwrap()
}

#[test]
fn test_create_empty_model() {
    let model = Model::new("ecommerce");
    assert_eq!(model.name(), "ecommerce");
    assert!(model.cubes().is_empty());
    assert_eq!(model.relation_count(), 0);
    assert_eq!(Model::default().name(), DEFAULT_MODEL_NAME);
}

#[test]
fn test_add_duplicate_cube() {
    let mut model = Model::default();
    model.add_cube(Cube::new("users", ["id"]).unwrap()).unwrap();

    let err = model
        .add_cube(Cube::new("users", ["id", "name"]).unwrap())
        .unwrap_err();
    assert_eq!(err, ModelError::DuplicateName("users".into()));
    assert_eq!(model.cubes().len(), 1);
    assert_eq!(model.get_cube("users").unwrap().columns(), ["id"]);
}

#[test]
fn test_get_cube_not_found() {
    let model = Model::default();
    let err = model.get_cube("users").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_scenario_graph_data() {
    let model = shop();
    let data = model.to_graph_data();

    assert_eq!(data.nodes.len(), 2);
    assert_eq!(data.edges.len(), 1);
    assert_eq!(data.edges[0].label, "customer_id = id");
    assert_eq!(data.edges[0].source, "orders");
    assert_eq!(data.edges[0].target, "customers");
}

#[test]
fn test_scenario_delete_cube_cascades() {
    let mut model = shop();
    let removed = model.remove_cube("customers").unwrap();
    assert_eq!(removed.len(), 1);

    let data = model.to_graph_data();
    assert_eq!(data.nodes.len(), 1);
    assert_eq!(data.nodes[0].id, "orders");
    assert!(data.edges.is_empty());
}

#[test]
fn test_scenario_bogus_column() {
    let mut model = shop();
    let bogus = Relation::new(&orders(), &customers(), "bogus", "id");
    assert!(matches!(bogus, Err(ModelError::Validation(_))));
    assert_eq!(model.relation_count(), 1);

    // A relation built against stale cubes is caught by the model.
    let stale_orders = Cube::new("orders", ["id", "bogus"]).unwrap();
    let rel = Relation::new(&stale_orders, &customers(), "bogus", "id").unwrap();
    let err = model.add_relation(rel).unwrap_err();
    assert!(matches!(err, ModelError::Validation(_)));
    assert_eq!(model.relation_count(), 1);
}

#[test]
fn test_remove_missing_cube() {
    let mut model = shop();
    assert!(model.remove_cube("nope").unwrap_err().is_not_found());
    assert_eq!(model.cubes().len(), 2);
}

#[test]
fn test_remove_cube_removes_incoming_and_outgoing() {
    let mut model = shop();
    model
        .add_cube(Cube::new("payments", ["id", "order_id"]).unwrap())
        .unwrap();
    let rel = relation(&model, "payments", "orders", "order_id", "id");
    model.add_relation(rel).unwrap();
    assert_eq!(model.relation_count(), 2);

    model.remove_cube("orders").unwrap();
    assert_eq!(model.relation_count(), 0);
    for (_, rel) in model.relations() {
        assert!(!rel.references("orders"));
    }
}

#[test]
fn test_add_relation_missing_cube() {
    let mut model = Model::default();
    model.add_cube(customers()).unwrap();

    let rel = Relation::new(&orders(), &customers(), "customer_id", "id").unwrap();
    let err = model.add_relation(rel).unwrap_err();
    assert_eq!(
        err,
        ModelError::Validation("Left cube 'orders' not found in model".into())
    );
}

#[test]
fn test_self_relation_rejected() {
    let mut model = Model::default();
    model
        .add_cube(Cube::new("employees", ["id", "manager_id"]).unwrap())
        .unwrap();
    let rel = relation(&model, "employees", "employees", "manager_id", "id");
    assert!(model.add_relation(rel).is_err());
    assert_eq!(model.relation_count(), 0);
}

#[test]
fn test_cycle_rejected() {
    let mut model = shop();
    let rel = relation(&model, "customers", "orders", "id", "customer_id");
    let err = model.add_relation(rel).unwrap_err();
    assert_eq!(
        err,
        ModelError::Validation("Adding relation customers -> orders would create a cycle".into())
    );
    assert_eq!(model.relation_count(), 1);
}

#[test]
fn test_duplicate_path_rejected() {
    let mut model = shop();
    model
        .add_cube(Cube::new("items", ["id", "order_id"]).unwrap())
        .unwrap();
    let items_orders = relation(&model, "items", "orders", "order_id", "id");
    model.add_relation(items_orders).unwrap();

    // items already reaches customers through orders
    let shortcut = relation(&model, "items", "customers", "id", "id");
    let err = model.add_relation(shortcut).unwrap_err();
    assert!(err.to_string().contains("duplicate path"));

    // and the same edge twice is a duplicate too
    let again = relation(&model, "orders", "customers", "customer_id", "id");
    assert!(model.add_relation(again).is_err());
    assert_eq!(model.relation_count(), 2);
}

#[test]
fn test_add_relation_with_id() {
    let mut model = Model::default();
    model.add_cube(customers()).unwrap();
    model.add_cube(orders()).unwrap();

    let rel = Relation::new(&orders(), &customers(), "customer_id", "id").unwrap();
    model.add_relation_with_id(42, rel.clone()).unwrap();
    assert_eq!(model.relation(42).unwrap(), &rel);

    model.remove_relation(42).unwrap();
    model.add_relation_with_id(42, rel.clone()).unwrap();
    assert!(model.add_relation_with_id(42, rel).is_err());

    // next generated id follows the largest in use
    model.add_cube(Cube::new("items", ["id", "order_id"]).unwrap()).unwrap();
    let rel = relation(&model, "items", "orders", "order_id", "id");
    assert_eq!(model.add_relation(rel).unwrap(), 43);
}

#[test]
fn test_remove_relation() {
    let mut model = shop();
    let id = model
        .find_relation("orders", "customers", "customer_id", "id")
        .unwrap();
    let removed = model.remove_relation(id).unwrap();
    assert_eq!(removed.left_cube(), "orders");
    assert_eq!(model.relation_count(), 0);

    assert!(model.remove_relation(id).unwrap_err().is_not_found());
}

#[test]
fn test_rename_cube_updates_relations() {
    let mut model = shop();
    model.rename_cube("customers", "clients").unwrap();

    assert!(model.get_cube("customers").is_err());
    assert_eq!(model.get_cube("clients").unwrap().name(), "clients");
    let (_, rel) = model.relations().next().unwrap();
    assert_eq!(rel.right_cube(), "clients");
    assert_eq!(model.to_graph_data().edges[0].target, "clients");
}

#[test]
fn test_rename_cube_errors() {
    let mut model = shop();
    assert_eq!(
        model.rename_cube("customers", "orders").unwrap_err(),
        ModelError::DuplicateName("orders".into())
    );
    assert!(model.rename_cube("nope", "x").unwrap_err().is_not_found());
    assert!(matches!(
        model.rename_cube("customers", ""),
        Err(ModelError::Validation(_))
    ));
    model.rename_cube("customers", "customers").unwrap();
    assert_eq!(model, shop());
}

#[test]
fn test_remove_referenced_column_fails() {
    let mut model = shop();
    let err = model.remove_column("orders", "customer_id").unwrap_err();
    assert!(matches!(err, ModelError::Validation(_)));
    assert!(model.get_cube("orders").unwrap().has_column("customer_id"));

    model.remove_column("orders", "total").unwrap();
    assert_eq!(model.get_cube("orders").unwrap().columns(), ["id", "customer_id"]);
}

#[test]
fn test_set_columns() {
    let mut model = shop();
    let keep_fk = vec!["id".to_string(), "customer_id".to_string(), "status".to_string()];
    model.set_columns("orders", &keep_fk).unwrap();
    assert_eq!(model.get_cube("orders").unwrap().columns(), keep_fk.as_slice());

    let drop_fk = vec!["id".to_string()];
    assert!(model.set_columns("orders", &drop_fk).is_err());
    assert_eq!(model.get_cube("orders").unwrap().columns(), keep_fk.as_slice());
}

#[test]
fn test_add_column() {
    let mut model = shop();
    model.add_column("customers", "phone").unwrap();
    assert!(model.get_cube("customers").unwrap().has_column("phone"));
    assert!(model.add_column("customers", "phone").is_err());
    assert!(model.add_column("nope", "x").unwrap_err().is_not_found());
}

#[test]
fn test_update_relation() {
    let mut model = shop();
    let id = 1;

    let edit = RelationEdit::default()
        .left_column("id")
        .cardinality(Cardinality::OneToOne);
    model.update_relation(id, &edit).unwrap();
    let rel = model.relation(id).unwrap();
    assert_eq!(rel.left_column(), "id");
    assert_eq!(rel.cardinality(), Cardinality::OneToOne);

    let bad = RelationEdit::default().right_column("bogus");
    assert!(model.update_relation(id, &bad).is_err());
    assert_eq!(model.relation(id).unwrap().right_column(), "id");

    assert!(model.update_relation(99, &edit).unwrap_err().is_not_found());
}

#[test]
fn test_update_relation_repoints_cubes() {
    let mut model = shop();
    model
        .add_cube(Cube::new("accounts", ["id", "email"]).unwrap())
        .unwrap();

    let edit = RelationEdit::default().right_cube("accounts");
    model.update_relation(1, &edit).unwrap();
    assert_eq!(model.relation(1).unwrap().right_cube(), "accounts");

    // reversing the edge is judged without the edge itself
    let reverse = RelationEdit::default()
        .left_cube("accounts")
        .right_cube("orders")
        .left_column("id")
        .right_column("customer_id");
    model.update_relation(1, &reverse).unwrap();
    assert_eq!(model.root_cubes(), vec!["customers", "accounts"]);
}

#[test]
fn test_graph_data_is_idempotent() {
    let model = shop();
    assert_eq!(model.to_graph_data(), model.to_graph_data());
}

#[test]
fn test_graph_data_preserves_insertion_order() {
    let mut model = Model::default();
    for name in ["zeta", "alpha", "mid"] {
        model.add_cube(Cube::new(name, ["id"]).unwrap()).unwrap();
    }
    let ids: Vec<_> = model.to_graph_data().nodes.into_iter().map(|n| n.id).collect();
    assert_eq!(ids, ["zeta", "alpha", "mid"]);
}

#[test]
fn test_reachability_and_roots() {
    let mut model = shop();
    model
        .add_cube(Cube::new("items", ["id", "order_id"]).unwrap())
        .unwrap();
    let rel = relation(&model, "items", "orders", "order_id", "id");
    model.add_relation(rel).unwrap();

    let reach = model.reachability();
    assert_eq!(reach["items"]["orders"], 1);
    assert_eq!(reach["items"]["customers"], 2);
    assert!(reach["customers"].is_empty());

    let queryable = model.queryable_with();
    assert!(queryable["customers"].contains("items"));
    assert!(queryable["customers"].contains("customers"));

    assert_eq!(model.root_cubes(), vec!["items"]);

    let order = model.topological_order().unwrap();
    let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
    assert!(pos("items") < pos("orders"));
    assert!(pos("orders") < pos("customers"));
}

/// Cubes a, b, c, x, y with relations x -> y (1), b -> c (2), a -> c (3).
fn fan_in() -> Model {
    let mut model = Model::default();
    for name in ["a", "b", "c", "x", "y"] {
        model
            .add_cube(Cube::new(name, ["id", "next_id"]).unwrap())
            .unwrap();
    }
    for (l, r) in [("x", "y"), ("b", "c"), ("a", "c")] {
        let rel = relation(&model, l, r, "next_id", "id");
        model.add_relation(rel).unwrap();
    }
    model
}

#[test]
fn test_add_relation_making_existing_one_redundant() {
    let mut model = fan_in();
    let before = model.clone();

    // a -> b would turn a -> c into a second path a -> b -> c
    let rel = relation(&model, "a", "b", "next_id", "id");
    let err = model.add_relation(rel).unwrap_err();
    assert!(err.to_string().contains("alongside relation 3"), "{}", err);
    assert_eq!(model, before);
}

#[test]
fn test_edit_making_existing_relation_redundant() {
    let mut model = fan_in();
    let before = model.clone();

    let edit = RelationEdit::default().left_cube("a").right_cube("b");
    let err = model.update_relation(1, &edit).unwrap_err();
    assert!(matches!(err, ModelError::Validation(_)));
    assert_eq!(model, before);
}

#[test]
fn test_accepted_model_replays_in_id_order() {
    let model = fan_in();
    let mut replayed = Model::default();
    for cube in model.cubes() {
        replayed.add_cube(cube.clone()).unwrap();
    }
    for (id, rel) in model.relations() {
        replayed.add_relation_with_id(id, rel.clone()).unwrap();
    }
    assert_eq!(replayed, model);
}

#[test]
fn test_relations_are_kept_in_id_order() {
    let mut model = Model::default();
    for name in ["a", "b", "c"] {
        model
            .add_cube(Cube::new(name, ["id", "next_id"]).unwrap())
            .unwrap();
    }
    let bc = relation(&model, "b", "c", "next_id", "id");
    let ab = relation(&model, "a", "b", "next_id", "id");
    model.add_relation_with_id(7, bc).unwrap();
    model.add_relation_with_id(2, ab).unwrap();

    let ids: Vec<_> = model.relations().map(|(id, _)| id).collect();
    assert_eq!(ids, [2, 7]);
    let edges: Vec<_> = model.to_graph_data().edges.into_iter().map(|e| e.id).collect();
    assert_eq!(edges, ["edge_2", "edge_7"]);
}
