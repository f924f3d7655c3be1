//! Sample e-commerce model used to seed an empty store.

use crate::model::{Cardinality, Cube, Model, Relation};

/// Cubes of the sample model.
const SAMPLE_CUBES: &[(&str, &[&str])] = &[
    ("promotions", &["id", "code"]),
    ("returns", &["id", "reason"]),
    (
        "order_items",
        &["id", "order_id", "product_id", "quantity", "unit_price"],
    ),
    ("products", &["id", "name", "category", "price", "stock"]),
    ("product_details", &["id", "name", "description"]),
    (
        "orders",
        &["id", "customer_id", "order_date", "total", "status"],
    ),
    ("customers", &["id", "name", "email", "created_at"]),
    ("warehouses", &["id", "name", "capacity"]),
];

/// Relations of the sample model: (left, right, left column, right column, cardinality).
const SAMPLE_RELATIONS: &[(&str, &str, &str, &str, Cardinality)] = &[
    ("promotions", "order_items", "id", "id", Cardinality::ManyToOne),
    ("returns", "order_items", "id", "id", Cardinality::OneToMany),
    ("order_items", "products", "product_id", "id", Cardinality::ManyToOne),
    ("products", "product_details", "id", "id", Cardinality::OneToOne),
    ("order_items", "orders", "order_id", "id", Cardinality::ManyToOne),
    ("orders", "customers", "customer_id", "id", Cardinality::ManyToOne),
];

/// Build the sample model.
///
/// # Panics
///
/// Panics if the constant sample definitions above stop forming a valid model.
pub fn sample_model() -> Model {
    let mut model = Model::new(super::DEFAULT_STORE_MODEL_NAME);

    for (name, columns) in SAMPLE_CUBES {
        let cube = Cube::new(*name, columns.iter().copied()).expect("valid sample cube");
        model.add_cube(cube).expect("unique sample cube");
    }

    for (left, right, left_column, right_column, cardinality) in SAMPLE_RELATIONS {
        let relation = Relation::new(
            model.get_cube(left).expect("sample cube"),
            model.get_cube(right).expect("sample cube"),
            *left_column,
            *right_column,
        )
        .expect("valid sample relation")
        .with_cardinality(*cardinality);
        model.add_relation(relation).expect("acyclic sample relation");
    }

    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_model_shape() {
        let model = sample_model();
        assert_eq!(model.cubes().len(), 8);
        assert_eq!(model.relation_count(), 6);
        assert_eq!(
            model.root_cubes(),
            vec!["promotions", "returns", "warehouses"]
        );
    }
}
