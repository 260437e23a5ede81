use monotable_core::{DomainTransformer, Registry};
use monotable_macros::model;

#[model(discriminator = "LINE")]
struct Line {
    sku: String,
}

#[model(discriminator = "ORDER")]
struct Order {
    id: u32,
    #[relation(many)]
    lines: Vec<Line>,
}

fn main() {
    let mut builder = Registry::builder();
    builder
        .register_model::<Line>()
        .and_then(|b| b.register_model::<Order>())
        .unwrap();
    let registry = builder.build().unwrap();

    let order = Order {
        id: 1,
        lines: vec![Line { sku: "A".into() }],
    };
    let records = DomainTransformer::new(&registry, "ItemType")
        .transform(&order)
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(order.id, 1);
    assert_eq!(order.lines[0].sku, "A");
}
