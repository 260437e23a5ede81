use anyhow::Result;
use monotable_core::{
    DomainTransformer, MapperError, PartitionAggregator, PartitionTransformer, Registry,
};
use monotable_macros::model;
use serde_json::json;

#[model(discriminator = "ITEM")]
#[derive(Debug, Clone, PartialEq)]
struct Item {
    pk: String,
    sk: String,
    id: u32,
    sku: String,
}

#[model(discriminator = "CUSTOMER")]
#[derive(Debug, Clone, PartialEq)]
struct Customer {
    pk: String,
    sk: String,
    name: String,
}

#[model(discriminator = "ORDER")]
#[derive(Debug, Clone, PartialEq)]
struct Order {
    pk: String,
    sk: String,
    id: u32,
    #[relation(many)]
    items: Vec<Item>,
    #[relation(one)]
    customer: Option<Customer>,
}

#[model]
#[derive(Debug, PartialEq)]
struct OrderLines {
    #[relation(many)]
    items: Vec<Item>,
}

fn registry() -> Registry {
    let mut builder = Registry::builder();
    builder
        .register_model::<Item>()
        .and_then(|b| b.register_model::<Customer>())
        .and_then(|b| b.register_model::<Order>())
        .and_then(|b| b.register_model::<OrderLines>())
        .expect("models register");
    builder.build().expect("registry builds")
}

fn item(id: u32) -> Item {
    Item {
        pk: "ORDER#1".into(),
        sk: format!("ITEM#{id}"),
        id,
        sku: format!("SKU-{id}"),
    }
}

fn order() -> Order {
    Order {
        pk: "ORDER#1".into(),
        sk: "ORDER#1".into(),
        id: 1,
        items: vec![item(1), item(2)],
        customer: None,
    }
}

#[test]
fn order_is_written_after_its_items() -> Result<()> {
    let registry = registry();
    let records = DomainTransformer::new(&registry, "ItemType").transform(&order())?;

    let keys: Vec<_> = records
        .iter()
        .map(|r| {
            (
                r.discriminator("ItemType").unwrap_or_default().to_string(),
                r.get("sk").cloned(),
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("ITEM".to_string(), Some(json!("ITEM#1"))),
            ("ITEM".to_string(), Some(json!("ITEM#2"))),
            ("ORDER".to_string(), Some(json!("ORDER#1"))),
        ]
    );
    assert!(records[2].get("items").is_none());
    Ok(())
}

#[test]
fn partition_is_assembled_into_order() -> Result<()> {
    let registry = registry();
    let records = vec![
        json_record(json!({ "ItemType": "ORDER", "pk": "ORDER#1", "sk": "ORDER#1", "id": 1 })),
        json_record(json!({ "ItemType": "ITEM", "pk": "ORDER#1", "sk": "ITEM#1", "id": 1, "sku": "SKU-1" })),
        json_record(json!({ "ItemType": "ITEM", "pk": "ORDER#1", "sk": "ITEM#2", "id": 2, "sku": "SKU-2" })),
    ];

    let partition = PartitionAggregator::aggregate("ItemType", records)?;
    let loaded: Order = PartitionTransformer::new(&registry).transform(&partition)?;

    assert_eq!(loaded, order());
    Ok(())
}

#[test]
fn round_trip_preserves_the_aggregate() -> Result<()> {
    let registry = registry();
    let mut original = order();
    original.items.push(item(3));
    original.customer = Some(Customer {
        pk: "ORDER#1".into(),
        sk: "CUSTOMER#7".into(),
        name: "Ada".into(),
    });

    let records = DomainTransformer::new(&registry, "ItemType").transform(&original)?;
    let partition = PartitionAggregator::aggregate("ItemType", records)?;
    let back: Order = PartitionTransformer::new(&registry).transform(&partition)?;

    assert_eq!(back, original);
    Ok(())
}

#[test]
fn container_round_trip_ignores_unrelated_records() -> Result<()> {
    let registry = registry();
    let lines = OrderLines {
        items: vec![item(1), item(2)],
    };

    let mut records = DomainTransformer::new(&registry, "ItemType").transform(&lines)?;
    records.push(json_record(json!({ "ItemType": "AUDIT", "pk": "ORDER#1", "sk": "AUDIT#1" })));

    let partition = PartitionAggregator::aggregate("ItemType", records)?;
    let back: OrderLines = PartitionTransformer::new(&registry).transform(&partition)?;
    assert_eq!(back, lines);
    Ok(())
}

#[test]
fn missing_relation_records_leave_fields_unset() -> Result<()> {
    let registry = registry();
    let records = vec![json_record(
        json!({ "ItemType": "ORDER", "pk": "ORDER#9", "sk": "ORDER#9", "id": 9 }),
    )];

    let partition = PartitionAggregator::aggregate("ItemType", records)?;
    let loaded: Order = PartitionTransformer::new(&registry).transform(&partition)?;
    assert_eq!(loaded.id, 9);
    assert!(loaded.items.is_empty());
    assert!(loaded.customer.is_none());
    Ok(())
}

#[test]
fn root_record_must_be_unique() -> Result<()> {
    let registry = registry();
    let transformer = PartitionTransformer::new(&registry);

    let none = PartitionAggregator::aggregate(
        "ItemType",
        vec![json_record(json!({ "ItemType": "ITEM", "pk": "p", "sk": "ITEM#1", "id": 1, "sku": "s" }))],
    )?;
    assert!(matches!(
        transformer.transform::<Order>(&none),
        Err(MapperError::MissingRootRecord { .. })
    ));

    let two = PartitionAggregator::aggregate(
        "ItemType",
        vec![
            json_record(json!({ "ItemType": "ORDER", "pk": "p", "sk": "ORDER#1", "id": 1 })),
            json_record(json!({ "ItemType": "ORDER", "pk": "p", "sk": "ORDER#2", "id": 2 })),
        ],
    )?;
    assert!(matches!(
        transformer.transform::<Order>(&two),
        Err(MapperError::AmbiguousRootRecord { count: 2, .. })
    ));
    Ok(())
}

#[test]
fn malformed_relation_record_aborts_the_load() -> Result<()> {
    let registry = registry();
    let partition = PartitionAggregator::aggregate(
        "ItemType",
        vec![
            json_record(json!({ "ItemType": "ORDER", "pk": "p", "sk": "ORDER#1", "id": 1 })),
            json_record(json!({ "ItemType": "ITEM", "pk": "p", "sk": "ITEM#1", "id": "not a number" })),
        ],
    )?;

    let err = PartitionTransformer::new(&registry)
        .transform::<Order>(&partition)
        .unwrap_err();
    assert!(matches!(err, MapperError::Decode { .. }));
    Ok(())
}

fn json_record(value: serde_json::Value) -> monotable_core::Record {
    serde_json::from_value(value).expect("object literal")
}
