use monotable_macros::model;

#[model(discriminator = "ORDER")]
struct Order {
    id: u32,
    #[relation(many)]
    items: String,
}

fn main() {}
