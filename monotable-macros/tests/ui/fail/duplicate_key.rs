use monotable_macros::model;

#[model(discriminator = "A", discriminator = "B")]
struct Item {
    id: u32,
}

fn main() {}
