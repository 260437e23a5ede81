use monotable_macros::model;

#[model(discriminator = "")]
struct Item {
    id: u32,
}

fn main() {}
