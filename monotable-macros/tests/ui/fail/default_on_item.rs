use monotable_macros::model;

#[model(discriminator = "ITEM", default = false)]
struct Item {
    id: u32,
}

fn main() {}
