use monotable_macros::model;

#[model(discriminatr = "ITEM")]
struct Item {
    id: u32,
}

fn main() {}
