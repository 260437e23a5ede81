use monotable_macros::model;

#[model(discriminator = "ID")]
struct OrderId(String);

fn main() {}
