use monotable_macros::model;

#[model(codec = SerdeCodec)]
struct Basket {
    id: u32,
}

fn main() {}
