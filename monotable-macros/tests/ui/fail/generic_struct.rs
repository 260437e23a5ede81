use monotable_macros::model;

#[model(discriminator = "BOX")]
struct Wrapper<T> {
    value: T,
}

fn main() {}
