use monotable_core::{Partition, PartitionTransformer, Registry};
use monotable_macros::model;

#[model(default = false)]
struct Draft {
    title: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            title: "untitled".into(),
        }
    }
}

fn main() {
    let mut builder = Registry::builder();
    builder.register_model::<Draft>().unwrap();
    let registry = builder.build().unwrap();

    let draft: Draft = PartitionTransformer::new(&registry)
        .transform(&Partition::default())
        .unwrap();
    assert_eq!(draft.title, "untitled");
}
