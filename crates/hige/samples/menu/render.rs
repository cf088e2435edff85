use std::{fs, path::Path};

use hige::{Context, Hige};
use serde_json::Value;

fn main() -> hige::Result<()> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("samples/menu");

    let template = fs::read_to_string(root.join("menu.mustache"))?;
    let data: Value = serde_json::from_slice(&fs::read(root.join("data.json"))?)?;

    let mut context = Context::from_json(data)?;
    let top = context.root();
    context.set_lambda(top, "strong", |text| format!("<strong>{text}</strong>"));

    let engine = Hige::parse_with_partials(&template, root.join("partials"))?;
    print!("{}", engine.render(&context)?);
    Ok(())
}
