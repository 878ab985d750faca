use std::env;
use std::error::Error;
use xml_tree::{TreeBuilder, XmlItem};

fn main() -> Result<(), Box<dyn Error>> {
    let expr = env::args().nth(1).unwrap_or_else(|| "//item".to_string());

    let mut builder = TreeBuilder::new();
    builder.comment("inventory")?;
    builder.start_element("stock", &[("xmlns:p", "urn:price")])?;
    for (id, name, price) in [("1", "apple", "120"), ("2", "pear", "90")] {
        builder.start_element("item", &[("id", id), ("p:yen", price)])?;
        builder.characters(name)?;
        builder.end_element()?;
    }
    builder.end_element()?;

    let document = builder.finish()?;
    println!("{}", document.borrow());

    for item in XmlItem::from(document).select_nodes(&expr)? {
        println!("{}\t{}", item.unique_path(), item.string_value());
    }

    Ok(())
}
