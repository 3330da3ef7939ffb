//! Print the generated OpenAPI document to stdout.

use anyhow::Result;

fn main() -> Result<()> {
    let spec = sigillo::api::openapi();
    println!("{}", spec.to_pretty_json()?);
    Ok(())
}
