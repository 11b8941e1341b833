use anyhow::Context;
use treecodec_core::dict_type_representation;

use crate::session::Session;

/// Print the field-type shape of a library type.
pub fn run_schema(session: &Session, type_name: &str) -> anyhow::Result<()> {
    let ty = session.resolve(type_name)?;
    let shape = dict_type_representation(&ty)?;
    let text = serde_json::to_string_pretty(&shape).context("Failed to render shape")?;
    println!("{text}");
    Ok(())
}
