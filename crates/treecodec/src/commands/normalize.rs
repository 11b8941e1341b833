use std::path::Path;

use anyhow::Context;

use crate::session::{Session, read_document};

/// Deserialize then re-serialize, printing the canonical tree.
///
/// Unknown keys are dropped, defaults filled in, and nulls omitted unless
/// `keep_nulls` is set.
pub fn run_normalize(
    session: &Session,
    type_name: &str,
    input: Option<&Path>,
    keep_nulls: bool,
) -> anyhow::Result<()> {
    let ty = session.resolve(type_name)?;
    let document = read_document(input)?;

    let mut codec = session.codec();
    if keep_nulls {
        let mut options = *codec.options();
        options.omit_nulls = false;
        codec = codec.with_options(options);
    }

    let value = codec
        .deserialize(&ty, &document)
        .with_context(|| format!("Document is not a valid {ty}"))?;
    let tree = codec.serialize(&value)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&tree).context("Failed to render document")?
    );
    Ok(())
}
