use std::path::Path;

use tracing::info;

use crate::session::{Session, read_document};

/// Outcome of checking one document.
#[derive(Debug)]
pub enum CheckOutcome {
    Valid,
    Invalid(treecodec_core::Error),
}

/// Deserialize a document against a library type, reporting rather than
/// propagating data errors.
pub fn run_check(
    session: &Session,
    type_name: &str,
    input: Option<&Path>,
) -> anyhow::Result<CheckOutcome> {
    let ty = session.resolve(type_name)?;
    let document = read_document(input)?;

    Ok(match session.codec().deserialize(&ty, &document) {
        Ok(_) => {
            info!(type_name, "Document is valid");
            println!("ok: document is a valid {ty}");
            CheckOutcome::Valid
        }
        Err(e) => {
            eprintln!("error: document is not a valid {ty}");
            eprintln!("  {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            CheckOutcome::Invalid(e)
        }
    })
}
