use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::load_document;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document JSON file
    pub document: PathBuf,
}

pub fn show(args: ShowArgs) -> Result<()> {
    let doc = load_document(&args.document)?;
    print!("{}", doc.serialize()?);
    Ok(())
}
