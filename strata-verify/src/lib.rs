//! # strata-verify: check published layout fields
//!
//! Fetches every entry of one content type from the content delivery API,
//! validates its layout field against the current envelope schema and then
//! looks up a single entry by slug, the way a rendering frontend would.

pub mod cli;
pub mod error;
pub mod fetch;
pub mod report;

use clap::Parser;

pub use cli::Cli;
pub use error::{Result, VerifyError};
pub use fetch::DeliveryClient;
pub use report::{check_layout, EntryReport, LayoutStatus, SlugLookup, VerifyReport};

pub fn run_from_env() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    if cli.has_placeholder_credentials() {
        return Err(VerifyError::PlaceholderCredentials);
    }

    let client = DeliveryClient::new(&cli)?;
    log::info!("Fetching {} entries", cli.content_type);
    let entries = client.fetch_entries()?;
    let reports: Vec<_> = entries
        .iter()
        .map(|entry| EntryReport::from_entry(entry, &cli.field))
        .collect();

    let lookup = if reports.is_empty() {
        None
    } else {
        log::info!("Looking up entry with slug {:?}", cli.slug);
        let entry = client.fetch_by_slug(&cli.slug)?;
        Some(SlugLookup::from_entry(&cli.slug, entry.as_ref(), &cli.field))
    };

    let report = VerifyReport {
        entries: reports,
        lookup,
    };
    print!("{}", report.render());

    let invalid = report.invalid_count();
    if cli.strict && invalid > 0 {
        return Err(VerifyError::ValidationFailed { count: invalid });
    }
    Ok(())
}
