use clap::Parser;

pub const PLACEHOLDER_SPACE_ID: &str = "your-space-id";
pub const PLACEHOLDER_ACCESS_TOKEN: &str = "your-content-delivery-api-key";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "strata-verify",
    about = "Check that published entries carry a well-formed layout field",
    version
)]
pub struct Cli {
    #[arg(long, default_value = PLACEHOLDER_SPACE_ID)]
    pub space_id: String,

    /// Content delivery API token, sent as a bearer token.
    #[arg(long, default_value = PLACEHOLDER_ACCESS_TOKEN)]
    pub access_token: String,

    #[arg(long, default_value = "landingPage")]
    pub content_type: String,

    /// Slug looked up after the full listing.
    #[arg(long, default_value = "homepage")]
    pub slug: String,

    #[arg(long, default_value = "https://cdn.contentful.com")]
    pub base_url: String,

    /// Entry field holding the layout.
    #[arg(long, default_value = "layoutConfig")]
    pub field: String,

    #[arg(long = "timeout", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_seconds: u64,

    /// Exit with status 2 when any entry has an invalid layout.
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    pub fn has_placeholder_credentials(&self) -> bool {
        self.space_id == PLACEHOLDER_SPACE_ID || self.access_token == PLACEHOLDER_ACCESS_TOKEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_delivery_api() {
        let cli = Cli::try_parse_from(["strata-verify"]).unwrap();
        assert_eq!(cli.content_type, "landingPage");
        assert_eq!(cli.slug, "homepage");
        assert_eq!(cli.field, "layoutConfig");
        assert_eq!(cli.base_url, "https://cdn.contentful.com");
        assert!(!cli.strict);
    }

    #[test]
    fn placeholder_detection() {
        let cli = Cli::try_parse_from(["strata-verify", "--space-id", "abc123"]).unwrap();
        assert!(cli.has_placeholder_credentials());

        let cli = Cli::try_parse_from([
            "strata-verify",
            "--space-id",
            "abc123",
            "--access-token",
            "token",
            "--strict",
        ])
        .unwrap();
        assert!(!cli.has_placeholder_credentials());
        assert!(cli.strict);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["strata-verify", "--timeout", "0"]).is_err());
    }
}
