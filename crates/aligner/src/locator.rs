//! Resume-by-content lookup

use contracts::SourceMessage;
use ingestion::extract_link;

/// Finds a start offset in the link source
pub struct LinkLocator;

impl LinkLocator {
    /// Index of the first oldest-first message whose extracted link contains `needle`
    ///
    /// Messages without a link never match.
    pub fn locate(links: &[SourceMessage], needle: &str) -> Option<usize> {
        links.iter().position(|message| {
            message
                .text
                .as_deref()
                .and_then(extract_link)
                .is_some_and(|link| link.contains(needle))
        })
    }
}
