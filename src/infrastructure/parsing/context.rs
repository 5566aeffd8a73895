/// Context for parsing one product detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// URL the page was fetched from; becomes the record's detail URL
    pub url: String,
}

impl PageContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}
