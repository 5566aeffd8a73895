/// Collapse every whitespace run to a single space and trim both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapsed text, or `None` when nothing is left.
pub fn non_empty_collapsed(raw: &str) -> Option<String> {
    let collapsed = collapse_whitespace(raw);
    (!collapsed.is_empty()).then_some(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs() {
        assert_eq!(collapse_whitespace("  A  Light\tin the\n\nAttic "), "A Light in the Attic");
        assert_eq!(non_empty_collapsed(" \n "), None);
        assert_eq!(non_empty_collapsed(" Poetry "), Some("Poetry".to_string()));
    }
}
