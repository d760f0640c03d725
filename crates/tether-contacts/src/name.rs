//! Composition and decomposition of short display names.
//!
//! A "short name" is the space-joined `prefix given middle family suffix`
//! form the UI shows in its edit field. Decomposition maps 1-5 tokens
//! positionally; longer names keep the first token as prefix, the last
//! three as middle/family/suffix, and fold everything in between into the
//! given name.

use crate::schema::StructuredName;

pub fn from_short_name(short_name: &str) -> StructuredName {
    let tokens: Vec<&str> = short_name.split(' ').collect();
    let mut name = StructuredName::default();

    match tokens.len() {
        1 => {
            name.given_name = Some(short_name.to_string());
        }
        2 => {
            name.given_name = Some(tokens[0].to_string());
            name.family_name = Some(tokens[1].to_string());
        }
        3 => {
            name.given_name = Some(tokens[0].to_string());
            name.middle_name = Some(tokens[1].to_string());
            name.family_name = Some(tokens[2].to_string());
        }
        4 => {
            name.prefix = Some(tokens[0].to_string());
            name.given_name = Some(tokens[1].to_string());
            name.middle_name = Some(tokens[2].to_string());
            name.family_name = Some(tokens[3].to_string());
        }
        5 => {
            name.prefix = Some(tokens[0].to_string());
            name.given_name = Some(tokens[1].to_string());
            name.middle_name = Some(tokens[2].to_string());
            name.family_name = Some(tokens[3].to_string());
            name.suffix = Some(tokens[4].to_string());
        }
        n => {
            name.prefix = Some(tokens[0].to_string());
            name.given_name = Some(tokens[1..n - 3].join(" "));
            name.middle_name = Some(tokens[n - 3].to_string());
            name.family_name = Some(tokens[n - 2].to_string());
            name.suffix = Some(tokens[n - 1].to_string());
        }
    }

    name
}

pub fn to_short_name(name: &StructuredName) -> String {
    [
        name.prefix.as_deref(),
        name.given_name.as_deref(),
        name.middle_name.as_deref(),
        name.family_name.as_deref(),
        name.suffix.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

pub fn to_display_name(name: &StructuredName, organization: Option<&str>) -> String {
    let mut display = to_short_name(name);
    if let Some(org) = organization.filter(|org| !org.is_empty()) {
        if !display.is_empty() {
            display.push(' ');
        }
        display.push_str(org);
    }
    display
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_token() {
        let name = from_short_name("Prince");
        assert_eq!(name.given_name.as_deref(), Some("Prince"));
        assert_eq!(name.family_name, None);
        assert_eq!(name.prefix, None);
    }

    #[test]
    fn test_two_and_three_tokens() {
        let name = from_short_name("Jane Public");
        assert_eq!(name.given_name.as_deref(), Some("Jane"));
        assert_eq!(name.family_name.as_deref(), Some("Public"));

        let name = from_short_name("Jane Q. Public");
        assert_eq!(name.given_name.as_deref(), Some("Jane"));
        assert_eq!(name.middle_name.as_deref(), Some("Q."));
        assert_eq!(name.family_name.as_deref(), Some("Public"));
    }

    #[test]
    fn test_four_tokens_gain_prefix() {
        let name = from_short_name("Dr. Jane Q. Public");
        assert_eq!(name.prefix.as_deref(), Some("Dr."));
        assert_eq!(name.given_name.as_deref(), Some("Jane"));
        assert_eq!(name.middle_name.as_deref(), Some("Q."));
        assert_eq!(name.family_name.as_deref(), Some("Public"));
        assert_eq!(name.suffix, None);
    }

    #[test]
    fn test_five_tokens_full_decomposition() {
        let name = from_short_name("Dr. Jane Q. Public Jr.");
        assert_eq!(name.prefix.as_deref(), Some("Dr."));
        assert_eq!(name.given_name.as_deref(), Some("Jane"));
        assert_eq!(name.middle_name.as_deref(), Some("Q."));
        assert_eq!(name.family_name.as_deref(), Some("Public"));
        assert_eq!(name.suffix.as_deref(), Some("Jr."));
    }

    #[test]
    fn test_five_token_roundtrip() {
        let original = "Dr. Jane Q. Public Jr.";
        assert_eq!(to_short_name(&from_short_name(original)), original);
    }

    #[test]
    fn test_many_tokens_fold_into_given_name() {
        let name = from_short_name("Don Juan Carlos de la Vega Sr.");
        assert_eq!(name.prefix.as_deref(), Some("Don"));
        assert_eq!(name.given_name.as_deref(), Some("Juan Carlos de"));
        assert_eq!(name.middle_name.as_deref(), Some("la"));
        assert_eq!(name.family_name.as_deref(), Some("Vega"));
        assert_eq!(name.suffix.as_deref(), Some("Sr."));
        assert_eq!(
            to_short_name(&name),
            "Don Juan Carlos de la Vega Sr."
        );
    }

    #[test]
    fn test_display_name_appends_organization() {
        let name = from_short_name("Jane Public");
        assert_eq!(
            to_display_name(&name, Some("Acme Corp")),
            "Jane Public Acme Corp"
        );
        assert_eq!(to_display_name(&name, None), "Jane Public");
        assert_eq!(to_display_name(&name, Some("")), "Jane Public");
    }

    #[test]
    fn test_short_name_skips_empty_fields() {
        let name = StructuredName {
            given_name: Some("Jane".to_string()),
            family_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(to_short_name(&name), "Jane");
    }
}
