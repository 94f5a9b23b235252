//! `{{ name }}` substitution for machine config templates.
//!
//! The syntax is deliberately small: a placeholder is `{{`, optional
//! whitespace, an optional leading `.`, an identifier, optional whitespace,
//! and `}}`. Everything else is copied through verbatim.
use std::collections::BTreeMap;

use crate::error::TemplateError;

enum Piece<'a> {
    Text(&'a str),
    Var(&'a str),
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let mut pieces = Vec::new();
    let mut rest = template;
    while let Some((before, after)) = rest.split_once("{{") {
        if !before.is_empty() {
            pieces.push(Piece::Text(before));
        }
        let Some((inner, tail)) = after.split_once("}}") else {
            return Err(TemplateError::Syntax(format!(
                "unterminated placeholder near '{{{{{}'",
                after.chars().take(20).collect::<String>()
            )));
        };
        let name = inner.trim();
        let name = name.strip_prefix('.').unwrap_or(name);
        if !is_identifier(name) {
            return Err(TemplateError::Syntax(format!(
                "invalid placeholder '{{{{{inner}}}}}'"
            )));
        }
        pieces.push(Piece::Var(name));
        rest = tail;
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Substitute `values` into `template`.
///
/// # Errors
///
/// Returns [`TemplateError::Syntax`] for a malformed placeholder and
/// [`TemplateError::UndefinedVariable`] for a name missing from `values`.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    for piece in parse(template)? {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Var(name) => {
                let value = values
                    .get(name)
                    .ok_or_else(|| TemplateError::UndefinedVariable(name.to_string()))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Distinct placeholder names in order of first use.
///
/// # Errors
///
/// Returns [`TemplateError::Syntax`] for a malformed placeholder.
pub fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
    let mut names: Vec<String> = Vec::new();
    for piece in parse(template)? {
        if let Piece::Var(name) = piece
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_with_and_without_spaces() {
        let out = render(
            "[user]\n name = {{user_name}}\n email = {{ .user_email }}",
            &values(&[("user_name", "Test User"), ("user_email", "test@example.com")]),
        )
        .unwrap();
        assert_eq!(out, "[user]\n name = Test User\n email = test@example.com");
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(render("plain { text }", &BTreeMap::new()).unwrap(), "plain { text }");
        assert_eq!(render("", &BTreeMap::new()).unwrap(), "");
    }

    #[test]
    fn undefined_variable_is_named() {
        let err = render("{{ missing }}", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedVariable(ref n) if n == "missing"));
    }

    #[test]
    fn unterminated_placeholder_is_syntax_error() {
        assert!(matches!(
            render("a {{ name", &values(&[("name", "x")])),
            Err(TemplateError::Syntax(_))
        ));
        assert!(matches!(placeholders("{{ }}"), Err(TemplateError::Syntax(_))));
    }

    #[test]
    fn placeholders_are_deduplicated_in_order() {
        let names = placeholders("{{b}} {{ a }} {{.b}}").unwrap();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn values_are_not_reexpanded() {
        let out = render("{{a}}", &values(&[("a", "{{b}}")])).unwrap();
        assert_eq!(out, "{{b}}");
    }
}
