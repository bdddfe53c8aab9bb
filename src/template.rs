// src/template.rs
use std::collections::HashMap;

use regex::Regex;

/// Global find/replace over `{{variable}}` tokens. No loops, conditionals,
/// escaping, or nesting.
///
/// Each variable resolves through the caller's mapping (variable -> source
/// column) into the row's field map; anything that cannot be resolved is
/// replaced with a `[MISSING: var]` marker. `sender_name` is the one
/// exception: it always comes from the sender parameter, mapping or not.
pub struct TemplateRenderer {
    token_re: Regex,
}

pub const SENDER_NAME_VAR: &str = "sender_name";

impl TemplateRenderer {
    pub fn new() -> Self {
        let token_re = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("token regex is static");
        Self { token_re }
    }

    pub fn render(
        &self,
        template: &str,
        mapping: &HashMap<String, String>,
        row: &HashMap<String, String>,
        sender_name: &str,
    ) -> String {
        self.token_re
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let var = &caps[1];
                if var == SENDER_NAME_VAR {
                    return sender_name.to_string();
                }
                match mapping.get(var).and_then(|column| row.get(column)) {
                    Some(value) => value.clone(),
                    None => format!("[MISSING: {}]", var),
                }
            })
            .into_owned()
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps(
        mapping: &[(&str, &str)],
        row: &[(&str, &str)],
    ) -> (HashMap<String, String>, HashMap<String, String>) {
        let mapping = mapping
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let row = row
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        (mapping, row)
    }

    #[test]
    fn substitutes_mapped_variables() {
        let r = TemplateRenderer::new();
        let (mapping, row) = maps(&[("name", "contact_name")], &[("contact_name", "Acme")]);
        assert_eq!(r.render("Hi {{name}}", &mapping, &row, "Priya"), "Hi Acme");
    }

    #[test]
    fn unmapped_variable_gets_missing_marker() {
        let r = TemplateRenderer::new();
        let (mapping, row) = maps(&[], &[("contact_name", "Acme")]);
        assert_eq!(
            r.render("Hi {{name}}", &mapping, &row, "Priya"),
            "Hi [MISSING: name]"
        );
    }

    #[test]
    fn mapped_but_absent_column_gets_missing_marker() {
        let r = TemplateRenderer::new();
        let (mapping, row) = maps(&[("name", "contact_name")], &[]);
        assert_eq!(
            r.render("Hi {{name}}", &mapping, &row, "Priya"),
            "Hi [MISSING: name]"
        );
    }

    #[test]
    fn sender_name_comes_from_the_sender_parameter() {
        let r = TemplateRenderer::new();
        // even a mapping entry for sender_name is ignored
        let (mapping, row) = maps(
            &[("sender_name", "contact_name")],
            &[("contact_name", "WRONG")],
        );
        assert_eq!(
            r.render("Regards, {{sender_name}}", &mapping, &row, "Priya"),
            "Regards, Priya"
        );
    }

    #[test]
    fn tolerates_whitespace_inside_tokens_and_repeats() {
        let r = TemplateRenderer::new();
        let (mapping, row) = maps(&[("city", "address")], &[("address", "Pune")]);
        assert_eq!(
            r.render("{{ city }} and {{city}}", &mapping, &row, "P"),
            "Pune and Pune"
        );
    }

    #[test]
    fn non_token_braces_are_left_alone() {
        let r = TemplateRenderer::new();
        let (mapping, row) = maps(&[], &[]);
        assert_eq!(
            r.render("a {not a token} b {{}} c", &mapping, &row, "P"),
            "a {not a token} b {{}} c"
        );
    }
}
