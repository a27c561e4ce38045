//! Literal `{{name}}` placeholder substitution for prompt templates.
//!
//! There is no templating language here: no escaping, no conditionals, no
//! filters. A placeholder is replaced only when it is one of the recognised
//! names and a value is bound for it; everything else is left verbatim.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Placeholders recognised in prompt templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Placeholder {
    Fail,
    ValidateScript,
    Files,
    Iteration,
    Attempt,
}

impl Placeholder {
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Fail => "FAIL",
            Placeholder::ValidateScript => "validate_script",
            Placeholder::Files => "files",
            Placeholder::Iteration => "iteration",
            Placeholder::Attempt => "attempt",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "FAIL" => Some(Placeholder::Fail),
            "validate_script" => Some(Placeholder::ValidateScript),
            "files" => Some(Placeholder::Files),
            "iteration" => Some(Placeholder::Iteration),
            "attempt" => Some(Placeholder::Attempt),
            _ => None,
        }
    }
}

/// Values bound to placeholders for a single render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<Placeholder, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }
}

/// Substitute every bound placeholder in `template`.
///
/// Substitution is single-pass: a bound value that itself contains `{{...}}`
/// is inserted as-is and never re-scanned.
pub fn render(template: &str, bindings: &Bindings) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder regex is valid"));

    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            Placeholder::from_name(&caps[1])
                .and_then(|placeholder| bindings.get(placeholder))
                .map(str::to_string)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_every_occurrence() {
        let bindings = Bindings::new()
            .bind(Placeholder::ValidateScript, "./validate.sh")
            .bind(Placeholder::Iteration, "3");
        let out = render(
            "run @{{validate_script}} (iter {{iteration}}), then @{{validate_script}} again",
            &bindings,
        );
        assert_eq!(out, "run @./validate.sh (iter 3), then @./validate.sh again");
    }

    #[test]
    fn leaves_unknown_and_unbound_placeholders_verbatim() {
        let bindings = Bindings::new().bind(Placeholder::Files, "?? a.txt");
        let out = render("{{files}} {{attempt}} {{other}} { {files} }", &bindings);
        assert_eq!(out, "?? a.txt {{attempt}} {{other}} { {files} }");
    }

    #[test]
    fn bound_values_are_not_rescanned() {
        let bindings = Bindings::new()
            .bind(Placeholder::Fail, "expected {{validate_script}}")
            .bind(Placeholder::ValidateScript, "./validate.sh");
        let out = render("{{FAIL}} via {{validate_script}}", &bindings);
        assert_eq!(out, "expected {{validate_script}} via ./validate.sh");
    }

    #[test]
    fn placeholder_names_are_case_sensitive() {
        let bindings = Bindings::new().bind(Placeholder::Fail, "boom");
        assert_eq!(render("{{fail}}|{{FAIL}}", &bindings), "{{fail}}|boom");
    }
}
