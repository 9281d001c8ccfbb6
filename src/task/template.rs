//! Placeholder substitution for instruction templates.
//!
//! Instruction templates mark insertion points with `{name}` tokens:
//!
//! - `{item}` - the current batch item (parallel and map phase)
//! - `{accumulator}` / `{result}` - the running value and the next map output
//!   (reduce phase)
//!
//! Only tokens whose name has a value are replaced. Every other brace,
//! including JSON examples such as `{"name": string}` or unknown tokens, is
//! copied verbatim: the template text is never interpreted beyond the marker
//! tokens. Substituted values are inserted as-is and never scanned again.

use std::collections::HashMap;

/// Render a template string by substituting known placeholders.
///
/// ```text
/// render_template("Summarize: {item}", &vars([("item", "report.txt")]))
///     == "Summarize: report.txt"
/// ```
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match placeholder(after, variables) {
            Some((value, consumed)) => {
                result.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                result.push('{');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Value and byte length of a `name}` token at the start of `after_brace`.
fn placeholder<'v>(
    after_brace: &str,
    variables: &'v HashMap<String, String>,
) -> Option<(&'v str, usize)> {
    let close = after_brace.find('}')?;
    let value = variables.get(&after_brace[..close])?;
    Some((value.as_str(), close + 1))
}

/// Whether `template` contains the `{name}` token.
pub fn references(template: &str, name: &str) -> bool {
    template.contains(&format!("{{{}}}", name))
}

/// Helper to create a variables map from a list of key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
