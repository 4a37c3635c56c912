use std::borrow::Cow;
use std::collections::HashMap;

use nom::bytes::complete::{tag, take_while1};
use nom::sequence::delimited;

use crate::common::parser::NomResult;

pub const DATA_FOLDER_PLACEHOLDER: &str = "DATA_FOLDER";
pub const DOCKER_IMAGE_PLACEHOLDER: &str = "DOCKER_IMAGE";
pub const INPUT_NOTEBOOK_PLACEHOLDER: &str = "INPUT_NOTEBOOK";
pub const OUTPUT_NOTEBOOK_PLACEHOLDER: &str = "OUTPUT_NOTEBOOK";
pub const PARAMETERS_PLACEHOLDER: &str = "PARAMETERS";
pub const MODEL_FOLDER_PLACEHOLDER: &str = "MODEL_FOLDER";
pub const MODEL_BUCKET_PLACEHOLDER: &str = "MODEL_BUCKET";
pub const INSTANCE_NAME_PLACEHOLDER: &str = "INSTANCE_NAME";
pub const ZONE_PLACEHOLDER: &str = "ZONE";

/// All placeholders that can be used inside a startup script template.
pub const KNOWN_PLACEHOLDERS: [&str; 9] = [
    DATA_FOLDER_PLACEHOLDER,
    DOCKER_IMAGE_PLACEHOLDER,
    INPUT_NOTEBOOK_PLACEHOLDER,
    OUTPUT_NOTEBOOK_PLACEHOLDER,
    PARAMETERS_PLACEHOLDER,
    MODEL_FOLDER_PLACEHOLDER,
    MODEL_BUCKET_PLACEHOLDER,
    INSTANCE_NAME_PLACEHOLDER,
    ZONE_PLACEHOLDER,
];

const PLACEHOLDER_START: &str = "%{";

pub type PlaceholderMap<'a> = HashMap<&'static str, Cow<'a, str>>;

#[derive(Debug, Eq, PartialEq)]
pub enum TemplatePart<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn is_placeholder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_placeholder(input: &str) -> NomResult<&str> {
    delimited(
        tag(PLACEHOLDER_START),
        take_while1(is_placeholder_char),
        tag("}"),
    )(input)
}

/// Splits a template into text and `%{NAME}` placeholders.
/// A `%{` that does not start a valid placeholder (e.g. `%{}` or `%{a b}`) is kept as text.
///
/// # Example
/// ```rust
/// use nbqueue::common::placeholders::{parse_template, TemplatePart};
///
/// assert_eq!(parse_template("--zone %{ZONE}"), vec![
///     TemplatePart::Text("--zone "),
///     TemplatePart::Placeholder("ZONE"),
/// ]);
/// ```
pub fn parse_template(template: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut rest = template;
    // Length of the text prefix of `rest` that was already scanned
    let mut scanned = 0;

    while let Some(offset) = rest[scanned..].find(PLACEHOLDER_START) {
        let position = scanned + offset;
        match parse_placeholder(&rest[position..]) {
            Ok((remaining, name)) => {
                if position > 0 {
                    parts.push(TemplatePart::Text(&rest[..position]));
                }
                parts.push(TemplatePart::Placeholder(name));
                rest = remaining;
                scanned = 0;
            }
            Err(_) => scanned = position + PLACEHOLDER_START.len(),
        }
    }
    if !rest.is_empty() {
        parts.push(TemplatePart::Text(rest));
    }
    parts
}

/// Replaces `%{NAME}` placeholders in `template` with values from `map`.
/// Placeholders missing from `map` are kept verbatim.
pub fn resolve(map: &PlaceholderMap, template: &str) -> String {
    let mut output = String::with_capacity(template.len());
    for part in parse_template(template) {
        match part {
            TemplatePart::Text(text) => output.push_str(text),
            TemplatePart::Placeholder(name) => {
                if let Some(value) = map.get(name) {
                    output.push_str(value);
                } else {
                    log::warn!("Unknown placeholder `{name}` in startup script template");
                    output.push_str(PLACEHOLDER_START);
                    output.push_str(name);
                    output.push('}');
                }
            }
        }
    }
    output
}

/// Returns placeholders used in `template` that are not contained in `known`.
pub fn find_unknown_placeholders<'a>(template: &'a str, known: &[&str]) -> Vec<&'a str> {
    parse_template(template)
        .into_iter()
        .filter_map(|part| match part {
            TemplatePart::Placeholder(name) if !known.contains(&name) => Some(name),
            _ => None,
        })
        .collect()
}
