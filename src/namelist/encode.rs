// ABOUTME: Namelist encoder producing canonical text from documents
// ABOUTME: Output decodes back to an equal document

use super::document::Document;
use super::value::{NmlValue, Scalar};

const INDENT: &str = "    ";

/// Encode a document as namelist text.
///
/// Each group is written as `&name`, one `key = value` line per variable and
/// a closing `/`. Groups are separated by a blank line.
pub fn encode(document: &Document) -> String {
    let mut out = String::new();

    for (index, (name, group)) in document.groups().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push('&');
        out.push_str(name);
        out.push('\n');
        for (key, value) in group {
            out.push_str(INDENT);
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&format_value(value));
            out.push('\n');
        }
        out.push_str("/\n");
    }

    out
}

/// Render a value the way it appears right of `=`
pub fn format_value(value: &NmlValue) -> String {
    value
        .scalars()
        .iter()
        .map(format_scalar)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_scalar(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Bool(true) => ".true.".to_string(),
        Scalar::Bool(false) => ".false.".to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => format_float(*f),
        Scalar::Str(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

// Shortest round-trip form, always with a '.' or an exponent
fn format_float(value: f64) -> String {
    format!("{:?}", value)
}
