//! Textual repairs applied to raw markup before it reaches the parser.
//!
//! These target real-world files produced by older authoring tools. Each
//! repair is a no-op on markup that does not need it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const ADOBE_EXTENSIBILITY_NAMESPACE: &str = "http://ns.adobe.com/Extensibility/1.0/";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const DUMMY_NAMESPACE: &str = "http://dummy.namespace";

static SVG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg [^>]*>").unwrap());
static NS_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&ns_[^;]+;").unwrap());
static IMAGE_PNG_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<image[^>]+?xlink:href=["'])data:img/png"#).unwrap());
static XML_NS_REBIND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(xmlns:[^ =]+)="http://www\.w3\.org/XML/1998/namespace""#).unwrap()
});
static METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata>.*</metadata>").unwrap());
static SCRIPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<script.*</script>").unwrap());

/// Applies every repair in order and returns the cleaned markup.
pub fn fix_markup(raw: &str) -> String {
    let mut out = add_missing_namespace(raw);
    out = replace_adobe_entities(&out);
    out = repair_png_data_uris(&out);
    out = rebind_xml_namespace_prefixes(&out);
    strip_metadata_and_scripts(&out)
}

/// Adds the SVG namespace to the root tag when it does not declare one.
pub fn add_missing_namespace(markup: &str) -> String {
    match SVG_TAG.find(markup) {
        Some(tag) if !tag.as_str().contains("xmlns=") => {
            markup.replacen("<svg ", &format!("<svg xmlns=\"{SVG_NAMESPACE}\" "), 1)
        }
        _ => markup.to_owned(),
    }
}

/// Illustrator exports reference namespaces through `&ns_*;` entities declared
/// in a DOCTYPE. Without the DOCTYPE those entities are undefined, so they are
/// replaced with the namespace URL they stand for.
pub fn replace_adobe_entities(markup: &str) -> String {
    let Some(tag) = SVG_TAG.find(markup) else {
        return markup.to_owned();
    };
    if !tag.as_str().contains("&ns_") || markup.contains("<!DOCTYPE") {
        return markup.to_owned();
    }
    let fixed = NS_ENTITY.replace_all(tag.as_str(), ADOBE_EXTENSIBILITY_NAMESPACE);
    let mut out = String::with_capacity(markup.len());
    out.push_str(&markup[..tag.start()]);
    out.push_str(&fixed);
    out.push_str(&markup[tag.end()..]);
    out
}

/// Some exporters wrote `data:img/png` instead of `data:image/png`.
pub fn repair_png_data_uris(markup: &str) -> String {
    if !markup.contains("data:img/png") {
        return markup.to_owned();
    }
    IMAGE_PNG_HREF
        .replace_all(markup, |caps: &Captures<'_>| format!("{}data:image/png", &caps[1]))
        .into_owned()
}

/// Only the `xml` prefix may be bound to the XML namespace; parsers reject any
/// other binding, so those are pointed at a harmless dummy namespace.
pub fn rebind_xml_namespace_prefixes(markup: &str) -> String {
    if !markup.contains(XML_NAMESPACE) {
        return markup.to_owned();
    }
    XML_NS_REBIND
        .replace_all(markup, |caps: &Captures<'_>| {
            if &caps[1] == "xmlns:xml" {
                caps[0].to_owned()
            } else {
                format!("{}=\"{DUMMY_NAMESPACE}\"", &caps[1])
            }
        })
        .into_owned()
}

/// Empties `<metadata>` (often huge and irrelevant) and `<script>` (never run).
pub fn strip_metadata_and_scripts(markup: &str) -> String {
    let out = METADATA.replace(markup, "<metadata></metadata>");
    SCRIPT.replace(&out, "<script></script>").into_owned()
}
