//! Structured XML addon format.
//!
//! `<files>` root, one `<file path="...">` per record with paired
//! `<search>`/`<replace>` children and a `<description>`. Unlike the
//! legacy format, a malformed entry is skipped on its own; the rest of
//! the document still loads.

use crate::addon::schema::{Addon, AddonData, AddonError};
use crate::matching::normalize_path;
use crate::xml::{self, Document};
use std::fs;
use std::path::Path;

/// Parse structured addon text.
pub fn from_str(name: &str, contents: &str) -> Result<Addon, AddonError> {
    let doc = xml::parse_str(contents)?;
    Ok(from_document(name, &doc))
}

/// Load a structured addon file; the addon name is the file's stem.
pub fn load(path: &Path) -> Result<Addon, AddonError> {
    let doc = xml::parse_file(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(from_document(&name, &doc))
}

fn from_document(name: &str, doc: &Document) -> Addon {
    let mut addon = Addon::new(name);
    let Some(root) = doc.document_element() else {
        return addon;
    };
    if doc.name(root) != Some("files") {
        log::warn!(
            "addon '{}': root element is '{}', expected 'files'",
            name,
            doc.name(root).unwrap_or("")
        );
        return addon;
    }

    for file in doc.children_named(root, "file") {
        let Some(path_attr) = doc.attribute(file, "path") else {
            log::warn!("addon '{}': skipping file entry without a path", name);
            continue;
        };
        let Some(description) = doc.child_named(file, "description") else {
            log::warn!(
                "addon '{}': skipping entry '{}' without a description",
                name,
                path_attr
            );
            continue;
        };
        let pattern = normalize_path(path_attr);
        if pattern.is_empty() {
            continue;
        }
        let searches: Vec<_> = doc.children_named(file, "search").collect();
        let replaces: Vec<_> = doc.children_named(file, "replace").collect();
        if searches.len() != replaces.len() {
            log::warn!(
                "addon '{}': skipping entry '{}' with {} searches but {} replacements",
                name,
                path_attr,
                searches.len(),
                replaces.len()
            );
            continue;
        }
        let snr = searches
            .into_iter()
            .zip(replaces)
            .map(|(s, r)| (doc.text_content(s), doc.text_content(r)))
            .collect();
        addon.insert_rule(
            pattern,
            AddonData {
                snr,
                description: doc.text_content(description),
            },
        );
    }
    addon
}

/// Build the on-disk document for an addon: search/replace text wrapped
/// in CDATA so newlines survive verbatim, description last.
#[must_use]
pub fn to_document(addon: &Addon) -> Document {
    let mut doc = Document::new();
    doc.set_encoding("utf-8");
    let root = doc.root();
    let files = doc.create_element("files");
    doc.append_child(root, files);

    for (pattern, data) in addon.rules() {
        let file = doc.create_element("file");
        doc.set_attribute(file, "path", pattern.as_str());
        doc.append_child(files, file);
        for (search, replace) in &data.snr {
            let search_el = doc.create_element("search");
            let cdata = doc.create_cdata(search.as_str());
            doc.append_child(search_el, cdata);
            doc.append_child(file, search_el);

            let replace_el = doc.create_element("replace");
            let cdata = doc.create_cdata(replace.as_str());
            doc.append_child(replace_el, cdata);
            doc.append_child(file, replace_el);
        }
        let description = doc.create_element("description");
        let text = doc.create_text(data.description.as_str());
        doc.append_child(description, text);
        doc.append_child(file, description);
    }
    doc
}

/// Serialize an addon in the structured format.
#[must_use]
pub fn to_xml(addon: &Addon) -> String {
    xml::serialize(&to_document(addon))
}

/// Write an addon to disk in the structured format.
pub fn save(addon: &Addon, path: &Path) -> Result<(), AddonError> {
    fs::write(path, to_xml(addon)).map_err(|source| AddonError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<files>
  <file path="xml\config.xml">
    <search><![CDATA[old]]></search>
    <replace><![CDATA[new]]></replace>
    <description>swap</description>
  </file>
</files>
"#;

    #[test]
    fn test_parse_sample() {
        let addon = from_str("sample", SAMPLE).unwrap();
        assert!(addon.is_valid());
        let pairs = addon.relevant_rules("config.xml");
        assert_eq!(pairs, vec![&("old".to_string(), "new".to_string())]);
    }

    #[test]
    fn test_wrong_root_is_invalid() {
        let addon = from_str("bad", "<patches><file path=\"a\"/></patches>").unwrap();
        assert!(!addon.is_valid());
    }

    #[test]
    fn test_unparseable_is_error() {
        assert!(from_str("bad", "<files><file").is_err());
    }

    #[test]
    fn test_entry_without_path_skipped() {
        let addon = from_str(
            "mixed",
            r#"<files>
                 <file><search>a</search><replace>b</replace><description>d</description></file>
                 <file path="keep.xml"><search>x</search><replace>y</replace><description>d</description></file>
               </files>"#,
        )
        .unwrap();
        assert_eq!(addon.rule_count(), 1);
        assert_eq!(addon.relevant_rules("keep.xml").len(), 1);
    }

    #[test]
    fn test_entry_without_description_skipped() {
        let addon = from_str(
            "mixed",
            r#"<files>
                 <file path="bad.xml"><search>a</search><replace>b</replace></file>
                 <file path="keep.xml"><search>x</search><replace>y</replace><description>d</description></file>
               </files>"#,
        )
        .unwrap();
        assert_eq!(addon.rule_count(), 1);
        assert!(addon.relevant_rules("bad.xml").is_empty());
    }

    #[test]
    fn test_count_mismatch_skips_only_that_entry() {
        let addon = from_str(
            "mixed",
            r#"<files>
                 <file path="bad.xml">
                   <search>a</search>
                   <search>b</search>
                   <replace>c</replace>
                   <description>broken</description>
                 </file>
                 <file path="keep.xml">
                   <search>x</search>
                   <replace>y</replace>
                   <description>fine</description>
                 </file>
               </files>"#,
        )
        .unwrap();
        assert_eq!(addon.rule_count(), 1);
        assert_eq!(addon.relevant_rules("keep.xml").len(), 1);
    }

    #[test]
    fn test_empty_path_skipped() {
        let addon = from_str(
            "empty",
            r#"<files><file path=""><search>a</search><replace>b</replace><description>d</description></file></files>"#,
        )
        .unwrap();
        assert!(!addon.is_valid());
    }

    #[test]
    fn test_pairs_collected_in_document_order() {
        let addon = from_str(
            "order",
            r#"<files>
                 <file path="a.xml">
                   <search>s1</search>
                   <replace>r1</replace>
                   <search>s2</search>
                   <replace>r2</replace>
                   <description>two</description>
                 </file>
               </files>"#,
        )
        .unwrap();
        let pairs = addon.relevant_rules("a.xml");
        assert_eq!(pairs[0].0, "s1");
        assert_eq!(pairs[1].0, "s2");
    }

    #[test]
    fn test_save_format() {
        let addon = from_str("sample", SAMPLE).unwrap();
        let out = to_xml(&addon);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<files>\n"));
        assert!(out.contains("  <file path=\"xml\\config.xml\">\n"));
        assert!(out.contains("    <search><![CDATA[old]]></search>\n"));
        assert!(out.contains("    <replace><![CDATA[new]]></replace>\n"));
        assert!(out.contains("    <description>swap</description>\n"));
    }

    #[test]
    fn test_round_trip_preserves_rules() {
        let addon = from_str(
            "rt",
            r#"<files>
                 <file path="a\b.xml">
                   <search><![CDATA[multi
line]]></search>
                   <replace><![CDATA[text & <markup>]]></replace>
                   <description>keeps everything</description>
                 </file>
                 <file path="c.xml">
                   <search>plain</search>
                   <replace>simple</replace>
                   <description>second</description>
                 </file>
               </files>"#,
        )
        .unwrap();
        let reloaded = from_str("rt", &to_xml(&addon)).unwrap();
        assert_eq!(reloaded.rule_count(), addon.rule_count());
        for ((p1, d1), (p2, d2)) in addon.rules().zip(reloaded.rules()) {
            assert_eq!(p1, p2);
            assert_eq!(d1, d2);
        }
    }
}
