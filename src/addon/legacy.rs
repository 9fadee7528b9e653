//! Legacy `Key=Value` addon format.
//!
//! Line oriented: `FileName=` opens a record (closing the previous one),
//! `Search=`/`Replace=` append to the open record, `Description=` labels
//! it. The format is unforgiving on purpose: one malformed record
//! discards the entire file so a half-applied addon can never ship.

use crate::addon::schema::{Addon, AddonData, AddonError};
use crate::matching::normalize_path;
use std::fs;
use std::path::Path;

/// Replace the `[NewLine]` and bare `NewLine` escape tokens with real
/// newlines. Bracketed first, otherwise its inner token would be eaten.
pub(crate) fn decode_snr_text(value: &str) -> String {
    value.replace("[NewLine]", "\n").replace("NewLine", "\n")
}

/// Parse legacy addon text. Never fails: a malformed file yields an
/// addon with no rules, which callers treat as not loaded.
#[must_use]
pub fn from_str(name: &str, contents: &str) -> Addon {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut addon = Addon::new(name);

    let mut fname: Option<String> = None;
    let mut searches: Vec<String> = Vec::new();
    let mut replaces: Vec<String> = Vec::new();
    let mut description: Option<String> = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "FileName" => {
                // A new record closes the previous one. Records must close
                // complete; anything less poisons the whole file.
                if let Some(pattern) = fname.take() {
                    if description.is_none() || searches.len() != replaces.len() {
                        log::warn!(
                            "addon '{}': record '{}' is incomplete, discarding every rule in the file",
                            name,
                            pattern
                        );
                        addon.clear_rules();
                        return addon;
                    }
                    let snr = searches.drain(..).zip(replaces.drain(..)).collect();
                    addon.insert_rule(
                        pattern,
                        AddonData {
                            snr,
                            description: description.take().unwrap_or_default(),
                        },
                    );
                }
                fname = Some(normalize_path(value));
            }
            "Search" => searches.push(decode_snr_text(value)),
            "Replace" => replaces.push(decode_snr_text(value)),
            "Description" => description = Some(value.to_string()),
            _ => {}
        }
    }

    // End of file closes the final record under the same policy.
    match (fname, description) {
        (Some(pattern), Some(desc)) if searches.len() == replaces.len() => {
            let snr = searches.into_iter().zip(replaces).collect();
            addon.insert_rule(
                pattern,
                AddonData {
                    snr,
                    description: desc,
                },
            );
        }
        _ => addon.clear_rules(),
    }
    addon
}

/// Load a legacy addon file; the addon name is the file's stem.
pub fn load(path: &Path) -> Result<Addon, AddonError> {
    let contents = fs::read_to_string(path).map_err(|source| AddonError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(from_str(&name, &contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record() {
        let addon = from_str(
            "greeting",
            "FileName=ui\\dialog.xml\nSearch=Hello\nReplace=Hi\nDescription=greeting fix\n",
        );
        assert!(addon.is_valid());
        assert_eq!(addon.name(), "greeting");
        let pairs = addon.relevant_rules("ui\\dialog.xml");
        assert_eq!(pairs, vec![&("Hello".to_string(), "Hi".to_string())]);
    }

    #[test]
    fn test_multiple_records() {
        let addon = from_str(
            "multi",
            "FileName=a.xml\n\
             Search=one\n\
             Replace=1\n\
             Description=first\n\
             FileName=b.xml\n\
             Search=two\n\
             Replace=2\n\
             Search=three\n\
             Replace=3\n\
             Description=second\n",
        );
        assert_eq!(addon.rule_count(), 2);
        assert_eq!(addon.relevant_rules("b.xml").len(), 2);
    }

    #[test]
    fn test_newline_tokens_decoded() {
        let addon = from_str(
            "nl",
            "FileName=a.xml\nSearch=x[NewLine]y\nReplace=aNewLineb\nDescription=d\n",
        );
        let pairs = addon.relevant_rules("a.xml");
        assert_eq!(pairs[0].0, "x\ny");
        assert_eq!(pairs[0].1, "a\nb");
    }

    #[test]
    fn test_bracketed_token_decoded_first() {
        assert_eq!(decode_snr_text("[NewLine]"), "\n");
        assert_eq!(decode_snr_text("a[NewLine]bNewLinec"), "a\nb\nc");
    }

    #[test]
    fn test_missing_description_discards_whole_file() {
        let addon = from_str(
            "bad",
            "FileName=good.xml\n\
             Search=a\n\
             Replace=b\n\
             Description=fine\n\
             FileName=bad.xml\n\
             Search=x\n\
             Replace=y\n",
        );
        // The good first record is discarded along with the bad one.
        assert!(!addon.is_valid());
        assert_eq!(addon.rule_count(), 0);
    }

    #[test]
    fn test_count_mismatch_discards_whole_file() {
        let addon = from_str(
            "bad",
            "FileName=good.xml\n\
             Search=a\n\
             Replace=b\n\
             Description=fine\n\
             FileName=bad.xml\n\
             Search=x\n\
             Search=y\n\
             Replace=z\n\
             Description=broken\n",
        );
        assert!(!addon.is_valid());
    }

    #[test]
    fn test_mid_file_failure_stops_parsing() {
        // The record after the bad one would be valid, but parsing stops.
        let addon = from_str(
            "bad",
            "FileName=first.xml\n\
             Search=a\n\
             Replace=b\n\
             FileName=second.xml\n\
             Search=x\n\
             Replace=y\n\
             Description=fine\n",
        );
        assert!(!addon.is_valid());
    }

    #[test]
    fn test_lines_without_equals_ignored() {
        let addon = from_str(
            "cmt",
            "# comment line\nFileName=a.xml\njunk\nSearch=x\nReplace=y\nDescription=d\n",
        );
        assert!(addon.is_valid());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let addon = from_str(
            "ws",
            "  FileName = a.xml  \n Search = x \n Replace = y \n Description = d \n",
        );
        assert_eq!(addon.relevant_rules("a.xml"), vec![&("x".to_string(), "y".to_string())]);
    }

    #[test]
    fn test_filename_normalized() {
        let addon = from_str(
            "norm",
            "FileName=ui//panel\\\\main.xml\nSearch=x\nReplace=y\nDescription=d\n",
        );
        assert_eq!(addon.relevant_rules("ui\\panel\\main.xml").len(), 1);
    }

    #[test]
    fn test_duplicate_filename_overwrites() {
        let addon = from_str(
            "dup",
            "FileName=a.xml\n\
             Search=old\n\
             Replace=1\n\
             Description=first\n\
             FileName=a.xml\n\
             Search=new\n\
             Replace=2\n\
             Description=second\n",
        );
        assert_eq!(addon.rule_count(), 1);
        assert_eq!(addon.relevant_rules("a.xml")[0].0, "new");
    }

    #[test]
    fn test_empty_file_is_invalid() {
        assert!(!from_str("empty", "").is_valid());
        assert!(!from_str("noeq", "just some text\n").is_valid());
    }

    #[test]
    fn test_bom_stripped() {
        let addon = from_str(
            "bom",
            "\u{feff}FileName=a.xml\nSearch=x\nReplace=y\nDescription=d\n",
        );
        assert!(addon.is_valid());
    }

    #[test]
    fn test_record_with_no_pairs_still_commits() {
        let addon = from_str("desc", "FileName=a.xml\nDescription=d\n");
        // Zero search/replace pairs is a complete record; it matches no
        // text but keeps the addon valid.
        assert!(addon.is_valid());
        assert!(addon.relevant_rules("a.xml").is_empty());
    }
}
