//! Default config creation and in-place field edits.
//!
//! Edits keep the user's comments and column alignment: an existing `key = value`
//! line is rewritten in place, a commented-out placeholder (`#key = ...`) is
//! activated, and anything else is appended.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::constants::*;
use crate::utils::private_path;

/// Write a default `salatr.toml` with every setting documented.
///
/// Location keys are written as commented placeholders until a location is set.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let content = ConfigBuilder::new()
        .add_section("Location")
        .add_placeholder("latitude", "0.000000", "Geographic latitude (-90 to 90)")
        .add_placeholder("longitude", "0.000000", "Geographic longitude (-180 to 180)")
        .add_placeholder("city", "\"\"", "Display label for the location")
        .add_placeholder(
            "timezone",
            "\"\"",
            "IANA zone, detected from coordinates when unset",
        )
        .add_section("Calculation")
        .add_placeholder(
            "method",
            "\"muslim_world_league\"",
            "Calculation method, recommended for the zone when unset",
        )
        .add_setting("madhab", "\"shafi\"", "Asr convention: \"shafi\" or \"hanafi\"")
        .add_section("Reminders")
        .add_setting(
            "reminders",
            &DEFAULT_REMINDERS_ENABLED.to_string(),
            "Send a notification before each prayer",
        )
        .add_setting(
            "reminder_minutes",
            &DEFAULT_REMINDER_MINUTES.to_string(),
            &format!(
                "Minutes before the prayer ({MINIMUM_REMINDER_MINUTES}-{MAXIMUM_REMINDER_MINUTES})"
            ),
        )
        .add_section("Overlay")
        .add_setting(
            "overlay",
            &DEFAULT_OVERLAY_ENABLED.to_string(),
            "Show the countdown overlay before each prayer",
        )
        .add_setting(
            "always_show_overlay",
            &DEFAULT_ALWAYS_SHOW_OVERLAY.to_string(),
            "Keep the overlay visible at all times",
        )
        .build();

    fs::write(path, content + "\n")
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));
    Ok(())
}

struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn add_placeholder(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("#{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}

/// Whether `line` assigns `key`, optionally behind a leading `#`.
fn assigns_key(line: &str, key: &str, commented: bool) -> bool {
    let trimmed = line.trim_start();
    let rest = if commented {
        match trimmed.strip_prefix('#') {
            Some(rest) => rest.trim_start(),
            None => return false,
        }
    } else if trimmed.starts_with('#') {
        return false;
    } else {
        trimmed
    };

    rest.strip_prefix(key)
        .is_some_and(|after| after.trim_start().starts_with('='))
}

/// Find the active config line assigning `key`.
pub(crate) fn find_config_line<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find(|line| assigns_key(line, key, false))
}

/// Rewrite a line's value keeping the spacing before its trailing comment.
pub(crate) fn preserve_comment_formatting(
    original_line: &str,
    key: &str,
    new_value: &str,
) -> String {
    let key_value_part = format!("{key} = {new_value}");

    match comment_column(original_line) {
        Some(pos) => {
            let padding = if key_value_part.len() < pos {
                pos - key_value_part.len()
            } else {
                1
            };
            format!(
                "{key_value_part}{}{}",
                " ".repeat(padding),
                &original_line[pos..]
            )
        }
        None => key_value_part,
    }
}

/// Byte offset of a trailing comment, ignoring `#` inside quoted strings.
fn comment_column(line: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes && i > 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Set `key` to the already formatted `value` in the file content.
pub(crate) fn update_field_in_content(content: &str, key: &str, value: &str) -> String {
    let existing = find_config_line(content, key)
        .or_else(|| content.lines().find(|line| assigns_key(line, key, true)));

    if let Some(line) = existing {
        let source = line.trim_start().trim_start_matches('#').trim_start();
        let new_line = preserve_comment_formatting(source, key, value);
        return content
            .lines()
            .map(|l| if l == line { new_line.as_str() } else { l })
            .collect::<Vec<_>>()
            .join("\n")
            + if content.ends_with('\n') { "\n" } else { "" };
    }

    let mut updated = content.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("{key} = {value}\n"));
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_line_matches_whole_key() {
        let content = "reminder_minutes = 15\nreminders = true\n";
        assert_eq!(
            find_config_line(content, "reminders"),
            Some("reminders = true")
        );
        assert_eq!(find_config_line(content, "minutes"), None);
    }

    #[test]
    fn test_preserve_comment_alignment() {
        let line = "reminder_minutes = 15   # Minutes before";
        assert_eq!(
            preserve_comment_formatting(line, "reminder_minutes", "5"),
            "reminder_minutes = 5    # Minutes before"
        );
    }

    #[test]
    fn test_update_activates_placeholder() {
        let content = "#[Location]\n#latitude = 0.000000  # Latitude\n";
        let updated = update_field_in_content(content, "latitude", "51.500000");
        assert_eq!(updated, "#[Location]\nlatitude = 51.500000 # Latitude\n");
    }

    #[test]
    fn test_update_appends_missing_key() {
        let updated = update_field_in_content("madhab = \"shafi\"", "overlay", "false");
        assert_eq!(updated, "madhab = \"shafi\"\noverlay = false\n");
    }
}
