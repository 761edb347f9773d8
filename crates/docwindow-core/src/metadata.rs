//! Path-derived document metadata.
//!
//! Category, subcategory, and title come from the document's relative path.
//! The category is the first configured pattern found anywhere in the path;
//! the segments after the matched folder decide subcategory and title:
//!
//! | Remaining segments | Subcategory | Title |
//! |--------------------|-------------|-------|
//! | 1 | none | file name |
//! | 2 | first segment | file name |
//! | 3+, parent is a document folder | segments before the parent | parent folder name |
//! | 3+, otherwise | all but the file name | file name |
//!
//! A "document folder" is a directory that itself names a document, such as
//! `2024-03-Pricing-Experiment-Readout`. It is recognised by the ordered
//! rules in [`DOCUMENT_FOLDER_RULES`]. Titles keep the file extension.

use serde::{Deserialize, Serialize};

/// A configured category: documents whose path contains `pattern` belong to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPattern {
    pub name: String,
    pub pattern: String,
}

impl CategoryPattern {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Metadata extracted from a relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMetadata {
    pub category: String,
    pub subcategory: Option<String>,
    pub document_title: String,
    pub file_name: String,
    /// Lowercase extension without the dot, empty when absent.
    pub file_extension: String,
}

/// One rule for recognising a document folder.
pub struct FolderRule {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
}

fn contains_deep_dive(segment: &str) -> bool {
    segment.contains("Deep-Dive")
}

fn contains_road_to(segment: &str) -> bool {
    segment.contains("Road-to")
}

fn contains_experiment_readout(segment: &str) -> bool {
    segment.contains("Experiment-Readout")
}

fn starts_with_year(segment: &str) -> bool {
    segment.len() >= 4 && segment.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

fn hyphenated_title(segment: &str) -> bool {
    let capitalized = segment
        .split('-')
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    segment.matches('-').count() >= 2 && capitalized >= 2
}

/// Rules are evaluated in order; the first match wins.
pub const DOCUMENT_FOLDER_RULES: &[FolderRule] = &[
    FolderRule {
        name: "deep-dive",
        matches: contains_deep_dive,
    },
    FolderRule {
        name: "road-to",
        matches: contains_road_to,
    },
    FolderRule {
        name: "experiment-readout",
        matches: contains_experiment_readout,
    },
    FolderRule {
        name: "year-prefix",
        matches: starts_with_year,
    },
    FolderRule {
        name: "hyphenated-title",
        matches: hyphenated_title,
    },
];

/// Name of the first rule that classifies `segment` as a document folder.
pub fn document_folder_rule(segment: &str) -> Option<&'static str> {
    DOCUMENT_FOLDER_RULES
        .iter()
        .find(|rule| (rule.matches)(segment))
        .map(|rule| rule.name)
}

/// Derives [`PathMetadata`] from relative paths using configured categories.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    categories: Vec<CategoryPattern>,
    default_category: String,
}

impl MetadataExtractor {
    pub fn new(categories: Vec<CategoryPattern>, default_category: impl Into<String>) -> Self {
        Self {
            categories,
            default_category: default_category.into(),
        }
    }

    pub fn extract(&self, relative_path: &str) -> PathMetadata {
        let path = crate::ids::normalize_path(relative_path);
        let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let file_extension = extension_of(&file_name);

        let (category, remaining) = match self.match_category(&path) {
            Some((name, rest)) => (name, segments(rest)),
            None => (self.default_category.clone(), segments(&path)),
        };
        // The pattern matched inside the file name itself.
        let remaining = if remaining.is_empty() {
            vec![file_name.as_str()]
        } else {
            remaining
        };

        let (subcategory, document_title) = subcategory_and_title(&remaining);

        PathMetadata {
            category,
            subcategory,
            document_title,
            file_name,
            file_extension,
        }
    }

    /// First category whose pattern occurs in `path`, with the path that
    /// follows the folder the pattern ended in.
    fn match_category<'a>(&self, path: &'a str) -> Option<(String, &'a str)> {
        self.categories.iter().find_map(|c| {
            if c.pattern.is_empty() {
                return None;
            }
            let idx = path.find(&c.pattern)?;
            let rest = &path[idx + c.pattern.len()..];
            let rest = if c.pattern.ends_with('/') {
                rest
            } else {
                rest.split_once('/').map(|(_, r)| r).unwrap_or("")
            };
            Some((c.name.clone(), rest))
        })
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn subcategory_and_title(segs: &[&str]) -> (Option<String>, String) {
    match segs {
        [] => (None, String::new()),
        [file] => (None, file.to_string()),
        [folder, file] => (Some(folder.to_string()), file.to_string()),
        [.., parent, file] => {
            let n = segs.len();
            if document_folder_rule(parent).is_some() {
                (Some(segs[..n - 2].join("/")), parent.to_string())
            } else {
                (Some(segs[..n - 1].join("/")), file.to_string())
            }
        }
    }
}

fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// MIME-style content type for a file extension.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "md" | "markdown" => "text/markdown",
        "sql" => "text/x-sql",
        "json" => "application/json",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        _ => "text/plain",
    }
}
