use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Lines shown before and after each match
    pub context: usize,
    pub case_sensitive: bool,
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            context: 3,
            case_sensitive: false,
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// 1-based
    pub line: usize,
    pub context: String,
}

/// Matching lines with surrounding context, in file order.
///
/// ```text
///     Line 4: <div>
/// >>> Line 5:   <h1>Title</h1>
///     Line 6: </div>
/// ```
pub fn search(content: &str, query: &str, options: &SearchOptions) -> Vec<SearchMatch> {
    if query.is_empty() || options.max_results == 0 {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let needle = if options.case_sensitive {
        query.to_string()
    } else {
        query.to_lowercase()
    };

    let mut matches = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let hit = if options.case_sensitive {
            line.contains(&needle)
        } else {
            line.to_lowercase().contains(&needle)
        };
        if !hit {
            continue;
        }

        let start = i.saturating_sub(options.context);
        let end = (i + options.context).min(lines.len() - 1);
        let context = (start..=end)
            .map(|j| {
                let marker = if j == i { ">>> " } else { "    " };
                format!("{marker}Line {}: {}", j + 1, lines[j])
            })
            .collect::<Vec<_>>()
            .join("\n");

        matches.push(SearchMatch { line: i + 1, context });
        if matches.len() >= options.max_results {
            break;
        }
    }
    matches
}

/// Human-readable report of [`search`] results.
pub fn format_matches(matches: &[SearchMatch], query: &str, source: &str) -> String {
    if matches.is_empty() {
        return format!("No matches found for \"{query}\" in {source}");
    }
    let blocks: Vec<&str> = matches.iter().map(|m| m.context.as_str()).collect();
    format!(
        "Found {} match(es) for \"{query}\" in {source}:\n\n{}",
        matches.len(),
        blocks.join("\n\n---\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "one\ntwo\nThree\nfour\nfive\nsix\nthree again";

    #[test]
    fn test_context_window() {
        let found = search(TEXT, "four", &SearchOptions { context: 1, ..Default::default() });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 4);
        assert_eq!(
            found[0].context,
            "    Line 3: Three\n>>> Line 4: four\n    Line 5: five"
        );
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = search(TEXT, "three", &SearchOptions::default());
        assert_eq!(insensitive.iter().map(|m| m.line).collect::<Vec<_>>(), vec![3, 7]);

        let sensitive = search(
            TEXT,
            "three",
            &SearchOptions { case_sensitive: true, ..Default::default() },
        );
        assert_eq!(sensitive.iter().map(|m| m.line).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_max_results_and_edges() {
        let found = search(TEXT, "e", &SearchOptions { max_results: 2, context: 5, ..Default::default() });
        assert_eq!(found.len(), 2);
        assert!(found[0].context.starts_with(">>> Line 1: one"));
    }

    #[test]
    fn test_format() {
        let found = search(TEXT, "f", &SearchOptions { context: 0, ..Default::default() });
        assert_eq!(
            format_matches(&found, "f", "notes.txt"),
            "Found 2 match(es) for \"f\" in notes.txt:\n\n>>> Line 4: four\n\n---\n\n>>> Line 5: five"
        );
        assert_eq!(
            format_matches(&[], "zzz", "notes.txt"),
            "No matches found for \"zzz\" in notes.txt"
        );
    }
}
