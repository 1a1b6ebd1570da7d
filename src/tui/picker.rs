// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-ContextViewer-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Context Viewer and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Fuzzy file picker over the workspace's root-relative paths.

const MAX_MATCHES: usize = 200;

#[derive(Debug, Clone, Default)]
pub(super) struct FilePicker {
    query: String,
    candidates: Vec<String>,
    matches: Vec<String>,
    selected: usize,
}

impl FilePicker {
    pub(super) fn new(candidates: Vec<String>) -> Self {
        let mut picker = Self {
            candidates,
            ..Self::default()
        };
        picker.refresh();
        picker
    }

    pub(super) fn query(&self) -> &str {
        &self.query
    }

    pub(super) fn matches(&self) -> &[String] {
        &self.matches
    }

    pub(super) fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub(super) fn selected_index(&self) -> usize {
        self.selected
    }

    pub(super) fn selected(&self) -> Option<&str> {
        self.matches.get(self.selected).map(String::as_str)
    }

    pub(super) fn push(&mut self, ch: char) {
        self.query.push(ch);
        self.refresh();
    }

    pub(super) fn pop(&mut self) {
        self.query.pop();
        self.refresh();
    }

    pub(super) fn move_selection(&mut self, delta: isize) {
        if self.matches.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.matches.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    fn refresh(&mut self) {
        self.selected = 0;
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            self.matches = self.candidates.iter().take(MAX_MATCHES).cloned().collect();
            return;
        }

        let mut scored: Vec<(i64, &String)> = self
            .candidates
            .iter()
            .filter_map(|path| fuzzy_score(&needle, &path.to_lowercase()).map(|score| (score, path)))
            .collect();
        scored.sort_by(|(a_score, a_path), (b_score, b_path)| {
            b_score.cmp(a_score).then_with(|| a_path.cmp(b_path))
        });
        self.matches = scored
            .into_iter()
            .take(MAX_MATCHES)
            .map(|(_, path)| path.clone())
            .collect();
    }
}

/// Scores `haystack` against an already lowercased `needle`.
///
/// Every needle character must appear in order; substring hits and file-name hits rank first.
pub(super) fn fuzzy_score(needle: &str, haystack: &str) -> Option<i64> {
    if needle.is_empty() || !is_subsequence(needle, haystack) {
        return None;
    }

    let file_name = haystack.rsplit('/').next().unwrap_or(haystack);
    let ratio = rapidfuzz::fuzz::ratio(needle.chars(), file_name.chars());
    let mut score = (ratio * 1000.0).round() as i64;
    if file_name.starts_with(needle) {
        score += 3000;
    } else if file_name.contains(needle) {
        score += 2000;
    } else if haystack.contains(needle) {
        score += 1000;
    }
    score -= haystack.len() as i64;
    Some(score)
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut rest = haystack.chars();
    needle.chars().all(|wanted| rest.any(|ch| ch == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker() -> FilePicker {
        FilePicker::new(vec![
            "README.md".to_owned(),
            "lib/util.rs".to_owned(),
            "main.py".to_owned(),
            "src/main.rs".to_owned(),
        ])
    }

    #[test]
    fn empty_query_lists_every_candidate_in_order() {
        let picker = picker();
        assert_eq!(picker.matches().len(), 4);
        assert_eq!(picker.selected(), Some("README.md"));
    }

    #[test]
    fn file_name_prefix_ranks_first() {
        let mut picker = picker();
        for ch in "main".chars() {
            picker.push(ch);
        }
        assert_eq!(picker.matches(), ["main.py", "src/main.rs"]);
    }

    #[test]
    fn non_subsequence_is_filtered_out() {
        let mut picker = picker();
        for ch in "xyz".chars() {
            picker.push(ch);
        }
        assert!(picker.matches().is_empty());
        assert_eq!(picker.selected(), None);

        picker.pop();
        picker.pop();
        picker.pop();
        assert_eq!(picker.matches().len(), 4);
    }

    #[test]
    fn selection_is_clamped_to_matches() {
        let mut picker = picker();
        picker.move_selection(10);
        assert_eq!(picker.selected_index(), 3);
        picker.move_selection(-10);
        assert_eq!(picker.selected_index(), 0);
    }

    #[test]
    fn query_matching_is_case_insensitive() {
        assert!(fuzzy_score("readme", "readme.md").is_some());
        let mut picker = picker();
        for ch in "READ".chars() {
            picker.push(ch);
        }
        assert_eq!(picker.selected(), Some("README.md"));
    }
}
