use std::collections::HashSet;

pub trait TeamMatcher {
    fn matches(&self, token: &str, team_name: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl TeamMatcher for SubstringMatcher {
    fn matches(&self, token: &str, team_name: &str) -> bool {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return false;
        }
        team_name.to_lowercase().contains(&token)
    }
}

/// Accepts when every word of the token appears among the team's words,
/// after stripping punctuation. "man united" does not match "Manchester
/// United", but "united manchester" matches it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetMatcher;

impl TeamMatcher for TokenSetMatcher {
    fn matches(&self, token: &str, team_name: &str) -> bool {
        let token = normalize_name(token);
        let team = normalize_name(team_name);
        let wanted = words(&token);
        if wanted.is_empty() {
            return false;
        }
        wanted.is_subset(&words(&team))
    }
}

pub fn normalize_name(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn words(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Loose comparison against a configured roster entry: either normalised
/// name contains the other, or all words of the shorter appear in the longer.
pub fn roster_allows(roster: &[String], team_name: &str) -> bool {
    let team = normalize_name(team_name);
    if team.is_empty() {
        return false;
    }
    roster.iter().any(|entry| {
        let entry = normalize_name(entry);
        if entry.is_empty() {
            return false;
        }
        if team.contains(&entry) || entry.contains(&team) {
            return true;
        }
        let (a, b) = (words(&entry), words(&team));
        a.is_subset(&b) || b.is_subset(&a)
    })
}
