//! Decoder for the inline `assign1,assign2:pass1,pass2` pair syntax.

use sqdeploy_common::types::DeploymentPair;

fn split_list(part: &str) -> Vec<String> {
    part.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses one pair token.
///
/// The token splits once on `:` into an assignment side and a password
/// side, then each side splits on `,`. Returns `None` when no assignment
/// remains after trimming.
#[must_use]
pub fn parse_pair(token: &str) -> Option<DeploymentPair> {
    let (assign_part, pass_part) = token.split_once(':').unwrap_or((token, ""));
    let assignments = split_list(assign_part);
    if assignments.is_empty() {
        tracing::warn!(token, "pair has no assignments, ignoring");
        return None;
    }
    Some(DeploymentPair::from_paths(assignments, split_list(pass_part)))
}

/// Parses a list of pair tokens, skipping tokens without assignments.
#[must_use]
pub fn parse_pairs<S: AsRef<str>>(tokens: &[S]) -> Vec<DeploymentPair> {
    tokens.iter().filter_map(|t| parse_pair(t.as_ref())).collect()
}
