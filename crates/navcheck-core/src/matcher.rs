//! Element matchers for selecting nodes in the accessibility hierarchy.
//!
//! Matchers are evaluated locally against a tree returned by
//! [`AutomationDriver::dump_tree`](crate::driver::AutomationDriver::dump_tree).
//! [`find_all`] walks the tree depth-first in document order, so selecting the
//! n-th match is stable between polls as long as the screen layout does not
//! change.

use std::fmt;

use crate::element::UIElement;

/// Describes which elements to select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Accessibility identifier, with `*` and `?` glob support.
    Id(String),
    /// Exact accessibility label (the displayed text for labels and buttons).
    Label(String),
    /// Label or value containing the given text.
    ContainsText(String),
    /// Every inner matcher must match.
    AllOf(Vec<Matcher>),
    /// Some ancestor of the element must match the inner matcher.
    Ancestor(Box<Matcher>),
}

impl Matcher {
    pub fn id(identifier: impl Into<String>) -> Self {
        Matcher::Id(identifier.into())
    }

    pub fn label(text: impl Into<String>) -> Self {
        Matcher::Label(text.into())
    }

    pub fn containing_text(text: impl Into<String>) -> Self {
        Matcher::ContainsText(text.into())
    }

    /// Restricts this matcher to descendants of elements matching `ancestor`.
    pub fn inside(self, ancestor: Matcher) -> Self {
        Matcher::AllOf(vec![self, Matcher::Ancestor(Box::new(ancestor))])
    }

    /// Evaluates the matcher for `element`, given the chain of its ancestors
    /// (outermost first).
    fn matches(&self, element: &UIElement, ancestors: &[&UIElement]) -> bool {
        match self {
            Matcher::Id(pattern) => element
                .identifier
                .as_deref()
                .map_or(false, |id| glob_match(pattern, id)),
            Matcher::Label(text) => element.label.as_deref() == Some(text.as_str()),
            Matcher::ContainsText(text) => {
                element.label.as_deref().map_or(false, |l| l.contains(text.as_str()))
                    || element.value.as_deref().map_or(false, |v| v.contains(text.as_str()))
            }
            Matcher::AllOf(matchers) => matchers.iter().all(|m| m.matches(element, ancestors)),
            Matcher::Ancestor(inner) => ancestors
                .iter()
                .enumerate()
                .any(|(depth, a)| inner.matches(a, &ancestors[..depth])),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Id(id) => write!(f, "id '{}'", id),
            Matcher::Label(text) => write!(f, "label '{}'", text),
            Matcher::ContainsText(text) => write!(f, "text containing '{}'", text),
            Matcher::AllOf(matchers) => {
                let parts: Vec<String> = matchers.iter().map(|m| m.to_string()).collect();
                write!(f, "({})", parts.join(" and "))
            }
            Matcher::Ancestor(inner) => write!(f, "descendant of {}", inner),
        }
    }
}

/// Returns true if the pattern contains glob wildcard characters (`*` or `?`).
fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Matches a string against a glob pattern with `*` (any chars) and `?` (single char).
///
/// When the pattern has no wildcards, falls back to exact equality.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == text;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    let (plen, tlen) = (pat.len(), txt.len());

    // dp[i][j] = pattern[..i] matches text[..j]
    let mut dp = vec![vec![false; tlen + 1]; plen + 1];
    dp[0][0] = true;

    for i in 1..=plen {
        if pat[i - 1] == '*' {
            dp[i][0] = dp[i - 1][0];
        }
    }

    for i in 1..=plen {
        for j in 1..=tlen {
            if pat[i - 1] == '*' {
                dp[i][j] = dp[i - 1][j] || dp[i][j - 1];
            } else if pat[i - 1] == '?' || pat[i - 1] == txt[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }

    dp[plen][tlen]
}

/// Collects every element in the hierarchy matching `matcher`, in document order.
pub fn find_all(elements: &[UIElement], matcher: &Matcher) -> Vec<UIElement> {
    let mut result = Vec::new();
    let mut ancestors = Vec::new();
    collect_matches(elements, matcher, &mut ancestors, &mut result);
    result
}

fn collect_matches<'a>(
    elements: &'a [UIElement],
    matcher: &Matcher,
    ancestors: &mut Vec<&'a UIElement>,
    result: &mut Vec<UIElement>,
) {
    for element in elements {
        if matcher.matches(element, ancestors) {
            result.push(element.clone());
        }
        ancestors.push(element);
        collect_matches(&element.children, matcher, ancestors, result);
        ancestors.pop();
    }
}

/// Returns the first element matching `matcher`, if any.
pub fn find_first(elements: &[UIElement], matcher: &Matcher) -> Option<UIElement> {
    find_all(elements, matcher).into_iter().next()
}
