//! Source lookup for a single rule.

use crate::mapping::{MappingRule, SourceTier};
use crate::types::FlatDocument;

/// Values found for a rule, plus the unit factor of the tier that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// One entry for a single-key pattern; one positional entry per listed key otherwise,
    /// with `""` where a key was missing.
    pub values: Vec<String>,
    pub unit_factor: String,
}

/// Resolve `rule` against `input`.
///
/// Lookup order is tier 1 alternate, tier 1 primary, tier 2 alternate, tier 2 primary; the first
/// pattern that resolves wins. Returns `None` when nothing resolves.
pub fn resolve(rule: &MappingRule, input: &FlatDocument) -> Option<Resolution> {
    resolve_with(rule, input, |_, _| {})
}

/// Like [`resolve`], but calls `on_miss(pattern, tier)` for every single-key pattern that was
/// tried and did not match. Patterns tried after the winning one are not reported.
pub fn resolve_with<F>(rule: &MappingRule, input: &FlatDocument, mut on_miss: F) -> Option<Resolution>
where
    F: FnMut(&str, &SourceTier),
{
    for tier in &rule.tiers {
        for pattern in tier.patterns() {
            match lookup(pattern, input) {
                Some(values) => {
                    return Some(Resolution {
                        values,
                        unit_factor: tier.unit_factor.clone(),
                    });
                }
                None if !is_key_list(pattern) => on_miss(pattern, tier),
                None => {}
            }
        }
    }
    None
}

/// Look up one pattern: a single key, or a `;`-separated list of keys.
///
/// A list is found when at least one of its keys is present; missing and blank entries keep
/// their slot as `""`.
pub fn lookup(pattern: &str, input: &FlatDocument) -> Option<Vec<String>> {
    if !is_key_list(pattern) {
        return input.get(pattern).map(|v| vec![v.clone()]);
    }

    let mut found_any = false;
    let values: Vec<String> = pattern
        .split(';')
        .map(str::trim)
        .map(|name| {
            if name.is_empty() {
                return String::new();
            }
            match input.get(name) {
                Some(v) => {
                    found_any = true;
                    v.clone()
                }
                None => String::new(),
            }
        })
        .collect();
    found_any.then_some(values)
}

fn is_key_list(pattern: &str) -> bool {
    pattern.contains(';')
}
