//! Expansion of wildcard rules into array elements discovered from input keys.
//!
//! A rule such as `acquisition.detectors[N].name ← Detectors.Detector-[N].DetectorName` cannot be
//! resolved by exact lookup. The first pass registers its pattern in [`DeferredRules`]; this
//! module then scans the input for keys matching the pattern, groups matches by the captured
//! `[N]` value and builds one array element per captured value.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::mapping::{MappingRule, SourceTier, TargetPath, WILDCARD};
use crate::types::{FlatDocument, Node, Object};

use super::diagnostic::Diagnostic;
use super::resolve::resolve;
use super::tree::insert;
use super::value::convert;

/// Wildcard rules handed from the first pass to the array expansion.
///
/// Created per conversion; each distinct pattern is registered once.
#[derive(Debug, Default)]
pub struct DeferredRules {
    seen: HashSet<String>,
    rules: Vec<MappingRule>,
}

impl DeferredRules {
    /// Register `pattern` (a source pattern of `rule` that did not match literally).
    ///
    /// Only wildcard patterns of rules targeting an array are kept. The stored rule looks up
    /// `pattern` alone, with the unit factor of the tier it came from. Returns `true` if the
    /// pattern was newly registered.
    pub fn register(&mut self, rule: &MappingRule, pattern: &str, tier: &SourceTier) -> bool {
        if !pattern.contains(WILDCARD) || !rule.target.is_array() {
            return false;
        }
        if !self.seen.insert(pattern.to_string()) {
            return false;
        }
        self.rules.push(MappingRule {
            target: rule.target.clone(),
            tiers: [
                SourceTier {
                    primary: pattern.to_string(),
                    alternate: String::new(),
                    unit_factor: tier.unit_factor.clone(),
                },
                SourceTier::default(),
            ],
            unit: rule.unit.clone(),
            declared_type: rule.declared_type.clone(),
        });
        true
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Elements built for one array location.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedArray {
    /// Path of the array, array name included.
    pub array: Vec<String>,
    /// Elements ordered by captured value.
    pub elements: Vec<Node>,
}

/// Build a regex for a wildcard source pattern.
///
/// Everything is matched literally except the wildcard, which captures one or more
/// characters other than `.`.
///
/// ```
/// use oscem_converter::conversion::dynamic::pattern_matcher;
///
/// let re = pattern_matcher("Detectors.Detector-[N].DetectorName").unwrap();
/// let caps = re.captures("Detectors.Detector-BM-Falcon.DetectorName").unwrap();
/// assert_eq!(&caps[1], "BM-Falcon");
/// assert!(!re.is_match("Detectors.Detector-1.Sub.DetectorName"));
/// ```
pub fn pattern_matcher(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern).replace(&regex::escape(WILDCARD), "([^.]+)");
    Regex::new(&format!("^{escaped}$"))
}

/// Expand every deferred rule against `input`.
///
/// Rules are grouped by array location. Within a location, input keys matching any rule
/// pattern are partitioned by captured value; captured values are visited in lexicographic
/// order and each one becomes an element built by all rules of that location. Elements that
/// receive no value are dropped.
pub fn expand(
    deferred: &DeferredRules,
    input: &FlatDocument,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ExpandedArray> {
    let mut by_location: BTreeMap<&[String], Vec<&MappingRule>> = BTreeMap::new();
    for rule in deferred.rules() {
        if let TargetPath::Array { array, .. } = &rule.target {
            by_location.entry(array.as_slice()).or_default().push(rule);
        }
    }

    let mut expanded = Vec::with_capacity(by_location.len());
    for (array, rules) in by_location {
        let groups = group_matches(&rules, input);

        let mut elements = Vec::with_capacity(groups.len());
        for (captured, sub_document) in &groups {
            let element = build_element(&rules, sub_document, diagnostics);
            if element.is_empty() {
                tracing::debug!(array = %array.join("."), captured = %captured, "dropping empty array element");
                continue;
            }
            elements.push(Node::Object(element));
        }

        if !elements.is_empty() {
            expanded.push(ExpandedArray {
                array: array.to_vec(),
                elements,
            });
        }
    }
    expanded
}

/// Captured value → (rule pattern → matched input value).
fn group_matches(rules: &[&MappingRule], input: &FlatDocument) -> BTreeMap<String, FlatDocument> {
    let mut groups: BTreeMap<String, FlatDocument> = BTreeMap::new();
    for rule in rules {
        let pattern = &rule.tiers[0].primary;
        let matcher = match pattern_matcher(pattern) {
            Ok(m) => m,
            // Escaped input only fails on the compiled size limit.
            Err(err) => {
                tracing::warn!(pattern = %pattern, error = %err, "skipping wildcard pattern");
                continue;
            }
        };

        for (key, value) in input {
            let Some(captured) = matcher.captures(key).and_then(|c| c.get(1)) else {
                continue;
            };
            groups
                .entry(captured.as_str().to_string())
                .or_default()
                .insert(pattern.clone(), value.clone());
        }
    }
    groups
}

fn build_element(
    rules: &[&MappingRule],
    sub_document: &FlatDocument,
    diagnostics: &mut Vec<Diagnostic>,
) -> Object {
    let mut element = Object::new();
    for rule in rules {
        let TargetPath::Array { element: path, .. } = &rule.target else {
            continue;
        };
        let Some(found) = resolve(rule, sub_document) else {
            continue;
        };
        let Some(raw) = found.values.first() else {
            continue;
        };

        let conversion = convert(raw, &found.unit_factor, &rule.declared_type, &rule.unit);
        if let Some(error) = conversion.warning {
            diagnostics.push(Diagnostic::UnitConversionFailed {
                target: rule.target.to_string(),
                error,
            });
        }
        let Some(value) = conversion.value else {
            continue;
        };
        if let Err(error) = insert(&mut element, path, Node::Value(value)) {
            diagnostics.push(Diagnostic::InsertConflict {
                target: rule.target.to_string(),
                error,
            });
        }
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DeclaredType;
    use crate::types::{DataType, TypedValue, Value};

    fn doc(pairs: &[(&str, &str)]) -> FlatDocument {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rule(target: &str, primary: &str, t: DataType) -> MappingRule {
        MappingRule::new(TargetPath::parse(target).unwrap(), primary, DeclaredType::Known(t))
    }

    fn text(s: &str) -> Node {
        Node::Value(TypedValue::set(Value::Utf8(s.to_string()), ""))
    }

    fn register_all(rules: &[MappingRule]) -> DeferredRules {
        let mut deferred = DeferredRules::default();
        for r in rules {
            deferred.register(r, &r.tiers[0].primary, &r.tiers[0]);
        }
        deferred
    }

    #[test]
    fn registration_is_once_per_pattern_and_only_for_array_wildcards() {
        let array_rule = rule("a.items[N].v", "Items.[N].V", DataType::Utf8);
        let plain_rule = rule("a.v", "Items.[N].V", DataType::Utf8);
        let literal_rule = rule("a.items[N].w", "Items.W", DataType::Utf8);

        let mut deferred = DeferredRules::default();
        assert!(!deferred.register(&plain_rule, "Items.[N].V", &plain_rule.tiers[0]));
        assert!(!deferred.register(&literal_rule, "Items.W", &literal_rule.tiers[0]));
        assert!(deferred.register(&array_rule, "Items.[N].V", &array_rule.tiers[0]));
        assert!(!deferred.register(&array_rule, "Items.[N].V", &array_rule.tiers[0]));
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn registered_rule_keeps_the_tier_factor() {
        let source = rule("a.items[N].v", "unused", DataType::Float64).with_second_tier(SourceTier {
            primary: "X.[N].v".into(),
            alternate: String::new(),
            unit_factor: "0.5".into(),
        });
        let mut deferred = DeferredRules::default();
        deferred.register(&source, "X.[N].v", &source.tiers[1]);
        let stored = &deferred.rules()[0];
        assert_eq!(stored.tiers[0].primary, "X.[N].v");
        assert_eq!(stored.tiers[0].unit_factor, "0.5");
    }

    #[test]
    fn groups_by_captured_value_in_lexicographic_order() {
        let rules = vec![
            rule("acquisition.detectors[N].name", "Detectors.Detector-[N].DetectorName", DataType::Utf8),
            rule("acquisition.detectors[N].mode", "Detectors.Detector-[N].Mode", DataType::Utf8),
        ];
        let input = doc(&[
            ("Detectors.Detector-7.DetectorName", "K3"),
            ("Detectors.Detector-1.DetectorName", "Falcon"),
            ("Detectors.Detector-1.Mode", "Counting"),
        ]);

        let mut diagnostics = Vec::new();
        let expanded = expand(&register_all(&rules), &input, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].array, vec!["acquisition", "detectors"]);

        let elements = &expanded[0].elements;
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].get("name"), Some(&text("Falcon")));
        assert_eq!(elements[0].get("mode"), Some(&text("Counting")));
        assert_eq!(elements[1].get("name"), Some(&text("K3")));
        assert!(elements[1].get("mode").is_none());
    }

    #[test]
    fn captured_values_sort_as_strings_not_numbers() {
        let rules = vec![rule("a.list[N].v", "L.[N].v", DataType::Int64)];
        let input = doc(&[("L.10.v", "10"), ("L.9.v", "9"), ("L.2.v", "2")]);
        let expanded = expand(&register_all(&rules), &input, &mut Vec::new());
        let values: Vec<_> = expanded[0]
            .elements
            .iter()
            .map(|e| e.get("v").and_then(Node::as_value).map(|v| v.value().clone()))
            .collect();
        assert_eq!(
            values,
            vec![Some(Value::Int64(10)), Some(Value::Int64(2)), Some(Value::Int64(9))]
        );
    }

    #[test]
    fn separate_locations_expand_independently() {
        let rules = vec![
            rule("a.first[N].v", "F.[N]", DataType::Utf8),
            rule("b.second[N].v", "S.[N]", DataType::Utf8),
        ];
        let input = doc(&[("F.x", "1"), ("S.y", "2"), ("S.z", "3")]);
        let expanded = expand(&register_all(&rules), &input, &mut Vec::new());
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].array, vec!["a", "first"]);
        assert_eq!(expanded[0].elements.len(), 1);
        assert_eq!(expanded[1].array, vec!["b", "second"]);
        assert_eq!(expanded[1].elements.len(), 2);
    }

    #[test]
    fn elements_without_values_are_dropped() {
        let mut unknown = rule("a.items[N].v", "I.[N].v", DataType::Utf8);
        unknown.declared_type = DeclaredType::Unrecognized("date".into());
        let expanded = expand(&register_all(&[unknown]), &doc(&[("I.1.v", "x")]), &mut Vec::new());
        assert!(expanded.is_empty());
    }

    #[test]
    fn pattern_metacharacters_match_literally() {
        let re = pattern_matcher("Gain(x+y)*.Det[1]-[N].$v").unwrap();
        let caps = re.captures("Gain(x+y)*.Det[1]-A2.$v").unwrap();
        assert_eq!(&caps[1], "A2");
        assert!(!re.is_match("Gainxxy.Det1-A2.v"));
    }

    #[test]
    fn wildcard_does_not_cross_separators() {
        let rules = vec![rule("a.items[N].v", "I.[N].v", DataType::Utf8)];
        let input = doc(&[("I.1.2.v", "nested"), ("I..v", "empty")]);
        assert!(expand(&register_all(&rules), &input, &mut Vec::new()).is_empty());
    }

    #[test]
    fn unit_factor_failures_inside_elements_are_reported() {
        let rules = vec![rule("a.items[N].v", "I.[N].v", DataType::Float64).with_unit_factor("2")];
        let mut diagnostics = Vec::new();
        let expanded = expand(&register_all(&rules), &doc(&[("I.1.v", "n/a")]), &mut diagnostics);
        assert_eq!(expanded[0].elements.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].subject(), "a.items[N].v");
    }
}
