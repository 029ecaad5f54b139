#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

/// One persisted identity record, reduced to what canonicalization needs.
/// The same value appears once per evidence submission that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityRow {
    pub value: String,
    pub created_at_ms: i64,
}

/// One alias edge: `alias` is superseded and resolves toward `root` within
/// the owner scope. `seq` is the edge creation order (monotonic per store).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasRow {
    pub seq: i64,
    pub alias: String,
    pub root: String,
}

/// Alias values hidden from listings. A root with no identity record of its
/// own is a virtual grouping key; its earliest-declared alias stays visible
/// as the representative, every other alias value is superseded.
pub fn superseded_values(identities: &[IdentityRow], aliases: &[AliasRow]) -> BTreeSet<String> {
    let recorded: BTreeSet<&str> = identities.iter().map(|row| row.value.as_str()).collect();

    let mut representative: BTreeMap<&str, (i64, &str)> = BTreeMap::new();
    for edge in aliases {
        if recorded.contains(edge.root.as_str()) {
            continue;
        }
        match representative.get(edge.root.as_str()) {
            Some((seq, _)) if *seq <= edge.seq => {}
            _ => {
                representative.insert(edge.root.as_str(), (edge.seq, edge.alias.as_str()));
            }
        }
    }
    let keep: BTreeSet<&str> = representative
        .values()
        .map(|(_, alias)| *alias)
        .collect();

    aliases
        .iter()
        .map(|edge| edge.alias.as_str())
        .filter(|alias| !keep.contains(alias))
        .map(|alias| alias.to_string())
        .collect()
}

/// One representative identity value per logical device: distinct recorded
/// values minus superseded aliases, deduplicated keeping each value's most
/// recent record, ordered most recent first (value ascending on ties).
pub fn canonical_values(identities: &[IdentityRow], aliases: &[AliasRow]) -> Vec<String> {
    let superseded = superseded_values(identities, aliases);

    let mut latest: BTreeMap<&str, i64> = BTreeMap::new();
    for row in identities {
        if superseded.contains(row.value.as_str()) {
            continue;
        }
        let entry = latest.entry(row.value.as_str()).or_insert(row.created_at_ms);
        if row.created_at_ms > *entry {
            *entry = row.created_at_ms;
        }
    }

    let mut ordered: Vec<(&str, i64)> = latest.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ordered.into_iter().map(|(value, _)| value.to_string()).collect()
}

/// Canonical values not grouped under any lot. A lot member excludes itself
/// plus its one-hop alias/root counterparts: every root an edge ties to a
/// member, and every alias of such a root.
pub fn unassigned_values(
    identities: &[IdentityRow],
    aliases: &[AliasRow],
    lot_members: &BTreeSet<String>,
) -> Vec<String> {
    let base = canonical_values(identities, aliases);
    if lot_members.is_empty() {
        return base;
    }

    let mut member_roots: BTreeSet<&str> = BTreeSet::new();
    for edge in aliases {
        if lot_members.contains(edge.alias.as_str()) || lot_members.contains(edge.root.as_str()) {
            member_roots.insert(edge.root.as_str());
        }
    }
    let mut excluded: BTreeSet<&str> = lot_members.iter().map(String::as_str).collect();
    for edge in aliases {
        if member_roots.contains(edge.root.as_str()) {
            excluded.insert(edge.alias.as_str());
        }
    }
    excluded.extend(member_roots.iter().copied());

    base.into_iter()
        .filter(|value| !excluded.contains(value.as_str()))
        .collect()
}

/// Identity values equivalent to `value`, one hop in each direction: aliases
/// pointing at it, and (when it is itself an alias) its root plus that
/// root's other aliases. Chains of edges are not followed further.
pub fn equivalence_set(value: &str, aliases: &[AliasRow]) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    set.insert(value.to_string());

    for edge in aliases {
        if edge.root == value {
            set.insert(edge.alias.clone());
        }
    }

    let roots: Vec<&str> = aliases
        .iter()
        .filter(|edge| edge.alias == value)
        .map(|edge| edge.root.as_str())
        .collect();
    for root in roots {
        set.insert(root.to_string());
        for edge in aliases {
            if edge.root == root {
                set.insert(edge.alias.clone());
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[&str], created_at_ms: i64) -> Vec<IdentityRow> {
        values
            .iter()
            .map(|value| IdentityRow {
                value: value.to_string(),
                created_at_ms,
            })
            .collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<AliasRow> {
        pairs
            .iter()
            .enumerate()
            .map(|(index, (alias, root))| AliasRow {
                seq: index as i64 + 1,
                alias: alias.to_string(),
                root: root.to_string(),
            })
            .collect()
    }

    // Mixed grouping scenario: a2 and d2 are recorded roots, b2 and c2 are
    // virtual roots whose earliest alias stays visible, z1 is ungrouped.
    fn mixed_identities() -> Vec<IdentityRow> {
        rows(&["a1", "a2", "a3", "b1", "b3", "c1", "d1", "d2", "z1"], 100)
    }

    fn mixed_edges() -> Vec<AliasRow> {
        edges(&[
            ("a1", "a2"),
            ("a3", "a2"),
            ("b1", "b2"),
            ("b3", "b2"),
            ("c1", "c2"),
            ("d1", "d2"),
        ])
    }

    #[test]
    fn canonical_keeps_one_value_per_device() {
        let values = canonical_values(&mixed_identities(), &mixed_edges());
        assert_eq!(values, vec!["a2", "b1", "c1", "d2", "z1"]);
    }

    #[test]
    fn virtual_root_keeps_earliest_alias_as_representative() {
        let identities = rows(&["a", "a2"], 50);
        let one_edge = edges(&[("a", "r")]);
        assert_eq!(canonical_values(&identities, &one_edge), vec!["a", "a2"]);

        let two_edges = edges(&[("a", "r"), ("a2", "r")]);
        assert_eq!(
            superseded_values(&identities, &two_edges),
            BTreeSet::from(["a2".to_string()])
        );
        assert_eq!(canonical_values(&identities, &two_edges), vec!["a"]);
    }

    #[test]
    fn aliases_of_recorded_roots_are_always_superseded() {
        let identities = rows(&["old", "new"], 10);
        let alias = edges(&[("old", "new")]);
        assert_eq!(canonical_values(&identities, &alias), vec!["new"]);
    }

    #[test]
    fn ordering_is_most_recent_first_then_value() {
        let identities = vec![
            IdentityRow {
                value: "m1".to_string(),
                created_at_ms: 100,
            },
            IdentityRow {
                value: "m2".to_string(),
                created_at_ms: 300,
            },
            IdentityRow {
                value: "m1".to_string(),
                created_at_ms: 400,
            },
            IdentityRow {
                value: "m3".to_string(),
                created_at_ms: 300,
            },
        ];
        let values = canonical_values(&identities, &[]);
        assert_eq!(values, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn empty_inputs_list_empty() {
        assert!(canonical_values(&[], &[]).is_empty());
        assert!(unassigned_values(&[], &[], &BTreeSet::new()).is_empty());
    }

    #[test]
    fn lot_membership_excludes_value_and_counterparts() {
        let lots = BTreeSet::from(["a2".to_string()]);
        let values = unassigned_values(&mixed_identities(), &mixed_edges(), &lots);
        assert_eq!(values, vec!["b1", "c1", "d2", "z1"]);
    }

    #[test]
    fn lot_membership_through_root_excludes_alias() {
        let identities = rows(&["d", "e"], 20);
        let alias = edges(&[("d", "e")]);
        let lots = BTreeSet::from(["e".to_string()]);
        let values = unassigned_values(&identities, &alias, &lots);
        assert!(values.is_empty());
    }

    #[test]
    fn lot_membership_of_virtual_root_excludes_whole_group() {
        let identities = rows(&["b1", "b3", "z1"], 30);
        let alias = edges(&[("b1", "b2"), ("b3", "b2")]);
        let lots = BTreeSet::from(["b2".to_string()]);
        let values = unassigned_values(&identities, &alias, &lots);
        assert_eq!(values, vec!["z1"]);
    }

    #[test]
    fn equivalence_set_collects_both_directions() {
        let alias = edges(&[("a1", "a2"), ("a3", "a2")]);
        let from_root = equivalence_set("a2", &alias);
        assert_eq!(
            from_root,
            BTreeSet::from(["a1".to_string(), "a2".to_string(), "a3".to_string()])
        );
        let from_alias = equivalence_set("a1", &alias);
        assert_eq!(
            from_alias,
            BTreeSet::from(["a1".to_string(), "a2".to_string(), "a3".to_string()])
        );
    }

    #[test]
    fn equivalence_set_stops_after_one_hop() {
        let chain = edges(&[("a", "b"), ("b", "c")]);
        let set = equivalence_set("a", &chain);
        assert_eq!(set, BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert!(!set.contains("c"));
    }

    #[test]
    fn equivalence_set_of_unaliased_value_is_singleton() {
        let set = equivalence_set("z1", &mixed_edges());
        assert_eq!(set, BTreeSet::from(["z1".to_string()]));
    }
}
