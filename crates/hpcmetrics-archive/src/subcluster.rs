// SPDX-License-Identifier: Apache-2.0

//! Resolving which subcluster a job ran on, from its first allocated hostname.

use hpcmetrics_nodelist::NodeList;

/// One subcluster's name and parsed node-list expression, as loaded from `cluster.json`.
pub struct SubclusterMembership {
    /// Subcluster name.
    pub name: String,
    /// Parsed node-list expression covering this subcluster's nodes.
    pub nodes: NodeList,
}

/// Resolves the subcluster a job ran on from the first hostname in its allocated resources.
///
/// Returns `None` if `resources` is empty or no subcluster's node-list expression matches the
/// first hostname; callers treat that as "subcluster unknown" rather than an error.
#[must_use]
pub fn assign_subcluster<'a>(
    memberships: &'a [SubclusterMembership],
    resources: &[String],
) -> Option<&'a str> {
    let first = resources.first()?;
    memberships
        .iter()
        .find(|m| m.nodes.contains(first))
        .map(|m| m.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_subcluster_from_first_hostname() {
        let memberships = vec![
            SubclusterMembership { name: "genoa".into(), nodes: NodeList::parse("fritz[0001-0500]").unwrap() },
            SubclusterMembership { name: "a100".into(), nodes: NodeList::parse("fritz[0501-0600]").unwrap() },
        ];
        let resources = vec!["fritz0042".to_owned(), "fritz0043".to_owned()];
        assert_eq!(assign_subcluster(&memberships, &resources), Some("genoa"));
    }

    #[test]
    fn unmatched_hostname_yields_none() {
        let memberships = vec![SubclusterMembership {
            name: "genoa".into(),
            nodes: NodeList::parse("fritz[0001-0500]").unwrap(),
        }];
        let resources = vec!["other9999".to_owned()];
        assert_eq!(assign_subcluster(&memberships, &resources), None);
    }

    #[test]
    fn empty_resources_yields_none() {
        let memberships: Vec<SubclusterMembership> = Vec::new();
        assert_eq!(assign_subcluster(&memberships, &[]), None);
    }
}
