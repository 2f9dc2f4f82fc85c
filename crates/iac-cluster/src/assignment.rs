use iac_core::{IacError, NodeId, Result, F};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cluster label to member node ids, both ascending.
///
/// Serializes as a JSON object keyed by label: `{"0": [0, 3], "1": [1, 2]}`.
/// Deserializing goes through [`ClusterAssignment::from_groups`], so a
/// document that is not a partition is rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<usize, Vec<NodeId>>",
    into = "BTreeMap<usize, Vec<NodeId>>"
)]
pub struct ClusterAssignment {
    groups: BTreeMap<usize, Vec<NodeId>>,
}

impl ClusterAssignment {
    /// Group nodes by label, re-indexing the distinct labels in ascending
    /// order to `0..k`.
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut distinct: Vec<usize> = labels.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let mut groups: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for (node, label) in labels.iter().enumerate() {
            // present by construction
            let index = distinct.binary_search(label).unwrap_or_default();
            groups.entry(index).or_default().push(node);
        }
        Self { groups }
    }

    /// Build from explicit groups, checking that they partition `[0, n)`.
    pub fn from_groups(groups: BTreeMap<usize, Vec<NodeId>>) -> Result<Self> {
        let mut assignment = Self { groups };
        for members in assignment.groups.values_mut() {
            members.sort_unstable();
        }
        assignment.validate()?;
        Ok(assignment)
    }

    pub fn num_clusters(&self) -> usize {
        self.groups.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn members(&self, label: usize) -> Option<&[NodeId]> {
        self.groups.get(&label).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[NodeId])> {
        self.groups.iter().map(|(&c, m)| (c, m.as_slice()))
    }

    pub fn sizes(&self) -> BTreeMap<usize, usize> {
        self.groups.iter().map(|(&c, m)| (c, m.len())).collect()
    }

    /// Share of nodes in each cluster, in percent.
    pub fn percentages(&self) -> BTreeMap<usize, F> {
        let n = self.num_nodes().max(1) as F;
        self.groups
            .iter()
            .map(|(&c, m)| (c, 100.0 * m.len() as F / n))
            .collect()
    }

    /// Every node in `[0, n)` appears in exactly one group.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_nodes();
        let mut seen = vec![false; n];
        for (&label, members) in &self.groups {
            for &v in members {
                match seen.get_mut(v) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(IacError::DegenerateInput(format!(
                            "node {v} appears twice (again in cluster {label})"
                        )))
                    }
                    None => {
                        return Err(IacError::DegenerateInput(format!(
                            "node {v} in cluster {label} outside [0, {n})"
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Per-node label vector.
    pub fn to_labels(&self) -> Result<Vec<usize>> {
        self.validate()?;
        let mut labels = vec![0; self.num_nodes()];
        for (&label, members) in &self.groups {
            for &v in members {
                labels[v] = label;
            }
        }
        Ok(labels)
    }
}

impl TryFrom<BTreeMap<usize, Vec<NodeId>>> for ClusterAssignment {
    type Error = IacError;

    fn try_from(groups: BTreeMap<usize, Vec<NodeId>>) -> Result<Self> {
        Self::from_groups(groups)
    }
}

impl From<ClusterAssignment> for BTreeMap<usize, Vec<NodeId>> {
    fn from(assignment: ClusterAssignment) -> Self {
        assignment.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reindexes_sorted_labels() {
        let a = ClusterAssignment::from_labels(&[7, 2, 7, 9, 2]);
        assert_eq!(a.num_clusters(), 3);
        assert_eq!(a.members(0), Some(&[1, 4][..]));
        assert_eq!(a.members(1), Some(&[0, 2][..]));
        assert_eq!(a.members(2), Some(&[3][..]));
        assert_eq!(a.to_labels().unwrap(), vec![1, 0, 1, 2, 0]);
    }

    #[test]
    fn test_json_shape() {
        let a = ClusterAssignment::from_labels(&[1, 0, 1]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"{"0":[1],"1":[0,2]}"#);
        let back: ClusterAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_deserialize_rejects_non_partition() {
        assert!(serde_json::from_str::<ClusterAssignment>(r#"{"0":[0,1],"1":[1]}"#).is_err());
        assert!(serde_json::from_str::<ClusterAssignment>(r#"{"0":[0],"1":[2]}"#).is_err());
        let a: ClusterAssignment = serde_json::from_str(r#"{"0":[2,0],"1":[1]}"#).unwrap();
        assert_eq!(a.members(0), Some(&[0, 2][..]));
    }

    #[test]
    fn test_sizes_and_percentages() {
        let a = ClusterAssignment::from_labels(&[0, 0, 0, 1]);
        assert_eq!(a.sizes()[&0], 3);
        assert_eq!(a.percentages()[&0], 75.0);
        assert_eq!(a.percentages()[&1], 25.0);
    }

    #[test]
    fn test_from_groups_rejects_overlap_and_gaps() {
        let overlap = BTreeMap::from([(0, vec![0, 1]), (1, vec![1])]);
        assert!(ClusterAssignment::from_groups(overlap).is_err());
        let gap = BTreeMap::from([(0, vec![0]), (1, vec![2])]);
        assert!(ClusterAssignment::from_groups(gap).is_err());
        let ok = BTreeMap::from([(0, vec![2, 0]), (1, vec![1])]);
        assert_eq!(ClusterAssignment::from_groups(ok).unwrap().members(0), Some(&[0, 2][..]));
    }

    #[test]
    fn test_empty() {
        let a = ClusterAssignment::from_labels(&[]);
        assert!(a.is_empty());
        assert_eq!(a.to_labels().unwrap(), Vec::<usize>::new());
    }
}
