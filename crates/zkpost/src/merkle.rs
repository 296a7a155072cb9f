//! Fixed-depth binary Merkle tree over identity commitments.
//!
//! $$\text{node} = H(\texttt{"ZkPost\_MerkleNod"},\; \text{left} \|
//!   \text{right})$$
//!
//! Empty leaves are $0$. A [`Path`] lists one sibling and one direction bit
//! per level, leaf first. Bit $0$ means the running node is the left child.

use ff::{Field as _, PrimeField as _};
use pasta_curves::Fp;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_TREE_DEPTH, MERKLE_NODE_PERSONALIZATION},
    error::WitnessError,
    primitives::{fp_hex, hash_to_field},
};

/// Hash two children into their parent.
#[must_use]
pub fn hash_node(left: Fp, right: Fp) -> Fp {
    hash_to_field(
        MERKLE_NODE_PERSONALIZATION,
        &[&left.to_repr(), &right.to_repr()],
    )
}

/// Root of the identity tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root(#[serde(with = "fp_hex")] pub Fp);

/// Membership path for one leaf.
///
/// Indices are kept as raw bytes so a malformed path survives until the
/// circuit rejects it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    elements: Vec<Fp>,
    indices: Vec<u8>,
}

impl Path {
    /// Assemble a path from sibling hashes and direction bits.
    #[must_use]
    pub const fn new(elements: Vec<Fp>, indices: Vec<u8>) -> Self {
        Self { elements, indices }
    }

    /// Sibling hashes, leaf level first.
    #[must_use]
    pub fn elements(&self) -> &[Fp] {
        &self.elements
    }

    /// Direction bits, leaf level first.
    #[must_use]
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Fold `leaf` up the path.
    pub fn root(&self, leaf: Fp) -> Result<Root, WitnessError> {
        if self.elements.len() != self.indices.len() {
            return Err(WitnessError::PathLength {
                elements: self.elements.len(),
                indices: self.indices.len(),
                depth: self.elements.len().max(self.indices.len()),
            });
        }
        let mut node = leaf;
        for (level, (sibling, index)) in self.elements.iter().zip(&self.indices).enumerate() {
            node = match *index {
                0 => hash_node(node, *sibling),
                1 => hash_node(*sibling, node),
                _ => return Err(WitnessError::PathIndex { level }),
            };
        }
        Ok(Root(node))
    }
}

/// In-memory identity group: an append-only tree of commitments.
#[derive(Clone, Debug)]
pub struct Group {
    depth: usize,
    leaves: Vec<Fp>,
}

impl Group {
    /// An empty group of the given depth, capped at the largest supported
    /// depth.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.min(MAX_TREE_DEPTH),
            leaves: Vec::new(),
        }
    }

    /// Tree depth.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Append a commitment. Returns its leaf index, or `None` once full.
    pub fn insert(&mut self, commitment: Fp) -> Option<usize> {
        let capacity = u32::try_from(self.depth)
            .ok()
            .and_then(|depth| 1usize.checked_shl(depth))
            .unwrap_or(usize::MAX);
        if self.leaves.len() >= capacity {
            return None;
        }
        self.leaves.push(commitment);
        Some(self.leaves.len() - 1)
    }

    /// Leaf index of a commitment.
    #[must_use]
    pub fn index_of(&self, commitment: Fp) -> Option<usize> {
        self.leaves.iter().position(|leaf| *leaf == commitment)
    }

    /// Current root.
    #[must_use]
    pub fn root(&self) -> Root {
        let mut layer = self.leaves.clone();
        let mut zero = Fp::ZERO;
        for _ in 0..self.depth {
            layer = Self::parent_layer(&layer, zero);
            zero = hash_node(zero, zero);
        }
        Root(layer.first().copied().unwrap_or(zero))
    }

    /// Membership path of the leaf at `index`.
    #[must_use]
    pub fn path(&self, index: usize) -> Option<Path> {
        if index >= self.leaves.len() {
            return None;
        }
        let mut layer = self.leaves.clone();
        let mut zero = Fp::ZERO;
        let mut position = index;
        let mut elements = Vec::with_capacity(self.depth);
        let mut indices = Vec::with_capacity(self.depth);
        for _ in 0..self.depth {
            elements.push(layer.get(position ^ 1).copied().unwrap_or(zero));
            indices.push(u8::from(position & 1 == 1));
            layer = Self::parent_layer(&layer, zero);
            zero = hash_node(zero, zero);
            position >>= 1;
        }
        Some(Path::new(elements, indices))
    }

    fn parent_layer(layer: &[Fp], zero: Fp) -> Vec<Fp> {
        layer
            .chunks(2)
            .map(|pair| match *pair {
                [left, right] => hash_node(left, right),
                [left] => hash_node(left, zero),
                _ => zero,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every member's path folds back to the group root.
    #[test]
    fn paths_reach_root() {
        let mut group = Group::new(4);
        for value in 1..=5u64 {
            group.insert(Fp::from(value)).unwrap();
        }
        let root = group.root();
        for index in 0..group.len() {
            let path = group.path(index).unwrap();
            assert_eq!(path.elements().len(), 4);
            let leaf = Fp::from(u64::try_from(index).unwrap() + 1);
            assert_eq!(path.root(leaf).unwrap(), root);
        }
        assert!(group.path(5).is_none());
    }

    /// The empty root is the zero hash chain.
    #[test]
    fn empty_root() {
        let zero1 = hash_node(Fp::ZERO, Fp::ZERO);
        let zero2 = hash_node(zero1, zero1);
        assert_eq!(Group::new(2).root(), Root(zero2));
    }

    /// Capacity is 2^depth.
    #[test]
    fn full_group_rejects() {
        let mut group = Group::new(1);
        assert_eq!(group.insert(Fp::ONE), Some(0));
        assert_eq!(group.insert(Fp::ONE), Some(1));
        assert_eq!(group.insert(Fp::ONE), None);
    }

    /// A direction byte other than 0 or 1 is rejected with its level.
    #[test]
    fn bad_index_rejected() {
        let path = Path::new(vec![Fp::ZERO, Fp::ZERO], vec![0, 2]);
        assert_eq!(
            path.root(Fp::ONE),
            Err(WitnessError::PathIndex { level: 1 })
        );
    }
}
