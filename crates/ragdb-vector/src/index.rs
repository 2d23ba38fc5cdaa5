use std::collections::HashSet;

use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{ChunkId, SearchHit};
use ragdb_core::{Error, Result};

/// Exact brute-force cosine index.
///
/// Norms are computed once at insert time, so a search is one dot product
/// per stored vector. Fine for collections up to a few hundred thousand
/// chunks; swap in another [`VectorIndex`] beyond that.
#[derive(Debug, Default, Clone)]
pub struct FlatIndex {
    ids: Vec<ChunkId>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    present: HashSet<ChunkId>,
    dim: Option<usize>,
    fixed_dim: Option<usize>,
}

impl FlatIndex {
    pub fn new() -> Self { Self::default() }

    /// Index with a fixed dimension, rejecting other lengths even before the
    /// first insert.
    pub fn with_dim(dim: usize) -> Self {
        Self { dim: Some(dim), fixed_dim: Some(dim), ..Self::default() }
    }

    pub fn contains(&self, id: ChunkId) -> bool { self.present.contains(&id) }

    fn validate(&self, ids: &[ChunkId], vectors: &[Vec<f32>]) -> Result<usize> {
        if ids.len() != vectors.len() {
            return Err(Error::ArityMismatch { left: ids.len(), right: vectors.len() });
        }
        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids {
            if self.present.contains(&id) || !seen.insert(id) {
                return Err(Error::DuplicateId(id));
            }
        }
        let expected = match (self.dim, vectors.first()) {
            (Some(d), _) => d,
            (None, Some(v)) => v.len(),
            (None, None) => 0,
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(Error::DimensionMismatch { expected, actual: bad.len() });
        }
        Ok(expected)
    }
}

fn l2(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, ids: &[ChunkId], vectors: Vec<Vec<f32>>) -> Result<()> {
        let dim = self.validate(ids, &vectors)?;
        if ids.is_empty() { return Ok(()); }
        self.dim = Some(dim);
        self.ids.reserve(ids.len());
        for (&id, v) in ids.iter().zip(vectors) {
            self.norms.push(l2(&v));
            self.vectors.push(v);
            self.ids.push(id);
            self.present.insert(id);
        }
        tracing::debug!(added = ids.len(), size = self.ids.len(), "index insert");
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        if self.ids.is_empty() { return Ok(Vec::new()); }
        if let Some(d) = self.dim {
            if query.len() != d {
                return Err(Error::DimensionMismatch { expected: d, actual: query.len() });
            }
        }
        let qn = l2(query);
        let mut hits: Vec<SearchHit> = self.ids.iter().zip(&self.vectors).zip(&self.norms)
            .map(|((&id, v), &n)| {
                let denom = qn * n;
                let score = if denom > 0.0 { (dot(query, v) / denom).clamp(-1.0, 1.0) } else { 0.0 };
                SearchHit { id, score }
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.vectors.clear();
        self.norms.clear();
        self.present.clear();
        self.dim = self.fixed_dim;
    }

    fn size(&self) -> usize { self.ids.len() }

    fn dim(&self) -> Option<usize> { self.dim }

    fn entries(&self) -> Vec<(ChunkId, Vec<f32>)> {
        self.ids.iter().copied().zip(self.vectors.iter().cloned()).collect()
    }
}
