use sprs::CsMat;

use crate::errors::ShapeError;
use crate::sparse::ragged_to_sparse;

///
/// Ragged per-sample peak data: for every sample, the region indices it has
/// signal at and the signal values there.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaggedProfiles {
    pub sample_ids: Vec<String>,
    pub indices: Vec<Vec<usize>>,
    pub values: Vec<Vec<f64>>,
}

impl RaggedProfiles {
    pub fn new(sample_ids: Vec<String>, indices: Vec<Vec<usize>>, values: Vec<Vec<f64>>) -> Self {
        RaggedProfiles {
            sample_ids,
            indices,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    pub fn position(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Regions x samples matrix for these profiles.
    pub fn to_sparse(&self, num_regions: usize) -> Result<CsMat<f64>, ShapeError> {
        ragged_to_sparse(&self.indices, &self.values, num_regions)
    }

    /// Boolean mask over regions marking where sample `col` has any signal.
    pub fn region_mask(&self, col: usize, num_regions: usize) -> Vec<bool> {
        let mut mask = vec![false; num_regions];
        if let Some(index_column) = self.indices.get(col) {
            for &i in index_column.iter().filter(|&&i| i < num_regions) {
                mask[i] = true;
            }
        }
        mask
    }
}
