use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;
use sprs::CsMat;

use crate::errors::{CoreError, Result, ShapeError};
use crate::models::{FactorMetadata, GeneSet, RaggedProfiles, Technology};
use crate::sparse::stack_columns;

///
/// Everything known about one data technology: the metadata of its
/// profiles, the ragged per-sample peaks, and optionally a precomputed
/// genes x samples RP matrix.
///
#[derive(Clone, Debug, Default)]
pub struct TechnologyData {
    pub metadata: FactorMetadata,
    pub profiles: RaggedProfiles,
    pub rp_matrix: Option<CsMat<f64>>,
}

impl TechnologyData {
    ///
    /// Give every metadata id without a profile an empty profile, appended
    /// after the existing ones. A precomputed RP matrix covering exactly the
    /// existing profiles gets matching zero columns. Returns the ids added.
    ///
    pub fn fill_missing_profiles(&mut self) -> std::result::Result<Vec<String>, ShapeError> {
        let present: HashSet<&str> = self.profiles.sample_ids.iter().map(|s| s.as_str()).collect();
        let missing: Vec<String> = self
            .metadata
            .ids()
            .into_iter()
            .filter(|id| !present.contains(id.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(missing);
        }

        if let Some(rp) = &self.rp_matrix
            && rp.cols() == self.profiles.len()
        {
            let zeros = CsMat::zero((rp.rows(), missing.len()));
            self.rp_matrix = Some(stack_columns(&[rp.clone(), zeros])?);
        }
        for id in missing.iter() {
            self.profiles.sample_ids.push(id.clone());
            self.profiles.indices.push(Vec::new());
            self.profiles.values.push(Vec::new());
        }

        Ok(missing)
    }
}

///
/// The read-only data a run works on.
///
/// `rp_map` is the resolved regulatory-potential map in CSR storage, genes x
/// regions, with rows ordered as `rp_map_locs`.
///
#[derive(Clone, Debug)]
pub struct LisaData {
    pub species: String,
    pub genes: GeneSet,
    pub rp_map_locs: Vec<String>,
    pub rp_map: CsMat<f64>,
    technologies: BTreeMap<Technology, TechnologyData>,
}

impl LisaData {
    pub fn new(
        species: &str,
        genes: GeneSet,
        rp_map_locs: Vec<String>,
        rp_map: CsMat<f64>,
    ) -> Result<Self> {
        if rp_map.rows() != rp_map_locs.len() {
            return Err(ShapeError::RowCountMismatch {
                expected: rp_map_locs.len(),
                got: rp_map.rows(),
            }
            .into());
        }

        Ok(LisaData {
            species: species.to_string(),
            genes,
            rp_map_locs,
            rp_map: rp_map.to_csr(),
            technologies: BTreeMap::new(),
        })
    }

    ///
    /// Add the data of one technology. Datasets listed in the metadata
    /// without any peaks get empty profiles. A precomputed RP matrix must
    /// have one row per RP map row and one column per profile.
    ///
    pub fn with_technology(mut self, technology: Technology, mut data: TechnologyData) -> Result<Self> {
        let filled = data.fill_missing_profiles()?;
        if !filled.is_empty() {
            warn!(
                "{} {} datasets have no peaks: {}",
                filled.len(),
                technology,
                filled.join(", ")
            );
        }

        if let Some(rp) = &data.rp_matrix {
            if rp.rows() != self.rp_map_locs.len() {
                return Err(ShapeError::RowCountMismatch {
                    expected: self.rp_map_locs.len(),
                    got: rp.rows(),
                }
                .into());
            }
            if rp.cols() != data.profiles.len() {
                return Err(ShapeError::SampleCountMismatch {
                    expected: data.profiles.len(),
                    got: rp.cols(),
                }
                .into());
            }
        }
        self.technologies.insert(technology, data);
        Ok(self)
    }

    pub fn num_genes(&self) -> usize {
        self.rp_map_locs.len()
    }

    pub fn num_regions(&self) -> usize {
        self.rp_map.cols()
    }

    pub fn technologies(&self) -> impl Iterator<Item = &Technology> {
        self.technologies.keys()
    }

    pub fn technology(&self, technology: Technology) -> Result<&TechnologyData> {
        self.technologies
            .get(&technology)
            .ok_or_else(|| CoreError::MissingTechnology(technology.to_string()))
    }

    /// Metadata slice of one technology.
    pub fn link_metadata(&self, technology: Technology) -> Result<&FactorMetadata> {
        Ok(&self.technology(technology)?.metadata)
    }

    /// Gene location -> row of the RP map.
    pub fn row_lookup(&self) -> HashMap<&str, usize> {
        self.rp_map_locs
            .iter()
            .enumerate()
            .map(|(i, loc)| (loc.as_str(), i))
            .collect()
    }

    ///
    /// Genes x samples RP matrix for a technology, in CSC storage.
    ///
    /// With `generate` unset and a precomputed matrix present, that matrix is
    /// used as is. Otherwise it is synthesized as `rp_map x peaks` from the
    /// technology's ragged profiles.
    ///
    pub fn sample_rp_matrix(&self, technology: Technology, generate: bool) -> Result<CsMat<f64>> {
        let data = self.technology(technology)?;

        match (&data.rp_matrix, generate) {
            (Some(rp), false) => Ok(rp.to_csc()),
            _ => {
                let peaks = data.profiles.to_sparse(self.num_regions())?.to_csr();
                let product: CsMat<f64> = &self.rp_map * &peaks;
                Ok(product.to_csc())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use sprs::TriMat;

    use crate::models::{FactorRecord, Gene};
    use crate::sparse::dense_column;

    #[fixture]
    fn data() -> LisaData {
        let genes = GeneSet::new(vec![Gene::new("g0", "A"), Gene::new("g1", "B")]).unwrap();

        // 2 genes x 3 regions
        let mut rp_map = TriMat::new((2, 3));
        rp_map.add_triplet(0, 0, 1.0);
        rp_map.add_triplet(0, 1, 0.5);
        rp_map.add_triplet(1, 2, 2.0);

        let mut precomputed = TriMat::new((2, 1));
        precomputed.add_triplet(0, 0, 9.0);

        let tech = TechnologyData {
            metadata: FactorMetadata::new(vec![FactorRecord {
                id: "s1".into(),
                attributes: [("factor".to_string(), "A".to_string())].into(),
            }])
            .unwrap(),
            profiles: RaggedProfiles::new(vec!["s1".into()], vec![vec![1, 2]], vec![vec![2.0, 1.0]]),
            rp_matrix: Some(precomputed.to_csc()),
        };

        LisaData::new("hg38", genes, vec!["g0".into(), "g1".into()], rp_map.to_csr())
            .unwrap()
            .with_technology(Technology::DNase, tech)
            .unwrap()
    }

    #[rstest]
    fn test_generated_rp_matrix(data: LisaData) {
        let rp = data.sample_rp_matrix(Technology::DNase, true).unwrap();
        assert_eq!(rp.shape(), (2, 1));
        assert_eq!(dense_column(&rp, 0, &[0, 1]).unwrap(), vec![1.0, 2.0]);
    }

    #[rstest]
    fn test_precomputed_rp_matrix(data: LisaData) {
        let rp = data.sample_rp_matrix(Technology::DNase, false).unwrap();
        assert_eq!(dense_column(&rp, 0, &[0, 1]).unwrap(), vec![9.0, 0.0]);
    }

    fn record(id: &str) -> FactorRecord {
        FactorRecord {
            id: id.into(),
            attributes: [("factor".to_string(), "A".to_string())].into(),
        }
    }

    fn tech_data(ids: &[&str], rp_cols: Option<usize>) -> TechnologyData {
        let rp_matrix = rp_cols.map(|cols| {
            let mut rp = TriMat::new((2, cols));
            rp.add_triplet(0, 0, 9.0);
            rp.to_csc()
        });
        TechnologyData {
            metadata: FactorMetadata::new(ids.iter().map(|id| record(id)).collect()).unwrap(),
            profiles: RaggedProfiles::new(vec!["s1".into()], vec![vec![1]], vec![vec![2.0]]),
            rp_matrix,
        }
    }

    fn empty_data() -> LisaData {
        let genes = GeneSet::new(vec![Gene::new("g0", "A"), Gene::new("g1", "B")]).unwrap();
        let rp_map: CsMat<f64> = TriMat::new((2, 3)).to_csr();
        LisaData::new("hg38", genes, vec!["g0".into(), "g1".into()], rp_map).unwrap()
    }

    #[rstest]
    fn test_dataset_without_peaks_gets_empty_profile() {
        let data = empty_data()
            .with_technology(Technology::ChipSeq, tech_data(&["s1", "s2"], None))
            .unwrap();

        let profiles = &data.technology(Technology::ChipSeq).unwrap().profiles;
        assert_eq!(profiles.sample_ids, vec!["s1", "s2"]);
        assert_eq!(profiles.position("s2"), Some(1));
        assert!(profiles.indices[1].is_empty());

        let rp = data.sample_rp_matrix(Technology::ChipSeq, true).unwrap();
        assert_eq!(rp.shape(), (2, 2));
        assert_eq!(dense_column(&rp, 1, &[0, 1]).unwrap(), vec![0.0, 0.0]);
    }

    #[rstest]
    fn test_precomputed_matrix_padded_for_filled_profiles() {
        let data = empty_data()
            .with_technology(Technology::ChipSeq, tech_data(&["s1", "s2"], Some(1)))
            .unwrap();

        let rp = data.sample_rp_matrix(Technology::ChipSeq, false).unwrap();
        assert_eq!(rp.shape(), (2, 2));
        assert_eq!(dense_column(&rp, 0, &[0, 1]).unwrap(), vec![9.0, 0.0]);
        assert_eq!(dense_column(&rp, 1, &[0, 1]).unwrap(), vec![0.0, 0.0]);
    }

    #[rstest]
    fn test_precomputed_matrix_column_count_checked() {
        let result = empty_data().with_technology(Technology::ChipSeq, tech_data(&["s1"], Some(3)));
        assert!(matches!(
            result,
            Err(CoreError::Shape(ShapeError::SampleCountMismatch { expected: 1, got: 3 }))
        ));
    }

    #[rstest]
    fn test_missing_technology(data: LisaData) {
        assert!(matches!(
            data.link_metadata(Technology::ChipSeq),
            Err(CoreError::MissingTechnology(_))
        ));
        assert_eq!(data.link_metadata(Technology::DNase).unwrap().len(), 1);
    }

    #[rstest]
    fn test_row_count_checked() {
        let genes = GeneSet::new(vec![Gene::new("g0", "A")]).unwrap();
        let rp_map: CsMat<f64> = TriMat::new((2, 3)).to_csr();
        assert!(LisaData::new("hg38", genes, vec!["g0".into()], rp_map).is_err());
    }
}
