//! Alignment of factor names onto the row order of an RP map.
//!
//! Factor names from metadata are matched against the gene catalog, which
//! normalizes casing and synonyms. Rows of the RP map whose gene location is
//! among the matched locations are selected, and each selected row is labelled
//! with the catalog symbol of its gene. Names without a catalog match are left
//! out silently.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::GeneCatalog;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactorAlignment {
    mask: Vec<bool>,
    lookup: BTreeMap<usize, String>,
}

impl FactorAlignment {
    ///
    /// Align factor names against the RP map rows.
    ///
    /// # Arguments
    /// - rp_map_locs: gene location of every RP map row, in row order
    /// - catalog: canonical gene set of the organism
    /// - factor_names: display names of the factors of interest
    pub fn align<C, S>(rp_map_locs: &[String], catalog: &C, factor_names: &[S]) -> Self
    where
        C: GeneCatalog,
        S: AsRef<str>,
    {
        let factor_genes = catalog.match_user_provided_genes(factor_names);

        let loc_to_symbol: HashMap<String, String> = factor_genes
            .get_locations()
            .into_iter()
            .zip(factor_genes.get_symbols())
            .collect();
        let matched: HashSet<&str> = loc_to_symbol.keys().map(|s| s.as_str()).collect();

        let mask: Vec<bool> = rp_map_locs
            .iter()
            .map(|loc| matched.contains(loc.as_str()))
            .collect();

        let lookup = rp_map_locs
            .iter()
            .enumerate()
            .filter(|(i, _)| mask[*i])
            .filter_map(|(i, loc)| loc_to_symbol.get(loc).map(|symbol| (i, symbol.clone())))
            .collect();

        FactorAlignment { mask, lookup }
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Selected row -> display label.
    pub fn lookup(&self) -> &BTreeMap<usize, String> {
        &self.lookup
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn num_selected(&self) -> usize {
        self.lookup.len()
    }

    /// Selected rows in ascending order.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.lookup.keys().copied().collect()
    }

    /// Labels of the selected rows in ascending row order.
    pub fn keys(&self) -> Vec<&str> {
        self.lookup.values().map(|s| s.as_str()).collect()
    }

    pub fn label(&self, row: usize) -> Option<&str> {
        self.lookup.get(&row).map(|s| s.as_str())
    }

    ///
    /// Pair per-selected-row values with their labels. `values` follows
    /// [Self::selected_rows]; when two rows share a label the later row wins.
    ///
    pub fn label_values<T: Clone>(&self, values: &[T]) -> HashMap<String, T> {
        self.lookup
            .values()
            .cloned()
            .zip(values.iter().cloned())
            .collect()
    }
}
