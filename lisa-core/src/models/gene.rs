use std::fmt::{self, Display};

use fxhash::FxHashMap;

use crate::errors::{CoreError, Result};

///
/// A single gene: a stable genomic location identifier plus its display symbol.
/// Aliases (RefSeq ids, synonyms) are only used while matching user input.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Gene {
    pub location: String,
    pub symbol: String,
    pub aliases: Vec<String>,
}

impl Gene {
    pub fn new(location: &str, symbol: &str) -> Self {
        Gene {
            location: location.to_string(),
            symbol: symbol.to_string(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.location)
    }
}

///
/// Ordered collection of genes with unique locations. The order is the
/// row order used by anything aligned against this set.
///
#[derive(Clone, Debug, Default)]
pub struct GeneSet {
    genes: Vec<Gene>,
    // lowercased symbol/alias -> position in `genes`
    name_index: FxHashMap<String, usize>,
}

impl GeneSet {
    pub fn new(genes: Vec<Gene>) -> Result<Self> {
        let mut seen: FxHashMap<&str, ()> = FxHashMap::default();
        for gene in genes.iter() {
            if seen.insert(gene.location.as_str(), ()).is_some() {
                return Err(CoreError::DuplicateLocation(gene.location.clone()));
            }
        }

        let mut name_index = FxHashMap::default();
        for (i, gene) in genes.iter().enumerate() {
            // symbols take precedence over aliases, and earlier genes over later ones
            name_index.entry(gene.symbol.to_lowercase()).or_insert(i);
        }
        for (i, gene) in genes.iter().enumerate() {
            name_index.entry(gene.location.to_lowercase()).or_insert(i);
            for alias in gene.aliases.iter() {
                name_index.entry(alias.to_lowercase()).or_insert(i);
            }
        }

        Ok(GeneSet { genes, name_index })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn get_locations(&self) -> Vec<String> {
        self.genes.iter().map(|g| g.location.clone()).collect()
    }

    pub fn get_symbols(&self) -> Vec<String> {
        self.genes.iter().map(|g| g.symbol.clone()).collect()
    }

    /// Look up a single gene by symbol, alias or location (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&Gene> {
        self.name_index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.genes[i])
    }
}

///
/// Resolves free-form gene names supplied by a user into canonical genes.
///
pub trait GeneCatalog {
    ///
    /// Match user supplied names against the catalog. Unknown names are
    /// skipped, names hitting an already matched gene collapse into it, and the
    /// result follows the order of `names`.
    ///
    fn match_user_provided_genes<S: AsRef<str>>(&self, names: &[S]) -> GeneSet;
}

impl GeneCatalog for GeneSet {
    fn match_user_provided_genes<S: AsRef<str>>(&self, names: &[S]) -> GeneSet {
        let mut taken = vec![false; self.genes.len()];
        let mut matched = Vec::new();

        for name in names {
            if let Some(&i) = self.name_index.get(&name.as_ref().trim().to_lowercase())
                && !taken[i]
            {
                taken[i] = true;
                matched.push(self.genes[i].clone());
            }
        }

        // locations were unique in self, so they are unique in any subset
        let mut name_index = FxHashMap::default();
        for (i, gene) in matched.iter().enumerate() {
            name_index.entry(gene.symbol.to_lowercase()).or_insert(i);
            name_index.entry(gene.location.to_lowercase()).or_insert(i);
        }

        GeneSet {
            genes: matched,
            name_index,
        }
    }
}
