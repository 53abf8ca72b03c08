/// Attribute every metadata record must carry.
pub const FACTOR_ATTRIBUTE: &str = "factor";

/// Metadata column holding the dataset identifier.
pub const ID_COLUMN: &str = "id";

/// Placeholder written for values an assay did not produce.
pub const NA: &str = "NA";

/// Column added by [crate::results::ResultsTable::sort_by] when ranks are requested.
pub const RANK_COLUMN: &str = "Rank";
