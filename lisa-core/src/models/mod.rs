pub mod data;
pub mod gene;
pub mod metadata;
pub mod profiles;

// re-export for cleaner imports
pub use self::data::{LisaData, TechnologyData};
pub use self::gene::{Gene, GeneCatalog, GeneSet};
pub use self::metadata::{FactorMetadata, FactorRecord, Technology};
pub use self::profiles::RaggedProfiles;
