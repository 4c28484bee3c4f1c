//! Company standards - reusable guidance blocks referenced from prompts

mod catalogue;
mod entity;
mod format;
mod repository;
mod resolver;

pub use catalogue::{normalize_name, CatalogueEntry, StandardCatalogue};
pub use entity::{CompanyStandard, StandardId, StandardKind};
pub use format::{format_standard, missing_standard_placeholder};
pub use repository::StandardRepository;
pub use resolver::{KeywordStandardResolver, StandardResolver};

#[cfg(test)]
pub use repository::MockStandardRepository;
