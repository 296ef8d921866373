pub mod gallery;
pub mod importer;
