//! Site buffer-and-clip CLI support: configuration layering, asset and
//! output validation, the HEC-RAS package and the QGIS project.

pub mod config;
pub mod hecras;
pub mod qgis;
pub mod report;
pub mod validation;
