pub mod cds;
pub mod pvgis;
