use std::{fs, path::PathBuf};

use clap::Parser;

use crate::{
    cli::PvgisArgs,
    data::DataHandle,
    prelude::*,
    tables::build_climate_table,
    timezone::GeoTimezoneFinder,
    topology::Topology,
};

#[derive(Parser)]
pub struct TopologyArgs {
    /// Topology TOML file.
    #[clap(long, env = "TOPOLOGY_PATH", default_value = "topology.toml")]
    pub topology: PathBuf,

    /// Directory for the `<node>.json` climate files.
    #[clap(long, env = "CLIMATE_DATA_DIR", default_value = "climate")]
    pub output_dir: PathBuf,

    /// Load a node's climate file instead of importing it when the file already exists.
    #[clap(long)]
    pub reuse_existing: bool,

    #[clap(flatten)]
    pub pvgis: PvgisArgs,
}

impl TopologyArgs {
    #[instrument(skip_all, fields(topology = %self.topology.display()))]
    pub fn run(self) -> Result {
        let topology = Topology::from_file(&self.topology)?;
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("failed to create `{}`", self.output_dir.display()))?;

        let importer = self.pvgis.importer(GeoTimezoneFinder::new());
        let mut data = DataHandle::new(&topology);
        for node in &topology.nodes {
            let path = self.output_dir.join(format!("{}.json", node.name));
            if self.reuse_existing && path.exists() {
                data.read_climate_data_from_file(&node.name, &path)?;
                continue;
            }
            let dataset = importer
                .import_climate(node.longitude, node.latitude, topology.year, node.altitude)
                .with_context(|| format!("failed to import climate data for `{}`", node.name))?;
            data.read_climate_data(&node.name, dataset)?;
            data.save_climate_data(&node.name, &path)?;
        }
        data.read_technology_data()?;
        data.read_network_data()?;

        println!(
            "{}",
            build_climate_table(
                data.nodes().filter_map(|(name, node)| Some((name, node.climate.as_ref()?))),
            ),
        );
        Ok(())
    }
}
