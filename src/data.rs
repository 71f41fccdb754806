//! Per-node input data that feeds the optimization model.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::{
    climate::ClimateDataset,
    network::{Network, NetworkData},
    prelude::*,
    technology::{Technology, TechnologyFit},
    topology::Topology,
};

#[must_use]
#[derive(Debug, Default)]
pub struct NodeData {
    pub climate: Option<ClimateDataset>,

    /// Demand per carrier, one value per time step.
    pub demand: BTreeMap<String, Vec<f64>>,

    /// Names of the technologies installed at the node.
    pub technologies: Vec<String>,

    /// Filled in by [`DataHandle::read_technology_data`].
    pub technology_fits: BTreeMap<String, TechnologyFit>,
}

/// Input data of every node in a topology.
///
/// All series are checked against the number of modelled time steps on the way in.
#[must_use]
#[derive(Debug)]
pub struct DataHandle {
    n_timesteps: usize,
    carriers: BTreeSet<String>,
    technologies: BTreeMap<String, Technology>,

    /// Node names in topology order, which is also the order of the network matrices.
    node_names: Vec<String>,

    nodes: BTreeMap<String, NodeData>,
    networks: Vec<Network>,
    network_data: BTreeMap<String, NetworkData>,
}

impl DataHandle {
    pub fn new(topology: &Topology) -> Self {
        Self {
            n_timesteps: topology.n_timesteps(),
            carriers: topology.carriers.iter().cloned().collect(),
            technologies: topology.technologies.clone(),
            node_names: topology.node_names(),
            nodes: topology
                .nodes
                .iter()
                .map(|node| {
                    let data =
                        NodeData { technologies: node.technologies.clone(), ..NodeData::default() };
                    (node.name.clone(), data)
                })
                .collect(),
            networks: topology.networks.clone(),
            network_data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn n_timesteps(&self) -> usize {
        self.n_timesteps
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeData> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeData)> {
        self.nodes.iter().map(|(name, data)| (name.as_str(), data))
    }

    /// Merges an imported climate dataset into the node.
    pub fn read_climate_data(&mut self, node: &str, dataset: ClimateDataset) -> Result {
        ensure!(
            dataset.len() == self.n_timesteps,
            "climate data for `{node}` has {} time steps, the topology has {}",
            dataset.len(),
            self.n_timesteps,
        );
        self.node_mut(node)?.climate = Some(dataset);
        debug!(node, "merged climate data");
        Ok(())
    }

    #[instrument(skip_all, fields(node = node))]
    pub fn read_climate_data_from_file(&mut self, node: &str, path: impl AsRef<Path>) -> Result {
        let dataset = ClimateDataset::load(path)?;
        self.read_climate_data(node, dataset)
    }

    #[instrument(skip_all, fields(node = node))]
    pub fn save_climate_data(&self, node: &str, path: impl AsRef<Path>) -> Result {
        self.node(node)
            .with_context(|| format!("node `{node}` is not in the topology"))?
            .climate
            .as_ref()
            .with_context(|| format!("node `{node}` has no climate data"))?
            .save(path)
    }

    pub fn read_demand_data(&mut self, node: &str, carrier: &str, demand: Vec<f64>) -> Result {
        ensure!(self.carriers.contains(carrier), "carrier `{carrier}` is not in the topology");
        ensure!(
            demand.len() == self.n_timesteps,
            "demand of `{carrier}` at `{node}` has {} time steps, the topology has {}",
            demand.len(),
            self.n_timesteps,
        );
        self.node_mut(node)?.demand.insert(carrier.to_owned(), demand);
        Ok(())
    }

    /// Fits every installed technology to the climate of its node.
    #[instrument(skip_all)]
    pub fn read_technology_data(&mut self) -> Result {
        for (name, node) in &mut self.nodes {
            let fits = node
                .technologies
                .iter()
                .map(|technology_name| {
                    let technology = self
                        .technologies
                        .get(technology_name)
                        .with_context(|| format!("technology `{technology_name}` is not defined"))?;
                    let climate = node.climate.as_ref().with_context(|| {
                        format!("node `{name}` needs climate data to fit `{technology_name}`")
                    })?;
                    Ok((technology_name.clone(), technology.fit(climate)))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;
            info!(node = %name, n_technologies = fits.len(), "fitted technologies");
            node.technology_fits = fits;
        }
        Ok(())
    }

    /// Builds the connection and distance matrices of every network.
    #[instrument(skip_all)]
    pub fn read_network_data(&mut self) -> Result {
        self.network_data = self
            .networks
            .iter()
            .map(|network| {
                let data = NetworkData::from_links(&self.node_names, &network.links)
                    .with_context(|| format!("invalid network `{}`", network.name))?;
                info!(network = %network.name, n_links = data.n_links(), "read network data");
                Ok((network.name.clone(), data))
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    #[must_use]
    pub fn network(&self, name: &str) -> Option<&NetworkData> {
        self.network_data.get(name)
    }

    fn node_mut(&mut self, node: &str) -> Result<&mut NodeData> {
        self.nodes.get_mut(node).with_context(|| format!("node `{node}` is not in the topology"))
    }
}
