//! Energy-system topology: the nodes to import climate data for.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use serde::Deserialize;

use crate::{
    climate::hours_in_year,
    network::{Network, NetworkData},
    prelude::*,
    technology::Technology,
};

#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Topology {
    /// Modelled calendar year, typical year when absent.
    pub year: Option<i32>,

    #[serde(default)]
    pub carriers: Vec<String>,

    pub nodes: Vec<Node>,

    /// Technologies that nodes may install, by name.
    #[serde(default)]
    pub technologies: BTreeMap<String, Technology>,

    #[serde(default)]
    pub networks: Vec<Network>,
}

#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Node {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,

    #[serde(default)]
    pub altitude: f64,

    /// Names from [`Topology::technologies`].
    #[serde(default)]
    pub technologies: Vec<String>,
}

impl Topology {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read `{}`", path.as_ref().display()))?;
        let topology = Self::from_toml(&text)?;
        info!(n_nodes = topology.nodes.len(), year = ?topology.year, "loaded");
        Ok(topology)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let topology: Self = toml::from_str(text).context("invalid topology")?;
        topology.validate()?;
        Ok(topology)
    }

    /// Number of hourly time steps every node series must have.
    #[must_use]
    pub fn n_timesteps(&self) -> usize {
        hours_in_year(self.year)
    }

    #[must_use]
    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.name.clone()).collect()
    }

    fn validate(&self) -> Result {
        ensure!(!self.nodes.is_empty(), "the topology must contain at least one node");
        let mut names = BTreeSet::new();
        for node in &self.nodes {
            ensure!(names.insert(node.name.as_str()), "node `{}` is defined twice", node.name);
            ensure!(
                (-180.0..=180.0).contains(&node.longitude)
                    && (-90.0..=90.0).contains(&node.latitude),
                "node `{}` has invalid coordinates",
                node.name,
            );
        }
        let mut carriers = BTreeSet::new();
        for carrier in &self.carriers {
            ensure!(carriers.insert(carrier.as_str()), "carrier `{carrier}` is defined twice");
        }
        for (name, technology) in &self.technologies {
            technology.validate().with_context(|| format!("invalid technology `{name}`"))?;
        }
        for node in &self.nodes {
            for technology in &node.technologies {
                ensure!(
                    self.technologies.contains_key(technology),
                    "node `{}` uses undefined technology `{technology}`",
                    node.name,
                );
            }
        }
        let node_names = self.node_names();
        let mut networks = BTreeSet::new();
        for network in &self.networks {
            ensure!(
                networks.insert(network.name.as_str()),
                "network `{}` is defined twice",
                network.name,
            );
            NetworkData::from_links(&node_names, &network.links)
                .with_context(|| format!("invalid network `{}`", network.name))?;
        }
        Ok(())
    }
}
