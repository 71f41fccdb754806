//! Connections between the nodes of a topology.

use serde::Deserialize;

use crate::prelude::*;

/// Network declared in the topology file.
#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Network {
    pub name: String,

    #[serde(default)]
    pub links: Vec<Link>,
}

/// Link between two nodes, in both directions unless `one_way` is set.
#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct Link {
    pub from: String,
    pub to: String,

    /// Length of the link, km.
    pub distance: f64,

    #[serde(default)]
    pub one_way: bool,
}

/// Square node × node table.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMatrix {
    nodes: Vec<String>,
    values: Vec<f64>,
}

impl NodeMatrix {
    pub fn zeros(nodes: &[String]) -> Self {
        Self { nodes: nodes.to_vec(), values: vec![0.0; nodes.len() * nodes.len()] }
    }

    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    #[must_use]
    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.offset(from, to).map(|offset| self.values[offset])
    }

    pub fn set(&mut self, from: &str, to: &str, value: f64) -> Result {
        let offset = self
            .offset(from, to)
            .with_context(|| format!("`{from}` → `{to}` is not in the network"))?;
        self.values[offset] = value;
        Ok(())
    }

    fn offset(&self, from: &str, to: &str) -> Option<usize> {
        let row = self.nodes.iter().position(|node| node == from)?;
        let column = self.nodes.iter().position(|node| node == to)?;
        Some(row * self.nodes.len() + column)
    }
}

/// Connection and distance matrices of a network.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkData {
    /// `1.0` where a directed link exists, `0.0` elsewhere.
    pub connection: NodeMatrix,

    /// Link lengths, km.
    pub distance: NodeMatrix,
}

impl NetworkData {
    /// Network over `nodes` without any links.
    pub fn empty(nodes: &[String]) -> Self {
        Self { connection: NodeMatrix::zeros(nodes), distance: NodeMatrix::zeros(nodes) }
    }

    pub fn from_links(nodes: &[String], links: &[Link]) -> Result<Self> {
        let mut data = Self::empty(nodes);
        for link in links {
            data.connect(&link.from, &link.to, link.distance)?;
            if !link.one_way {
                data.connect(&link.to, &link.from, link.distance)?;
            }
        }
        Ok(data)
    }

    pub fn connect(&mut self, from: &str, to: &str, distance: f64) -> Result {
        ensure!(from != to, "`{from}` cannot be connected to itself");
        ensure!(distance.is_finite() && distance >= 0.0, "`{from}` → `{to}` has invalid distance");
        self.connection.set(from, to, 1.0)?;
        self.distance.set(from, to, distance)
    }

    #[must_use]
    pub fn is_connected(&self, from: &str, to: &str) -> bool {
        self.connection.get(from, to).is_some_and(|connection| connection > 0.0)
    }

    /// Number of directed links.
    #[must_use]
    pub fn n_links(&self) -> usize {
        self.connection.values.iter().filter(|connection| **connection > 0.0).count()
    }
}
