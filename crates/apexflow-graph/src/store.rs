use crate::graph::ProgramGraph;
use apexflow_core::Diagnostic;
use sled::Db;
use std::path::Path;
use thiserror::Error;

const GRAPH_KEY: &str = "program_graph";
const DIAGNOSTICS_KEY: &str = "diagnostics";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Persists a built graph so walks can run without re-ingesting.
pub struct GraphStore {
    db: Db,
}

impl GraphStore {
    /// Opens or creates a graph store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Saves the graph and the diagnostics collected while building it.
    pub fn save(&self, graph: &ProgramGraph, diagnostics: &[Diagnostic]) -> Result<(), StoreError> {
        self.db.insert(GRAPH_KEY, bincode::serialize(graph)?)?;
        self.db
            .insert(DIAGNOSTICS_KEY, bincode::serialize(diagnostics)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads the graph, if one was saved.
    pub fn load_graph(&self) -> Result<Option<ProgramGraph>, StoreError> {
        match self.db.get(GRAPH_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn load_diagnostics(&self) -> Result<Vec<Diagnostic>, StoreError> {
        match self.db.get(DIAGNOSTICS_KEY)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Clears the stored graph.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.remove(GRAPH_KEY)?;
        self.db.remove(DIAGNOSTICS_KEY)?;
        self.db.flush()?;
        Ok(())
    }
}
