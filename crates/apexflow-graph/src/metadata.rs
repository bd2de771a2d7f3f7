//! Run-scoped metadata derived from the finished graph.
//!
//! Custom settings are recognised by how they are accessed: a call such as
//! `My_Setting__c.getInstance()` marks `My_Setting__c` as a custom setting.
//! Enum values are read from the fields of each user enum, in order.

use crate::graph::ProgramGraph;
use crate::query::VertexQuery;
use apexflow_core::{keys, GraphError, Result, VertexKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const SETTING_ACCESSORS: &[&str] = &["getInstance", "getValues", "getOrgDefaults", "getAll"];
const CUSTOM_OBJECT_SUFFIX: &str = "__c";

/// Names are stored lowercase; lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct MetadataInfo {
    custom_settings: HashSet<String>,
    enums: HashMap<String, Vec<String>>,
}

impl MetadataInfo {
    /// Computes metadata from a fully built graph.
    pub fn from_graph(graph: &ProgramGraph) -> Self {
        let mut info = Self::default();

        let calls = VertexQuery::kind(VertexKind::MethodCallExpression)
            .one_of(keys::METHOD_NAME, SETTING_ACCESSORS);
        for id in graph.query(&calls) {
            let Some(full_name) = graph.vertex(id).and_then(|v| v.folded_property(keys::FULL_METHOD_NAME)) else {
                continue;
            };
            if let Some((qualifier, _)) = full_name.rsplit_once('.') {
                if qualifier.ends_with(CUSTOM_OBJECT_SUFFIX) {
                    info.custom_settings.insert(qualifier.to_string());
                }
            }
        }

        for id in graph.vertices_of_kind(VertexKind::UserEnum) {
            let Some(name) = graph.vertex(*id).and_then(|v| v.defining_type_ci()) else {
                continue;
            };
            let values = graph
                .children_of_kind(*id, VertexKind::Field)
                .into_iter()
                .filter_map(|field| graph.vertex(field).and_then(|v| v.name()).map(str::to_string))
                .collect();
            info.enums.insert(name.to_string(), values);
        }

        debug!(
            "Metadata: {} custom settings, {} enums",
            info.custom_settings.len(),
            info.enums.len()
        );
        info
    }

    pub fn is_custom_setting(&self, name: &str) -> bool {
        self.custom_settings.contains(&name.to_lowercase())
    }

    /// Values of an enum, in declaration order.
    pub fn get_enum(&self, name: &str) -> Option<&[String]> {
        self.enums.get(&name.to_lowercase()).map(Vec::as_slice)
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Uninitialized,
    Ready(MetadataInfo),
}

/// One-shot holder for a worker's `MetadataInfo`.
#[derive(Debug, Default)]
pub struct MetadataInfoProvider {
    state: State,
}

impl MetadataInfoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the metadata. Fails if called twice.
    pub fn initialize(&mut self, graph: &ProgramGraph) -> Result<()> {
        if let State::Ready(_) = self.state {
            return Err(GraphError::AlreadyInitialized("MetadataInfo"));
        }
        self.state = State::Ready(MetadataInfo::from_graph(graph));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn get(&self) -> Result<&MetadataInfo> {
        match &self.state {
            State::Ready(info) => Ok(info),
            State::Uninitialized => Err(GraphError::NotInitialized("MetadataInfo")),
        }
    }

    pub fn is_custom_setting(&self, name: &str) -> Result<bool> {
        Ok(self.get()?.is_custom_setting(name))
    }

    pub fn get_enum(&self, name: &str) -> Result<Option<&[String]>> {
        Ok(self.get()?.get_enum(name))
    }
}
