//! defgraph Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout defgraph:
//! - Vertex/edge models of the definition graph
//! - Common error types
//! - Definition source trait and token rules
//! - Morphological resolution of inflected references
//! - Sparse adjacency matrices returned by neighborhood queries
//! - Configuration management

pub mod config;
pub mod morphology;
pub mod sparse;
pub mod text;

pub use config::{AppConfig, BuildConfig, ConfigError, DatabaseConfig, LoggingConfig};
pub use morphology::{AdjacencyMap, Lexicon, WordClassIndex};
pub use sparse::SparseMatrix;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Build version of the persisted graph. Bump to force a rebuild.
pub const GRAPH_VERSION: &str = "4";

/// Metadata key holding the build version
pub const VERSION_KEY: &str = "dictionary_version";

/// Metadata key holding the build timestamp
pub const BUILT_AT_KEY: &str = "built_at";

/// Dictionaries a graph can be built from
pub const SUPPORTED_DICTIONARIES: &[&str] = &["OPTED"];

/// Vertices whose in-candidate indegree reaches this value are pruned by
/// [`NeighborhoodMethod::HubPruned`]
pub const HUB_INDEGREE_THRESHOLD: u64 = 1000;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for defgraph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Vertex not found: {0}")]
    NotFound(String),

    #[error("Malformed record in {source_name}: {reason}")]
    MalformedRecord { source_name: String, reason: String },

    #[error("Division by zero: transformed indegree of '{word}' is zero")]
    DivisionByZero { word: String },

    #[error("Invalid weight: transformed indegree of '{word}' is {value}")]
    NonFiniteIndegree { word: String, value: f64 },

    #[error("Duplicate vertex value: {0}")]
    DuplicateVertex(String),

    #[error("Invalid neighborhood method: {0} (expected 1, 2 or 3)")]
    InvalidMethod(u8),

    #[error("Unsupported dictionary: {0}")]
    UnsupportedDictionary(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for GraphError {
    fn from(err: ConfigError) -> Self {
        GraphError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

// ============================================================================
// Graph Model
// ============================================================================

/// Identifier of a persisted vertex
pub type VertexId = i64;

/// A persisted headword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub value: String,
}

/// A persisted reference: the definition of `id1` uses the word `id2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub id1: VertexId,
    pub id2: VertexId,
}

impl Edge {
    pub fn new(id1: VertexId, id2: VertexId) -> Self {
        Self { id1, id2 }
    }
}

/// Vertex and edge counts of a graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSize {
    pub vertices: u64,
    pub edges: u64,
}

// ============================================================================
// Neighborhood
// ============================================================================

/// Policy used to build the ego-network of a word
///
/// - `Full`: every edge among the one-hop candidates, weight 1
/// - `HubPruned`: drops candidates with in-candidate indegree >= 1000
/// - `Weighted`: edge `i -> j` weighs `1 / f(indegree(j))`, indegree global
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodMethod {
    Full,
    HubPruned,
    Weighted,
}

impl NeighborhoodMethod {
    /// Numeric code of the method (1, 2 or 3)
    pub fn code(self) -> u8 {
        match self {
            Self::Full => 1,
            Self::HubPruned => 2,
            Self::Weighted => 3,
        }
    }
}

impl TryFrom<u8> for NeighborhoodMethod {
    type Error = GraphError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Full),
            2 => Ok(Self::HubPruned),
            3 => Ok(Self::Weighted),
            other => Err(GraphError::InvalidMethod(other)),
        }
    }
}

impl std::fmt::Display for NeighborhoodMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::HubPruned => write!(f, "hub-pruned"),
            Self::Weighted => write!(f, "weighted"),
        }
    }
}

/// Transform applied to global indegrees by [`NeighborhoodMethod::Weighted`]
pub type IndegreeTransform<'a> = &'a dyn Fn(f64) -> f64;

/// Reindexed ego-network of a word
///
/// `labels[i]` is the word at matrix row/column `i`. Store ids do not
/// appear in either structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub labels: Vec<String>,
    pub matrix: SparseMatrix,
}

impl Neighborhood {
    /// Number of vertices
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Matrix index of a word
    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.labels.iter().position(|label| label == word)
    }

    /// Weight of the edge `from -> to`, zero when absent
    pub fn weight(&self, from: &str, to: &str) -> f64 {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => self.matrix.get(i, j),
            _ => 0.0,
        }
    }
}

// ============================================================================
// Definition Source
// ============================================================================

/// A single dictionary entry as delivered by a definition source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    /// Headword as written in the dictionary
    pub headword: String,

    /// Grammatical tag, e.g. `n.` or `v. t.`
    pub word_class: String,

    /// Raw definition text
    pub definition: String,
}

impl DefinitionRecord {
    pub fn new(
        headword: impl Into<String>,
        word_class: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            headword: headword.into(),
            word_class: word_class.into(),
            definition: definition.into(),
        }
    }
}

/// Supplier of dictionary entries for a graph build
///
/// Implementations abort with [`GraphError::MalformedRecord`] on any entry
/// that does not have the expected shape.
pub trait DefinitionSource {
    /// Dictionary name, used in logs
    fn name(&self) -> &str;

    /// All entries of the dictionary
    fn records(&self) -> Result<Vec<DefinitionRecord>>;
}

impl DefinitionSource for Vec<DefinitionRecord> {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn records(&self) -> Result<Vec<DefinitionRecord>> {
        Ok(self.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
