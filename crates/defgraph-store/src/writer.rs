//! Graph writer
//!
//! Accumulates the headword -> references map of a build and persists its
//! induced subgraph. A writer owns one transaction from the table reset to
//! the final commit in [`GraphWriter::save`]; dropping it unsaved, or a
//! failed save, leaves the previous graph in place.

use std::collections::{HashMap, HashSet};

use defgraph_core::{AdjacencyMap, GraphError, GraphSize, Lexicon, Result, VertexId};
use sqlx::{QueryBuilder, Sqlite, Transaction};

use crate::database::{Database, Index, Table};

/// Rows per multi-row INSERT, kept under SQLite's bind parameter limit
const INSERT_BATCH: usize = 5000;

pub(crate) const TABLES: &[Table] = &[
    Table {
        name: "vertices",
        lines: &["id INTEGER PRIMARY KEY", "value TEXT NOT NULL"],
    },
    Table {
        name: "edges",
        lines: &[
            "id1 INTEGER NOT NULL",
            "id2 INTEGER NOT NULL",
            "FOREIGN KEY(id1) REFERENCES vertices(id)",
            "FOREIGN KEY(id2) REFERENCES vertices(id)",
            "UNIQUE(id1, id2)",
        ],
    },
];

pub(crate) const INDEXES: &[Index] = &[
    Index {
        name: "vertices_value",
        table: "vertices",
        columns: &["value"],
        unique: true,
    },
    Index {
        name: "edges_id1",
        table: "edges",
        columns: &["id1"],
        unique: false,
    },
    Index {
        name: "edges_id2",
        table: "edges",
        columns: &["id2"],
        unique: false,
    },
];

/// Builds and saves a fresh graph
pub struct GraphWriter<'a> {
    tx: Transaction<'a, Sqlite>,
    adjacency: AdjacencyMap,
}

impl<'a> GraphWriter<'a> {
    /// Drop and recreate the graph tables and indexes, then start empty
    ///
    /// The reset is only visible once [`GraphWriter::save`] commits.
    pub async fn new(db: &'a mut Database) -> Result<Self> {
        let mut tx = db.begin().await?;
        // Referencing table first, `edges` holds foreign keys into `vertices`
        for table in TABLES.iter().rev() {
            table.drop(&mut *tx).await?;
        }
        for index in INDEXES {
            index.drop(&mut *tx).await?;
        }
        for table in TABLES {
            table.create(&mut *tx).await?;
        }
        for index in INDEXES {
            index.create(&mut *tx).await?;
        }

        tracing::debug!("Graph tables reset");

        Ok(Self {
            tx,
            adjacency: AdjacencyMap::new(),
        })
    }

    /// Merge `references` into the references of `word`
    pub fn add_adjacencies(&mut self, word: &str, references: HashSet<String>) {
        self.adjacency.add_adjacencies(word, references);
    }

    pub fn adjacency(&self) -> &AdjacencyMap {
        &self.adjacency
    }

    /// Resolve every reference to a headword, dropping unresolvable ones
    pub fn resolve(&mut self, lexicon: &Lexicon) {
        let before = self.adjacency.pair_count();
        self.adjacency.resolve(lexicon);
        tracing::info!(
            "Resolved references: {} -> {} pairs",
            before,
            self.adjacency.pair_count()
        );
    }

    /// Save `vertices` and the induced subgraph of the adjacency map
    ///
    /// Vertex ids are list positions. Pairs with an endpoint outside
    /// `vertices` are not saved. The reset and the inserts commit together.
    pub async fn save(mut self, vertices: &[String]) -> Result<GraphSize> {
        let mut ids: HashMap<&str, VertexId> = HashMap::with_capacity(vertices.len());
        for (position, value) in vertices.iter().enumerate() {
            if ids.insert(value.as_str(), position as VertexId).is_some() {
                return Err(GraphError::DuplicateVertex(value.clone()));
            }
        }

        let mut edges: Vec<(VertexId, VertexId)> = Vec::new();
        for (word, references) in self.adjacency.iter() {
            let Some(&id1) = ids.get(word.as_str()) else {
                continue;
            };
            edges.extend(
                references
                    .iter()
                    .filter_map(|reference| ids.get(reference.as_str()))
                    .map(|&id2| (id1, id2)),
            );
        }
        edges.sort_unstable();

        let dropped = self.adjacency.pair_count() - edges.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} pairs outside the vertex set", dropped);
        }

        let rows: Vec<(VertexId, &str)> = vertices
            .iter()
            .enumerate()
            .map(|(position, value)| (position as VertexId, value.as_str()))
            .collect();
        for chunk in rows.chunks(INSERT_BATCH) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO vertices (id, value) ");
            builder.push_values(chunk, |mut row, (id, value)| {
                row.push_bind(*id).push_bind(value.to_string());
            });
            builder
                .build()
                .execute(&mut *self.tx)
                .await
                .map_err(|e| GraphError::DatabaseError(format!("Failed to save vertices: {e}")))?;
        }

        for chunk in edges.chunks(INSERT_BATCH) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("INSERT INTO edges (id1, id2) ");
            builder.push_values(chunk, |mut row, (id1, id2)| {
                row.push_bind(*id1).push_bind(*id2);
            });
            builder
                .build()
                .execute(&mut *self.tx)
                .await
                .map_err(|e| GraphError::DatabaseError(format!("Failed to save edges: {e}")))?;
        }

        self.tx
            .commit()
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to commit graph: {e}")))?;

        let size = GraphSize {
            vertices: vertices.len() as u64,
            edges: edges.len() as u64,
        };
        tracing::info!("Saved {} vertices and {} edges", size.vertices, size.edges);

        Ok(size)
    }
}
