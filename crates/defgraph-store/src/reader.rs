//! Graph reader
//!
//! Aggregate queries over the persisted graph and ego-network extraction.
//!
//! The candidate set of a word `w` is `{w}` plus every vertex one edge away
//! in either direction. SQL narrows the data down to the candidates; pruning,
//! weighting and reindexing happen in memory.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use defgraph_core::{
    Edge, GraphError, GraphSize, IndegreeTransform, Neighborhood, NeighborhoodMethod, Result,
    SparseMatrix, Vertex, VertexId, HUB_INDEGREE_THRESHOLD,
};
use futures::TryStreamExt;
use sqlx::FromRow;

use crate::database::Database;

/// Common table expression binding `candidates(id)` for the vertex `?1`
const CANDIDATES_CTE: &str = r#"
    WITH candidates(id) AS (
        SELECT id1 FROM edges WHERE id2 = ?1
        UNION SELECT id2 FROM edges WHERE id1 = ?1
        UNION SELECT ?1
    )"#;

#[derive(Debug, FromRow)]
struct VertexRow {
    id: i64,
    value: String,
}

impl From<VertexRow> for Vertex {
    fn from(row: VertexRow) -> Self {
        Vertex {
            id: row.id,
            value: row.value,
        }
    }
}

/// Read access to a persisted graph
pub struct GraphReader {
    db: Database,
}

impl GraphReader {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&mut self) -> &mut Database {
        &mut self.db
    }

    pub fn into_inner(self) -> Database {
        self.db
    }

    /// Number of vertices and edges
    pub async fn size(&mut self) -> Result<GraphSize> {
        let vertices: i64 = self
            .db
            .query_value("SELECT COUNT(*) FROM vertices", &[])
            .await?
            .unwrap_or(0);
        let edges: i64 = self
            .db
            .query_value("SELECT COUNT(*) FROM edges", &[])
            .await?
            .unwrap_or(0);

        Ok(GraphSize {
            vertices: vertices as u64,
            edges: edges as u64,
        })
    }

    /// All vertices ordered by id
    pub async fn vertices(&mut self) -> Result<Vec<Vertex>> {
        let rows: Vec<VertexRow> = sqlx::query_as("SELECT id, value FROM vertices ORDER BY id")
            .fetch_all(self.db.connection())
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to read vertices: {e}")))?;

        Ok(rows.into_iter().map(Vertex::from).collect())
    }

    /// All edges ordered by `(id1, id2)`
    pub async fn edges(&mut self) -> Result<Vec<Edge>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT id1, id2 FROM edges ORDER BY id1, id2")
            .fetch_all(self.db.connection())
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to read edges: {e}")))?;

        Ok(rows.into_iter().map(|(id1, id2)| Edge::new(id1, id2)).collect())
    }

    /// Vertices and edges together
    pub async fn snapshot(&mut self) -> Result<(Vec<Vertex>, Vec<Edge>)> {
        let vertices = self.vertices().await?;
        let edges = self.edges().await?;
        Ok((vertices, edges))
    }

    /// Vertex id -> number of incoming edges; vertices without any are absent
    pub async fn indegrees(&mut self) -> Result<BTreeMap<VertexId, u64>> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT id2, COUNT(id1) FROM edges GROUP BY id2")
                .fetch_all(self.db.connection())
                .await
                .map_err(|e| GraphError::DatabaseError(format!("Failed to count indegrees: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count as u64))
            .collect())
    }

    /// The `limit` words with the highest indegree, ties broken by word
    pub async fn top_indegrees(&mut self, limit: u32) -> Result<Vec<(String, u64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT vertices.value, COUNT(edges.id1) AS indegree
            FROM edges JOIN vertices ON vertices.id = edges.id2
            GROUP BY edges.id2
            ORDER BY indegree DESC, vertices.value
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.db.connection())
        .await
        .map_err(|e| GraphError::DatabaseError(format!("Failed to rank indegrees: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(word, count)| (word, count as u64))
            .collect())
    }

    /// Id of the vertex holding `word`
    pub async fn vertex_id(&mut self, word: &str) -> Result<Option<VertexId>> {
        self.db
            .query_value("SELECT id FROM vertices WHERE value = ?", &[word])
            .await
    }

    /// Ego-network of `word` under `method`
    ///
    /// `transform` is applied to global indegrees by
    /// [`NeighborhoodMethod::Weighted`] and ignored otherwise. It must not
    /// map the indegree of any edge target to zero.
    pub async fn neighborhood(
        &mut self,
        word: &str,
        method: NeighborhoodMethod,
        transform: Option<IndegreeTransform<'_>>,
    ) -> Result<Neighborhood> {
        let w = self
            .vertex_id(word)
            .await?
            .ok_or_else(|| GraphError::NotFound(word.to_string()))?;

        let labels = self.candidate_labels(w).await?;
        let mut edges: Vec<Edge> = self
            .candidate_edges(w)
            .await?
            .into_iter()
            .filter(|edge| labels.contains_key(&edge.id1) && labels.contains_key(&edge.id2))
            .collect();

        let mut selected: BTreeSet<VertexId> = labels.keys().copied().collect();
        let mut weights: Option<HashMap<VertexId, f64>> = None;

        match method {
            NeighborhoodMethod::Full => {}
            NeighborhoodMethod::HubPruned => {
                let mut local: HashMap<VertexId, u64> = HashMap::new();
                for edge in &edges {
                    *local.entry(edge.id2).or_default() += 1;
                }
                selected.retain(|id| {
                    *id == w || local.get(id).copied().unwrap_or(0) < HUB_INDEGREE_THRESHOLD
                });
                edges.retain(|edge| selected.contains(&edge.id1) && selected.contains(&edge.id2));
            }
            NeighborhoodMethod::Weighted => {
                let global = self.candidate_indegrees(w).await?;
                let mut inverse = HashMap::with_capacity(global.len());
                for edge in &edges {
                    if inverse.contains_key(&edge.id2) {
                        continue;
                    }
                    let count = global.get(&edge.id2).copied().unwrap_or(0) as f64;
                    let denominator = match transform {
                        Some(f) => f(count),
                        None => count,
                    };
                    if denominator == 0.0 {
                        return Err(GraphError::DivisionByZero {
                            word: labels[&edge.id2].clone(),
                        });
                    }
                    if !denominator.is_finite() {
                        return Err(GraphError::NonFiniteIndegree {
                            word: labels[&edge.id2].clone(),
                            value: denominator,
                        });
                    }
                    inverse.insert(edge.id2, 1.0 / denominator);
                }
                weights = Some(inverse);
            }
        }

        // Dense reindexing in ascending id order
        let index: HashMap<VertexId, usize> = selected
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        let triplets = edges.iter().map(|edge| {
            let weight = weights
                .as_ref()
                .and_then(|inverse| inverse.get(&edge.id2).copied())
                .unwrap_or(1.0);
            (index[&edge.id1], index[&edge.id2], weight)
        });
        let matrix = SparseMatrix::from_triplets(selected.len(), triplets);
        let labels: Vec<String> = selected.iter().map(|id| labels[id].clone()).collect();

        tracing::debug!(
            "Neighborhood of '{}' ({}): {} vertices, {} edges",
            word,
            method,
            labels.len(),
            matrix.nnz()
        );

        Ok(Neighborhood { labels, matrix })
    }

    async fn candidate_labels(&mut self, w: VertexId) -> Result<HashMap<VertexId, String>> {
        let sql = format!("{CANDIDATES_CTE} SELECT id, value FROM vertices WHERE id IN candidates");
        let mut rows = sqlx::query_as::<_, VertexRow>(&sql)
            .bind(w)
            .fetch(self.db.connection());

        let mut labels = HashMap::new();
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to read candidates: {e}")))?
        {
            labels.insert(row.id, row.value);
        }
        Ok(labels)
    }

    async fn candidate_edges(&mut self, w: VertexId) -> Result<Vec<Edge>> {
        let sql = format!(
            "{CANDIDATES_CTE} SELECT id1, id2 FROM edges \
             WHERE id1 IN candidates AND id2 IN candidates"
        );
        let mut rows = sqlx::query_as::<_, (i64, i64)>(&sql)
            .bind(w)
            .fetch(self.db.connection());

        let mut edges = Vec::new();
        while let Some((id1, id2)) = rows
            .try_next()
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to read edges: {e}")))?
        {
            edges.push(Edge::new(id1, id2));
        }
        Ok(edges)
    }

    /// Global indegree of every candidate with at least one incoming edge
    async fn candidate_indegrees(&mut self, w: VertexId) -> Result<HashMap<VertexId, u64>> {
        let sql = format!(
            "{CANDIDATES_CTE} SELECT id2, COUNT(id1) FROM edges \
             WHERE id2 IN candidates GROUP BY id2"
        );
        let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
            .bind(w)
            .fetch_all(self.db.connection())
            .await
            .map_err(|e| GraphError::DatabaseError(format!("Failed to count indegrees: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count as u64))
            .collect())
    }
}
