//! Version-gated dictionary graph
//!
//! Opening a graph never builds it. Callers check [`DictionaryGraph::is_stale`]
//! (or the pure [`needs_rebuild`]) and run [`DictionaryGraph::rebuild`] with a
//! definition source; [`DictionaryGraph::ensure_built`] combines both.

use std::collections::BTreeMap;

use defgraph_core::text::{is_word, to_words};
use defgraph_core::{
    AppConfig, BuildConfig, DefinitionSource, Edge, GraphError, GraphSize, IndegreeTransform,
    Lexicon, Neighborhood, NeighborhoodMethod, Result, Vertex, VertexId, WordClassIndex,
    BUILT_AT_KEY, GRAPH_VERSION, SUPPORTED_DICTIONARIES, VERSION_KEY,
};

use crate::database::Database;
use crate::metadata::KeyValueStore;
use crate::reader::GraphReader;
use crate::writer::GraphWriter;

/// Metadata table name
const METADATA_TABLE: &str = "data";

/// Whether a graph stored with `stored_version` must be rebuilt
pub fn needs_rebuild(stored_version: Option<&str>) -> bool {
    stored_version != Some(GRAPH_VERSION)
}

/// Graph of one dictionary, backed by its own SQLite file
pub struct DictionaryGraph {
    name: String,
    reader: GraphReader,
    metadata: KeyValueStore,
    build: BuildConfig,
}

impl DictionaryGraph {
    /// Open the store of the configured dictionary
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let name = &config.database.dictionary;
        if !SUPPORTED_DICTIONARIES.contains(&name.as_str()) {
            return Err(GraphError::UnsupportedDictionary(name.clone()));
        }

        let data_dir = &config.database.data_dir;
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| GraphError::Io {
                path: data_dir.clone(),
                source: e,
            })?;

        let db = Database::open(&config.database.database_path()).await?;
        Self::with_database(name, db, config.build.clone()).await
    }

    /// Use an already opened database
    pub async fn with_database(name: &str, mut db: Database, build: BuildConfig) -> Result<Self> {
        let metadata = KeyValueStore::open(&mut db, METADATA_TABLE).await?;

        Ok(Self {
            name: name.to_string(),
            reader: GraphReader::new(db),
            metadata,
            build,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build version recorded by the last successful build
    pub async fn stored_version(&mut self) -> Result<Option<String>> {
        self.metadata
            .get(self.reader.database(), VERSION_KEY)
            .await
    }

    /// Timestamp (RFC 3339) of the last successful build
    pub async fn built_at(&mut self) -> Result<Option<String>> {
        self.metadata
            .get(self.reader.database(), BUILT_AT_KEY)
            .await
    }

    /// Whether the stored graph is missing or from another version
    pub async fn is_stale(&mut self) -> Result<bool> {
        let stored = self.stored_version().await?;
        Ok(needs_rebuild(stored.as_deref()))
    }

    /// Rebuild if stale; returns whether a build ran
    pub async fn ensure_built(&mut self, source: &dyn DefinitionSource) -> Result<bool> {
        if !self.is_stale().await? {
            tracing::debug!("Graph for {} is up to date", self.name);
            return Ok(false);
        }
        self.rebuild(source).await?;
        Ok(true)
    }

    /// Replace the stored graph with one built from `source`
    ///
    /// Every record is read before the store is touched, and the table
    /// reset commits together with the new graph. Any failure leaves the
    /// previous graph and its version in place.
    pub async fn rebuild(&mut self, source: &dyn DefinitionSource) -> Result<GraphSize> {
        tracing::info!("Building graph for dictionary {} from {}", self.name, source.name());
        let records = source.records()?;

        let mut writer = GraphWriter::new(self.reader.database()).await?;
        let mut word_classes = WordClassIndex::new();
        let mut skipped = 0usize;
        for record in &records {
            let word = record.headword.to_lowercase();
            if !is_word(&word) {
                skipped += 1;
                continue;
            }
            writer.add_adjacencies(&word, to_words(&record.definition));
            word_classes.insert(&record.word_class, &word);
        }
        tracing::info!(
            "Read {} records: {} headwords, {} word classes, {} skipped",
            records.len(),
            writer.adjacency().len(),
            word_classes.len(),
            skipped
        );

        let lexicon = Lexicon::from_index(
            writer.adjacency().headwords(),
            &word_classes,
            &self.build.noun_tag,
            &self.build.verb_tag_prefix,
        );
        writer.resolve(&lexicon);

        // Induced subgraph over the defined words
        let vertices = writer.adjacency().sorted_headwords();
        let size = writer.save(&vertices).await?;

        let db = self.reader.database();
        self.metadata.set(db, VERSION_KEY, GRAPH_VERSION).await?;
        self.metadata
            .set(db, BUILT_AT_KEY, &chrono::Utc::now().to_rfc3339())
            .await?;

        tracing::info!("Done.");
        Ok(size)
    }

    pub async fn size(&mut self) -> Result<GraphSize> {
        self.reader.size().await
    }

    pub async fn vertices(&mut self) -> Result<Vec<Vertex>> {
        self.reader.vertices().await
    }

    pub async fn edges(&mut self) -> Result<Vec<Edge>> {
        self.reader.edges().await
    }

    pub async fn indegrees(&mut self) -> Result<BTreeMap<VertexId, u64>> {
        self.reader.indegrees().await
    }

    pub async fn neighborhood(
        &mut self,
        word: &str,
        method: NeighborhoodMethod,
        transform: Option<IndegreeTransform<'_>>,
    ) -> Result<Neighborhood> {
        self.reader.neighborhood(word, method, transform).await
    }

    /// Direct access to every read query
    pub fn reader(&mut self) -> &mut GraphReader {
        &mut self.reader
    }

    /// Close the underlying connection
    pub async fn close(self) -> Result<()> {
        self.reader.into_inner().close().await
    }
}
