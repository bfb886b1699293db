use super::SemanticIndex;
use super::tokenizer::{NOTE_TOKENIZER, NoteTokenizer, tokenize};
use crate::error::IndexError;
use crate::types::{Chunk, ChunkMetadata, RetrievedChunk};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, doc};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// BM25-ranked index over chunk text, stored with Tantivy.
///
/// Writes go through a lazily created writer and only become visible to
/// [`SemanticIndex::retrieve`] after [`SemanticIndex::persist`].
pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    writer: Option<IndexWriter<TantivyDocument>>,
    path: PathBuf,
    chunk_id_field: Field,
    doc_id_field: Field,
    text_field: Field,
    metadata_field: Field,
}

impl KeywordIndex {
    /// Open the index stored in `path`, creating it when absent
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).with_context(|| {
            format!("Failed to create index directory {}", path.display())
        })?;

        let index = if path.join("meta.json").exists() {
            Index::open_in_dir(&path).map_err(|e| IndexError::OpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            Index::create_in_dir(&path, Self::schema()).map_err(|e| IndexError::OpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        };
        index.tokenizers().register(NOTE_TOKENIZER, NoteTokenizer);

        let schema = index.schema();
        let field = |name: &str| {
            schema.get_field(name).map_err(|e| IndexError::OpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        };
        let chunk_id_field = field("chunk_id")?;
        let doc_id_field = field("doc_id")?;
        let text_field = field("text")?;
        let metadata_field = field("metadata")?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create index reader")?;

        tracing::debug!("Opened keyword index at {}", path.display());

        Ok(Self {
            index,
            reader,
            writer: None,
            path,
            chunk_id_field,
            doc_id_field,
            text_field,
            metadata_field,
        })
    }

    fn schema() -> Schema {
        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(NOTE_TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let mut schema_builder = Schema::builder();
        schema_builder.add_text_field("chunk_id", STRING | STORED);
        schema_builder.add_text_field("doc_id", STRING | STORED);
        schema_builder.add_text_field("text", text_options);
        schema_builder.add_text_field("metadata", STORED);
        schema_builder.build()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut IndexWriter<TantivyDocument>> {
        if self.writer.is_none() {
            let writer = self
                .index
                .writer(WRITER_HEAP_BYTES)
                .context("Failed to create index writer")?;
            self.writer = Some(writer);
        }
        self.writer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Index writer unavailable"))
    }

    /// Stage removal of every chunk belonging to one note
    pub fn remove_document(&mut self, doc_id: &str) -> Result<()> {
        let term = Term::from_field_text(self.doc_id_field, doc_id);
        self.writer()?.delete_term(term);
        Ok(())
    }

    fn build_query(&self, query: &str) -> Option<BooleanQuery> {
        let terms: BTreeSet<String> = tokenize(query).into_iter().map(|t| t.text).collect();
        if terms.is_empty() {
            return None;
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|text| {
                let term = Term::from_field_text(self.text_field, text);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();

        Some(BooleanQuery::new(clauses))
    }
}

impl SemanticIndex for KeywordIndex {
    fn insert(&mut self, chunk: &Chunk) -> Result<()> {
        let metadata = serde_json::to_string(&chunk.metadata).map_err(|e| {
            IndexError::InsertFailed {
                chunk_id: chunk.id.clone(),
                reason: e.to_string(),
            }
        })?;

        let document = doc!(
            self.chunk_id_field => chunk.id.clone(),
            self.doc_id_field => chunk.metadata.doc_id.clone(),
            self.text_field => chunk.text.clone(),
            self.metadata_field => metadata,
        );
        let term = Term::from_field_text(self.chunk_id_field, &chunk.id);

        let writer = self.writer()?;
        writer.delete_term(term);
        writer
            .add_document(document)
            .map_err(|e| IndexError::InsertFailed {
                chunk_id: chunk.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let Some(query) = self.build_query(query) else {
            return Ok(Vec::new());
        };

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(top_k))
            .map_err(|e| IndexError::SearchFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let stored: TantivyDocument = searcher
                .doc(address)
                .context("Failed to retrieve document")?;

            let text_of = |field: Field| {
                stored
                    .get_first(field)
                    .and_then(|value| value.as_str())
                    .map(str::to_string)
            };

            let (Some(id), Some(text), Some(raw_metadata)) = (
                text_of(self.chunk_id_field),
                text_of(self.text_field),
                text_of(self.metadata_field),
            ) else {
                tracing::warn!("Skipping index entry with missing stored fields");
                continue;
            };

            let metadata: ChunkMetadata = match serde_json::from_str(&raw_metadata) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Skipping chunk {} with unreadable metadata: {}", id, e);
                    continue;
                }
            };

            results.push(RetrievedChunk {
                id,
                text,
                metadata,
                score,
            });
        }

        Ok(results)
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .commit()
                .map_err(|e| IndexError::PersistFailed(e.to_string()))?;
            writer
                .wait_merging_threads()
                .map_err(|e| IndexError::PersistFailed(e.to_string()))?;
        }
        self.reader
            .reload()
            .context("Failed to reload index reader")?;
        Ok(())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.reader.searcher().num_docs() as usize)
    }

    fn remove(&mut self, chunk_ids: &[String]) -> Result<usize> {
        let field = self.chunk_id_field;
        let writer = self.writer()?;
        for id in chunk_ids {
            writer.delete_term(Term::from_field_text(field, id));
        }
        Ok(chunk_ids.len())
    }

    fn clear(&mut self) -> Result<()> {
        self.writer()?
            .delete_all_documents()
            .context("Failed to delete all documents")?;
        Ok(())
    }
}
