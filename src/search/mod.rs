//! Tantivy-based search index module.
//!
//! One index covers all three content kinds; each document carries a kind
//! discriminant so hits can be hydrated from the right table.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::db::SearchHitData;
use crate::errors::AppError;
use crate::models::ContentKind;

/// Field boost values: title matches dominate, then body text, then themes.
const BOOST_TITLE: f32 = 10.0;
const BOOST_BODY: f32 = 7.0;
const BOOST_THEME_NAMES: f32 = 4.0;

/// Candidate cap for one search. Well above the expected corpus size so
/// visibility/theme filtering always happens before any limit is applied.
const MAX_CANDIDATES: usize = 2000;

/// A ranked search candidate, not yet filtered for visibility.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub id: String,
    pub kind: ContentKind,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    id: Field,
    kind: Field,
    title: Field,
    body: Field,
    theme_names: Field,
}

/// Tantivy search index over all content kinds.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        // Define schema
        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let kind = schema_builder.add_text_field("kind", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let body = schema_builder.add_text_field("body", TEXT);
        let theme_names = schema_builder.add_text_field("theme_names", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            id,
            kind,
            title,
            body,
            theme_names,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from the store's content.
    pub async fn rebuild(&self, hits: &[SearchHitData]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        // Clear existing index
        writer.delete_all_documents()?;

        for hit in hits {
            let doc = self.create_document(hit);
            writer.add_document(doc)?;
        }

        writer.commit()?;

        // Reload reader to see new documents
        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} documents", hits.len());
        Ok(())
    }

    /// Index (or re-index) a single content item.
    pub async fn index_item(&self, hit: &SearchHitData) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        // Delete existing document if any
        let term = tantivy::Term::from_field_text(self.fields.id, &hit.id);
        writer.delete_term(term);

        let doc = self.create_document(hit);
        writer.add_document(doc)?;
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Remove a content item from the index.
    pub async fn remove_item(&self, id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        let term = tantivy::Term::from_field_text(self.fields.id, id);
        writer.delete_term(term);
        writer.commit()?;

        self.reader.reload()?;

        Ok(())
    }

    /// Search for content matching the query.
    ///
    /// Returns up to [`MAX_CANDIDATES`] ranked candidates; the caller
    /// applies visibility and theme filtering before any pagination.
    /// Ordering is stable: score descending, id ascending on ties.
    pub fn search(&self, query_str: &str) -> Result<Vec<SearchCandidate>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let base_parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.body, self.fields.theme_names],
        );
        let base_query = base_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        // Field-specific boosted queries, combined with OR semantics
        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.body, BOOST_BODY),
            (self.fields.theme_names, BOOST_THEME_NAMES),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                let boosted = BoostQuery::new(field_query, boost);
                subqueries.push((Occur::Should, Box::new(boosted)));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(MAX_CANDIDATES))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let mut results: Vec<SearchCandidate> = top_docs
            .into_iter()
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let id = doc.get_first(self.fields.id)?.as_str()?.to_string();
                let kind_str = doc.get_first(self.fields.kind)?.as_str()?;
                let kind = ContentKind::from_str(kind_str)?;
                Some(SearchCandidate { id, kind, score })
            })
            .collect();

        // Identical input must always yield identical order; break score
        // ties on id.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(results)
    }

    /// Create a Tantivy document from hydrated content data.
    fn create_document(&self, hit: &SearchHitData) -> TantivyDocument {
        let theme_names = hit
            .themes
            .iter()
            .map(|theme| theme.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.id => hit.id.clone(),
            self.fields.kind => hit.kind.as_str(),
            self.fields.title => hit.title.clone(),
            self.fields.body => hit.preview.clone().unwrap_or_default(),
            self.fields.theme_names => theme_names
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;
    use tempfile::TempDir;

    fn create_test_hit(id: &str, title: &str, preview: &str) -> SearchHitData {
        SearchHitData {
            id: id.to_string(),
            kind: ContentKind::Postcard,
            title: title.to_string(),
            preview: Some(preview.to_string()),
            owner_id: "owner".to_string(),
            visibility: Visibility::Org,
            team_id: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            themes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_search_index_creation() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let hits = vec![
            create_test_hit("1", "Trauma Informed Practice", "Working with care experience"),
            create_test_hit("2", "Safeguarding Basics", "Annual refresher training"),
        ];

        index.rebuild(&hits).await.unwrap();

        let results = index.search("trauma").unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "1");
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let results = index.search("").unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_remove_item() {
        let temp_dir = TempDir::new().unwrap();
        let index = SearchIndex::open(temp_dir.path()).unwrap();

        let hits = vec![create_test_hit("1", "Nurture Groups", "Running a nurture group")];
        index.rebuild(&hits).await.unwrap();
        assert!(!index.search("nurture").unwrap().is_empty());

        index.remove_item("1").await.unwrap();
        assert!(index.search("nurture").unwrap().is_empty());
    }
}
