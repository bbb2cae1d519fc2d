use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Client;
use serde::{Deserialize, Serialize};
use sheetpipe_core::{Cell, ColumnType, Error, Extractor, Result, Table, TableSchema};
use tracing::{debug, info};

/// Field name in mongo for uniquely identifying a document. The export
/// schema exposes it as the `id` column.
const ID_FIELD: &str = "_id";
const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSourceConfig {
    /// MongoDB connection string (scheme + credentials + host)
    pub uri: String,

    /// Database name
    pub database: String,

    /// Collection name
    pub collection: String,

    /// Documents whose `_id` matches this pattern are excluded. Server-side
    /// `$regex` semantics: an unanchored search over the id, i.e. substring
    /// matching unless the pattern itself carries anchors. Empty disables
    /// the filter.
    #[serde(default)]
    pub exclude_id_pattern: String,
}

impl Default for MongoSourceConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "app".to_string(),
            collection: "users".to_string(),
            exclude_id_pattern: String::new(),
        }
    }
}

/// Extracts the projected user fields from a MongoDB collection through an
/// aggregation pipeline.
pub struct MongoExtractor {
    config: MongoSourceConfig,
    schema: TableSchema,
}

impl MongoExtractor {
    pub fn new(config: MongoSourceConfig) -> Self {
        Self {
            config,
            schema: TableSchema::user_export(),
        }
    }

    /// Mongo field backing a schema column.
    fn source_field(column: &str) -> &str {
        if column == ID_COLUMN {
            ID_FIELD
        } else {
            column
        }
    }

    /// Aggregation pipeline: project the schema's fields, then drop ids
    /// matching the exclusion pattern. The filter runs server-side; rows
    /// are not re-checked downstream.
    fn build_pipeline(&self) -> Vec<Document> {
        let mut projection = Document::new();
        for column in self.schema.columns() {
            projection.insert(Self::source_field(&column.name), 1);
        }

        let mut stages = vec![doc! { "$project": projection }];

        if !self.config.exclude_id_pattern.is_empty() {
            stages.push(doc! {
                "$match": {
                    "_id": { "$not": { "$regex": &self.config.exclude_id_pattern } }
                }
            });
        }

        stages
    }

    /// Convert one projected document into a schema row.
    ///
    /// A field that is absent, null, or of a shape the column cannot hold
    /// becomes a null cell; the row itself is kept.
    fn document_to_row(&self, document: &Document) -> Vec<Cell> {
        self.schema
            .columns()
            .iter()
            .map(|column| {
                document
                    .get(Self::source_field(&column.name))
                    .map(|value| bson_to_cell(value, column.column_type))
                    .unwrap_or(Cell::Null)
            })
            .collect()
    }
}

fn bson_to_cell(value: &Bson, column_type: ColumnType) -> Cell {
    match (column_type, value) {
        (_, Bson::Null) => Cell::Null,
        (ColumnType::Text, Bson::String(s)) => Cell::Text(s.clone()),
        (ColumnType::Text, Bson::ObjectId(oid)) => Cell::Text(oid.to_hex()),
        (ColumnType::Number, Bson::Double(n)) => Cell::Number(*n),
        (ColumnType::Number, Bson::Int32(n)) => Cell::Number(*n as f64),
        (ColumnType::Number, Bson::Int64(n)) => Cell::Number(*n as f64),
        (ColumnType::Timestamp, Bson::DateTime(dt)) => {
            timestamp_from_millis(dt.timestamp_millis())
        }
        (ColumnType::Timestamp, Bson::Int64(ms)) => timestamp_from_millis(*ms),
        (ColumnType::Timestamp, Bson::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|ts| Cell::Timestamp(ts.with_timezone(&Utc)))
            .unwrap_or(Cell::Null),
        _ => Cell::Null,
    }
}

fn timestamp_from_millis(millis: i64) -> Cell {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(Cell::Timestamp)
        .unwrap_or(Cell::Null)
}

#[async_trait]
impl Extractor for MongoExtractor {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn extract(&self) -> Result<Table> {
        info!(
            "Connecting to MongoDB, collection {}.{}",
            self.config.database, self.config.collection
        );

        let client = Client::with_uri_str(&self.config.uri)
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to MongoDB: {}", e)))?;

        let collection = client
            .database(&self.config.database)
            .collection::<Document>(&self.config.collection);

        let pipeline = self.build_pipeline();
        debug!("Aggregation pipeline: {:?}", pipeline);

        let mut cursor = collection
            .aggregate(pipeline)
            .await
            .map_err(|e| Error::Connection(format!("Aggregation failed: {}", e)))?;

        // Materialize eagerly; the result set is expected to fit in memory.
        let mut table = Table::new(self.schema.clone());
        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| Error::Connection(format!("Cursor error: {}", e)))?
        {
            table.push_row(self.document_to_row(&document))?;
        }

        info!(
            "Fetched {} document(s) from {}.{}",
            table.row_count(),
            self.config.database,
            self.config.collection
        );

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn extractor(pattern: &str) -> MongoExtractor {
        MongoExtractor::new(MongoSourceConfig {
            exclude_id_pattern: pattern.to_string(),
            ..MongoSourceConfig::default()
        })
    }

    #[test]
    fn test_pipeline_projects_then_filters() {
        let pipeline = extractor("12345").build_pipeline();

        assert_eq!(
            pipeline,
            vec![
                doc! {
                    "$project": { "_id": 1, "createdAt": 1, "updatedAt": 1, "email": 1 }
                },
                doc! {
                    "$match": { "_id": { "$not": { "$regex": "12345" } } }
                },
            ]
        );
    }

    #[test]
    fn test_empty_pattern_skips_match_stage() {
        let pipeline = extractor("").build_pipeline();
        assert_eq!(pipeline.len(), 1);
        assert!(pipeline[0].contains_key("$project"));
    }

    #[test]
    fn test_document_to_row_maps_object_id_and_dates() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let document = doc! {
            "_id": oid,
            "createdAt": mongodb::bson::DateTime::from_millis(1_714_564_800_000),
            "updatedAt": mongodb::bson::DateTime::from_millis(1_714_651_200_000),
            "email": "user@example.com",
        };

        let row = extractor("").document_to_row(&document);

        assert_eq!(row[0], Cell::Text("507f1f77bcf86cd799439011".to_string()));
        assert_eq!(
            row[1],
            Cell::Timestamp(DateTime::<Utc>::from_timestamp_millis(1_714_564_800_000).unwrap())
        );
        assert_eq!(row[3], Cell::Text("user@example.com".to_string()));
    }

    #[test]
    fn test_document_missing_fields_coerces_to_null() {
        let document = doc! { "_id": "user-1" };

        let row = extractor("").document_to_row(&document);

        assert_eq!(row.len(), 4);
        assert_eq!(row[0], Cell::Text("user-1".to_string()));
        assert_eq!(row[1], Cell::Null);
        assert_eq!(row[2], Cell::Null);
        assert_eq!(row[3], Cell::Null);
    }

    #[test]
    fn test_epoch_millis_accepted_in_timestamp_column() {
        let document = doc! {
            "_id": "user-2",
            "createdAt": 1_700_000_000_000i64,
            "email": "u2@example.com",
        };

        let row = extractor("").document_to_row(&document);

        assert_eq!(
            row[1],
            Cell::Timestamp(DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap())
        );
    }

    #[test]
    fn test_mistyped_field_coerces_to_null() {
        let document = doc! {
            "_id": "user-3",
            "email": 42,
        };

        let row = extractor("").document_to_row(&document);
        assert_eq!(row[3], Cell::Null);
    }
}
