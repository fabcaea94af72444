//! Document fixtures: Extended JSON resources inserted into a collection.

use crate::cleanup::TouchedDatabases;
use crate::context::TestContext;
use crate::error::FixtureError;
use crate::fixture::DocumentFixture;
use bson::{Bson, Document};
use tracing::{debug, info};

/// Loads [`DocumentFixture`]s and remembers which databases it wrote to.
#[derive(Debug, Default)]
pub struct DocumentFixtureLoader {
    touched: TouchedDatabases,
}

impl DocumentFixtureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every resource of `fixture` in order and insert the documents as
    /// one batch.
    ///
    /// Returns the number of documents inserted.
    pub async fn load(
        &mut self,
        fixture: &DocumentFixture,
        context: &TestContext<'_>,
    ) -> Result<u64, FixtureError> {
        let mut documents = Vec::new();
        let resources = context
            .resources
            .resolve_all(&context.test_class.package, &fixture.files);
        for resource in resources {
            let text = resource.read_to_string().await?;
            let parsed = parse_documents(resource.declared(), &text)?;
            debug!(
                "Parsed {} documents from {}",
                parsed.len(),
                resource.display_name()
            );
            documents.extend(parsed);
        }

        let database = context.resolve_database(fixture.database.as_deref())?;
        self.touched.insert(&database);

        if documents.is_empty() {
            debug!(
                "No documents declared for {}.{}, skipping insert",
                database, fixture.collection
            );
            return Ok(0);
        }

        let inserted = context
            .store
            .insert_documents(&database, &fixture.collection, documents)
            .await?;
        info!(
            "Inserted {} documents into {}.{}",
            inserted, database, fixture.collection
        );
        Ok(inserted)
    }

    pub fn touched(&self) -> &TouchedDatabases {
        &self.touched
    }

    pub(crate) fn touched_mut(&mut self) -> &mut TouchedDatabases {
        &mut self.touched
    }
}

/// Parse one resource's Extended JSON text into documents.
///
/// A top-level object is one document; a top-level array contributes each
/// of its elements, which must all be objects.
pub fn parse_documents(resource: &str, text: &str) -> Result<Vec<Document>, FixtureError> {
    let invalid = |message: String| FixtureError::InvalidDocument {
        resource: resource.to_string(),
        message,
    };

    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let items = match json {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| match Bson::try_from(item) {
            Ok(Bson::Document(doc)) => Ok(doc),
            Ok(other) => Err(invalid(format!(
                "expected a document, found {:?}",
                other.element_type()
            ))),
            Err(e) => Err(invalid(e.to_string())),
        })
        .collect()
}

/// Parse an Extended JSON metadata string into a document.
pub fn parse_metadata(metadata: &str) -> Result<Document, FixtureError> {
    let invalid = |message: String| FixtureError::InvalidMetadata {
        metadata: metadata.to_string(),
        message,
    };

    if metadata.trim().is_empty() {
        return Ok(Document::new());
    }
    let json: serde_json::Value =
        serde_json::from_str(metadata).map_err(|e| invalid(e.to_string()))?;
    match Bson::try_from(json) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(invalid(format!(
            "expected a document, found {:?}",
            other.element_type()
        ))),
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_parse_single_document_with_object_id() {
        let docs = parse_documents(
            "john.json",
            r#"{"_id": {"$oid": "6032473edd63e50bd3565171"}, "firstName": "John", "lastName": "Doe"}"#,
        )
        .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].get_object_id("_id").unwrap(),
            ObjectId::parse_str("6032473edd63e50bd3565171").unwrap()
        );
        assert_eq!(docs[0].get_str("firstName").unwrap(), "John");
    }

    #[test]
    fn test_parse_array_keeps_order() {
        let docs = parse_documents(
            "people.json",
            r#"[{"name": "John"}, {"name": "Jane"}]"#,
        )
        .unwrap();

        let names: Vec<_> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, vec!["John", "Jane"]);
    }

    #[test]
    fn test_parse_extended_date() {
        let docs = parse_documents(
            "event.json",
            r#"{"at": {"$date": "2021-02-21T12:00:00Z"}}"#,
        )
        .unwrap();
        assert!(docs[0].get_datetime("at").is_ok());
    }

    #[test]
    fn test_parse_rejects_scalar() {
        let err = parse_documents("bad.json", "42").unwrap_err();
        assert!(matches!(err, FixtureError::InvalidDocument { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse_documents("bad.json", "{ name: ").unwrap_err();
        assert!(matches!(err, FixtureError::InvalidDocument { .. }));
    }

    #[test]
    fn test_parse_rejects_array_of_scalars() {
        let err = parse_documents("bad.json", r#"[{"ok": 1}, "nope"]"#).unwrap_err();
        assert!(matches!(err, FixtureError::InvalidDocument { .. }));
    }

    #[test]
    fn test_parse_metadata() {
        let metadata =
            parse_metadata(r#"{"createdBy": {"$oid": "60327cc5dbc0a320d7544ae3"}}"#).unwrap();
        assert_eq!(
            metadata.get_object_id("createdBy").unwrap(),
            ObjectId::parse_str("60327cc5dbc0a320d7544ae3").unwrap()
        );
    }

    #[test]
    fn test_parse_metadata_default() {
        assert!(parse_metadata("{}").unwrap().is_empty());
        assert!(parse_metadata("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_metadata_rejects_array() {
        let err = parse_metadata("[]").unwrap_err();
        assert!(matches!(err, FixtureError::InvalidMetadata { .. }));
    }
}
