use crate::db::traits::MetadataStore;
use crate::error::{AxonError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionCheck {
    /// Fresh database; the model's dimension was recorded.
    Initialized,
    Matched,
}

/// Compare the embedding model's dimension with the one the vectors were stored at.
///
/// Stored vectors cannot be searched with embeddings of another size, so a
/// mismatch is a configuration error.
pub async fn check_dimension_compatibility<S>(
    db: &S,
    model_dimensions: usize,
) -> Result<DimensionCheck>
where
    S: MetadataStore + ?Sized,
{
    match db.get_embedding_dimensions().await? {
        None => {
            tracing::info!(
                "Fresh database, storing embedding dimensions: {}",
                model_dimensions
            );
            db.set_embedding_dimensions(model_dimensions).await?;
            Ok(DimensionCheck::Initialized)
        }
        Some(db_dims) if db_dims == model_dimensions => {
            tracing::info!("Embedding dimensions match: {}", model_dimensions);
            Ok(DimensionCheck::Matched)
        }
        Some(db_dims) => {
            tracing::error!(
                "Dimension mismatch: database has {} dimensions, model produces {}",
                db_dims,
                model_dimensions
            );
            Err(AxonError::Config(format!(
                "Embedding dimension mismatch: database stores {db_dims}, model produces {model_dimensions}. \
                 Use an embedding model with {db_dims} dimensions or start from a new database."
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryMeta(Mutex<Option<usize>>);

    #[async_trait]
    impl MetadataStore for MemoryMeta {
        async fn get_embedding_dimensions(&self) -> Result<Option<usize>> {
            Ok(*self.0.lock().unwrap())
        }
        async fn set_embedding_dimensions(&self, dims: usize) -> Result<()> {
            *self.0.lock().unwrap() = Some(dims);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fresh_database_records_dimensions() {
        let meta = MemoryMeta::default();
        let check = check_dimension_compatibility(&meta, 768).await.unwrap();
        assert_eq!(check, DimensionCheck::Initialized);
        assert_eq!(meta.get_embedding_dimensions().await.unwrap(), Some(768));

        let again = check_dimension_compatibility(&meta, 768).await.unwrap();
        assert_eq!(again, DimensionCheck::Matched);
    }

    #[tokio::test]
    async fn test_mismatch_is_config_error() {
        let meta = MemoryMeta(Mutex::new(Some(384)));
        let err = check_dimension_compatibility(&meta, 768).await.unwrap_err();
        assert!(matches!(err, AxonError::Config(_)));
    }
}
