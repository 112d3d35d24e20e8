//! A whole JSON document held in memory and mirrored to a [`Medium`].

use super::medium::Medium;
use crate::core::{GokiError, MediumError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span};

/// In-memory state, its lock, and the medium it is persisted to.
///
/// Mutations lock `state`, change it, release it, then flush. Flushes are
/// serialized by `flush_lock` and snapshot the state only after taking it,
/// so a later flush never writes an older document.
#[derive(Debug)]
pub(crate) struct Document<M, T> {
    store: &'static str,
    medium: M,
    state: Mutex<T>,
    flush_lock: Mutex<()>,
}

impl<M, T> Document<M, T>
where
    M: Medium,
    T: Serialize + DeserializeOwned + Default + Send,
{
    /// Loads the document, or writes an empty one if the medium has none.
    pub(crate) async fn open(store: &'static str, medium: M) -> Result<Self> {
        let span = info_span!("store.open", store, medium = %medium.describe());
        async move {
            let open_error = |source: MediumError| GokiError::StoreOpen { store, source };

            let exists = medium.exists().await.map_err(open_error)?;
            let state = if exists {
                let bytes = medium.read().await.map_err(open_error)?;
                serde_json::from_slice(&bytes).map_err(|err| open_error(err.into()))?
            } else {
                T::default()
            };

            let document = Self {
                store,
                medium,
                state: Mutex::new(state),
                flush_lock: Mutex::new(()),
            };

            if exists {
                info!("store loaded");
            } else {
                document.flush().await.map_err(open_error)?;
                info!("store created empty");
            }
            Ok(document)
        }
        .instrument(span)
        .await
    }

    pub(crate) async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Applies `f` under the lock and persists if it succeeded.
    ///
    /// A failed write keeps the in-memory change; the next successful flush
    /// (another update or `close`) carries it to the medium.
    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let output = {
            let mut state = self.state.lock().await;
            f(&mut state)?
        };

        self.flush().await.map_err(|source| {
            error!(store = self.store, error = %source, "store save failed");
            GokiError::StoreSave {
                store: self.store,
                source,
            }
        })?;
        Ok(output)
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.flush().await.map_err(|source| {
            error!(store = self.store, error = %source, "store close failed");
            GokiError::StoreClose {
                store: self.store,
                source,
            }
        })?;
        info!(store = self.store, medium = %self.medium.describe(), "store closed");
        Ok(())
    }

    async fn flush(&self) -> std::result::Result<(), MediumError> {
        let _flush = self.flush_lock.lock().await;
        let bytes = {
            let state = self.state.lock().await;
            serde_json::to_vec(&*state)?
        };
        self.medium.write(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::medium::MemoryMedium;
    use std::collections::BTreeMap;

    type Doc = Document<MemoryMedium, BTreeMap<String, u32>>;

    #[tokio::test]
    async fn test_open_writes_empty_document() {
        let medium = MemoryMedium::new();
        let _doc = Doc::open("test", medium.clone()).await.unwrap();
        assert_eq!(medium.contents(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_update_persists_and_rejections_do_not() {
        let medium = MemoryMedium::new();
        let doc = Doc::open("test", medium.clone()).await.unwrap();

        doc.update(|map| {
            map.insert("a".into(), 1);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(medium.contents(), Some(br#"{"a":1}"#.to_vec()));

        let rejected: Result<()> = doc
            .update(|map| {
                map.insert("b".into(), 2);
                Err(GokiError::Internal("rejected".into()))
            })
            .await;
        assert!(rejected.is_err());
        assert_eq!(medium.contents(), Some(br#"{"a":1}"#.to_vec()));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_state() {
        let medium = MemoryMedium::new();
        let doc = Doc::open("test", medium.clone()).await.unwrap();

        medium.set_read_only(true);
        let err = doc
            .update(|map| {
                map.insert("a".into(), 1);
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GokiError::StoreSave { store: "test", .. }));
        assert_eq!(doc.read(|map| map.get("a").copied()).await, Some(1));

        medium.set_read_only(false);
        doc.close().await.unwrap();
        assert_eq!(medium.contents(), Some(br#"{"a":1}"#.to_vec()));
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_document() {
        let medium = MemoryMedium::with_contents("not json");
        let err = Doc::open("test", medium).await.unwrap_err();
        assert!(matches!(
            err,
            GokiError::StoreOpen {
                source: MediumError::Codec(_),
                ..
            }
        ));
    }
}
