//! Integration test utilities and helpers

pub mod fixtures {
    use std::sync::{Arc, Once};

    use vesper_search::{IndexProvisioner, Settings};
    use vesper_vector::InMemoryVectorStore;

    static INIT: Once = Once::new();

    /// Dimension of the default sentence-embedding model
    pub const DIM: usize = 384;

    /// Initialize test environment
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });
    }

    /// Unit vector along one axis
    pub fn axis(index: usize) -> Vec<f32> {
        let mut data = vec![0.0; DIM];
        data[index % DIM] = 1.0;
        data
    }

    /// Normalized `(1 - t) * a + t * b`
    pub fn blend(a: &[f32], b: &[f32], t: f32) -> Vec<f32> {
        let mut data: Vec<f32> = a.iter().zip(b).map(|(x, y)| (1.0 - t) * x + t * y).collect();
        let norm = data.iter().map(|v| v * v).sum::<f32>().sqrt();
        data.iter_mut().for_each(|v| *v /= norm);
        data
    }

    /// In-memory store with the default document index provisioned
    pub async fn provisioned_store() -> (Arc<InMemoryVectorStore>, Settings) {
        let settings = Settings::default();
        let store = Arc::new(InMemoryVectorStore::new(settings.key_prefix.clone()));
        IndexProvisioner::from_settings(store.clone(), &settings)
            .ensure()
            .await
            .expect("provision index");
        (store, settings)
    }
}

pub mod asserts {
    use vesper_vector::SearchHit;

    /// Assert hits are ordered by non-decreasing score
    pub fn assert_ascending(hits: &[SearchHit]) {
        for pair in hits.windows(2) {
            assert!(
                pair[0].score <= pair[1].score,
                "hits out of order: {} ({}) before {} ({})",
                pair[0].id,
                pair[0].score,
                pair[1].id,
                pair[1].score
            );
        }
    }
}
