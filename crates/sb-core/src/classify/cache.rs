//! Memoizing front for [`SignalClassifier`].

use std::collections::HashMap;
use std::sync::Mutex;

use sb_common::SignalKey;

use super::{SignalClassification, SignalClassifier};

/// Owned memo cache keyed by exact (source, lower-cased name).
///
/// Classification is a pure function of the key, so concurrent writers can
/// only ever store equal values.
#[derive(Debug)]
pub struct ClassificationCache {
    classifier: SignalClassifier,
    memo: Mutex<HashMap<SignalKey, SignalClassification>>,
}

impl ClassificationCache {
    pub fn new(classifier: SignalClassifier) -> Self {
        ClassificationCache {
            classifier,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn classifier(&self) -> &SignalClassifier {
        &self.classifier
    }

    /// Classify through the memo.
    pub fn classify(&self, key: &SignalKey) -> SignalClassification {
        if let Some(hit) = self.lock().get(key) {
            return hit.clone();
        }
        let computed = self.classifier.classify(key);
        self.lock().insert(key.clone(), computed.clone());
        computed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SignalKey, SignalClassification>> {
        // A panic mid-insert cannot leave a wrong value behind, only a missing one.
        self.memo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(SignalClassifier::default())
    }
}
