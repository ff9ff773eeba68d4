//! In-memory persistence gateway
//!
//! Nothing survives the process. Useful for tests and for hosts that keep
//! their own storage and only need a staging area.

use annotation_engine::{ContainerKey, Descriptor, GatewayError, PersistenceGateway};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// Descriptors kept in a `HashMap` behind a `RwLock`
#[derive(Debug, Default)]
pub struct MemoryGateway {
    containers: RwLock<HashMap<ContainerKey, Vec<Descriptor>>>,
    /// When set, every call fails with `GatewayError::Unavailable`
    offline: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail, or succeed again
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `save` calls, including failed ones
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Keys of every container with saved descriptors
    pub fn keys(&self) -> Vec<ContainerKey> {
        let mut keys: Vec<_> = self
            .containers
            .read()
            .map(|containers| containers.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn check_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("memory gateway is offline".into()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> GatewayError {
    GatewayError::Unavailable("memory gateway lock poisoned".into())
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self, key: &ContainerKey) -> Result<Vec<Descriptor>, GatewayError> {
        self.check_online()?;
        let containers = self.containers.read().map_err(poisoned)?;
        Ok(containers.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &ContainerKey, descriptors: &[Descriptor]) -> Result<(), GatewayError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut containers = self.containers.write().map_err(poisoned)?;
        if descriptors.is_empty() {
            containers.remove(key);
        } else {
            containers.insert(key.clone(), descriptors.to_vec());
        }
        Ok(())
    }

    fn discard(&self, key: &ContainerKey) -> Result<(), GatewayError> {
        self.check_online()?;
        self.containers.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotation_engine::{capture, AnnotationMeta};
    use content_tree::{AnnotationStyle, DocumentTree};

    fn descriptor(key: &ContainerKey) -> Descriptor {
        let tree = DocumentTree::from_paragraphs(&["some text"]);
        capture(
            &tree,
            tree.root_id(),
            0,
            4,
            AnnotationMeta::new(AnnotationStyle::Highlight),
            key,
        )
        .unwrap()
    }

    #[test]
    fn test_containers_are_independent() {
        let gateway = MemoryGateway::new();
        let a = ContainerKey::new("doc", Some("a")).unwrap();
        let b = ContainerKey::new("doc", Some("b")).unwrap();

        gateway.save(&a, &[descriptor(&a)]).unwrap();

        assert_eq!(gateway.load(&a).unwrap().len(), 1);
        assert!(gateway.load(&b).unwrap().is_empty());
        assert_eq!(gateway.keys(), vec![a.clone()]);

        gateway.discard(&a).unwrap();
        assert!(gateway.load(&a).unwrap().is_empty());
    }

    #[test]
    fn test_offline_fails_every_call() {
        let gateway = MemoryGateway::new();
        let key = ContainerKey::new("doc", None).unwrap();
        gateway.set_offline(true);

        assert!(matches!(gateway.load(&key), Err(GatewayError::Unavailable(_))));
        assert!(gateway.save(&key, &[]).is_err());
        assert_eq!(gateway.save_count(), 1);

        gateway.set_offline(false);
        assert!(gateway.save(&key, &[]).is_ok());
    }
}
