//! Store da leitura mais recente por dispositivo.
//!
//! Um único `Mutex` protege o mapa inteiro: cada `put`, `get` e `snapshot`
//! é mutuamente exclusivo. Nenhuma operação faz I/O com o lock segurado.

use crate::types::{DeviceIdentity, Reading};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cópia pontual do store.
pub type Snapshot = HashMap<DeviceIdentity, Reading>;

/// Handle clonável para o mapa compartilhado `identidade → leitura`.
///
/// Last-write-wins: `put` substitui incondicionalmente. Entradas nunca são
/// removidas; um dispositivo silencioso aparece como leitura antiga.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    inner: Arc<Mutex<HashMap<DeviceIdentity, Reading>>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitui a leitura de `identity`, sem merge nem comparação.
    pub fn put(&self, identity: DeviceIdentity, reading: Reading) {
        self.lock().insert(identity, reading);
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<Reading> {
        self.lock().get(identity).copied()
    }

    /// Cópia do mapa inteiro; mutações posteriores não aparecem nela.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Cada operação deixa o mapa consistente, então um lock envenenado
    // por pânico em outra thread ainda é utilizável.
    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceIdentity, Reading>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, UNIX_EPOCH};

    fn id(name: &str) -> DeviceIdentity {
        DeviceIdentity::new(name).unwrap()
    }

    fn reading(temperature: f64, battery: u8, secs: u64) -> Reading {
        Reading {
            temperature,
            humidity: 50.0,
            battery,
            received_at: UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    #[test]
    fn put_then_get_returns_same_reading() {
        let store = ReadingStore::new();
        let r = reading(21.3, 90, 100);
        store.put(id("GVH5075_0001"), r);
        assert_eq!(store.get(&id("GVH5075_0001")), Some(r));
    }

    #[test]
    fn unknown_identity_is_absent() {
        let store = ReadingStore::new();
        assert_eq!(store.get(&id("GVH5075_0001")), None);
        assert!(store.is_empty());
    }

    #[test]
    fn last_write_wins_even_with_worse_values() {
        let store = ReadingStore::new();
        store.put(id("a"), reading(20.0, 95, 200));
        // bateria zerada e timestamp mais antigo ainda sobrescrevem
        let garbage = reading(-0.0, 0, 100);
        store.put(id("a"), garbage);
        assert_eq!(store.get(&id("a")), Some(garbage));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = ReadingStore::new();
        store.put(id("a"), reading(20.0, 95, 1));
        let snap = store.snapshot();
        store.put(id("a"), reading(25.0, 95, 2));
        store.put(id("b"), reading(10.0, 95, 2));

        assert_eq!(snap.len(), 1);
        assert_eq!(snap[&id("a")].temperature, 20.0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clones_share_the_same_map() {
        let store = ReadingStore::new();
        let writer = store.clone();
        writer.put(id("a"), reading(20.0, 95, 1));
        assert!(store.get(&id("a")).is_some());
    }

    #[test]
    fn concurrent_puts_and_snapshots() {
        let store = ReadingStore::new();
        let writers: Vec<_> = (0..8)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    let key = id(&format!("GV{w}"));
                    for i in 0..500u64 {
                        store.put(key.clone(), reading(i as f64, (i % 100) as u8, i));
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        for r in store.snapshot().values() {
                            // entrada nunca aparece pela metade
                            assert_eq!(r.temperature as u64, r.received_unix_secs() as u64);
                        }
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }

        let snap = store.snapshot();
        assert_eq!(snap.len(), 8);
        for r in snap.values() {
            assert_eq!(r.received_at, UNIX_EPOCH + Duration::from_secs(499));
        }
    }

    #[test]
    fn survives_poisoned_lock() {
        let store = ReadingStore::new();
        let poisoner = store.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("pânico proposital");
        })
        .join();

        store.put(id("a"), reading(1.0, 1, 1));
        assert_eq!(store.len(), 1);
    }
}
