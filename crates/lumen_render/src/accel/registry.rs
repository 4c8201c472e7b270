//! Process-wide resource handle registry
//!
//! The wavefront backend mirrors a just-in-time device runtime that
//! tracks every object participating in kernel dispatch. Instances
//! register an opaque handle when a backend builds over them and
//! explicitly deregister when the backend releases. `trim` sweeps
//! entries whose owner vanished without deregistering, so the table
//! never outlives the objects it describes.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key naming a registered instance inside the table
    pub struct RegistryKey;
}

/// Handle returned by [`register`].
///
/// Dropping the handle without [`deregister`] leaves a dead entry behind
/// that the next [`trim`] sweeps.
#[derive(Debug)]
pub struct RegistryHandle {
    key: RegistryKey,
    _token: Arc<()>,
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    type_name: &'static str,
    token: Weak<()>,
}

fn table() -> &'static Mutex<SlotMap<RegistryKey, RegistryEntry>> {
    static TABLE: OnceLock<Mutex<SlotMap<RegistryKey, RegistryEntry>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(SlotMap::with_key()))
}

/// Register an instance, returning its handle
pub fn register(type_name: &'static str) -> RegistryHandle {
    let token = Arc::new(());
    let key = table().lock().unwrap().insert(RegistryEntry {
        type_name,
        token: Arc::downgrade(&token),
    });
    RegistryHandle { key, _token: token }
}

/// Deregister a previously registered instance.
///
/// Returns whether the entry was still present.
pub fn deregister(handle: RegistryHandle) -> bool {
    table().lock().unwrap().remove(handle.key).is_some()
}

/// Number of entries in the table, live or dead
pub fn len() -> usize {
    table().lock().unwrap().len()
}

/// Sweep entries whose handle was dropped without deregistration.
///
/// Returns how many were dropped. Entries belonging to live handles are
/// left untouched, so concurrent scenes do not disturb each other.
pub fn trim() -> usize {
    let mut map = table().lock().unwrap();
    let before = map.len();
    map.retain(|_, entry| {
        let live = entry.token.strong_count() > 0;
        if !live {
            log::debug!("registry trim dropped stale {} handle", entry.type_name);
        }
        live
    });
    before - map.len()
}

/// Serializes tests that touch the process-global table.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: Mutex<()> = Mutex::new(());
    GUARD
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The registry is process-global, so exercise the full lifecycle in
    // one test under the shared guard.
    #[test]
    fn test_register_deregister_trim_lifecycle() {
        let _guard = test_lock();
        let baseline = len();

        let a = register("sphere");
        let b = register("sphere");
        assert_eq!(len(), baseline + 2);

        // Explicit deregistration removes the entry
        assert!(deregister(a));
        assert_eq!(len(), baseline + 1);

        // A dropped handle leaves a dead entry that trim sweeps
        drop(b);
        assert!(trim() >= 1);

        // Live handles survive a sweep
        let c = register("sphere");
        assert_eq!(trim(), 0);
        assert!(deregister(c));
    }
}
