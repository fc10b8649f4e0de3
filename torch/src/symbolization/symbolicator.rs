//! Address to symbol name resolution for a whole process

use log::{debug, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::address_map::AddressMap;
use super::{process_maps, symbol_table};
use crate::domain::{Address, LoadError, Pid};

/// Default bound on symbol tables read at the same time
pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = 32;

/// Resolves process addresses to symbol names
///
/// Holds the executable mappings of one process and the symbol table of every
/// binary they reference. Both are immutable once built, so a symbolicator can
/// be shared freely between threads.
#[derive(Debug, Clone)]
pub struct Symbolicator {
    binaries: Arc<AddressMap>,
    symbol_tables: HashMap<String, Arc<AddressMap>>,
}

impl Symbolicator {
    /// Build a symbolicator from already loaded maps
    #[must_use]
    pub fn from_parts(binaries: AddressMap, symbol_tables: HashMap<String, AddressMap>) -> Self {
        Self {
            binaries: Arc::new(binaries),
            symbol_tables: symbol_tables.into_iter().map(|(name, map)| (name, Arc::new(map))).collect(),
        }
    }

    /// Load the maps of `pid` and the symbol table of every mapped binary
    ///
    /// # Errors
    /// Returns an error if the process maps cannot be read, or if any one of
    /// the mapped binaries cannot be read or parsed
    pub async fn load_for_pid(pid: Pid, max_concurrent_loads: usize) -> Result<Self, LoadError> {
        let binaries = tokio::task::spawn_blocking(move || process_maps::load(pid))
            .await
            .map_err(|e| LoadError::TaskFailed(e.to_string()))??;

        info!("Loading symbol tables for {} binaries of {pid}", binaries.names().len());
        Self::load_for_binaries(binaries, max_concurrent_loads).await
    }

    /// Load the symbol table of every binary named in `binaries`
    ///
    /// Symbol tables are read concurrently on the blocking pool, at most
    /// `max_concurrent_loads` at a time, and all of them are loaded before the
    /// symbolicator is returned.
    ///
    /// # Errors
    /// Returns the first error of any one load; the symbolicator is only built
    /// when every binary loaded
    pub async fn load_for_binaries(
        binaries: AddressMap,
        max_concurrent_loads: usize,
    ) -> Result<Self, LoadError> {
        let names: Vec<String> = binaries.names().into_iter().map(str::to_string).collect();

        let permits = Arc::new(Semaphore::new(max_concurrent_loads.max(1)));
        let mut loads = JoinSet::new();

        for name in names {
            let permits = Arc::clone(&permits);
            loads.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| LoadError::TaskFailed(e.to_string()))?;
                let path = PathBuf::from(&name);
                let map = tokio::task::spawn_blocking(move || symbol_table::load(path))
                    .await
                    .map_err(|e| LoadError::TaskFailed(e.to_string()))??;
                Ok::<_, LoadError>((name, map))
            });
        }

        let mut symbol_tables = HashMap::new();
        while let Some(joined) = loads.join_next().await {
            let (name, map) = joined.map_err(|e| LoadError::TaskFailed(e.to_string()))??;
            debug!("{name}: {} symbols", map.len());
            symbol_tables.insert(name, map);
        }

        Ok(Self::from_parts(binaries, symbol_tables))
    }

    /// Resolve `address` to a symbol name
    ///
    /// An exact hit returns the bare symbol name. Misses keep the address for
    /// debugging: `[0x... in /path/to/binary]` when the binary is known but the
    /// symbol is not, `[0x... in unknown binary]` otherwise.
    #[must_use]
    pub fn atos(&self, address: u64) -> String {
        let addr = Address(address);

        let Some(mapping) = self.binaries.entry_for_offset(address) else {
            return format!("[{addr} in unknown binary]");
        };

        let Some(symbols) = self.symbol_tables.get(&mapping.name).filter(|m| !m.is_empty()) else {
            return format!("[{addr} in {}]", mapping.name);
        };

        // Process address -> offset within the mapped file
        let offset = address.wrapping_sub(mapping.base).wrapping_add(mapping.mapped_entity_offset);

        match symbols.entry_for_offset(offset) {
            Some(symbol) => symbol.name.clone(),
            None => format!("[{addr} in {}]", mapping.name),
        }
    }

    /// The executable mappings this symbolicator was built from
    #[must_use]
    pub fn binaries(&self) -> &AddressMap {
        &self.binaries
    }

    /// The symbol table loaded for `binary`, if any
    #[must_use]
    pub fn symbol_table(&self, binary: &str) -> Option<&AddressMap> {
        self.symbol_tables.get(binary).map(Arc::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_symbolicator() -> Symbolicator {
        let mut binaries = AddressMap::new();
        binaries.add_mapping("/usr/bin/node", 0x5555_0000_0000, 0x10_0000, 0);
        binaries.add_mapping("/usr/bin/node", 0x5555_0020_0000, 0x1000, 0x20_0000);
        binaries.add_mapping("/lib/libstripped.so", 0x7f00_0000_0000, 0x1000, 0);

        let mut node = AddressMap::new();
        node.add_entry("main", 0x40_06a4, 0xb, 0, 0x40_0000);
        node.add_entry("v8::internal::Heap::GC()", 0x60_0100, 0x80, 0, 0x40_0000);

        let mut tables = HashMap::new();
        tables.insert("/usr/bin/node".to_string(), node);
        tables.insert("/lib/libstripped.so".to_string(), AddressMap::new());
        Symbolicator::from_parts(binaries, tables)
    }

    #[test]
    fn test_atos_exact_hit_is_bare_name() {
        let symbolicator = node_symbolicator();
        assert_eq!(symbolicator.atos(0x5555_0000_06a4), "main");
        assert_eq!(symbolicator.atos(0x5555_0000_06af), "main");
    }

    #[test]
    fn test_atos_uses_mapped_file_offset() {
        let symbolicator = node_symbolicator();
        // 0x120 into the second mapping, which starts at file offset 0x200000
        assert_eq!(symbolicator.atos(0x5555_0020_0120), "v8::internal::Heap::GC()");
    }

    #[test]
    fn test_atos_unknown_binary() {
        let symbolicator = node_symbolicator();
        assert_eq!(symbolicator.atos(0x1234), "[0x1234 in unknown binary]");
    }

    #[test]
    fn test_atos_symbol_miss_keeps_address() {
        let symbolicator = node_symbolicator();
        assert_eq!(symbolicator.atos(0x5555_0000_9000), "[0x555500009000 in /usr/bin/node]");
    }

    #[test]
    fn test_atos_empty_symbol_table() {
        let symbolicator = node_symbolicator();
        assert_eq!(symbolicator.atos(0x7f00_0000_0010), "[0x7f0000000010 in /lib/libstripped.so]");
    }

    #[test]
    fn test_atos_missing_symbol_table() {
        let mut binaries = AddressMap::new();
        binaries.add_mapping("/bin/true", 0x1000, 0x1000, 0);
        let symbolicator = Symbolicator::from_parts(binaries, HashMap::new());

        assert_eq!(symbolicator.atos(0x1800), "[0x1800 in /bin/true]");
        assert!(symbolicator.symbol_table("/bin/true").is_none());
    }

    #[test]
    fn test_symbolicator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Symbolicator>();
    }

    #[tokio::test]
    async fn test_load_for_missing_pid_fails() {
        let result = Symbolicator::load_for_pid(Pid(u32::MAX), DEFAULT_MAX_CONCURRENT_LOADS).await;
        assert!(matches!(result, Err(LoadError::ProcessMaps { .. })));
    }
}
