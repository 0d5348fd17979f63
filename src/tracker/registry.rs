//! The tracker's peer registry: an info-hash keyed map of peer records
//! guarded by a single mutex, matching the "acceptable given the tracker's
//! low request rate" design note.
use super::protocol::Event;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

const PEER_TIMEOUT: Duration = crate::config::PEER_TIMEOUT;

#[derive(Debug, Clone, PartialEq)]
pub struct PeerRecord {
    pub peer_id: String,
    pub seeder: bool,
    pub ip: String,
    pub port: u16,
    pub last_announce: SystemTime,
}

#[derive(Debug, Default)]
pub struct Registry {
    peers: Mutex<HashMap<[u8; 20], Vec<PeerRecord>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Applies one announce event under the registry's lock and returns the
    /// current seeder list for the info-hash, which eviction and the event
    /// itself may both have changed.
    pub fn announce(
        &self,
        info_hash: [u8; 20],
        peer_id: String,
        ip: String,
        port: u16,
        event: Event,
        is_seeder_registration: bool,
    ) -> Vec<PeerRecord> {
        let mut peers = self.peers.lock().expect("registry mutex poisoned");
        let bucket = peers.entry(info_hash).or_default();

        evict_stale(bucket);

        match event {
            Event::Started => {
                bucket.push(PeerRecord {
                    peer_id,
                    seeder: is_seeder_registration,
                    ip,
                    port,
                    last_announce: SystemTime::now(),
                });
            }
            Event::Stopped => {
                bucket.retain(|p| p.peer_id != peer_id);
            }
            Event::Completed => {
                if let Some(record) = bucket.iter_mut().find(|p| p.peer_id == peer_id) {
                    record.seeder = true;
                    record.last_announce = SystemTime::now();
                }
            }
        }

        bucket.iter().filter(|p| p.seeder).cloned().collect()
    }

    /// A point-in-time copy of every bucket, for the REPL's `lp` command.
    pub fn snapshot(&self) -> Vec<([u8; 20], Vec<PeerRecord>)> {
        let peers = self.peers.lock().expect("registry mutex poisoned");
        peers.iter().map(|(hash, records)| (*hash, records.clone())).collect()
    }
}

fn evict_stale(bucket: &mut Vec<PeerRecord>) {
    let now = SystemTime::now();
    bucket.retain(|p| {
        now.duration_since(p.last_announce)
            .map(|elapsed| elapsed < PEER_TIMEOUT)
            .unwrap_or(true)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_registers_and_returns_seeders_only() {
        let registry = Registry::new();
        let hash = [1u8; 20];
        registry.announce(hash, "leecher".to_string(), "1.2.3.4".to_string(), 1, Event::Started, false);
        let seeders = registry.announce(
            hash,
            "seeder".to_string(),
            "5.6.7.8".to_string(),
            2,
            Event::Started,
            true,
        );
        assert_eq!(seeders.len(), 1);
        assert_eq!(seeders[0].peer_id, "seeder");
    }

    #[test]
    fn completed_flips_seeder_flag() {
        let registry = Registry::new();
        let hash = [2u8; 20];
        registry.announce(hash, "a".to_string(), "1.1.1.1".to_string(), 1, Event::Started, false);
        let seeders = registry.announce(hash, "a".to_string(), "1.1.1.1".to_string(), 1, Event::Completed, false);
        assert_eq!(seeders.len(), 1);
        assert_eq!(seeders[0].peer_id, "a");
    }

    #[test]
    fn stopped_removes_the_record() {
        let registry = Registry::new();
        let hash = [3u8; 20];
        registry.announce(hash, "a".to_string(), "1.1.1.1".to_string(), 1, Event::Started, true);
        let seeders = registry.announce(hash, "a".to_string(), "1.1.1.1".to_string(), 1, Event::Stopped, true);
        assert!(seeders.is_empty());
    }

    #[test]
    fn stale_records_are_evicted_on_the_next_announce() {
        let registry = Registry::new();
        let hash = [4u8; 20];
        {
            let mut peers = registry.peers.lock().unwrap();
            peers.entry(hash).or_default().push(PeerRecord {
                peer_id: "stale".to_string(),
                seeder: true,
                ip: "9.9.9.9".to_string(),
                port: 1,
                last_announce: SystemTime::now() - Duration::from_secs(200),
            });
        }
        let seeders = registry.announce(hash, "fresh".to_string(), "1.1.1.1".to_string(), 2, Event::Started, true);
        assert_eq!(seeders.len(), 1);
        assert_eq!(seeders[0].peer_id, "fresh");
    }
}
