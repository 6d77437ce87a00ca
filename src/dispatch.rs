//! Dispatch orchestration: look a machine up in the allowlist, send
//! its magic packet, and report a classified outcome.

use crate::machine::Machine;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::wol::{WolError, WolSender};
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("machine '{0}' not found")]
    NotFound(String),
    #[error("failed to send WoL packet to machine '{id}'")]
    SendFailed {
        id: String,
        #[source]
        source: WolError,
    },
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    sender: Arc<dyn WolSender>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, sender: Arc<dyn WolSender>, metrics: Arc<Metrics>) -> Self {
        Dispatcher {
            registry,
            sender,
            metrics,
        }
    }

    /// Sends a WoL packet to the machine with the given ID. Unknown
    /// IDs fail before any packet is built or transmitted.
    pub fn dispatch(&self, id: &str) -> Result<(), DispatchError> {
        let machine = match self.registry.get_by_id(id) {
            Ok(machine) => machine,
            Err(_) => {
                self.metrics.machine_not_found.inc();
                warn!("machine '{id}' not in allowlist, refusing to wake");
                return Err(DispatchError::NotFound(id.to_string()));
            }
        };

        info!(
            "sending WoL packet to machine '{}' ({}) at MAC {} on broadcast {}",
            machine.name,
            machine.id,
            machine.normalized_mac(),
            machine.broadcast
        );

        match self.sender.send(&machine.mac, &machine.broadcast) {
            Ok(()) => {
                self.metrics.wol_sent.inc();
                info!("WoL packet successfully sent to machine '{}'", machine.id);
                Ok(())
            }
            Err(source) => {
                self.metrics.wol_failed.inc();
                warn!("WoL packet to machine '{}' failed: {source}", machine.id);
                Err(DispatchError::SendFailed {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    pub fn get_machine(&self, id: &str) -> Result<Arc<Machine>, DispatchError> {
        self.registry
            .get_by_id(id)
            .map_err(|_| DispatchError::NotFound(id.to_string()))
    }

    pub fn list_machines(&self) -> Vec<Arc<Machine>> {
        self.registry.get_all()
    }

    pub fn machine_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    struct FakeSender {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl FakeSender {
        fn new() -> Self {
            FakeSender {
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            FakeSender {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl WolSender for FakeSender {
        fn send(&self, mac: &str, broadcast: &str) -> Result<(), WolError> {
            self.calls
                .lock()
                .unwrap()
                .push((mac.to_string(), broadcast.to_string()));
            if self.fail {
                return Err(WolError::SendFailed {
                    broadcast: broadcast.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "network unreachable"),
                });
            }
            Ok(())
        }
    }

    fn machine(id: &str, mac: &str, broadcast: &str) -> Machine {
        Machine {
            id: id.to_string(),
            name: format!("{id} box"),
            mac: mac.to_string(),
            broadcast: broadcast.to_string(),
        }
    }

    fn dispatcher(machines: Vec<Machine>, sender: Arc<FakeSender>) -> Dispatcher {
        let registry = Arc::new(Registry::new(machines).unwrap());
        let metrics = Arc::new(Metrics::new().unwrap());
        Dispatcher::new(registry, sender, metrics)
    }

    #[test]
    fn dispatch_sends_machine_mac_and_broadcast() {
        let sender = Arc::new(FakeSender::new());
        let d = dispatcher(
            vec![machine("saruman", "AA:BB:CC:DD:EE:FF", "192.168.1.255")],
            sender.clone(),
        );

        d.dispatch("saruman").unwrap();

        let calls = sender.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "AA:BB:CC:DD:EE:FF");
        assert_eq!(calls[0].1, "192.168.1.255");
        assert_eq!(d.metrics.wol_sent.get(), 1);
        assert_eq!(d.metrics.wol_failed.get(), 0);
    }

    #[test]
    fn unknown_machine_never_reaches_the_sender() {
        let sender = Arc::new(FakeSender::new());
        let d = dispatcher(
            vec![machine("saruman", "AA:BB:CC:DD:EE:FF", "192.168.1.255")],
            sender.clone(),
        );

        let err = d.dispatch("sauron").unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(id) if id == "sauron"));
        assert!(sender.calls().is_empty());
        assert_eq!(d.metrics.machine_not_found.get(), 1);
    }

    #[test]
    fn sender_failure_becomes_send_failed() {
        let sender = Arc::new(FakeSender::failing());
        let d = dispatcher(
            vec![machine("saruman", "AA:BB:CC:DD:EE:FF", "192.168.1.255")],
            sender.clone(),
        );

        let err = d.dispatch("saruman").unwrap_err();
        assert!(matches!(err, DispatchError::SendFailed { ref id, .. } if id == "saruman"));
        assert_eq!(sender.calls().len(), 1);
        assert_eq!(d.metrics.wol_failed.get(), 1);
        assert_eq!(d.metrics.wol_sent.get(), 0);
    }

    #[test]
    fn get_machine_and_list() {
        let sender = Arc::new(FakeSender::new());
        let d = dispatcher(
            vec![
                machine("a", "AA:BB:CC:DD:EE:FF", "192.168.1.255"),
                machine("b", "11:22:33:44:55:66", "10.0.0.255"),
            ],
            sender,
        );

        assert_eq!(d.get_machine("a").unwrap().broadcast, "192.168.1.255");
        assert!(matches!(
            d.get_machine("zzz"),
            Err(DispatchError::NotFound(_))
        ));
        assert_eq!(d.list_machines().len(), 2);
        assert_eq!(d.machine_count(), 2);
    }

    #[test]
    fn concurrent_dispatches_are_independent() {
        let sender = Arc::new(FakeSender::new());
        let d = Arc::new(dispatcher(
            vec![
                machine("a", "AA:BB:CC:DD:EE:FF", "192.168.1.255"),
                machine("b", "11:22:33:44:55:66", "10.0.0.255"),
                machine("c", "22:33:44:55:66:77", "172.16.0.255"),
            ],
            sender.clone(),
        ));

        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|id| {
                let d = d.clone();
                thread::spawn(move || d.dispatch(id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let calls = sender.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.contains(&("AA:BB:CC:DD:EE:FF".to_string(), "192.168.1.255".to_string())));
        assert!(calls.contains(&("11:22:33:44:55:66".to_string(), "10.0.0.255".to_string())));
        assert!(calls.contains(&("22:33:44:55:66:77".to_string(), "172.16.0.255".to_string())));
        assert_eq!(d.metrics.wol_sent.get(), 3);
    }
}
