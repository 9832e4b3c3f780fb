//! In-memory registrar and probe used by the engine tests.

use async_trait::async_trait;
use dssync_core::{
    DnsKeyRecord, DnskeyProbe, DomainName, DomainPage, DomainSummary, DsRecord, NameserverSet,
    ProbeTarget, RecordId, Registrar, RemoteDsRecord, Result, SyncError,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Ordered log of calls shared between fakes
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn domain(name: &str) -> DomainName {
    DomainName::parse(name).unwrap()
}

pub fn ksk(seed: u8) -> DnsKeyRecord {
    DnsKeyRecord::new(257, 13, vec![seed; 64])
}

pub fn zsk(seed: u8) -> DnsKeyRecord {
    DnsKeyRecord::new(256, 13, vec![seed; 64])
}

#[derive(Default)]
struct RegistrarState {
    nameservers: HashMap<DomainName, NameserverSet>,
    ds: HashMap<DomainName, Vec<RemoteDsRecord>>,
    fail_reads: HashSet<DomainName>,
    fail_creates: HashSet<u16>,
    fail_deletes: HashSet<RecordId>,
    fail_update_ns: bool,
    next_id: u64,
}

pub struct FakeRegistrar {
    state: Mutex<RegistrarState>,
    journal: Journal,
}

impl Default for FakeRegistrar {
    fn default() -> Self {
        Self::with_journal(Journal::default())
    }
}

impl FakeRegistrar {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            state: Mutex::new(RegistrarState {
                next_id: 1000,
                ..RegistrarState::default()
            }),
            journal,
        }
    }

    pub fn set_nameservers(&self, domain: &DomainName, hosts: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .nameservers
            .insert(domain.clone(), NameserverSet::new(hosts));
    }

    /// Publish records directly, bypassing the journal
    pub fn publish(&self, domain: &DomainName, records: impl IntoIterator<Item = DsRecord>) {
        let mut state = self.state.lock().unwrap();
        for record in records {
            state.next_id += 1;
            let id = RecordId(state.next_id.to_string());
            state
                .ds
                .entry(domain.clone())
                .or_default()
                .push(RemoteDsRecord { id, record });
        }
    }

    pub fn fail_reads_for(&self, domain: &DomainName) {
        self.state.lock().unwrap().fail_reads.insert(domain.clone());
    }

    pub fn fail_create_of(&self, key_tag: u16) {
        self.state.lock().unwrap().fail_creates.insert(key_tag);
    }

    pub fn fail_delete_of(&self, id: &RecordId) {
        self.state.lock().unwrap().fail_deletes.insert(id.clone());
    }

    pub fn fail_update_ns(&self) {
        self.state.lock().unwrap().fail_update_ns = true;
    }

    pub fn published(&self, domain: &DomainName) -> Vec<RemoteDsRecord> {
        self.state
            .lock()
            .unwrap()
            .ds
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn published_set(&self, domain: &DomainName) -> BTreeSet<DsRecord> {
        self.published(domain).into_iter().map(|r| r.record).collect()
    }

    pub fn nameservers_of(&self, domain: &DomainName) -> Option<NameserverSet> {
        self.state.lock().unwrap().nameservers.get(domain).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Calls that change registrar state
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("create") || c.starts_with("delete") || c.starts_with("update_ns"))
            .collect()
    }

    fn record(&self, call: String) {
        self.journal.lock().unwrap().push(call);
    }

    fn check_readable(&self, domain: &DomainName) -> Result<()> {
        if self.state.lock().unwrap().fail_reads.contains(domain) {
            return Err(SyncError::Transport(format!("connection reset reading {domain}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Registrar for FakeRegistrar {
    async fn list_domains(&self, start: usize) -> Result<DomainPage> {
        self.record(format!("list_domains {start}"));
        let state = self.state.lock().unwrap();
        let mut names: Vec<&DomainName> = state.nameservers.keys().chain(state.ds.keys()).collect();
        names.sort();
        names.dedup();
        let domains = names
            .into_iter()
            .skip(start)
            .map(|d| DomainSummary::named(d.clone()))
            .collect();
        Ok(DomainPage::from_domains(domains))
    }

    async fn get_nameservers(&self, domain: &DomainName) -> Result<NameserverSet> {
        self.record(format!("get_ns {domain}"));
        self.check_readable(domain)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .nameservers
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_nameservers(
        &self,
        domain: &DomainName,
        nameservers: &NameserverSet,
    ) -> Result<()> {
        self.record(format!("update_ns {domain} {nameservers}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_update_ns {
            return Err(SyncError::Registrar {
                code: 400,
                message: "Invalid nameserver.".into(),
            });
        }
        state.nameservers.insert(domain.clone(), nameservers.clone());
        Ok(())
    }

    async fn list_ds_records(&self, domain: &DomainName) -> Result<Vec<RemoteDsRecord>> {
        self.record(format!("list_ds {domain}"));
        self.check_readable(domain)?;
        Ok(self.published(domain))
    }

    async fn create_ds_record(
        &self,
        domain: &DomainName,
        ds: &DsRecord,
    ) -> Result<Option<RecordId>> {
        self.record(format!("create {domain} {}", ds.key_tag));
        if self.state.lock().unwrap().fail_creates.contains(&ds.key_tag) {
            return Err(SyncError::Registrar {
                code: 400,
                message: "Invalid digest.".into(),
            });
        }
        self.publish(domain, [ds.clone()]);
        Ok(self.published(domain).last().map(|r| r.id.clone()))
    }

    async fn delete_ds_record(&self, domain: &DomainName, id: &RecordId) -> Result<()> {
        self.record(format!("delete {domain} {id}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes.contains(id) {
            return Err(SyncError::Transport("connection reset".into()));
        }
        if let Some(records) = state.ds.get_mut(domain) {
            records.retain(|r| &r.id != id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeProbe {
    keys: Mutex<HashMap<DomainName, Vec<DnsKeyRecord>>>,
    served_ns: Mutex<HashMap<DomainName, Vec<String>>>,
    failing: Mutex<HashSet<DomainName>>,
    journal: Journal,
}

impl FakeProbe {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn serve_keys(&self, domain: &DomainName, keys: Vec<DnsKeyRecord>) {
        self.keys.lock().unwrap().insert(domain.clone(), keys);
    }

    pub fn serve_ns(&self, domain: &DomainName, hosts: &[&str]) {
        self.served_ns
            .lock()
            .unwrap()
            .insert(domain.clone(), hosts.iter().map(ToString::to_string).collect());
    }

    pub fn fail_for(&self, domain: &DomainName) {
        self.failing.lock().unwrap().insert(domain.clone());
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn check(&self, domain: &DomainName) -> Result<()> {
        if self.failing.lock().unwrap().contains(domain) {
            return Err(SyncError::Probe(format!("{domain}: request timed out")));
        }
        Ok(())
    }
}

#[async_trait]
impl DnskeyProbe for FakeProbe {
    async fn resolve_nameservers(
        &self,
        domain: &DomainName,
        server: SocketAddr,
    ) -> Result<Vec<String>> {
        self.journal.lock().unwrap().push(format!("ns_query {domain} @{server}"));
        self.check(domain)?;
        Ok(self
            .served_ns
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_dnskeys(
        &self,
        domain: &DomainName,
        target: ProbeTarget<'_>,
    ) -> Result<Vec<DnsKeyRecord>> {
        let via = match target {
            ProbeTarget::Server(addr) => format!("@{addr}"),
            ProbeTarget::Nameservers(ns) => format!("via {ns}"),
        };
        self.journal.lock().unwrap().push(format!("dnskey {domain} {via}"));
        self.check(domain)?;
        Ok(self
            .keys
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }
}
