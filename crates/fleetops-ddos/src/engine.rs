//! The DDoS Protection Engine (§4.5/C6).

use crate::error::{DdosError, Result};
use dashmap::DashMap;
use fleetops_types::ddos::{AdmissionDecision, AttackEvent, IpReputation, ThreatLevel};
use ipnet::IpNet;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// A whitelist entry: either a single address or a containing CIDR block.
#[derive(Debug, Clone)]
enum Entry {
    Ip(IpAddr),
    Cidr(IpNet),
}

impl Entry {
    fn parse(raw: &str) -> Result<Self> {
        if let Ok(ip) = IpAddr::from_str(raw) {
            return Ok(Entry::Ip(ip));
        }
        if let Ok(net) = IpNet::from_str(raw) {
            return Ok(Entry::Cidr(net));
        }
        Err(DdosError::InvalidEntry(raw.to_string()))
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match self {
            Entry::Ip(entry) => *entry == ip,
            Entry::Cidr(net) => net.contains(&ip),
        }
    }
}

/// Static configuration for the protection engine.
#[derive(Debug, Clone)]
pub struct DdosConfig {
    pub enabled: bool,
    pub ban_duration: Duration,
    pub ring_capacity: usize,
    /// Threat score past which an IP is auto-banned. Callers tune this per
    /// environment (§9) — production profiles run a lower threshold than
    /// development/staging to ban aggressively under real traffic.
    pub threat_score_ban_threshold: u64,
}

impl Default for DdosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ban_duration: Duration::from_secs(3600),
            ring_capacity: 1024,
            threat_score_ban_threshold: 100,
        }
    }
}

/// IP reputation tracking, admission checks, and the overall threat level
/// derived from recent attacks and active bans.
pub struct DdosEngine {
    config: DdosConfig,
    enabled: AtomicBool,
    whitelist: DashMap<String, Entry>,
    blacklist: DashMap<String, ()>,
    reputations: DashMap<String, IpReputation>,
    attacks: Mutex<VecDeque<AttackEvent>>,
    event_tx: broadcast::Sender<AttackEvent>,
    dropped_events: AtomicU64,
}

impl DdosEngine {
    pub fn new(config: DdosConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            enabled: AtomicBool::new(config.enabled),
            whitelist: DashMap::new(),
            blacklist: DashMap::new(),
            reputations: DashMap::new(),
            attacks: Mutex::new(VecDeque::with_capacity(config.ring_capacity)),
            event_tx,
            dropped_events: AtomicU64::new(0),
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttackEvent> {
        self.event_tx.subscribe()
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn add_to_whitelist(&self, raw: &str) -> Result<()> {
        let entry = Entry::parse(raw)?;
        self.whitelist.insert(raw.to_string(), entry);
        Ok(())
    }

    pub fn remove_from_whitelist(&self, raw: &str) {
        self.whitelist.remove(raw);
    }

    pub fn add_to_blacklist(&self, raw: &str) -> Result<()> {
        IpAddr::from_str(raw).map_err(|_| DdosError::InvalidEntry(raw.to_string()))?;
        self.blacklist.insert(raw.to_string(), ());
        Ok(())
    }

    pub fn remove_from_blacklist(&self, raw: &str) {
        self.blacklist.remove(raw);
    }

    pub fn is_blacklisted(&self, ip: &str) -> bool {
        self.blacklist.contains_key(ip)
    }

    pub fn is_whitelisted(&self, ip: &str) -> bool {
        let Ok(addr) = IpAddr::from_str(ip) else {
            return false;
        };
        self.whitelist.iter().any(|e| e.value().contains(addr))
    }

    /// `CheckRequest` per §4.5: whitelist beats blacklist beats ban state
    /// beats threat score.
    #[instrument(skip(self))]
    pub fn check_request(&self, ip: &str) -> AdmissionDecision {
        if !self.enabled.load(Ordering::SeqCst) {
            return AdmissionDecision::allow();
        }
        if self.is_whitelisted(ip) {
            return AdmissionDecision::allow();
        }
        if self.is_blacklisted(ip) {
            return AdmissionDecision::deny("blacklisted");
        }

        let now = chrono::Utc::now();
        let mut rep = self
            .reputations
            .entry(ip.to_string())
            .or_insert_with(|| IpReputation::new(ip));
        rep.request_count += 1;
        rep.last_seen = now;

        if rep.banned {
            let expired = rep.ban_expires.map(|exp| exp <= now).unwrap_or(true);
            if expired {
                rep.banned = false;
                rep.banned_at = None;
                rep.ban_expires = None;
                rep.ban_reason = None;
            } else {
                rep.blocked_count += 1;
                let reason = rep.ban_reason.clone().unwrap_or_default();
                return AdmissionDecision::deny(reason);
            }
        }

        if rep.threat_score > self.config.threat_score_ban_threshold {
            self.ban(&mut rep, now, "high threat score");
            rep.blocked_count += 1;
            return AdmissionDecision::deny("high threat score");
        }

        AdmissionDecision::allow()
    }

    fn ban(&self, rep: &mut IpReputation, now: chrono::DateTime<chrono::Utc>, reason: &str) {
        rep.banned = true;
        rep.banned_at = Some(now);
        rep.ban_expires = Some(now + chrono::Duration::from_std(self.config.ban_duration).unwrap_or_default());
        rep.ban_reason = Some(reason.to_string());
        warn!(ip = %rep.ip, reason, "ip banned");
    }

    /// Increments unconditionally; crossing the threshold while unbanned
    /// triggers an auto-ban (§4.5).
    pub fn increase_threat_score(&self, ip: &str, delta: u64) {
        let now = chrono::Utc::now();
        let mut rep = self
            .reputations
            .entry(ip.to_string())
            .or_insert_with(|| IpReputation::new(ip));
        rep.threat_score += delta;
        if rep.threat_score > self.config.threat_score_ban_threshold && !rep.banned {
            self.ban(&mut rep, now, "high threat score");
        }
    }

    /// Reads back a reputation record with `whitelisted` filled in from the
    /// live whitelist check, since admission itself never consults or
    /// updates the stored field.
    pub fn reputation(&self, ip: &str) -> Option<IpReputation> {
        self.reputations.get(ip).map(|r| {
            let mut rep = r.clone();
            rep.whitelisted = self.is_whitelisted(ip);
            rep
        })
    }

    /// Appends to the bounded ring and offers the event on the broadcast
    /// channel; dropped sends are allowed (§4.5).
    #[instrument(skip(self, event), fields(source_ip = %event.source_ip))]
    pub fn record_attack(&self, event: AttackEvent) {
        {
            let mut ring = self.attacks.lock().unwrap();
            if ring.len() >= self.config.ring_capacity {
                ring.pop_front();
            }
            ring.push_back(event.clone());
        }
        if self.event_tx.send(event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        info!("attack event recorded");
    }

    pub fn get_recent_attacks(&self, limit: usize) -> Vec<AttackEvent> {
        let ring = self.attacks.lock().unwrap();
        ring.iter().rev().take(limit).rev().cloned().collect()
    }

    /// Overall threat level per the §4.5 table: first matching row wins.
    pub fn threat_level(&self) -> ThreatLevel {
        let now = chrono::Utc::now();
        let window_start = now - chrono::Duration::minutes(5);
        let recent_attacks = {
            let ring = self.attacks.lock().unwrap();
            ring.iter().filter(|e| e.detected_at >= window_start).count()
        };
        let banned_ips = self
            .reputations
            .iter()
            .filter(|r| r.banned)
            .count();

        if recent_attacks > 100 || banned_ips > 50 {
            ThreatLevel::Critical
        } else if recent_attacks > 50 || banned_ips > 25 {
            ThreatLevel::High
        } else if recent_attacks > 20 || banned_ips > 10 {
            ThreatLevel::Medium
        } else if recent_attacks > 5 || banned_ips > 3 {
            ThreatLevel::Low
        } else {
            ThreatLevel::None
        }
    }

    /// Drops expired bans and clears stale reputations older than `max_age`.
    /// Scores do not decay (§4.5); this only reclaims memory.
    pub fn purge_stale(&self, max_age: Duration) {
        let cutoff = chrono::Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_default();
        self.reputations
            .retain(|_, rep| rep.banned || rep.last_seen >= cutoff);
    }
}
