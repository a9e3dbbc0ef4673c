// src/relevance.rs
//! Relevance gate: pattern groups, ordered tier rules, and the safety-net domain list.
//!
//! A rule set names five pattern groups and two ordered rule lists (strict and
//! fallback). Each rule is `when -> action`; the first rule whose condition holds
//! decides, and falling off the end rejects. The safety net bypasses text entirely
//! and trusts a handful of aggregator domains.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

use crate::ingest::types::CanonicalItem;

// --- env defaults & names ---
pub const DEFAULT_RELEVANCE_CONFIG_PATH: &str = "config/relevance.toml";
pub const DEFAULT_FALLBACK_BELOW: usize = 12;
pub const DEFAULT_SAFETY_NET_BELOW: usize = 6;

pub const ENV_RELEVANCE_CONFIG_PATH: &str = "RELEVANCE_CONFIG_PATH";
pub const ENV_FALLBACK_BELOW: &str = "FALLBACK_BELOW";
pub const ENV_SAFETY_NET_BELOW: &str = "SAFETY_NET_BELOW";

/// Rule set compiled into the binary; identical to the shipped `config/relevance.toml`.
const BUILTIN_RULES: &str = include_str!("../config/relevance.toml");

// Dev logging gate: RELEVANCE_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("RELEVANCE_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    is_dev_env()
}

pub(crate) fn is_dev_env() -> bool {
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short, stable, non-reversible id for a piece of text (first 6 bytes of SHA-256).
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for relevance decisions.
fn dev_log_relevance(tier: Tier, text: &str, rule: Option<&str>, kept: bool) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    // Never log raw text. Only hashed id + the deciding rule.
    info!(
        target: "relevance",
        %id,
        tier = tier.as_str(),
        rule = rule.unwrap_or("-"),
        kept,
        "relevance decision"
    );
}

// parse optional count env (non-negative integer)
fn parse_count_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
}

/* ----------------------------
Vocabulary
---------------------------- */

/// The pattern groups a rule condition can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Non-football sports; rejects in every tier.
    ExcludeOtherSports,
    /// Team nickname, head coach, stadium, fan site, rallying cry.
    StrongSignal,
    /// State / institution names that collide with another school's acronym.
    AmbiguousName,
    /// Context of the other school sharing the acronym.
    NegativeDisambiguation,
    /// Generic football vocabulary.
    TopicContext,
}

impl Group {
    pub const ALL: [Group; 5] = [
        Group::ExcludeOtherSports,
        Group::StrongSignal,
        Group::AmbiguousName,
        Group::NegativeDisambiguation,
        Group::TopicContext,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Group::ExcludeOtherSports => "exclude_other_sports",
            Group::StrongSignal => "strong_signal",
            Group::AmbiguousName => "ambiguous_name",
            Group::NegativeDisambiguation => "negative_disambiguation",
            Group::TopicContext => "topic_context",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Keep,
    Reject,
}

/// Text-classification tiers. The safety net is domain-based and lives outside this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Strict,
    Fallback,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Strict => "strict",
            Tier::Fallback => "fallback",
        }
    }
}

/// Best tier an item qualifies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    StrictKeep,
    FallbackKeep,
    Reject,
}

/// Diagnostic view of one tier decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relevance {
    pub tier: Tier,
    pub kept: bool,
    /// Id of the deciding rule; `None` when no rule matched (default reject).
    pub rule: Option<String>,
    /// Every group with at least one matching pattern.
    pub matched: Vec<&'static str>,
}

/// Lowercased `"{title} {summary}"`, the text every tier classifies.
pub fn item_text(item: &CanonicalItem) -> String {
    format!("{} {}", item.title, item.summary).to_lowercase()
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct RulesRoot {
    #[serde(default)]
    pub population: PopulationCfg,
    pub groups: GroupsCfg,
    pub tiers: TiersCfg,
    #[serde(default)]
    pub safety_net: SafetyNetCfg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PopulationCfg {
    #[serde(default = "default_fallback_below")]
    pub fallback_below: usize,
    #[serde(default = "default_safety_net_below")]
    pub safety_net_below: usize,
}

fn default_fallback_below() -> usize {
    DEFAULT_FALLBACK_BELOW
}
fn default_safety_net_below() -> usize {
    DEFAULT_SAFETY_NET_BELOW
}

impl PopulationCfg {
    /// The safety net only runs after fallback, so its floor cannot sit above fallback's.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.safety_net_below > self.fallback_below {
            anyhow::bail!(
                "safety_net_below ({}) exceeds fallback_below ({})",
                self.safety_net_below,
                self.fallback_below
            );
        }
        Ok(())
    }
}

impl Default for PopulationCfg {
    fn default() -> Self {
        Self {
            fallback_below: DEFAULT_FALLBACK_BELOW,
            safety_net_below: DEFAULT_SAFETY_NET_BELOW,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupsCfg {
    #[serde(default)]
    pub exclude_other_sports: Vec<String>,
    #[serde(default)]
    pub strong_signal: Vec<String>,
    #[serde(default)]
    pub ambiguous_name: Vec<String>,
    #[serde(default)]
    pub negative_disambiguation: Vec<String>,
    #[serde(default)]
    pub topic_context: Vec<String>,
}

impl GroupsCfg {
    fn patterns(&self, group: Group) -> &[String] {
        match group {
            Group::ExcludeOtherSports => &self.exclude_other_sports,
            Group::StrongSignal => &self.strong_signal,
            Group::AmbiguousName => &self.ambiguous_name,
            Group::NegativeDisambiguation => &self.negative_disambiguation,
            Group::TopicContext => &self.topic_context,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TiersCfg {
    #[serde(default)]
    pub strict: Vec<RuleCfg>,
    #[serde(default)]
    pub fallback: Vec<RuleCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleCfg {
    pub id: String,
    /// Conjunction of disjunctions over groups.
    #[serde(default)]
    pub when: Vec<Vec<Group>>,
    pub action: Action,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyNetCfg {
    #[serde(default)]
    pub domains: Vec<String>,
}

/* ----------------------------
Compiled engine
---------------------------- */

/// Per-text memo of group hits so each group is matched at most once.
struct Hits<'a> {
    engine: &'a RelevanceEngine,
    text: &'a str,
    cache: [Option<bool>; 5],
}

impl<'a> Hits<'a> {
    fn new(engine: &'a RelevanceEngine, text: &'a str) -> Self {
        Self {
            engine,
            text,
            cache: [None; 5],
        }
    }

    fn hit(&mut self, group: Group) -> bool {
        let slot = &mut self.cache[group.index()];
        if let Some(v) = *slot {
            return v;
        }
        let v = self.engine.groups[group.index()]
            .iter()
            .any(|re| re.is_match(self.text));
        *slot = Some(v);
        v
    }

    fn holds(&mut self, rule: &RuleCfg) -> bool {
        rule.when
            .iter()
            .all(|alternatives| alternatives.iter().any(|&g| self.hit(g)))
    }
}

/// Compiled rule set. Pure: classification never fails and performs no I/O.
#[derive(Debug)]
pub struct RelevanceEngine {
    pub cfg: RulesRoot,
    /// Indexed by `Group::index()`.
    groups: [Vec<Regex>; 5],
    domains: Vec<String>,
}

impl RelevanceEngine {
    /// The rule set compiled into the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    /// Load from `RELEVANCE_CONFIG_PATH`, else `config/relevance.toml`, else the built-in
    /// rules. Population floors may be overridden via `FALLBACK_BELOW` / `SAFETY_NET_BELOW`.
    pub fn from_toml() -> anyhow::Result<Self> {
        let mut eng = match std::env::var(ENV_RELEVANCE_CONFIG_PATH) {
            Ok(p) => Self::from_path(Path::new(&p))?,
            Err(_) => {
                let default = PathBuf::from(DEFAULT_RELEVANCE_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(&default)?
                } else {
                    info!(
                        target: "relevance",
                        "no {} on disk, using built-in rules",
                        DEFAULT_RELEVANCE_CONFIG_PATH
                    );
                    Self::builtin()?
                }
            }
        };

        if let Some(n) = parse_count_env(std::env::var(ENV_FALLBACK_BELOW).ok()) {
            eng.cfg.population.fallback_below = n;
        }
        if let Some(n) = parse_count_env(std::env::var(ENV_SAFETY_NET_BELOW).ok()) {
            eng.cfg.population.safety_net_below = n;
        }
        eng.cfg.population.validate()?;

        Ok(eng)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read relevance config at {}: {}",
                path.display(),
                e
            )
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from a TOML string
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: RulesRoot = toml::from_str(toml_str)?;
        cfg.population.validate()?;

        let mut groups: [Vec<Regex>; 5] = Default::default();
        for group in Group::ALL {
            groups[group.index()] = cfg
                .groups
                .patterns(group)
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| {
                            anyhow::anyhow!("group `{}` regex error: {}", group.as_str(), e)
                        })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
        }

        for (tier, rules) in [("strict", &cfg.tiers.strict), ("fallback", &cfg.tiers.fallback)] {
            for r in rules {
                if r.when.iter().any(|alts| alts.is_empty()) {
                    anyhow::bail!("{tier} rule `{}` has an empty group list", r.id);
                }
            }
        }

        let domains = cfg
            .safety_net
            .domains
            .iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Ok(Self {
            cfg,
            groups,
            domains,
        })
    }

    pub fn population(&self) -> PopulationCfg {
        self.cfg.population
    }

    fn rules(&self, tier: Tier) -> &[RuleCfg] {
        match tier {
            Tier::Strict => &self.cfg.tiers.strict,
            Tier::Fallback => &self.cfg.tiers.fallback,
        }
    }

    /// First matching rule of `tier`, if any.
    fn decide<'s>(&'s self, tier: Tier, hits: &mut Hits<'_>) -> Option<&'s RuleCfg> {
        self.rules(tier).iter().find(|r| hits.holds(r))
    }

    /// Keep/reject decision for already-lowercased `text` under `tier`.
    pub fn keeps(&self, tier: Tier, text: &str) -> bool {
        let mut hits = Hits::new(self, text);
        let rule = self.decide(tier, &mut hits);
        let kept = matches!(rule, Some(r) if r.action == Action::Keep);
        dev_log_relevance(tier, text, rule.map(|r| r.id.as_str()), kept);
        kept
    }

    /// Best tier `text` qualifies for.
    pub fn classify(&self, text: &str) -> Verdict {
        if self.keeps(Tier::Strict, text) {
            Verdict::StrictKeep
        } else if self.keeps(Tier::Fallback, text) {
            Verdict::FallbackKeep
        } else {
            Verdict::Reject
        }
    }

    /// Same decision as `keeps`, with the deciding rule and matched groups attached.
    pub fn explain(&self, tier: Tier, text: &str) -> Relevance {
        let mut hits = Hits::new(self, text);
        let rule = self.decide(tier, &mut hits);
        let matched = Group::ALL
            .iter()
            .copied()
            .filter(|&g| hits.hit(g))
            .map(Group::as_str)
            .collect();
        Relevance {
            tier,
            kept: matches!(rule, Some(r) if r.action == Action::Keep),
            rule: rule.map(|r| r.id.clone()),
            matched,
        }
    }

    /// True if `source_url` contains one of the trusted aggregator domain fragments.
    pub fn in_safety_net(&self, source_url: &str) -> bool {
        let url = source_url.to_ascii_lowercase();
        self.domains.iter().any(|d| url.contains(d.as_str()))
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// A threadsafe handle that can hot-reload the underlying engine in dev/local.
/// - Enable by setting RELEVANCE_HOT_RELOAD=1
/// - Dev-gated: active only if cfg!(debug_assertions) OR SHUTTLE_ENV is "local"/"development".
#[derive(Clone)]
pub struct RelevanceHandle {
    inner: Arc<RwLock<Arc<RelevanceEngine>>>,
}

impl RelevanceHandle {
    pub fn new(engine: RelevanceEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(engine))),
        }
    }

    /// The engine in effect right now. A collection cycle holds on to one engine
    /// for its whole run, so a reload never splits a cycle across two rule sets.
    pub fn current(&self) -> Arc<RelevanceEngine> {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, engine: RelevanceEngine) {
        match self.inner.write() {
            Ok(mut g) => *g = Arc::new(engine),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(engine),
        }
    }

    pub fn keeps(&self, tier: Tier, text: &str) -> bool {
        self.current().keeps(tier, text)
    }

    pub fn explain(&self, tier: Tier, text: &str) -> Relevance {
        self.current().explain(tier, text)
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var("RELEVANCE_HOT_RELOAD")
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    want && is_dev_env()
}

/// Start a simple polling watcher on `path` to hot-reload into `handle`.
/// Polls mtime every 2s. A file that fails to parse leaves the current rules in place.
pub fn start_hot_reload_thread(handle: RelevanceHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        match RelevanceEngine::from_path(&path) {
                            Ok(new_engine) => {
                                handle.replace(new_engine);
                                info!(target: "relevance", path = %path.display(), "rules reloaded");
                            }
                            Err(e) => {
                                tracing::warn!(target: "relevance", error = %e, "rules reload failed, keeping previous");
                            }
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}

/* ----------------------------
Tests
---------------------------- */
