use serde::{Deserialize, Serialize};

pub const DEFAULT_FEEDBACK_MS: u64 = 1000;
pub const DEFAULT_WARNING_MS: u64 = 5000;
pub const DEFAULT_ITI_MS: u64 = 1000;

fn default_keys() -> [String; 2] {
    ["arrowleft".to_string(), "arrowright".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_feedback_ms() -> u64 {
    DEFAULT_FEEDBACK_MS
}

fn default_warning_ms() -> u64 {
    DEFAULT_WARNING_MS
}

fn default_iti_ms() -> u64 {
    DEFAULT_ITI_MS
}

/// Position of a trial within the session, as seen by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialMeta {
    /// 1-based index within the block (or practice list).
    pub trial: u32,
    /// 1-based block number; `None` outside the task blocks.
    #[serde(default)]
    pub block: Option<u32>,
    #[serde(default)]
    pub practice: bool,
}

impl TrialMeta {
    pub fn starts_block(&self) -> bool {
        self.trial == 1
    }

    pub fn starts_session(&self) -> bool {
        self.trial == 1 && self.block == Some(1)
    }
}

/// Instructed-trial overrides. Everything is ignored unless `enabled`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcedOverrides {
    pub enabled: bool,
    /// Rocket index (into `rocket_colors`) to force when no color matches.
    pub state1_key: Option<usize>,
    /// Rocket color to force; its side is looked up after the shuffle.
    pub state1_color: Option<String>,
    /// Alien index within the planet (0 or 1) to force when no absolute
    /// index matches.
    pub state2_key: Option<usize>,
    /// Absolute alien index (0..6) to force at stage 2.
    pub alien_index: Option<usize>,
    /// Destination planet that overrides the transition.
    pub transition: Option<usize>,
    /// Banner text shown at stage 1 in place of the derived instruction.
    pub message: Option<String>,
}

/// Immutable input for one two-step trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub rocket_colors: [String; 2],
    /// Rockets of this color always land on planet 0.
    pub deterministic_rocket_color: String,
    #[serde(default)]
    pub planet_colors: Vec<String>,
    /// Alien identifiers keyed by absolute index, two per planet.
    #[serde(default)]
    pub aliens: Vec<String>,
    /// Reward per absolute alien index.
    #[serde(default)]
    pub outcomes: Option<Vec<i64>>,
    #[serde(default = "default_keys")]
    pub valid_responses_s1: [String; 2],
    #[serde(default = "default_keys")]
    pub valid_responses_s2: [String; 2],
    #[serde(default = "default_true")]
    pub randomize_s1: bool,
    #[serde(default = "default_true")]
    pub randomize_s2: bool,
    /// `None` waits forever.
    #[serde(default)]
    pub stage1_timeout_ms: Option<u64>,
    #[serde(default)]
    pub stage2_timeout_ms: Option<u64>,
    #[serde(default = "default_feedback_ms")]
    pub feedback_duration_ms: u64,
    #[serde(default = "default_warning_ms")]
    pub warning_duration_ms: u64,
    /// Plays the launch animation between the stages.
    #[serde(default = "default_true")]
    pub animation: bool,
    #[serde(default = "default_true")]
    pub show_gem_counter: bool,
    #[serde(default)]
    pub forced: ForcedOverrides,
    #[serde(default)]
    pub meta: TrialMeta,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            rocket_colors: ["#FFD700".to_string(), "#00CED1".to_string()],
            deterministic_rocket_color: "#FFD700".to_string(),
            planet_colors: Vec::new(),
            aliens: Vec::new(),
            outcomes: None,
            valid_responses_s1: default_keys(),
            valid_responses_s2: default_keys(),
            randomize_s1: true,
            randomize_s2: true,
            stage1_timeout_ms: None,
            stage2_timeout_ms: None,
            feedback_duration_ms: DEFAULT_FEEDBACK_MS,
            warning_duration_ms: DEFAULT_WARNING_MS,
            animation: true,
            show_gem_counter: true,
            forced: ForcedOverrides::default(),
            meta: TrialMeta::default(),
        }
    }
}

impl TrialConfig {
    pub fn is_forced(&self) -> bool {
        self.forced.enabled
    }

    pub fn is_practice(&self) -> bool {
        self.meta.practice
    }

    pub fn alien(&self, index: usize) -> Option<&str> {
        self.aliens.get(index).map(String::as_str)
    }
}

/// Input for a stage-2-only practice trial on a single planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlienPracticeConfig {
    #[serde(default)]
    pub aliens: Vec<String>,
    #[serde(default)]
    pub outcomes: Option<Vec<i64>>,
    #[serde(default)]
    pub planet_color: String,
    #[serde(default = "default_true")]
    pub randomize: bool,
    #[serde(default = "default_keys")]
    pub valid_responses: [String; 2],
    /// Counted from the end of the inter-trial interval.
    #[serde(default)]
    pub choice_duration_ms: Option<u64>,
    #[serde(default = "default_feedback_ms")]
    pub feedback_duration_ms: u64,
    #[serde(default = "default_warning_ms")]
    pub warning_duration_ms: u64,
    #[serde(default = "default_iti_ms")]
    pub iti_duration_ms: u64,
    #[serde(default)]
    pub meta: TrialMeta,
}

impl Default for AlienPracticeConfig {
    fn default() -> Self {
        Self {
            aliens: Vec::new(),
            outcomes: None,
            planet_color: String::new(),
            randomize: true,
            valid_responses: default_keys(),
            choice_duration_ms: None,
            feedback_duration_ms: DEFAULT_FEEDBACK_MS,
            warning_duration_ms: DEFAULT_WARNING_MS,
            iti_duration_ms: DEFAULT_ITI_MS,
            meta: TrialMeta::default(),
        }
    }
}
