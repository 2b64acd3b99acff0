//! Engine tuning constants shared across modules.

/// Comparison tolerance for snapshot diffs and float assertions.
pub const FLOAT_EPSILON: f64 = 1e-4;

/// Month the first playthrough turn lands on (1-12).
pub const START_MONTH: u8 = 3;
/// Action points granted at the start of every period.
pub const DEFAULT_MAX_AP: u32 = 3;
/// Wall-clock minutes represented by one spent action point.
pub const MINUTES_PER_ACTION: u32 = 240;

/// Weight assumed for events that do not author one.
pub const DEFAULT_EVENT_WEIGHT: f64 = 1.0;
/// AP cost assumed for options that do not author one.
pub const DEFAULT_AP_COST: u32 = 1;

/// Derived chance floor/ceiling for stat-driven probability.
pub const CHANCE_STAT_FLOOR: f64 = 0.05;
pub const CHANCE_STAT_CEIL: f64 = 0.95;

/// Consecutive favor-less periods tolerated before the neglect penalty bites.
pub const NEGLECT_THRESHOLD: u32 = 3;
/// Favor lost per period once the neglect threshold is crossed.
pub const NEGLECT_FAVOR_PENALTY: f64 = 5.0;
/// Appearance decay applied on every favor-less period rollover.
pub const NEGLECT_APPEARANCE_DECAY: f64 = 0.5;

/// Turns between conception and a birth coming due.
pub const PREGNANCY_TERM_TURNS: u32 = 10;
/// Matron trust at or above which a newborn is taken into her custody.
pub const CUSTODY_TRUST_THRESHOLD: f64 = 60.0;

/// Turns a cached NPC impression stays fresh.
pub const IMPRESSION_REFRESH_TURNS: u32 = 6;

/// Maximum chronicle entries retained in a save.
pub const CHRONICLE_CAP: usize = 200;

/// Relationship key for the young lord of the house.
pub const NPC_LORD: &str = "lord";
/// Relationship key for the household matron.
pub const NPC_MATRON: &str = "matron";

/// Numeric suffix of each stage's recurring period event (`s1_1000`, ...).
pub const RECURRING_EVENT_SUFFIX: &str = "1000";

/// Inventory key advanced by the escape subplot handler.
pub const ITEM_ESCAPE_PROGRESS: &str = "escape_progress";
/// Inventory key granted by imperial-merit rewards.
pub const ITEM_IMPERIAL_MERIT: &str = "imperial_merit";
