use cpk_alerts::BatchOptions;
use cpk_reconcile::MatchTolerance;
use cpk_schedule::GenerateOptions;

/// Typed knobs the engine runs with. Built from `cpk-config`'s
/// `EngineConfig` by the binaries; defaults match the configuration defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub tolerance: MatchTolerance,
    pub generate: GenerateOptions,
    pub alerts: BatchOptions,
}
