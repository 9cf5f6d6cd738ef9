// Metrics reporting loop
pub mod monitoring;

// System orchestrator
pub mod system;
