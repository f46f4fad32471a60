use cumulus_core::config::CUTOVER_VERSION_ENV;
use cumulus_core::{EngineConfig, VersionGate};

// Un solo test por binario: muta el entorno del proceso.
#[test]
fn engine_config_reads_cutover_from_environment() {
    std::env::set_var(CUTOVER_VERSION_ENV, "3.0.0");
    let cfg = EngineConfig::from_env();
    assert_eq!(cfg.relational_cutover_version.as_deref(), Some("3.0.0"));
    assert_eq!(VersionGate::new(&cfg).cutover().expect("parse").to_string(), "3.0.0");

    std::env::set_var(CUTOVER_VERSION_ENV, "  ");
    assert_eq!(EngineConfig::from_env().relational_cutover_version, None);

    std::env::remove_var(CUTOVER_VERSION_ENV);
    assert_eq!(EngineConfig::from_env(), EngineConfig::default());
}
