use etlwatch::config::{self, ConfigError, Environment, Properties};
use etlwatch::{EnvConfig, Settings};

const PROPERTIES: &str = "\
# Data warehouse
dw.hostname=sqlprod01
dw.database=DW_HOSPITALAR
dw.username=etl
dw.password=secret
dw.port=1433

# Staging area
sa.hostname=sqlstg01
sa.database=SA_HOSPITALAR
sa.username=etl
sa.password=secret
sa.port=1434

mail.addr.sender=etl@example.com
mail.server.password=hunter2
mail.server=smtp.example.com
mail.server.port=587
mail.addr.destination=ops@example.com
";

#[test]
fn env_config_reads_root_dir() {
    std::env::set_var("ROOT_DIR", "/srv/etl");

    let env = Environment::from_env().unwrap();

    assert_eq!(env.root_dir(), std::path::PathBuf::from("/srv/etl"));
    assert_eq!(
        config::properties_path(&env.root_dir()),
        std::path::PathBuf::from("/srv/etl/config/config.properties")
    );

    std::env::remove_var("ROOT_DIR");
}

#[test]
fn root_dir_defaults_when_unset() {
    let env = Environment::default();
    assert_eq!(
        env.root_dir(),
        std::path::PathBuf::from(config::DEFAULT_ROOT_DIR)
    );
}

#[test]
fn settings_load_from_properties_file() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("config")).unwrap();
    let path = config::properties_path(root.path());
    std::fs::write(&path, PROPERTIES).unwrap();

    let settings = Settings::load(&path).unwrap();

    assert_eq!(settings.warehouse.database, "DW_HOSPITALAR");
    let staging = settings.staging.expect("staging configured");
    assert_eq!(staging.host, "sqlstg01");
    assert_eq!(staging.port, 1434);
    assert_eq!(settings.mail.recipients, vec!["ops@example.com"]);
}

#[test]
fn missing_file_is_a_read_error() {
    let root = tempfile::tempdir().unwrap();
    let path = config::properties_path(root.path());

    let err = Properties::load(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Read { path: p, .. } if p == path));
}

#[test]
fn missing_required_key_fails_before_any_lookup() {
    let props = Properties::parse(&PROPERTIES.replace("mail.server.password=hunter2\n", ""));

    let err = Settings::from_properties(&props).unwrap_err();

    assert_eq!(
        err.to_string(),
        "missing required config keys: mail.server.password"
    );
    assert_eq!(etlwatch::Error::from(err).exit_code(), 2);
}
