use serde_yaml::Value;
use std::path::PathBuf;

fn repo_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(name)
}

fn compose() -> Value {
    let content = std::fs::read_to_string(repo_file("docker-compose.yml")).unwrap();
    serde_yaml::from_str(&content).unwrap()
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_compose_declares_both_services() {
    let compose = compose();
    let services = compose["services"].as_mapping().unwrap();
    assert_eq!(services.len(), 2);
    assert!(compose["services"]["postgres"].is_mapping());
    assert!(compose["services"]["service"].is_mapping());
}

#[test]
fn test_postgres_health_check_budget() {
    let compose = compose();
    let healthcheck = &compose["services"]["postgres"]["healthcheck"];

    let test = strings(&healthcheck["test"]).join(" ");
    assert!(test.contains("pg_isready"));
    assert_eq!(healthcheck["interval"].as_str(), Some("2s"));
    assert_eq!(healthcheck["timeout"].as_str(), Some("2s"));
    assert_eq!(healthcheck["retries"].as_u64(), Some(10));
}

#[test]
fn test_service_waits_for_healthy_postgres() {
    let compose = compose();
    let depends_on = &compose["services"]["service"]["depends_on"];
    assert_eq!(
        depends_on["postgres"]["condition"].as_str(),
        Some("service_healthy")
    );
    assert!(compose["services"]["service"]["build"].is_string());
}

#[test]
fn test_database_port_comes_from_env() {
    let compose = compose();
    let ports = strings(&compose["services"]["postgres"]["ports"]);
    assert_eq!(ports, vec!["${POSTGRES_PORT}:5432".to_string()]);
}

#[test]
fn test_volume_mounts() {
    let compose = compose();

    let postgres_volumes = strings(&compose["services"]["postgres"]["volumes"]);
    assert!(postgres_volumes
        .contains(&"./data/init.sql:/docker-entrypoint-initdb.d/init.sql".to_string()));
    assert!(postgres_volumes.contains(&"./data/pgdata:/var/lib/postgresql/data".to_string()));

    let service_volumes = strings(&compose["services"]["service"]["volumes"]);
    assert_eq!(service_volumes, vec!["./data:/app/data".to_string()]);

    for service in ["postgres", "service"] {
        let env_files = strings(&compose["services"][service]["env_file"]);
        assert_eq!(env_files, vec![".env".to_string()]);
    }
}

fn minor_version(version: &str) -> Option<u32> {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some("1"), Some(minor)) => minor.parse().ok(),
        _ => None,
    }
}

#[test]
fn test_builder_image_meets_rust_version() {
    let dockerfile = std::fs::read_to_string(repo_file("Dockerfile")).unwrap();
    let image = dockerfile
        .lines()
        .find_map(|line| line.strip_prefix("FROM rust:"))
        .and_then(|rest| rest.split_whitespace().next())
        .expect("Dockerfile has no rust builder stage");

    let manifest: toml::Value =
        toml::from_str(&std::fs::read_to_string(repo_file("Cargo.toml")).unwrap()).unwrap();
    let required = manifest["package"]["rust-version"]
        .as_str()
        .and_then(minor_version)
        .expect("Cargo.toml declares rust-version");

    let tag = image.trim_end_matches("-slim");
    if let Some(minor) = minor_version(tag) {
        assert!(
            minor >= required,
            "builder rust:{} is older than rust-version 1.{}",
            image,
            required
        );
    } else {
        // Floating tags such as `1-slim` always track the latest stable.
        assert!(matches!(tag, "1" | "slim" | "latest"), "unexpected tag {}", image);
    }
}

#[test]
fn test_init_script_creates_sku_table() {
    let sql = std::fs::read_to_string(repo_file("data/init.sql")).unwrap();
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.sku"));
    for column in offer_feed_etl::domain::model::OFFER_COLUMNS {
        assert!(sql.contains(column), "init.sql is missing column {}", column);
    }
}

#[test]
fn test_env_example_documents_required_variables() {
    let env = std::fs::read_to_string(repo_file(".env.example")).unwrap();
    for key in [
        "POSTGRES_DB",
        "POSTGRES_USER",
        "POSTGRES_PASSWORD",
        "POSTGRES_HOST",
        "POSTGRES_PORT",
        "TARGET_FILENAME",
    ] {
        assert!(env.contains(&format!("{}=", key)), "missing {}", key);
    }
}
