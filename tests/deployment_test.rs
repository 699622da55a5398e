use serde_yaml::Value;

fn read(file: &str) -> String {
    std::fs::read_to_string(format!("{}/{}", env!("CARGO_MANIFEST_DIR"), file))
        .unwrap_or_else(|e| panic!("cannot read {}: {}", file, e))
}

fn compose() -> Value {
    serde_yaml::from_str(&read("docker-compose.yml")).unwrap()
}

fn strings(value: &Value) -> Vec<&str> {
    value
        .as_sequence()
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn app_mounts_checkout_and_runs_startup_in_order() {
    let compose = compose();
    let app = &compose["services"]["app"];

    let volumes = strings(&app["volumes"]);
    assert!(volumes.contains(&"./:/app"), "{:?}", volumes);
    assert!(volumes.iter().any(|v| v.ends_with(":/vol/web")), "{:?}", volumes);
    assert!(read("Dockerfile").contains("WORKDIR /app"));

    let command = app["command"].as_str().unwrap();
    let positions: Vec<usize> = ["wait-for-db", "migrate", "serve"]
        .iter()
        .map(|step| command.find(&format!("school-registry {}", step)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", command);
    assert_eq!(strings(&app["depends_on"]), vec!["db"]);
}

#[test]
fn db_reads_env_file_and_shares_credentials_with_app() {
    let compose = compose();
    let db = &compose["services"]["db"];
    let app = &compose["services"]["app"];

    let env_file = db["env_file"].as_sequence().unwrap();
    assert_eq!(env_file[0]["path"].as_str(), Some(".env"));
    assert_eq!(env_file[0]["required"].as_bool(), Some(false));

    let db_env = strings(&db["environment"]);
    let app_env = strings(&app["environment"]);
    for (postgres, registry) in [
        ("POSTGRES_DB", "DB_NAME"),
        ("POSTGRES_USER", "DB_USER"),
        ("POSTGRES_PASSWORD", "DB_PASS"),
    ] {
        let value = |env: &[&str], key: &str| {
            env.iter()
                .find_map(|e| e.strip_prefix(&format!("{}=", key)).map(str::to_string))
                .unwrap_or_else(|| panic!("{} is not set", key))
        };
        assert_eq!(value(&db_env, postgres), value(&app_env, registry));
    }
    assert!(app_env.contains(&"DB_HOST=db"));
}
