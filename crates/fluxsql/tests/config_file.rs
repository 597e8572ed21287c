use fluxsql::prelude::*;
use std::path::PathBuf;

fn write_config(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fluxsql-{}-{name}.toml", std::process::id()));
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn load_config_drives_compilation() {
    let path = write_config(
        "pg",
        r#"
        dialect = "postgresql"
        prefix = "app_"
        protect_identifiers = true
        "#,
    );
    let config = ConnectionConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let conn = Connection::new(config);
    let mut qb = conn.table("users u");
    qb.select("users.id").where_("users.email", "a@b.c").unwrap();
    assert_eq!(
        qb.sql().unwrap(),
        r#"SELECT "u"."id" FROM "app_users" AS "u" WHERE "u"."email" = 'a@b.c'"#
    );
}

#[test]
fn native_upsert_flag_from_toml() {
    let config = ConnectionConfig::from_toml_str(
        r#"
        dialect = "pg"
        native_upsert_replace = true
        "#,
    )
    .unwrap();
    let conn = Connection::new(config);
    let sql = conn
        .table("settings")
        .replace([("key", "theme")])
        .unwrap()
        .sql()
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO settings (key) VALUES ('theme') ON CONFLICT (key) DO NOTHING"
    );
}

#[test]
fn missing_config_file_is_a_config_error() {
    let err = ConnectionConfig::load("/nonexistent/fluxsql.toml").unwrap_err();
    assert!(matches!(err, QbError::Config(_)));
}
