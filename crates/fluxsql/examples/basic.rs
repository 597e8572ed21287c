//! Compile the same queries for every dialect.
//!
//! Run with: `cargo run --example basic -p fluxsql`

use fluxsql::prelude::*;

fn show(conn: &std::sync::Arc<Connection>) -> QbResult<()> {
    let dialect = conn.config().dialect.name();

    let mut qb = conn.table("jobs j");
    qb.select("jobs.id, jobs.name")
        .left_join("teams t", "jobs.team_id = teams.id")
        .where_("jobs.level >=", 2)?
        .or_where_in("t.name", ["core", "infra"])?
        .where_ilike("jobs.name", "Dev", LikeSide::Both)?
        .sort_desc("jobs.id")
        .limit(10, Some(20))?;
    println!("[{dialect}] {}", qb.sql()?);

    let mut qb = conn.table("settings");
    qb.replace([("key", Value::from("theme")), ("value", Value::from("dark"))])?;
    let compiled = qb.compile()?;
    println!("[{dialect}] {}", compiled.sql);
    if let Some(fallback) = compiled.replace_fallback {
        println!("[{dialect}]   probe:  {}", fallback.probe);
        println!("[{dialect}]   update: {}", fallback.update);
    }

    let mut qb = conn.table("jobs");
    qb.where_("archived", true)?;
    match qb.delete_limit(100) {
        Ok(qb) => println!("[{dialect}] {}", qb.sql()?),
        Err(e) => println!("[{dialect}] {e}"),
    }

    Ok(())
}

fn main() -> QbResult<()> {
    for dialect in [DialectKind::MySql, DialectKind::Postgres, DialectKind::Sqlite] {
        let conn = Connection::new(ConnectionConfig::new(dialect).with_protect_identifiers(true));
        show(&conn)?;
    }
    Ok(())
}
