use anyhow::{bail, Context, Result};
use postgres::types::Type;
use postgres::{Client, NoTls, Row};
use treebench_runtime::{QueryExecutor, Table};

/// Blocking PostgreSQL reader. One connection per query.
#[derive(Default)]
pub struct PostgresExecutor;

impl PostgresExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl QueryExecutor for PostgresExecutor {
    fn read_sql(&mut self, url: &str, query: &str) -> Result<Table> {
        let mut client = Client::connect(url, NoTls).context("postgres connection failed")?;
        let stmt = client
            .prepare(query)
            .with_context(|| format!("failed to prepare `{query}`"))?;
        let columns: Vec<(String, Type)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_().clone()))
            .collect();

        let rows = client
            .query(&stmt, &[])
            .with_context(|| format!("failed to execute `{query}`"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = columns
                .iter()
                .enumerate()
                .map(|(idx, (name, ty))| cell(row, idx, name, ty))
                .collect::<Result<Vec<_>>>()?;
            out.push(values);
        }

        Ok(Table {
            columns: columns.into_iter().map(|(name, _)| name).collect(),
            rows: out,
        })
    }
}

fn cell(row: &Row, idx: usize, name: &str, ty: &Type) -> Result<Option<f64>> {
    let value = if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.map(f64::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(|v| v as f64)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(f64::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(f64::from)
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?
            .map(|b| if b { 1.0 } else { 0.0 })
    } else {
        bail!("column `{name}` has unsupported type {ty}");
    };
    Ok(value)
}
