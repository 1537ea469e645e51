//! Setup probes backed by the `PostgreSQL` system catalogs.
//!
//! Each probe lists the objects a step must have created and asks the
//! catalog which of them exist in the configured schema. The probe passes
//! only when none are missing.

use async_trait::async_trait;
use sqlx::PgPool;

use stockroom_core::{ProbeError, StepProbe};

/// Kind of catalog object a probe looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogObject {
    /// Enum types (`pg_type`, `typtype = 'e'`).
    EnumType,
    /// Ordinary tables (`information_schema.tables`).
    Table,
    /// Tables with row-level security enabled (`pg_class.relrowsecurity`).
    RowLevelSecurity,
    /// Functions callable over RPC (`pg_proc`).
    Function,
}

impl CatalogObject {
    const fn query(self) -> &'static str {
        match self {
            Self::EnumType => {
                r"
                SELECT DISTINCT t.typname::text
                FROM pg_type t
                JOIN pg_namespace n ON n.oid = t.typnamespace
                WHERE n.nspname = $1 AND t.typtype = 'e' AND t.typname::text = ANY($2)
                "
            }
            Self::Table => {
                r"
                SELECT DISTINCT table_name::text
                FROM information_schema.tables
                WHERE table_schema = $1
                  AND table_type = 'BASE TABLE'
                  AND table_name::text = ANY($2)
                "
            }
            Self::RowLevelSecurity => {
                r"
                SELECT DISTINCT c.relname::text
                FROM pg_class c
                JOIN pg_namespace n ON n.oid = c.relnamespace
                WHERE n.nspname = $1
                  AND c.relkind = 'r'
                  AND c.relrowsecurity
                  AND c.relname::text = ANY($2)
                "
            }
            Self::Function => {
                r"
                SELECT DISTINCT p.proname::text
                FROM pg_proc p
                JOIN pg_namespace n ON n.oid = p.pronamespace
                WHERE n.nspname = $1 AND p.proname::text = ANY($2)
                "
            }
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::EnumType => "enum types",
            Self::Table => "tables",
            Self::RowLevelSecurity => "row-level security",
            Self::Function => "functions",
        }
    }
}

/// Probe passing when every named object of one kind exists in a schema.
#[derive(Debug, Clone)]
pub struct CatalogProbe {
    pool: PgPool,
    schema: String,
    object: CatalogObject,
    names: Vec<String>,
}

impl CatalogProbe {
    #[must_use]
    pub fn new(pool: PgPool, schema: &str, object: CatalogObject, names: &[&str]) -> Self {
        Self {
            pool,
            schema: schema.to_owned(),
            object,
            names: names.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    /// Names the catalog does not have.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the catalog query fails.
    pub async fn missing(&self) -> Result<Vec<String>, sqlx::Error> {
        let found: Vec<String> = sqlx::query_scalar::<_, String>(self.object.query())
            .bind(&self.schema)
            .bind(&self.names)
            .fetch_all(&self.pool)
            .await?;

        Ok(missing_names(&self.names, &found))
    }
}

fn missing_names(expected: &[String], found: &[String]) -> Vec<String> {
    expected
        .iter()
        .filter(|name| !found.contains(name))
        .cloned()
        .collect()
}

#[async_trait]
impl StepProbe for CatalogProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        let missing = self.missing().await.map_err(|e| {
            ProbeError::with_source(format!("could not check {}", self.object.label()), e)
        })?;

        if missing.is_empty() {
            Ok(true)
        } else {
            tracing::info!(
                schema = %self.schema,
                object = self.object.label(),
                missing = ?missing,
                "Setup objects missing"
            );
            Ok(false)
        }
    }
}
