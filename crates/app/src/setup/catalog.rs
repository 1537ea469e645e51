//! The backend bootstrap steps, in the order they must be run.

use std::sync::Arc;

use sqlx::PgPool;

use stockroom_core::{SetupError, SetupStep, SetupTracker};

use super::probes::{CatalogObject, CatalogProbe};

/// Step ids.
pub mod step_ids {
    pub const ENUMS: &str = "enums";
    pub const TABLES: &str = "tables";
    pub const RLS: &str = "rls";
    pub const FUNCTIONS: &str = "functions";
    pub const SEED: &str = "seed";

    pub const ALL: [&str; 5] = [ENUMS, TABLES, RLS, FUNCTIONS, SEED];
}

pub const REQUIRED_ENUMS: [&str; 3] = ["user_role", "product_status", "transfer_status"];

pub const REQUIRED_TABLES: [&str; 7] = [
    "profiles",
    "products",
    "customers",
    "suppliers",
    "samples",
    "sales",
    "transfers",
];

pub const REQUIRED_FUNCTIONS: [&str; 3] = [
    "generate_product_code",
    "handle_new_user",
    "soft_delete_record",
];

const ENUMS_SQL: &str = r"CREATE TYPE user_role AS ENUM ('super_admin', 'admin', 'sales_manager', 'investor');
CREATE TYPE product_status AS ENUM ('available', 'reserved', 'sold', 'archived');
CREATE TYPE transfer_status AS ENUM ('pending', 'in_transit', 'received', 'cancelled');";

const TABLES_SQL: &str = r"CREATE TABLE profiles (
    id uuid PRIMARY KEY REFERENCES auth.users (id) ON DELETE CASCADE,
    email text NOT NULL UNIQUE,
    full_name text,
    role user_role NOT NULL DEFAULT 'investor',
    permissions jsonb,
    is_active boolean NOT NULL DEFAULT true,
    created_at timestamptz NOT NULL DEFAULT now(),
    deleted_at timestamptz
);
-- products, customers, suppliers, samples, sales and transfers follow the
-- same pattern: uuid id, created_at, updated_at, deleted_at.";

const RLS_SQL: &str = r"ALTER TABLE profiles ENABLE ROW LEVEL SECURITY;
ALTER TABLE products ENABLE ROW LEVEL SECURITY;
ALTER TABLE customers ENABLE ROW LEVEL SECURITY;
ALTER TABLE suppliers ENABLE ROW LEVEL SECURITY;
ALTER TABLE samples ENABLE ROW LEVEL SECURITY;
ALTER TABLE sales ENABLE ROW LEVEL SECURITY;
ALTER TABLE transfers ENABLE ROW LEVEL SECURITY;";

const FUNCTIONS_SQL: &str = r"CREATE OR REPLACE FUNCTION generate_product_code() RETURNS text
    LANGUAGE sql AS $$ SELECT 'PRD-' || lpad(nextval('product_code_seq')::text, 6, '0') $$;

CREATE OR REPLACE FUNCTION handle_new_user() RETURNS trigger
    LANGUAGE plpgsql SECURITY DEFINER AS $$
BEGIN
    INSERT INTO profiles (id, email, full_name)
    VALUES (NEW.id, lower(NEW.email), NEW.raw_user_meta_data ->> 'full_name');
    RETURN NEW;
END $$;

CREATE OR REPLACE FUNCTION soft_delete_record(table_name text, record_id uuid) RETURNS void
    LANGUAGE plpgsql SECURITY DEFINER AS $$
BEGIN
    EXECUTE format('UPDATE %I SET deleted_at = now() WHERE id = $1', table_name)
    USING record_id;
END $$;";

const SEED_SQL: &str = r"UPDATE profiles
SET role = 'super_admin', is_active = true
WHERE email = lower('owner@example.com');";

/// The catalog with probes against `pool`, checking objects in `schema`.
#[must_use]
pub fn default_steps(pool: &PgPool, schema: &str) -> Vec<SetupStep> {
    let probe = |object, names: &[&str]| {
        Arc::new(CatalogProbe::new(pool.clone(), schema, object, names))
    };

    let [enums, tables, rls, functions, seed] = base_steps();
    vec![
        enums.with_probe(probe(CatalogObject::EnumType, &REQUIRED_ENUMS)),
        tables.with_probe(probe(CatalogObject::Table, &REQUIRED_TABLES)),
        rls.with_probe(probe(CatalogObject::RowLevelSecurity, &REQUIRED_TABLES)),
        functions.with_probe(probe(CatalogObject::Function, &REQUIRED_FUNCTIONS)),
        seed,
    ]
}

/// The catalog with no probes, for working without a database.
#[must_use]
pub fn manual_steps() -> Vec<SetupStep> {
    base_steps().into()
}

/// Build a tracker over [`default_steps`] or, without a pool, [`manual_steps`].
///
/// # Errors
///
/// Returns `SetupError::DuplicateStep` if the catalog repeats an id.
pub fn tracker(pool: Option<&PgPool>, schema: &str) -> Result<SetupTracker, SetupError> {
    let steps = match pool {
        Some(pool) => default_steps(pool, schema),
        None => manual_steps(),
    };
    SetupTracker::new(steps)
}

fn base_steps() -> [SetupStep; 5] {
    [
        SetupStep::new(
            step_ids::ENUMS,
            "Create enum types",
            "Role, product status and transfer status enumerations.",
        )
        .with_sql(ENUMS_SQL)
        .with_manual_instructions(
            "Open the SQL editor of the hosted project and run the enum statements.",
        ),
        SetupStep::new(
            step_ids::TABLES,
            "Create tables",
            "Profiles plus the inventory and sales tables.",
        )
        .with_sql(TABLES_SQL)
        .with_manual_instructions(
            "Run the table statements after the enum types exist. Every table keeps a \
             deleted_at column for soft deletes.",
        ),
        SetupStep::new(
            step_ids::RLS,
            "Enable row-level security",
            "Restrict every table to authenticated users with the right role.",
        )
        .with_sql(RLS_SQL)
        .with_manual_instructions(
            "Enable RLS on each table, then add the role policies from the project \
             dashboard under Authentication > Policies.",
        ),
        SetupStep::new(
            step_ids::FUNCTIONS,
            "Create functions",
            "Product code generation, new-user profile trigger and soft delete.",
        )
        .with_sql(FUNCTIONS_SQL)
        .with_manual_instructions(
            "Run the function statements, then attach handle_new_user as an AFTER INSERT \
             trigger on auth.users.",
        ),
        SetupStep::new(
            step_ids::SEED,
            "Promote the first administrator",
            "Give the owner account the super_admin role.",
        )
        .with_sql(SEED_SQL)
        .with_manual_instructions(
            "Sign up once in the app with the owner email, replace the address in the \
             statement and run it. Mark this step done yourself; it cannot be detected.",
        ),
    ]
}
