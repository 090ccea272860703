use rand::{rngs::StdRng, SeedableRng};
use rbulk::{
    database::batch_operations::{
        build_create_staging_table, build_drop_staging_table, build_insert_header,
        build_union_rows, build_update_from_staging,
    },
    BulkInsertBuilder, ColumnSpec, EncodingMode, SqlDialect, SqlValue,
};

use crate::{
    cli_interface::SqlDetails,
    console::{print_heading, print_parameter, print_statement, print_warn_message},
    sample::{employee_columns, generate_employees, salary_raises, EMPLOYEE_KEY},
};

const PREVIEW_SEED: u64 = 1;

pub fn handle_sql_command(details: SqlDetails) -> Result<(), Box<dyn std::error::Error>> {
    let dialect: SqlDialect = details.dialect.parse()?;
    if details.rows == 0 {
        print_warn_message("No rows requested, nothing to render.");
        return Ok(());
    }

    let mut rng = StdRng::seed_from_u64(PREVIEW_SEED);
    let columns = employee_columns();
    let employees = generate_employees(&mut rng, details.rows);
    let raises = salary_raises(&mut rng, &employees);

    let mode =
        if details.bound { EncodingMode::BoundParameters } else { EncodingMode::LiteralValues };
    let insert = BulkInsertBuilder::new(dialect, "employees", &columns).build(&employees, mode)?;

    print_heading(&format!("{} INSERT ({:?})", dialect.name(), mode));
    print_statement(&insert.sql);
    for (i, param) in insert.params.iter().enumerate() {
        print_parameter(&dialect.placeholder(i + 1), &param.to_string());
    }

    let key = ColumnSpec::text(EMPLOYEE_KEY);
    let changed = [ColumnSpec::numeric("salary")];
    let staging_columns = [key.clone(), changed[0].clone()];
    let staging = dialect.temporary_table_name("preview");
    let rows: Vec<&Vec<SqlValue>> = raises.iter().collect();

    print_heading(&format!("{} staged UPDATE", dialect.name()));
    print_statement(&build_create_staging_table(dialect, &staging, &staging_columns));
    print_statement(&format!(
        "{} {}",
        build_insert_header(dialect, &staging, &staging_columns),
        build_union_rows(dialect, &staging_columns, rows, "UNION ALL")
    ));
    print_statement(&build_update_from_staging(dialect, "employees", &staging, &key, &changed));
    print_statement(&build_drop_staging_table(dialect, &staging));

    Ok(())
}
