use std::{
    path::Path,
    time::{Duration, Instant},
};

use colored::Colorize;
use rand::{rngs::StdRng, SeedableRng};
use rbulk::{
    database::sqlite::connection_string, encode_numeric, encode_text, read_config, BulkConfig,
    BulkWriteSummary, BulkWriter, ColumnSpec, ConfigurationError, EncodingMode, ExecutionSink,
    Row, SqlDialect, SqliteClient,
};

use crate::{
    cli_interface::BenchDetails,
    console::{format_speed_up, print_heading, print_success_message, print_warn_message},
    sample::{
        create_employee_table_sql, employee_columns, generate_employees, salary_raises,
        EMPLOYEE_KEY,
    },
};

const ROW_BY_ROW_TABLE: &str = "employees_row_by_row";
const BATCHED_TABLE: &str = "employees_batched";

struct Measurement {
    case: &'static str,
    statements: usize,
    rows_affected: u64,
    elapsed: Duration,
}

impl Measurement {
    fn new(case: &'static str, summary: BulkWriteSummary, elapsed: Duration) -> Self {
        Measurement {
            case,
            statements: summary.batches,
            rows_affected: summary.rows_affected,
            elapsed,
        }
    }
}

fn timed<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<(T, Duration), E> {
    let started = Instant::now();
    let value = f()?;
    Ok((value, started.elapsed()))
}

fn resolve_config(details: &BenchDetails) -> Result<BulkConfig, Box<dyn std::error::Error>> {
    let mut config = match &details.config {
        Some(path) => read_config(Path::new(path))?,
        None => BulkConfig::new(SqlDialect::Sqlite),
    };

    if config.dialect != SqlDialect::Sqlite {
        print_warn_message(&format!(
            "Config targets {} but the benchmark runs on SQLite, using SQLite limits instead",
            config.dialect.name()
        ));
        config.dialect = SqlDialect::Sqlite;
        config.limits = None;
    }

    if let Some(batch_size) = details.batch_size {
        config = config.with_batch_size(batch_size);
    }

    config.validate()?;
    Ok(config)
}

/// Writer issuing one INSERT per row whatever encoding the config asks for,
/// since bound mode sizes batches from the parameter ceiling instead.
fn row_by_row_writer(config: &BulkConfig) -> Result<BulkWriter, ConfigurationError> {
    BulkWriter::new(config.clone().with_encoding(EncodingMode::LiteralValues).with_batch_size(1))
}

/// One UPDATE per row, all inside a single transaction.
fn update_row_by_row(
    client: &mut SqliteClient,
    table_name: &str,
    updates: &[Row],
) -> Result<BulkWriteSummary, Box<dyn std::error::Error>> {
    let mut summary = BulkWriteSummary { rows: updates.len(), ..Default::default() };

    client.begin()?;
    for row in updates {
        let matricule = row[0].as_raw_string();
        let salary = row[1].as_raw_string();
        let sql = format!(
            "UPDATE {} SET salary = {} WHERE {} = {}",
            table_name,
            encode_numeric(salary.as_deref()),
            EMPLOYEE_KEY,
            encode_text(matricule.as_deref())
        );

        match client.execute(&sql, &[]) {
            Ok(affected) => summary.rows_affected += affected,
            Err(e) => {
                client.rollback()?;
                return Err(e.into());
            }
        }
        summary.batches += 1;
    }
    client.commit()?;

    Ok(summary)
}

fn print_results(measurements: &[Measurement]) {
    print_heading("Results");
    println!(
        "{:<28} {:>12} {:>14} {:>12}   {}",
        "case".bold(),
        "statements".bold(),
        "rows affected".bold(),
        "time (ms)".bold(),
        "speed-up".bold()
    );

    // measurements come in (row-by-row, batched) pairs
    for pair in measurements.chunks(2) {
        let baseline = pair[0].elapsed.as_secs_f64();
        for measurement in pair {
            let elapsed = measurement.elapsed.as_secs_f64();
            println!(
                "{:<28} {:>12} {:>14} {:>12.2}   {}",
                measurement.case,
                measurement.statements,
                measurement.rows_affected,
                elapsed * 1000.0,
                format_speed_up(baseline, elapsed)
            );
        }
    }
}

pub fn handle_bench_command(details: BenchDetails) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&details)?;
    let database = details.database.clone().unwrap_or_else(connection_string);
    let seed = details.seed.unwrap_or_else(rand::random);

    print_heading(&format!(
        "Benchmarking {} rows against {} (batch size {}, seed {})",
        details.rows, database, config.batch_size, seed
    ));

    let mut rng = StdRng::seed_from_u64(seed);
    let columns = employee_columns();
    let employees = generate_employees(&mut rng, details.rows);
    let raises = salary_raises(&mut rng, &employees);
    let key = ColumnSpec::text(EMPLOYEE_KEY);
    let changed = [ColumnSpec::numeric("salary")];

    let mut client = SqliteClient::open(&database)?;
    client.batch_execute(&create_employee_table_sql(ROW_BY_ROW_TABLE))?;
    client.batch_execute(&create_employee_table_sql(BATCHED_TABLE))?;

    let row_by_row = row_by_row_writer(&config)?;
    let batched = BulkWriter::new(config)?;

    let mut measurements = Vec::with_capacity(4);

    let (summary, elapsed) =
        timed(|| row_by_row.insert(&mut client, ROW_BY_ROW_TABLE, &columns, &employees))?;
    measurements.push(Measurement::new("row-by-row INSERT", summary, elapsed));

    let (summary, elapsed) =
        timed(|| batched.insert(&mut client, BATCHED_TABLE, &columns, &employees))?;
    measurements.push(Measurement::new("batched INSERT", summary, elapsed));

    let (summary, elapsed) = timed(|| update_row_by_row(&mut client, ROW_BY_ROW_TABLE, &raises))?;
    measurements.push(Measurement::new("row-by-row UPDATE", summary, elapsed));

    let (summary, elapsed) =
        timed(|| batched.update(&mut client, BATCHED_TABLE, &key, &changed, &raises))?;
    measurements.push(Measurement::new("staged UPDATE", summary, elapsed));

    print_results(&measurements);

    let mismatches: i64 = client.query_scalar(&format!(
        "SELECT COUNT(*) FROM {a} a JOIN {b} b ON a.{key} = b.{key} \
         WHERE a.salary IS NOT b.salary OR a.contract IS NOT b.contract",
        a = ROW_BY_ROW_TABLE,
        b = BATCHED_TABLE,
        key = EMPLOYEE_KEY
    ))?;

    if mismatches == 0 {
        print_success_message("\nBoth approaches produced identical tables.");
    } else {
        print_warn_message(&format!(
            "\n{} rows differ between {} and {}",
            mismatches, ROW_BY_ROW_TABLE, BATCHED_TABLE
        ));
    }

    Ok(())
}
