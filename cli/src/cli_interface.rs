use clap::{Args, Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "rbulk", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct BenchDetails {
    /// Number of synthetic employee rows to write.
    #[clap(long, short, default_value_t = 5000)]
    pub rows: usize,

    /// optional - SQLite database file, defaults to DATABASE_URL or ./rbulk.db
    #[clap(long, short)]
    pub database: Option<String>,

    /// optional - Rows per literal-value statement, defaults to 500 or the config value.
    #[clap(long, short)]
    pub batch_size: Option<usize>,

    /// optional - Seed for the synthetic data so runs can be compared.
    #[clap(long, short)]
    pub seed: Option<u64>,

    /// optional - Path to an rbulk.yaml overriding batch settings.
    #[clap(long, short)]
    pub config: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SqlDetails {
    /// Dialect to render for: sqlserver, postgres, mysql or sqlite.
    #[clap(long, default_value = "sqlserver")]
    pub dialect: String,

    /// Number of sample rows.
    #[clap(long, short, default_value_t = 3)]
    pub rows: usize,

    /// Render the INSERT with bound parameters instead of literal values.
    #[clap(long)]
    pub bound: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Times row-by-row statements against batched inserts and staged updates
    /// on a SQLite database.
    ///
    /// Example:
    /// `rbulk bench --rows 10000 --batch-size 500`
    #[clap(name = "bench")]
    Bench(BenchDetails),

    /// Prints the statements one batch of sample rows would produce.
    ///
    /// Example:
    /// `rbulk sql --dialect postgres --rows 2`
    #[clap(name = "sql")]
    Sql(SqlDetails),
}
