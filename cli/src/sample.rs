use chrono::{Days, NaiveDate};
use rand::Rng;
use rbulk::{ColumnSpec, Row, SqlValue};
use rust_decimal::Decimal;

const FIRST_NAMES: &[&str] =
    &["Ada", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Niklaus"];

const LAST_NAMES: &[&str] =
    &["Lovelace", "Hopper", "O'Brien", "Hamilton", "Ritchie", "Liskov", "Thompson", "Allen"];

const CONTRACTS: &[&str] = &["CDI", "CDD", "Interim", "Apprentice"];

pub const EMPLOYEE_KEY: &str = "matricule";

pub fn employee_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::text(EMPLOYEE_KEY),
        ColumnSpec::text("name"),
        ColumnSpec::text("contract"),
        ColumnSpec::numeric("salary"),
        ColumnSpec::date("hire_date"),
    ]
}

pub fn create_employee_table_sql(table_name: &str) -> String {
    format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
             matricule TEXT PRIMARY KEY,
             name TEXT,
             contract TEXT,
             salary NUMERIC,
             hire_date TEXT
         );",
        table = table_name
    )
}

fn pick<'a, R: Rng>(rng: &mut R, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

/// Synthetic employees keyed `000001`, `000002`, ... with the odd missing
/// contract so NULL handling is part of every run.
pub fn generate_employees<R: Rng>(rng: &mut R, count: usize) -> Vec<Row> {
    let epoch = NaiveDate::from_ymd_opt(2000, 1, 1);

    (1..=count)
        .map(|i| {
            let name = format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES));
            let contract =
                if rng.random_bool(0.05) { None } else { Some(pick(rng, CONTRACTS)) };
            let salary = Decimal::new(rng.random_range(150_000..900_000), 2);
            let hire_date =
                epoch.and_then(|date| date.checked_add_days(Days::new(rng.random_range(0..9000))));

            vec![
                SqlValue::text(format!("{:06}", i)),
                SqlValue::text(name),
                SqlValue::from(contract),
                SqlValue::from(salary),
                SqlValue::from(hire_date),
            ]
        })
        .collect()
}

/// `[matricule, new salary]` for every employee, a raise between 1% and 10%.
pub fn salary_raises<R: Rng>(rng: &mut R, employees: &[Row]) -> Vec<Row> {
    employees
        .iter()
        .map(|row| {
            let raise = Decimal::new(rng.random_range(101..=110), 2);
            let salary = match row.get(3) {
                Some(SqlValue::Decimal(salary)) => (salary * raise).round_dp(2),
                _ => Decimal::ZERO,
            };
            vec![row[0].clone(), SqlValue::from(salary)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_generated_rows_match_columns() {
        let mut rng = StdRng::seed_from_u64(7);
        let employees = generate_employees(&mut rng, 50);

        assert_eq!(employees.len(), 50);
        assert!(employees.iter().all(|row| row.len() == employee_columns().len()));
        assert_eq!(employees[0][0], SqlValue::text("000001"));
        assert_eq!(employees[49][0], SqlValue::text("000050"));
    }

    #[test]
    fn test_same_seed_same_rows() {
        let first = generate_employees(&mut StdRng::seed_from_u64(42), 20);
        let second = generate_employees(&mut StdRng::seed_from_u64(42), 20);
        assert_eq!(first, second);
    }

    #[test]
    fn test_salary_raises_keep_keys() {
        let mut rng = StdRng::seed_from_u64(1);
        let employees = generate_employees(&mut rng, 10);
        let raises = salary_raises(&mut rng, &employees);

        for (employee, raise) in employees.iter().zip(&raises) {
            assert_eq!(employee[0], raise[0]);
            match (&employee[3], &raise[1]) {
                (SqlValue::Decimal(old), SqlValue::Decimal(new)) => assert!(new > old),
                other => panic!("unexpected salaries {:?}", other),
            }
        }
    }
}
