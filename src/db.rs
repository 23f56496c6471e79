use crate::error::{StoreError, StoreResult};
use crate::models::{Cell, CityDim, CustomerDim, SaleFact, SourceTables};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, info};

pub type DbConn = Connection;

pub const FACT_SALE: &str = "FactSale";
pub const DIM_CUSTOMER: &str = "DimCustomer";
pub const DIM_CITY: &str = "DimCity";

/// Open the store read-only. A missing file is reported as `NotFound`
/// instead of letting SQLite create an empty database.
pub fn connect(path: &Path) -> StoreResult<DbConn> {
    if !path.is_file() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| StoreError::Connection {
        path: path.to_path_buf(),
        source,
    })?;

    // Opening is lazy; touch the schema so a corrupt file fails here
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
        .map_err(|source| StoreError::Connection {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(conn)
}

/// Load `FactSale`, `DimCustomer` and `DimCity` in full.
///
/// The connection lives only for the duration of this call and is closed on
/// both the success and the error path. Nothing is returned unless all three
/// relations were read.
pub fn load_tables(path: &Path) -> StoreResult<SourceTables> {
    let tables = {
        let conn = connect(path)?;
        info!("Connected to data store at {}", path.display());
        let result = read_tables(&conn);
        drop(conn);
        info!("Data store connection closed");
        result?
    };

    info!(
        "Loaded {} sales, {} customers, {} cities",
        tables.sales.len(),
        tables.customers.len(),
        tables.cities.len()
    );
    Ok(tables)
}

fn read_tables(conn: &DbConn) -> StoreResult<SourceTables> {
    let customers = read_customers(&Relation::read(conn, DIM_CUSTOMER)?)?;
    let sales = read_sales(&Relation::read(conn, FACT_SALE)?)?;
    let cities = read_cities(&Relation::read(conn, DIM_CITY)?)?;
    Ok(SourceTables {
        sales,
        customers,
        cities,
    })
}

/// A relation read generically: column names plus untyped cells
struct Relation {
    name: &'static str,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Relation {
    fn read(conn: &DbConn, name: &'static str) -> StoreResult<Self> {
        let query_err = |source| StoreError::Query {
            relation: name,
            source,
        };

        let mut stmt = conn
            .prepare(&format!("SELECT * FROM \"{}\"", name))
            .map_err(query_err)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i).map(Cell::from))
                    .collect::<rusqlite::Result<Vec<Cell>>>()
            })
            .map_err(query_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err)?;

        debug!("Read {} rows x {} columns from {}", rows.len(), width, name);
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Column lookup tolerant of case, spaces and underscores
    /// ("Customer Key", "CustomerKey", "customer_key")
    fn find(&self, column: &str) -> Option<usize> {
        let wanted = fold_column_name(column);
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| fold_column_name(c) == wanted))
    }

    fn index(&self, column: &'static str) -> StoreResult<usize> {
        self.find(column).ok_or(StoreError::MissingColumn {
            relation: self.name,
            column,
        })
    }

    fn key(&self, row: &[Cell], idx: usize, column: &'static str) -> StoreResult<i64> {
        key_of(&row[idx]).ok_or_else(|| StoreError::InvalidKey {
            relation: self.name,
            column,
            value: format!("{:?}", row[idx]),
        })
    }
}

fn fold_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Coerce a key cell to an integer; integral reals and numeric text are accepted
pub fn key_of(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Integer(i) => Some(*i),
        // i64::MAX as f64 rounds up to 2^63, hence the exclusive upper bound
        Cell::Real(f) if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) => {
            Some(*f as i64)
        }
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Text(s) => Some(s.clone()),
        Cell::Integer(i) => Some(i.to_string()),
        Cell::Real(f) => Some(f.to_string()),
    }
}

fn read_sales(rel: &Relation) -> StoreResult<Vec<SaleFact>> {
    let sale_key = rel.index("Sale Key")?;
    let customer_key = rel.index("Customer Key")?;
    let city_key = rel.index("City Key")?;
    let invoice_date = rel.index("Invoice Date Key")?;
    let total = rel.index("Total Including Tax")?;
    let category = rel.find("Category");

    rel.rows
        .iter()
        .map(|row| {
            Ok(SaleFact {
                sale_key: rel.key(row, sale_key, "Sale Key")?,
                customer_key: key_of(&row[customer_key]),
                city_key: key_of(&row[city_key]),
                invoice_date: row[invoice_date].clone(),
                total_including_tax: row[total].clone(),
                category: category.and_then(|i| text_of(&row[i])),
            })
        })
        .collect()
}

fn read_customers(rel: &Relation) -> StoreResult<Vec<CustomerDim>> {
    let customer_key = rel.index("Customer Key")?;
    let customer = rel.find("Customer");
    let category = rel.find("Category");
    let buying_group = rel.find("Buying Group");

    rel.rows
        .iter()
        .map(|row| {
            Ok(CustomerDim {
                customer_key: rel.key(row, customer_key, "Customer Key")?,
                customer: customer.and_then(|i| text_of(&row[i])),
                category: category.and_then(|i| text_of(&row[i])),
                buying_group: buying_group.and_then(|i| text_of(&row[i])),
            })
        })
        .collect()
}

fn read_cities(rel: &Relation) -> StoreResult<Vec<CityDim>> {
    let city_key = rel.index("City Key")?;
    let city = rel.index("City")?;
    let state_province = rel.find("State Province");

    rel.rows
        .iter()
        .map(|row| {
            Ok(CityDim {
                city_key: rel.key(row, city_key, "City Key")?,
                city: text_of(&row[city]),
                state_province: state_province.and_then(|i| text_of(&row[i])),
            })
        })
        .collect()
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Cell::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Create the three relations with the column names the loader expects.
/// Amount and date columns carry no declared type so raw values are kept as
/// written.
pub fn init_schema(conn: &DbConn) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS DimCustomer (
            "Customer Key"  INTEGER PRIMARY KEY,
            "Customer"      TEXT,
            "Category"      TEXT,
            "Buying Group"  TEXT
        );

        CREATE TABLE IF NOT EXISTS DimCity (
            "City Key"        INTEGER PRIMARY KEY,
            "City"            TEXT,
            "State Province"  TEXT
        );

        CREATE TABLE IF NOT EXISTS FactSale (
            "Sale Key"             INTEGER PRIMARY KEY,
            "City Key"             INTEGER,
            "Customer Key"         INTEGER,
            "Invoice Date Key",
            "Total Including Tax"
        );
        "#,
    )
}

/// Write all three relations in a single transaction
pub fn write_tables(conn: &mut DbConn, tables: &SourceTables) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            r#"INSERT INTO DimCustomer ("Customer Key", "Customer", "Category", "Buying Group")
               VALUES (?1, ?2, ?3, ?4)"#,
        )?;
        for c in &tables.customers {
            stmt.execute(params![c.customer_key, c.customer, c.category, c.buying_group])?;
        }

        let mut stmt = tx.prepare(
            r#"INSERT INTO DimCity ("City Key", "City", "State Province") VALUES (?1, ?2, ?3)"#,
        )?;
        for c in &tables.cities {
            stmt.execute(params![c.city_key, c.city, c.state_province])?;
        }

        let mut stmt = tx.prepare(
            r#"INSERT INTO FactSale ("Sale Key", "City Key", "Customer Key", "Invoice Date Key", "Total Including Tax")
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )?;
        for s in &tables.sales {
            stmt.execute(params![
                s.sale_key,
                s.city_key,
                s.customer_key,
                s.invoice_date,
                s.total_including_tax
            ])?;
        }
    }
    tx.commit()
}
