use crate::config::FarmConfig;
use crate::dashboard::DashboardSummary;
use crate::entities::{
    format_invoice_number, Activity, ActivityUpdate, Coop, CoopStatus, CoopUpdate, Expense,
    Invoice, InvoiceUpdate, Mortality, NewActivity, NewExpense, NewInvoice, NewMortality,
    NewPurchase, Purchase, UnknownVariant,
};
use crate::error::{FarmError, FarmResult};
use crate::rotation::{plan_rotation, RotationPlan};
use crate::stock::{plan_deduction, Deduction};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Sample batches the farm starts with: (quantity, entry date)
const SAMPLE_COOPS: [(i64, (i32, u32, u32)); 7] = [
    (450, (2024, 11, 15)),
    (380, (2024, 11, 10)),
    (420, (2024, 11, 5)),
    (360, (2024, 10, 28)),
    (480, (2024, 10, 20)),
    (390, (2024, 10, 15)),
    (370, (2024, 11, 25)),
];

const INVOICE_SEQUENCE: &str = "invoice_number";

const COOP_COLUMNS: &str = "id, number, quantity, entry_date, status";
const PURCHASE_COLUMNS: &str = "id, purchase_type, quantity, price, supplier, notes, date";
const EXPENSE_COLUMNS: &str = "id, category, description, amount, date";
const ACTIVITY_COLUMNS: &str =
    "id, activity_type, coop_number, description, scheduled_date, completed, recurring";
const INVOICE_COLUMNS: &str = "id, invoice_number, client_name, client_phone, concept, quantity,
     pounds, price_per_pound, total, status, date";
const MORTALITY_COLUMNS: &str = "id, coop_number, quantity, cause, description, date";

/// Event for audit trail (every coop mutation leaves one)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    /// Coop events are keyed by slot number, which never changes
    pub fn for_coop(event_type: &str, coop_number: i64, data: serde_json::Value, actor: &str) -> Self {
        Self::new(event_type, "coop", &coop_number.to_string(), data, actor)
    }
}

pub fn setup_database(conn: &Connection) -> FarmResult<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS coops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            number INTEGER UNIQUE NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            entry_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active'
        );

        CREATE TABLE IF NOT EXISTS purchases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_type TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            price REAL NOT NULL,
            supplier TEXT NOT NULL,
            notes TEXT,
            date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS activities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_type TEXT NOT NULL,
            coop_number INTEGER,
            description TEXT,
            scheduled_date TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            recurring INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS invoices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sequence INTEGER UNIQUE NOT NULL,
            invoice_number TEXT UNIQUE NOT NULL,
            client_name TEXT NOT NULL,
            client_phone TEXT,
            concept TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            pounds REAL NOT NULL,
            price_per_pound REAL NOT NULL,
            total REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'paid',
            date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS mortalities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            coop_number INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            cause TEXT NOT NULL,
            description TEXT,
            date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sequences (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_purchases_date ON purchases(date);
        CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
        CREATE INDEX IF NOT EXISTS idx_activities_scheduled ON activities(scheduled_date);
        CREATE INDEX IF NOT EXISTS idx_invoices_date ON invoices(date);
        CREATE INDEX IF NOT EXISTS idx_mortalities_date ON mortalities(date);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    Ok(())
}

/// Create every coop slot 1..=coop_count that does not exist yet.
/// The first seven get the farm's sample batches, any extra slot starts empty.
pub fn seed_coops(conn: &Connection, config: &FarmConfig, now: DateTime<Utc>) -> FarmResult<usize> {
    let mut inserted = 0;

    for number in 1..=i64::from(config.coop_count) {
        let (quantity, entry_date) = SAMPLE_COOPS
            .get((number - 1) as usize)
            .and_then(|(quantity, (y, m, d))| {
                Utc.with_ymd_and_hms(*y, *m, *d, 0, 0, 0)
                    .single()
                    .map(|date| (*quantity, date))
            })
            .unwrap_or((0, now));

        inserted += conn.execute(
            "INSERT OR IGNORE INTO coops (number, quantity, entry_date, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                number,
                quantity,
                timestamp(entry_date),
                CoopStatus::Active.as_str()
            ],
        )?;
    }

    if inserted > 0 {
        info!(inserted, "seeded coop slots");
    }
    Ok(inserted)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> FarmResult<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            timestamp(event.timestamp),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> FarmResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(row, 1)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| conversion_error(5, e))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// STORE
// ============================================================================

/// Owns the database connection; every read-modify-write runs in one
/// SQLite transaction, so a rotation and a deduction can never interleave.
pub struct Store {
    conn: Connection,
    config: FarmConfig,
}

impl Store {
    pub fn open(path: &Path, config: FarmConfig) -> FarmResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, config)
    }

    pub fn open_in_memory(config: FarmConfig) -> FarmResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, config)
    }

    pub fn with_connection(conn: Connection, config: FarmConfig) -> FarmResult<Self> {
        config.validate()?;
        setup_database(&conn)?;
        seed_coops(&conn, &config, Utc::now())?;
        Ok(Store { conn, config })
    }

    pub fn config(&self) -> &FarmConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Coops
    // ------------------------------------------------------------------------

    pub fn coops(&self) -> FarmResult<Vec<Coop>> {
        query_coops(&self.conn)
    }

    pub fn coop(&self, id: i64) -> FarmResult<Coop> {
        fetch_coop(&self.conn, id)?.ok_or_else(|| FarmError::not_found("Coop", id))
    }

    pub fn update_coop(&mut self, id: i64, update: CoopUpdate) -> FarmResult<Coop> {
        update.validate(&self.config)?;

        let tx = self.conn.transaction()?;
        let current = fetch_coop(&tx, id)?.ok_or_else(|| FarmError::not_found("Coop", id))?;
        let updated = update.apply_to(&current);

        if updated != current {
            tx.execute(
                "UPDATE coops SET quantity = ?1, entry_date = ?2, status = ?3 WHERE id = ?4",
                params![
                    updated.quantity,
                    timestamp(updated.entry_date),
                    updated.status.as_str(),
                    id
                ],
            )?;
            insert_event(
                &tx,
                &Event::for_coop(
                    "coop_updated",
                    current.number,
                    serde_json::json!({ "before": current, "after": updated }),
                    "coop_update",
                ),
            )?;
        }
        tx.commit()?;

        debug!(coop = updated.number, quantity = updated.quantity, "coop updated");
        Ok(updated)
    }

    /// Audit trail of one coop, newest first
    pub fn coop_events(&self, id: i64) -> FarmResult<Vec<Event>> {
        let coop = self.coop(id)?;
        get_events_for_entity(&self.conn, "coop", &coop.number.to_string())
    }

    // ------------------------------------------------------------------------
    // Purchases
    // ------------------------------------------------------------------------

    pub fn purchases(&self) -> FarmResult<Vec<Purchase>> {
        query_list(
            &self.conn,
            &format!("SELECT {} FROM purchases ORDER BY date DESC, id DESC", PURCHASE_COLUMNS),
            purchase_from_row,
        )
    }

    pub fn create_purchase(&mut self, input: NewPurchase) -> FarmResult<Purchase> {
        self.create_purchase_at(input, Utc::now())
    }

    /// Record a purchase dated `now`; chicken purchases rotate the coops
    pub fn create_purchase_at(&mut self, input: NewPurchase, now: DateTime<Utc>) -> FarmResult<Purchase> {
        input.validate(&self.config)?;
        let rotates = input.triggers_rotation();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO purchases (purchase_type, quantity, price, supplier, notes, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                input.purchase_type.as_str(),
                input.quantity,
                input.price,
                input.supplier,
                input.notes,
                timestamp(now)
            ],
        )?;
        let purchase = Purchase {
            id: tx.last_insert_rowid(),
            purchase_type: input.purchase_type,
            quantity: input.quantity,
            price: input.price,
            supplier: input.supplier,
            notes: input.notes,
            date: now,
        };

        if rotates {
            rotate_coops(&tx, &self.config, &purchase)?;
        }
        tx.commit()?;

        info!(
            purchase = purchase.id,
            kind = %purchase.purchase_type,
            quantity = purchase.quantity,
            "purchase recorded"
        );
        Ok(purchase)
    }

    // ------------------------------------------------------------------------
    // Expenses
    // ------------------------------------------------------------------------

    pub fn expenses(&self) -> FarmResult<Vec<Expense>> {
        query_list(
            &self.conn,
            &format!("SELECT {} FROM expenses ORDER BY date DESC, id DESC", EXPENSE_COLUMNS),
            expense_from_row,
        )
    }

    pub fn create_expense(&mut self, input: NewExpense) -> FarmResult<Expense> {
        self.create_expense_at(input, Utc::now())
    }

    pub fn create_expense_at(&mut self, input: NewExpense, now: DateTime<Utc>) -> FarmResult<Expense> {
        input.validate(&self.config)?;

        self.conn.execute(
            "INSERT INTO expenses (category, description, amount, date) VALUES (?1, ?2, ?3, ?4)",
            params![input.category.as_str(), input.description, input.amount, timestamp(now)],
        )?;

        Ok(Expense {
            id: self.conn.last_insert_rowid(),
            category: input.category,
            description: input.description,
            amount: input.amount,
            date: now,
        })
    }

    // ------------------------------------------------------------------------
    // Activities
    // ------------------------------------------------------------------------

    pub fn activities(&self) -> FarmResult<Vec<Activity>> {
        query_list(
            &self.conn,
            &format!(
                "SELECT {} FROM activities ORDER BY scheduled_date DESC, id DESC",
                ACTIVITY_COLUMNS
            ),
            activity_from_row,
        )
    }

    pub fn create_activity(&mut self, input: NewActivity) -> FarmResult<Activity> {
        input.validate(&self.config)?;

        self.conn.execute(
            "INSERT INTO activities (activity_type, coop_number, description, scheduled_date, completed, recurring)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                input.activity_type.as_str(),
                input.coop_number,
                input.description,
                timestamp(input.scheduled_date),
                input.completed,
                input.recurring
            ],
        )?;

        Ok(Activity {
            id: self.conn.last_insert_rowid(),
            activity_type: input.activity_type,
            coop_number: input.coop_number,
            description: input.description,
            scheduled_date: input.scheduled_date,
            completed: input.completed,
            recurring: input.recurring,
        })
    }

    pub fn update_activity(&mut self, id: i64, update: ActivityUpdate) -> FarmResult<Activity> {
        update.validate(&self.config)?;

        let tx = self.conn.transaction()?;
        let current = fetch_one(
            &tx,
            &format!("SELECT {} FROM activities WHERE id = ?1", ACTIVITY_COLUMNS),
            id,
            activity_from_row,
        )?
        .ok_or_else(|| FarmError::not_found("Activity", id))?;
        let updated = update.apply_to(&current);

        tx.execute(
            "UPDATE activities
             SET activity_type = ?1, coop_number = ?2, description = ?3,
                 scheduled_date = ?4, completed = ?5, recurring = ?6
             WHERE id = ?7",
            params![
                updated.activity_type.as_str(),
                updated.coop_number,
                updated.description,
                timestamp(updated.scheduled_date),
                updated.completed,
                updated.recurring,
                id
            ],
        )?;
        tx.commit()?;

        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Invoices
    // ------------------------------------------------------------------------

    pub fn invoices(&self) -> FarmResult<Vec<Invoice>> {
        query_list(
            &self.conn,
            &format!("SELECT {} FROM invoices ORDER BY date DESC, id DESC", INVOICE_COLUMNS),
            invoice_from_row,
        )
    }

    pub fn invoice(&self, id: i64) -> FarmResult<Invoice> {
        fetch_invoice(&self.conn, id)?.ok_or_else(|| FarmError::not_found("Invoice", id))
    }

    pub fn create_invoice(&mut self, input: NewInvoice) -> FarmResult<Invoice> {
        self.create_invoice_at(input, Utc::now())
    }

    /// Number the invoice, store it and take the sold birds out of the sales coop
    pub fn create_invoice_at(&mut self, input: NewInvoice, now: DateTime<Utc>) -> FarmResult<Invoice> {
        input.validate(&self.config)?;

        let tx = self.conn.transaction()?;
        let sequence = next_invoice_sequence(&tx)?;
        let invoice_number = format_invoice_number(&self.config, sequence);
        let total = input.total();

        tx.execute(
            "INSERT INTO invoices (
                sequence, invoice_number, client_name, client_phone, concept, quantity,
                pounds, price_per_pound, total, status, date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                sequence,
                invoice_number,
                input.client_name,
                input.client_phone,
                input.concept,
                input.quantity,
                input.pounds,
                input.price_per_pound,
                total,
                input.status.as_str(),
                timestamp(now)
            ],
        )?;
        let invoice = Invoice {
            id: tx.last_insert_rowid(),
            invoice_number,
            client_name: input.client_name,
            client_phone: input.client_phone,
            concept: input.concept,
            quantity: input.quantity,
            pounds: input.pounds,
            price_per_pound: input.price_per_pound,
            total,
            status: input.status,
            date: now,
        };

        let deduction = plan_deduction(
            &query_coops(&tx)?,
            i64::from(self.config.sales_coop),
            invoice.quantity,
        );
        apply_deduction(&tx, &deduction, "invoice", &invoice.invoice_number)?;
        tx.commit()?;

        info!(invoice = %invoice.invoice_number, total = invoice.total, "invoice created");
        Ok(invoice)
    }

    /// Edit an invoice; the total follows pounds and price, stock is not touched
    pub fn update_invoice(&mut self, id: i64, update: InvoiceUpdate) -> FarmResult<Invoice> {
        update.validate(&self.config)?;

        let tx = self.conn.transaction()?;
        let current = fetch_invoice(&tx, id)?.ok_or_else(|| FarmError::not_found("Invoice", id))?;
        let updated = update.apply_to(&current);
        update.validate_merged(&updated, &self.config)?;

        tx.execute(
            "UPDATE invoices
             SET client_name = ?1, client_phone = ?2, concept = ?3, quantity = ?4,
                 pounds = ?5, price_per_pound = ?6, total = ?7, status = ?8
             WHERE id = ?9",
            params![
                updated.client_name,
                updated.client_phone,
                updated.concept,
                updated.quantity,
                updated.pounds,
                updated.price_per_pound,
                updated.total,
                updated.status.as_str(),
                id
            ],
        )?;
        tx.commit()?;

        Ok(updated)
    }

    /// Remove an invoice. Sold birds are not returned to any coop.
    pub fn delete_invoice(&mut self, id: i64) -> FarmResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM invoices WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(FarmError::not_found("Invoice", id));
        }
        info!(invoice_id = id, "invoice deleted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Mortalities
    // ------------------------------------------------------------------------

    pub fn mortalities(&self) -> FarmResult<Vec<Mortality>> {
        query_list(
            &self.conn,
            &format!("SELECT {} FROM mortalities ORDER BY date DESC, id DESC", MORTALITY_COLUMNS),
            mortality_from_row,
        )
    }

    pub fn create_mortality(&mut self, input: NewMortality) -> FarmResult<Mortality> {
        self.create_mortality_at(input, Utc::now())
    }

    pub fn create_mortality_at(&mut self, input: NewMortality, now: DateTime<Utc>) -> FarmResult<Mortality> {
        input.validate(&self.config)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO mortalities (coop_number, quantity, cause, description, date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                input.coop_number,
                input.quantity,
                input.cause.as_str(),
                input.description,
                timestamp(now)
            ],
        )?;
        let mortality = Mortality {
            id: tx.last_insert_rowid(),
            coop_number: input.coop_number,
            quantity: input.quantity,
            cause: input.cause,
            description: input.description,
            date: now,
        };

        let deduction = plan_deduction(&query_coops(&tx)?, mortality.coop_number, mortality.quantity);
        apply_deduction(&tx, &deduction, "mortality", &mortality.id.to_string())?;
        tx.commit()?;

        Ok(mortality)
    }

    // ------------------------------------------------------------------------
    // Dashboard
    // ------------------------------------------------------------------------

    pub fn dashboard(&self, now: DateTime<Utc>) -> FarmResult<DashboardSummary> {
        Ok(DashboardSummary::build(
            &self.coops()?,
            &self.invoices()?,
            &self.expenses()?,
            &self.mortalities()?,
            now,
        ))
    }
}

// ============================================================================
// DOMAIN WRITES (run inside the caller's transaction)
// ============================================================================

fn rotate_coops(conn: &Connection, config: &FarmConfig, purchase: &Purchase) -> FarmResult<RotationPlan> {
    let snapshot = query_coops(conn)?;
    let plan = plan_rotation(&snapshot, config.coop_count, purchase.quantity, purchase.date);

    for update in &plan.updates {
        conn.execute(
            "UPDATE coops SET quantity = ?1, entry_date = ?2 WHERE id = ?3",
            params![update.quantity, timestamp(update.entry_date), update.coop_id],
        )?;
        insert_event(
            conn,
            &Event::for_coop(
                "coops_rotated",
                update.number,
                serde_json::json!({
                    "purchaseId": purchase.id,
                    "from": update.previous_quantity,
                    "to": update.quantity,
                }),
                "purchase",
            ),
        )?;
    }

    if !plan.is_complete() {
        warn!(missing = ?plan.missing_slots, "rotation skipped missing coop slots");
    }
    info!(
        purchase = purchase.id,
        incoming = purchase.quantity,
        discarded = plan.discarded,
        "coops rotated"
    );
    Ok(plan)
}

fn apply_deduction(conn: &Connection, deduction: &Deduction, actor: &str, source: &str) -> FarmResult<()> {
    match deduction {
        Deduction::Apply {
            coop_id,
            coop_number,
            before,
            after,
        } => {
            conn.execute(
                "UPDATE coops SET quantity = ?1 WHERE id = ?2",
                params![after, coop_id],
            )?;
            insert_event(
                conn,
                &Event::for_coop(
                    "stock_deducted",
                    *coop_number,
                    serde_json::json!({ "source": source, "from": before, "to": after }),
                    actor,
                ),
            )?;
        }
        Deduction::Insufficient {
            coop_number,
            available,
            requested,
        } => {
            warn!(
                coop = coop_number,
                available, requested, source, "stock adjustment skipped: insufficient stock"
            );
            insert_event(
                conn,
                &Event::for_coop(
                    "stock_adjustment_skipped",
                    *coop_number,
                    serde_json::json!({
                        "source": source,
                        "reason": deduction.skip_reason(),
                        "available": available,
                        "requested": requested,
                    }),
                    actor,
                ),
            )?;
        }
        Deduction::CoopMissing { coop_number } => {
            warn!(coop = coop_number, source, "stock adjustment skipped: coop missing");
            insert_event(
                conn,
                &Event::for_coop(
                    "stock_adjustment_skipped",
                    *coop_number,
                    serde_json::json!({ "source": source, "reason": deduction.skip_reason() }),
                    actor,
                ),
            )?;
        }
    }
    Ok(())
}

/// Next invoice sequence value. Taken from the persisted counter and the
/// highest stored invoice, so numbers survive restarts and are never reused.
fn next_invoice_sequence(conn: &Connection) -> FarmResult<i64> {
    let stored: i64 = conn
        .query_row(
            "SELECT value FROM sequences WHERE name = ?1",
            params![INVOICE_SEQUENCE],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let highest: i64 = conn.query_row("SELECT COALESCE(MAX(sequence), 0) FROM invoices", [], |row| {
        row.get(0)
    })?;

    let next = stored.max(highest) + 1;
    conn.execute(
        "INSERT INTO sequences (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        params![INVOICE_SEQUENCE, next],
    )?;
    Ok(next)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Fixed-width RFC 3339 so text order equals time order
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_enum<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn coop_from_row(row: &Row) -> rusqlite::Result<Coop> {
    Ok(Coop {
        id: row.get(0)?,
        number: row.get(1)?,
        quantity: row.get(2)?,
        entry_date: parse_timestamp(row, 3)?,
        status: parse_enum(row, 4)?,
    })
}

fn purchase_from_row(row: &Row) -> rusqlite::Result<Purchase> {
    Ok(Purchase {
        id: row.get(0)?,
        purchase_type: parse_enum(row, 1)?,
        quantity: row.get(2)?,
        price: row.get(3)?,
        supplier: row.get(4)?,
        notes: row.get(5)?,
        date: parse_timestamp(row, 6)?,
    })
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        category: parse_enum(row, 1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        date: parse_timestamp(row, 4)?,
    })
}

fn activity_from_row(row: &Row) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        activity_type: parse_enum(row, 1)?,
        coop_number: row.get(2)?,
        description: row.get(3)?,
        scheduled_date: parse_timestamp(row, 4)?,
        completed: row.get(5)?,
        recurring: row.get(6)?,
    })
}

fn invoice_from_row(row: &Row) -> rusqlite::Result<Invoice> {
    Ok(Invoice {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        client_name: row.get(2)?,
        client_phone: row.get(3)?,
        concept: row.get(4)?,
        quantity: row.get(5)?,
        pounds: row.get(6)?,
        price_per_pound: row.get(7)?,
        total: row.get(8)?,
        status: parse_enum(row, 9)?,
        date: parse_timestamp(row, 10)?,
    })
}

fn mortality_from_row(row: &Row) -> rusqlite::Result<Mortality> {
    Ok(Mortality {
        id: row.get(0)?,
        coop_number: row.get(1)?,
        quantity: row.get(2)?,
        cause: parse_enum(row, 3)?,
        description: row.get(4)?,
        date: parse_timestamp(row, 5)?,
    })
}

fn query_list<T>(
    conn: &Connection,
    sql: &str,
    map: fn(&Row) -> rusqlite::Result<T>,
) -> FarmResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], map)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn fetch_one<T>(
    conn: &Connection,
    sql: &str,
    id: i64,
    map: fn(&Row) -> rusqlite::Result<T>,
) -> FarmResult<Option<T>> {
    Ok(conn.query_row(sql, params![id], map).optional()?)
}

fn query_coops(conn: &Connection) -> FarmResult<Vec<Coop>> {
    query_list(
        conn,
        &format!("SELECT {} FROM coops ORDER BY number", COOP_COLUMNS),
        coop_from_row,
    )
}

fn fetch_coop(conn: &Connection, id: i64) -> FarmResult<Option<Coop>> {
    fetch_one(
        conn,
        &format!("SELECT {} FROM coops WHERE id = ?1", COOP_COLUMNS),
        id,
        coop_from_row,
    )
}

fn fetch_invoice(conn: &Connection, id: i64) -> FarmResult<Option<Invoice>> {
    fetch_one(
        conn,
        &format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS),
        id,
        invoice_from_row,
    )
}
