//! SQL schema for the Taste Tracker SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Find-or-create by name; rows are never updated once written.
CREATE TABLE IF NOT EXISTS restaurants (
    restaurant_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    cuisine       TEXT,
    address       TEXT,
    latitude      REAL,
    longitude     REAL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS companions (
    companion_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS visits (
    visit_id      TEXT PRIMARY KEY,
    restaurant_id TEXT NOT NULL REFERENCES restaurants(restaurant_id),
    visit_date    TEXT NOT NULL,   -- YYYY-MM-DD
    rating        INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    recorded_at   TEXT NOT NULL    -- RFC 3339 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS visit_companions (
    visit_id     TEXT NOT NULL REFERENCES visits(visit_id) ON DELETE CASCADE,
    companion_id TEXT NOT NULL REFERENCES companions(companion_id),
    position     INTEGER NOT NULL,
    PRIMARY KEY (visit_id, companion_id)
);

-- Owned by exactly one visit.
CREATE TABLE IF NOT EXISTS menu_items (
    menu_item_id TEXT PRIMARY KEY,
    visit_id     TEXT NOT NULL REFERENCES visits(visit_id) ON DELETE CASCADE,
    position     INTEGER NOT NULL,
    name         TEXT NOT NULL,
    category     TEXT NOT NULL
                 CHECK (category IN ('STARTER', 'MAIN', 'DESSERT', 'DRINK')),
    price        REAL CHECK (price IS NULL OR price >= 0),
    UNIQUE (visit_id, position)
);

CREATE INDEX IF NOT EXISTS visits_restaurant_idx       ON visits(restaurant_id);
CREATE INDEX IF NOT EXISTS visits_date_idx             ON visits(visit_date);
CREATE INDEX IF NOT EXISTS visit_companions_companion_idx
    ON visit_companions(companion_id);

PRAGMA user_version = 1;
";
